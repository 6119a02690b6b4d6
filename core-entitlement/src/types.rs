//! Entitlement domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of the authenticated principal, as issued by the identity
/// provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrincipalId(pub String);

impl PrincipalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Entitlement state of a principal as read from the document store.
///
/// Referenced, not owned: the document store is the source of truth and the
/// core never mutates the balance except through the debit operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitlementState {
    /// Coin balance (non-negative)
    pub coins: u64,
    /// Whether a membership is currently flagged active
    pub membership_active: bool,
    /// Membership expiry instant, if any
    pub membership_expiry: Option<DateTime<Utc>>,
}

impl EntitlementState {
    /// A fresh account: no coins, no membership.
    pub fn empty() -> Self {
        Self {
            coins: 0,
            membership_active: false,
            membership_expiry: None,
        }
    }

    /// Whether membership entitles access at the given instant.
    ///
    /// A set flag with a lapsed expiry does not count; the service flips the
    /// flag off at read time.
    pub fn is_member_at(&self, now: DateTime<Utc>) -> bool {
        if !self.membership_active {
            return false;
        }
        match self.membership_expiry {
            Some(expiry) => now <= expiry,
            // Flag without expiry is treated as active (legacy documents).
            None => true,
        }
    }
}

/// Category of a ledger transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Coins credited after a successful charge
    CoinPurchase,
    /// Coins spent on a chapter unlock
    CoinUsage,
    /// Membership purchase or renewal
    Membership,
}

/// Immutable ledger entry appended by every balance mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Store-generated document id
    #[serde(skip)]
    pub id: String,
    /// Transaction category
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// Signed coin delta (negative for usage, zero for membership)
    pub amount: i64,
    /// Price paid in currency, for purchases
    #[serde(default)]
    pub price: f64,
    /// Human-readable description referencing the book and chapter
    pub description: String,
    /// Timestamp (Unix epoch seconds)
    pub timestamp: i64,
}

/// Result of a debit attempt.
///
/// Insufficient balance is an expected outcome, not an error: the caller
/// surfaces an upsell action rather than a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebitOutcome {
    /// Balance was decremented and a ledger entry appended.
    Completed { new_balance: u64 },
    /// Balance was left untouched.
    InsufficientBalance { balance: u64 },
}

impl DebitOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, DebitOutcome::Completed { .. })
    }
}
