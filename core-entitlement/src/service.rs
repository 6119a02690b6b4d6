//! # Balance Service
//!
//! Orchestrates coin debits, credits, and membership state against the remote
//! document store, appending an immutable transaction record for every
//! mutation and refreshing the client state mirrors afterwards.

use crate::error::{EntitlementError, Result};
use crate::types::{
    DebitOutcome, EntitlementState, PrincipalId, TransactionKind, TransactionRecord,
};
use async_trait::async_trait;
use bridge_traits::documents::{Document, DocumentQuery, DocumentStore};
use bridge_traits::Clock;
use chrono::{DateTime, TimeZone, Utc};
use core_catalog::ClientStateStore;
use core_runtime::events::{CoreEvent, EntitlementEvent, EventBus};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Collection holding user documents.
const USERS_COLLECTION: &str = "users";

/// Membership duration granted per purchase.
pub const MEMBERSHIP_DAYS: i64 = 30;

/// External balance operations used by the chapter unlock gate.
///
/// Implementations must keep the stored balance the single source of truth:
/// a debit decrements it and appends a ledger record atomically enough that a
/// reread observes the new balance.
#[async_trait]
pub trait BalanceService: Send + Sync {
    /// Current entitlement state. Lapsed memberships are flipped off and
    /// persisted during this read.
    async fn entitlement_of(&self, principal: &PrincipalId) -> Result<EntitlementState>;

    /// Attempt to debit `amount` coins. Insufficient balance is a normal
    /// outcome, not an error; the balance is left untouched in that case.
    async fn debit(
        &self,
        principal: &PrincipalId,
        amount: u64,
        description: &str,
    ) -> Result<DebitOutcome>;

    /// Credit coins after an opaque "charge succeeded" event from the payment
    /// processor. Returns the new balance.
    async fn grant(&self, principal: &PrincipalId, coins: u64, description: &str) -> Result<u64>;

    /// Activate or renew membership for [`MEMBERSHIP_DAYS`] days. Returns the
    /// new expiry instant.
    async fn activate_membership(&self, principal: &PrincipalId) -> Result<DateTime<Utc>>;

    /// Stop auto-renewal; membership remains active until expiry.
    async fn cancel_auto_renew(&self, principal: &PrincipalId) -> Result<()>;

    /// Transaction records, newest first.
    async fn history(
        &self,
        principal: &PrincipalId,
        limit: usize,
    ) -> Result<Vec<TransactionRecord>>;
}

/// `BalanceService` implementation over a [`DocumentStore`].
///
/// User documents live at `users/{principal}`, their ledgers at
/// `users/{principal}/transactions`.
pub struct DocumentBalanceService {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    client_state: Option<Arc<ClientStateStore>>,
    event_bus: Option<Arc<EventBus>>,
}

impl DocumentBalanceService {
    pub fn new(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            client_state: None,
            event_bus: None,
        }
    }

    /// Refresh the client mirrors after every mutation.
    pub fn with_client_state(mut self, client_state: Arc<ClientStateStore>) -> Self {
        self.client_state = Some(client_state);
        self
    }

    /// Set event bus for entitlement events.
    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Create the user document if this principal has none yet.
    ///
    /// New accounts start with zero coins and no membership.
    #[instrument(skip(self))]
    pub async fn ensure_user(&self, principal: &PrincipalId, email: &str) -> Result<()> {
        if self
            .store
            .get(USERS_COLLECTION, principal.as_str())
            .await?
            .is_some()
        {
            return Ok(());
        }

        let now = self.clock.unix_timestamp();
        let document = as_document(json!({
            "email": email,
            "coins": 0,
            "membershipStatus": false,
            "membershipExpiry": Value::Null,
            "createdAt": now,
            "updatedAt": now,
        }));
        self.store
            .set(USERS_COLLECTION, principal.as_str(), document)
            .await?;

        info!(principal = %principal, "Created user document");
        Ok(())
    }

    fn transactions_collection(principal: &PrincipalId) -> String {
        format!("{}/{}/transactions", USERS_COLLECTION, principal.as_str())
    }

    async fn user_document(&self, principal: &PrincipalId) -> Result<Document> {
        self.store
            .get(USERS_COLLECTION, principal.as_str())
            .await?
            .ok_or_else(|| EntitlementError::UnknownPrincipal(principal.to_string()))
    }

    fn state_from_document(document: &Document) -> EntitlementState {
        let coins = document
            .get("coins")
            .and_then(Value::as_i64)
            .unwrap_or(0)
            .max(0) as u64;
        let membership_active = document
            .get("membershipStatus")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let membership_expiry = document
            .get("membershipExpiry")
            .and_then(Value::as_i64)
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single());

        EntitlementState {
            coins,
            membership_active,
            membership_expiry,
        }
    }

    async fn append_transaction(
        &self,
        principal: &PrincipalId,
        kind: TransactionKind,
        amount: i64,
        price: f64,
        description: &str,
        extra: Option<(&str, Value)>,
    ) -> Result<()> {
        let mut record = as_document(json!({
            "type": kind,
            "amount": amount,
            "price": price,
            "description": description,
            "status": "success",
            "timestamp": self.clock.unix_timestamp(),
        }));
        if let Some((key, value)) = extra {
            record.insert(key.to_string(), value);
        }

        self.store
            .add(&Self::transactions_collection(principal), record)
            .await?;
        Ok(())
    }

    /// Mirror failures are logged, never propagated: the document store
    /// mutation already succeeded and money must not appear to fail.
    async fn refresh_balance_mirror(&self, balance: u64) {
        if let Some(client_state) = &self.client_state {
            if let Err(e) = client_state.set_coin_balance(balance).await {
                warn!(error = %e, "Failed to refresh coin balance mirror");
            }
        }
    }

    async fn refresh_membership_mirror(&self, active: bool) {
        if let Some(client_state) = &self.client_state {
            if let Err(e) = client_state.set_membership_active(active).await {
                warn!(error = %e, "Failed to refresh membership mirror");
            }
        }
    }

    fn emit(&self, event: EntitlementEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit(CoreEvent::Entitlement(event)).ok();
        }
    }
}

#[async_trait]
impl BalanceService for DocumentBalanceService {
    #[instrument(skip(self))]
    async fn entitlement_of(&self, principal: &PrincipalId) -> Result<EntitlementState> {
        let document = self.user_document(principal).await?;
        let mut state = Self::state_from_document(&document);

        // Lapsed membership is flipped off at read time.
        if state.membership_active && !state.is_member_at(self.clock.now()) {
            info!(principal = %principal, "Membership expired, clearing flag");
            self.store
                .update(
                    USERS_COLLECTION,
                    principal.as_str(),
                    as_document(json!({
                        "membershipStatus": false,
                        "membershipExpiry": Value::Null,
                        "updatedAt": self.clock.unix_timestamp(),
                    })),
                )
                .await?;
            self.refresh_membership_mirror(false).await;
            self.emit(EntitlementEvent::MembershipExpired {
                principal_id: principal.to_string(),
            });

            state.membership_active = false;
            state.membership_expiry = None;
        }

        Ok(state)
    }

    #[instrument(skip(self, description))]
    async fn debit(
        &self,
        principal: &PrincipalId,
        amount: u64,
        description: &str,
    ) -> Result<DebitOutcome> {
        let document = self.user_document(principal).await?;
        let state = Self::state_from_document(&document);

        if state.coins < amount {
            debug!(
                principal = %principal,
                balance = state.coins,
                requested = amount,
                "Debit declined: insufficient balance"
            );
            self.emit(EntitlementEvent::DebitDeclined {
                principal_id: principal.to_string(),
                amount,
                balance: state.coins,
            });
            return Ok(DebitOutcome::InsufficientBalance {
                balance: state.coins,
            });
        }

        let new_balance = state.coins - amount;
        self.store
            .update(
                USERS_COLLECTION,
                principal.as_str(),
                as_document(json!({
                    "coins": new_balance,
                    "updatedAt": self.clock.unix_timestamp(),
                })),
            )
            .await?;

        self.append_transaction(
            principal,
            TransactionKind::CoinUsage,
            -(amount as i64),
            0.0,
            description,
            None,
        )
        .await?;

        self.refresh_balance_mirror(new_balance).await;
        self.emit(EntitlementEvent::Debited {
            principal_id: principal.to_string(),
            amount,
            balance: new_balance,
        });

        info!(principal = %principal, amount, new_balance, "Coins debited");
        Ok(DebitOutcome::Completed { new_balance })
    }

    #[instrument(skip(self, description))]
    async fn grant(&self, principal: &PrincipalId, coins: u64, description: &str) -> Result<u64> {
        let document = self.user_document(principal).await?;
        let state = Self::state_from_document(&document);
        let new_balance = state.coins + coins;

        self.store
            .update(
                USERS_COLLECTION,
                principal.as_str(),
                as_document(json!({
                    "coins": new_balance,
                    "updatedAt": self.clock.unix_timestamp(),
                })),
            )
            .await?;

        self.append_transaction(
            principal,
            TransactionKind::CoinPurchase,
            coins as i64,
            0.0,
            description,
            None,
        )
        .await?;

        self.refresh_balance_mirror(new_balance).await;
        self.emit(EntitlementEvent::Granted {
            principal_id: principal.to_string(),
            amount: coins,
            balance: new_balance,
        });

        info!(principal = %principal, coins, new_balance, "Coins granted");
        Ok(new_balance)
    }

    #[instrument(skip(self))]
    async fn activate_membership(&self, principal: &PrincipalId) -> Result<DateTime<Utc>> {
        // Ensure the principal exists before mutating.
        self.user_document(principal).await?;

        let expiry = self.clock.now() + chrono::Duration::days(MEMBERSHIP_DAYS);
        self.store
            .update(
                USERS_COLLECTION,
                principal.as_str(),
                as_document(json!({
                    "membershipStatus": true,
                    "membershipExpiry": expiry.timestamp(),
                    "updatedAt": self.clock.unix_timestamp(),
                })),
            )
            .await?;

        self.append_transaction(
            principal,
            TransactionKind::Membership,
            0,
            0.0,
            "Premium Membership (30 days)",
            Some(("expiryDate", json!(expiry.timestamp()))),
        )
        .await?;

        self.refresh_membership_mirror(true).await;
        self.emit(EntitlementEvent::MembershipActivated {
            principal_id: principal.to_string(),
            expires_at: expiry.timestamp(),
        });

        info!(principal = %principal, expires_at = expiry.timestamp(), "Membership activated");
        Ok(expiry)
    }

    #[instrument(skip(self))]
    async fn cancel_auto_renew(&self, principal: &PrincipalId) -> Result<()> {
        self.user_document(principal).await?;

        self.store
            .update(
                USERS_COLLECTION,
                principal.as_str(),
                as_document(json!({
                    "autoRenew": false,
                    "updatedAt": self.clock.unix_timestamp(),
                })),
            )
            .await?;

        info!(principal = %principal, "Membership will not auto-renew");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn history(
        &self,
        principal: &PrincipalId,
        limit: usize,
    ) -> Result<Vec<TransactionRecord>> {
        let documents = self
            .store
            .query(
                &Self::transactions_collection(principal),
                DocumentQuery::newest_first("timestamp").with_limit(limit),
            )
            .await?;

        let mut records = Vec::with_capacity(documents.len());
        for (id, document) in documents {
            let mut record: TransactionRecord =
                serde_json::from_value(Value::Object(document))
                    .map_err(|e| EntitlementError::InvalidRecord(e.to_string()))?;
            record.id = id;
            records.push(record);
        }
        Ok(records)
    }
}

fn as_document(value: Value) -> Document {
    value
        .as_object()
        .expect("literal is an object")
        .clone()
}
