//! # Entitlement Module
//!
//! Coin balance and membership management for chapter unlocks.
//!
//! ## Overview
//!
//! The entitlement state (coin balance, membership flag with expiry) lives in
//! the remote document store and is the single source of truth for money. The
//! core reads it before gating chapter access and mutates it exclusively
//! through [`BalanceService::debit`]; every mutation appends an immutable
//! transaction record.
//!
//! The client state mirrors in `core-catalog` are refreshed after each
//! mutation so the UI can render balances without a round trip, but they are
//! never consulted when deciding whether a debit succeeds.
//!
//! ## Usage
//!
//! ```ignore
//! use core_entitlement::{DocumentBalanceService, BalanceService, PrincipalId};
//!
//! # async fn example(service: &DocumentBalanceService) -> core_entitlement::Result<()> {
//! let principal = PrincipalId::new("user-1");
//! match service.debit(&principal, 10, "Unlocked Chapter 2 of The Long Road").await? {
//!     core_entitlement::DebitOutcome::Completed { new_balance } => {
//!         println!("Unlocked, {} coins left", new_balance);
//!     }
//!     core_entitlement::DebitOutcome::InsufficientBalance { balance } => {
//!         println!("Only {} coins available", balance);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod service;
pub mod types;

pub use error::{EntitlementError, Result};
pub use service::{BalanceService, DocumentBalanceService};
pub use types::{
    DebitOutcome, EntitlementState, PrincipalId, TransactionKind, TransactionRecord,
};
