//! # Offline Cache Router
//!
//! Request interception layer for the audiobook player: classifies every
//! outgoing request into a caching strategy, executes the matching
//! fetch/cache protocol, bounds the audio cache with FIFO eviction, and
//! survives version upgrades without breaking in-flight clients.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────┐
//! │     CacheRouter                        │
//! │  - handle(request)                     │
//! └────────┬───────────────────────────────┘
//!          │
//!          ├──> StrategyClassifier (pure URL → strategy)
//!          ├──> NamedCacheStore (versioned static/audio/runtime caches)
//!          ├──> enforce_entry_limit (FIFO bound on the audio cache)
//!          └──> HttpClient (network fetches with timeout)
//!
//! ┌────────────────────────────────────────┐
//! │     LifecycleManager                   │
//! │  - install() / activate()              │
//! │  - skip_waiting()                      │
//! └────────────────────────────────────────┘
//! ```
//!
//! ## Guarantees
//!
//! - The router never rejects: every fault degrades to a placeholder response.
//! - Within one request, clone-then-store-then-return is strictly ordered; the
//!   caller-visible response is never the stored copy.
//! - Eviction re-reads the key list at the moment it runs, so an interleaved
//!   `put` is always observed.
//! - At most one set of {static, audio, runtime} caches carries the current
//!   version tag; activation deletes every other set.

pub mod config;
pub mod error;
pub mod eviction;
pub mod lifecycle;
pub mod messages;
pub mod router;
pub mod store;
pub mod strategy;

pub use config::RouterConfig;
pub use error::{CacheError, Result};
pub use eviction::enforce_entry_limit;
pub use lifecycle::{InstallReport, LifecycleManager, LifecycleState};
pub use messages::{ControlAck, ControlChannel, ControlMessage};
pub use router::{CacheRouter, ResponseSource, RouterResponse};
pub use store::{CacheHandle, LogicalCache, NamedCacheStore};
pub use strategy::{StrategyClassifier, StrategyLabel};
