//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the core library and platform-specific
//! implementations. Each trait represents a capability that the core requires but
//! that must be implemented differently per platform (desktop, mobile, web).
//!
//! ## Traits
//!
//! ### Networking & Storage
//! - [`HttpClient`](http::HttpClient) - Async HTTP operations with retry and timeouts
//! - [`CacheStorage`](storage::CacheStorage) - Named key→response stores with stable insertion order
//! - [`SettingsStore`](storage::SettingsStore) - Key-value client state storage
//! - [`DocumentStore`](documents::DocumentStore) - Remote document database access
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Fail-Fast Strategy
//!
//! The core should fail fast with descriptive errors when a required capability is
//! missing:
//!
//! ```ignore
//! use core_runtime::error::Error;
//!
//! pub fn new(config: CoreConfig) -> Result<Self> {
//!     let http_client = config.http_client
//!         .ok_or_else(|| Error::CapabilityMissing {
//!             capability: "HttpClient".to_string(),
//!             message: "No HTTP client implementation provided. \
//!                      Desktop: ensure default feature is enabled. \
//!                      Mobile: inject platform-native adapter.".to_string()
//!         })?;
//!     // ...
//! }
//! ```
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type for consistent
//! error handling. Platform implementations should:
//!
//! - Convert platform-specific errors to `BridgeError`
//! - Provide actionable error messages
//! - Include error context (e.g., cache names, document paths)
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds to support safe concurrent usage
//! across async tasks. Implementations must ensure thread safety.

pub mod documents;
pub mod error;
pub mod http;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use documents::{Document, DocumentQuery, DocumentStore, SortDirection};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use storage::{CacheStorage, SettingsStore, StoredResponse};
pub use time::{Clock, LogEntry, LogLevel, LoggerSink, SystemClock};
