//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! This crate provides production-ready implementations of the networking
//! bridge plus in-process shims for the storage bridges:
//! - `HttpClient` using `reqwest`
//! - `CacheStorage` as an insertion-ordered in-memory store
//! - `DocumentStore` as an in-memory collection store
//! - `SettingsStore` as an in-memory key-value store
//!
//! The memory-backed stores are process-lifetime: suitable for desktop hosts
//! that hydrate from the remote document store on startup, and for integration
//! tests. Hosts needing durable caches inject their own `CacheStorage`.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{MemoryCacheStorage, ReqwestHttpClient};
//! use bridge_traits::{CacheStorage, HttpClient};
//!
//! #[tokio::main]
//! async fn main() {
//!     let http_client = ReqwestHttpClient::new();
//!     let cache_storage = MemoryCacheStorage::new();
//!
//!     // Use in core configuration
//! }
//! ```

mod cache_storage;
mod documents;
mod http;
mod settings;

pub use cache_storage::MemoryCacheStorage;
pub use documents::MemoryDocumentStore;
pub use http::ReqwestHttpClient;
pub use settings::MemorySettingsStore;
