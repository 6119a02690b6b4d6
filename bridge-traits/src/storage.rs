//! Cache and Settings Storage Abstractions
//!
//! Provides platform-agnostic traits for the named response caches used by the
//! offline router and for small key-value client state.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::error::Result;

/// A cached HTTP response as persisted by a [`CacheStorage`] backend.
///
/// Entries are immutable once stored; a re-`put` under the same key replaces
/// the entry wholesale and moves it to the end of the insertion order.
#[derive(Debug, Clone)]
pub struct StoredResponse {
    /// HTTP status of the captured response
    pub status: u16,
    /// Response headers captured at store time
    pub headers: HashMap<String, String>,
    /// Raw body bytes
    pub body: Bytes,
    /// SHA-256 hex digest of `body`, computed by the writer
    pub content_hash: String,
    /// When the entry was written
    pub stored_at: DateTime<Utc>,
}

impl StoredResponse {
    /// Returns `true` if the captured response was an HTTP success (2xx).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body size in bytes.
    pub fn size(&self) -> usize {
        self.body.len()
    }
}

/// Named key→response store trait
///
/// Abstracts the persistent response caches backing the offline router:
/// - Desktop: in-memory or file-backed stores
/// - Web: the platform cache storage
/// - Mobile: app-sandboxed storage
///
/// ## Ordering Contract
///
/// `keys()` MUST return keys in insertion order: the order entries were first
/// `put` (a re-`put` of an existing key moves it to the end). The eviction
/// policy layered on top depends on this ordering and on nothing else.
///
/// ## Atomicity
///
/// `put` and `delete` are atomic at single-key granularity. No operation
/// spans multiple keys or multiple caches transactionally.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open a named cache, creating it if absent.
    async fn open(&self, cache_name: &str) -> Result<()>;

    /// Look up an entry by key. Returns `Ok(None)` on miss or unknown cache.
    async fn get(&self, cache_name: &str, key: &str) -> Result<Option<StoredResponse>>;

    /// Store an entry, overwriting any existing entry under `key`.
    ///
    /// Implicitly opens the cache if it does not exist yet.
    async fn put(&self, cache_name: &str, key: &str, response: StoredResponse) -> Result<()>;

    /// All keys of a cache in insertion order. Unknown caches yield an empty list.
    async fn keys(&self, cache_name: &str) -> Result<Vec<String>>;

    /// Delete a single entry. Returns `true` if an entry was removed.
    async fn delete(&self, cache_name: &str, key: &str) -> Result<bool>;

    /// Names of all caches currently present, in creation order.
    async fn list_caches(&self) -> Result<Vec<String>>;

    /// Delete an entire named cache and all its entries.
    ///
    /// Returns `true` if the cache existed.
    async fn delete_cache(&self, cache_name: &str) -> Result<bool>;
}

/// Key-value settings storage trait
///
/// Abstracts platform-specific preferences/client-state storage:
/// - Desktop: config files or OS-specific preferences
/// - Mobile: UserDefaults / SharedPreferences
/// - Web: local key-value storage
///
/// Values stored here are mirrors of server truth for instant UI reads; they
/// are never the source of truth for entitlements.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::SettingsStore;
///
/// async fn save_preference(store: &dyn SettingsStore) -> Result<()> {
///     store.set_string("theme", "dark").await?;
///     store.set_bool("membership_active", true).await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Store a string value
    async fn set_string(&self, key: &str, value: &str) -> Result<()>;

    /// Retrieve a string value
    async fn get_string(&self, key: &str) -> Result<Option<String>>;

    /// Store a boolean value
    async fn set_bool(&self, key: &str, value: bool) -> Result<()>;

    /// Retrieve a boolean value
    async fn get_bool(&self, key: &str) -> Result<Option<bool>>;

    /// Store an integer value
    async fn set_i64(&self, key: &str, value: i64) -> Result<()>;

    /// Retrieve an integer value
    async fn get_i64(&self, key: &str) -> Result<Option<i64>>;

    /// Delete a setting
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check if a setting exists
    async fn has_key(&self, key: &str) -> Result<bool>;

    /// List all setting keys
    async fn list_keys(&self) -> Result<Vec<String>>;

    /// Clear all settings
    async fn clear_all(&self) -> Result<()>;
}
