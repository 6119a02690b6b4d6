//! # Named Cache Store
//!
//! Thin wrapper over [`CacheStorage`] exposing the three logical caches
//! (static assets, audio blobs, runtime/API responses), each keyed by
//! `{prefix}-{logical}-{version}` so that deploying a new version invalidates
//! stale entries atomically.
//!
//! No eviction logic lives here; that is layered on top by
//! [`enforce_entry_limit`](crate::eviction::enforce_entry_limit).

use crate::config::RouterConfig;
use crate::error::Result;
use bridge_traits::http::HttpResponse;
use bridge_traits::storage::{CacheStorage, StoredResponse};
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;

/// The three logical caches the router writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalCache {
    /// Pre-warmed application shell assets
    Static,
    /// Audio blobs, FIFO-bounded
    Audio,
    /// Everything served network-first
    Runtime,
}

impl LogicalCache {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalCache::Static => "static",
            LogicalCache::Audio => "audio",
            LogicalCache::Runtime => "runtime",
        }
    }

    pub const ALL: [LogicalCache; 3] =
        [LogicalCache::Static, LogicalCache::Audio, LogicalCache::Runtime];
}

impl fmt::Display for LogicalCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle to one opened versioned cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheHandle {
    name: String,
}

impl CacheHandle {
    /// The fully-versioned cache name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Versioned view over the underlying cache storage.
///
/// Cheap to clone; the router and the lifecycle manager share one storage
/// handle through it.
#[derive(Clone)]
pub struct NamedCacheStore {
    storage: Arc<dyn CacheStorage>,
    prefix: String,
    version: String,
}

impl NamedCacheStore {
    pub fn new(storage: Arc<dyn CacheStorage>, config: &RouterConfig) -> Self {
        Self {
            storage,
            prefix: config.name_prefix.clone(),
            version: config.cache_version.clone(),
        }
    }

    /// The current build tag.
    pub fn version(&self) -> &str {
        &self.version
    }

    fn cache_name(&self, logical: LogicalCache) -> String {
        format!("{}-{}-{}", self.prefix, logical, self.version)
    }

    /// The three cache names carrying the current version tag.
    pub fn current_names(&self) -> Vec<String> {
        LogicalCache::ALL
            .iter()
            .map(|logical| self.cache_name(*logical))
            .collect()
    }

    /// Open a logical cache (creating it if absent) and return its handle.
    pub async fn open(&self, logical: LogicalCache) -> Result<CacheHandle> {
        let name = self.cache_name(logical);
        self.storage.open(&name).await?;
        Ok(CacheHandle { name })
    }

    pub async fn get(&self, handle: &CacheHandle, key: &str) -> Result<Option<StoredResponse>> {
        Ok(self.storage.get(&handle.name, key).await?)
    }

    /// Store an entry; a `put` with an existing key overwrites and moves the
    /// key to the new insertion position.
    pub async fn put(&self, handle: &CacheHandle, key: &str, entry: StoredResponse) -> Result<()> {
        self.storage.put(&handle.name, key, entry).await?;
        Ok(())
    }

    /// Keys in insertion order, the sole ordering signal eviction uses.
    pub async fn keys(&self, handle: &CacheHandle) -> Result<Vec<String>> {
        Ok(self.storage.keys(&handle.name).await?)
    }

    pub async fn delete(&self, handle: &CacheHandle, key: &str) -> Result<bool> {
        Ok(self.storage.delete(&handle.name, key).await?)
    }

    /// Drop an entire logical cache for the current version.
    ///
    /// Returns `true` if the cache existed.
    pub async fn clear(&self, logical: LogicalCache) -> Result<bool> {
        Ok(self.storage.delete_cache(&self.cache_name(logical)).await?)
    }

    /// All cache names present in the underlying storage, any version.
    pub async fn list_cache_names(&self) -> Result<Vec<String>> {
        Ok(self.storage.list_caches().await?)
    }

    /// Delete a cache by its full versioned name.
    pub async fn delete_cache(&self, name: &str) -> Result<bool> {
        Ok(self.storage.delete_cache(name).await?)
    }
}

/// Capture a network response as a cache entry.
///
/// The entry owns its own copy of the bytes; the response handed back to the
/// caller is never the stored one. The content hash is stamped here so reads
/// can verify integrity later.
pub fn entry_from_response(response: &HttpResponse) -> StoredResponse {
    StoredResponse {
        status: response.status,
        headers: response.headers.clone(),
        body: response.body.clone(),
        content_hash: hash_body(&response.body),
        stored_at: Utc::now(),
    }
}

/// SHA-256 hex digest of a response body.
pub fn hash_body(body: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::collections::HashMap;

    #[test]
    fn versioned_names() {
        let config = RouterConfig::new("v1.0.3").with_name_prefix("apc");
        // A no-op storage is enough for name math.
        struct NullStorage;
        #[async_trait::async_trait]
        impl CacheStorage for NullStorage {
            async fn open(&self, _: &str) -> bridge_traits::error::Result<()> {
                Ok(())
            }
            async fn get(
                &self,
                _: &str,
                _: &str,
            ) -> bridge_traits::error::Result<Option<StoredResponse>> {
                Ok(None)
            }
            async fn put(
                &self,
                _: &str,
                _: &str,
                _: StoredResponse,
            ) -> bridge_traits::error::Result<()> {
                Ok(())
            }
            async fn keys(&self, _: &str) -> bridge_traits::error::Result<Vec<String>> {
                Ok(vec![])
            }
            async fn delete(&self, _: &str, _: &str) -> bridge_traits::error::Result<bool> {
                Ok(false)
            }
            async fn list_caches(&self) -> bridge_traits::error::Result<Vec<String>> {
                Ok(vec![])
            }
            async fn delete_cache(&self, _: &str) -> bridge_traits::error::Result<bool> {
                Ok(false)
            }
        }

        let store = NamedCacheStore::new(Arc::new(NullStorage), &config);
        assert_eq!(
            store.current_names(),
            vec![
                "apc-static-v1.0.3".to_string(),
                "apc-audio-v1.0.3".to_string(),
                "apc-runtime-v1.0.3".to_string(),
            ]
        );
    }

    #[test]
    fn entry_capture_hashes_body() {
        let response = HttpResponse {
            status: 200,
            headers: HashMap::new(),
            body: Bytes::from_static(b"audio-bytes"),
        };

        let entry = entry_from_response(&response);
        assert_eq!(entry.status, 200);
        assert_eq!(entry.body, response.body);
        assert_eq!(entry.content_hash, hash_body(b"audio-bytes"));
        // Stored copy shares no mutable state with the response body slice.
        assert_ne!(entry.content_hash, hash_body(b"other-bytes"));
    }
}
