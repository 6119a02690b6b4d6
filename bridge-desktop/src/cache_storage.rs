//! In-Memory Cache Storage
//!
//! Insertion-ordered named response stores backing the offline router on
//! desktop hosts and in integration tests.

use async_trait::async_trait;
use bridge_traits::{
    error::Result,
    storage::{CacheStorage, StoredResponse},
};
use tokio::sync::Mutex;
use tracing::debug;

/// One named cache: entries kept in insertion order.
#[derive(Debug, Default)]
struct CacheBucket {
    entries: Vec<(String, StoredResponse)>,
}

impl CacheBucket {
    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }
}

/// In-memory `CacheStorage` implementation.
///
/// Maintains the ordering contract of the trait: `keys()` returns keys in the
/// order they were first stored, and re-storing an existing key moves it to
/// the end. Caches themselves are listed in creation order.
///
/// All state lives behind a single async mutex; individual operations are
/// atomic at the key level, matching the granularity the router relies on.
#[derive(Debug, Default)]
pub struct MemoryCacheStorage {
    caches: Mutex<Vec<(String, CacheBucket)>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total entry count across all caches, for diagnostics.
    pub async fn total_entries(&self) -> usize {
        let caches = self.caches.lock().await;
        caches.iter().map(|(_, bucket)| bucket.entries.len()).sum()
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, cache_name: &str) -> Result<()> {
        let mut caches = self.caches.lock().await;
        if !caches.iter().any(|(name, _)| name == cache_name) {
            debug!(cache = cache_name, "Creating cache");
            caches.push((cache_name.to_string(), CacheBucket::default()));
        }
        Ok(())
    }

    async fn get(&self, cache_name: &str, key: &str) -> Result<Option<StoredResponse>> {
        let caches = self.caches.lock().await;
        let entry = caches
            .iter()
            .find(|(name, _)| name == cache_name)
            .and_then(|(_, bucket)| {
                bucket.position(key).map(|i| bucket.entries[i].1.clone())
            });
        Ok(entry)
    }

    async fn put(&self, cache_name: &str, key: &str, response: StoredResponse) -> Result<()> {
        let mut caches = self.caches.lock().await;

        let index = match caches.iter().position(|(name, _)| name == cache_name) {
            Some(index) => index,
            None => {
                caches.push((cache_name.to_string(), CacheBucket::default()));
                caches.len() - 1
            }
        };
        let bucket = &mut caches[index].1;

        // Overwrite moves the key to the new insertion position (end).
        if let Some(i) = bucket.position(key) {
            bucket.entries.remove(i);
        }
        bucket.entries.push((key.to_string(), response));
        Ok(())
    }

    async fn keys(&self, cache_name: &str) -> Result<Vec<String>> {
        let caches = self.caches.lock().await;
        let keys = caches
            .iter()
            .find(|(name, _)| name == cache_name)
            .map(|(_, bucket)| bucket.entries.iter().map(|(k, _)| k.clone()).collect())
            .unwrap_or_default();
        Ok(keys)
    }

    async fn delete(&self, cache_name: &str, key: &str) -> Result<bool> {
        let mut caches = self.caches.lock().await;
        if let Some((_, bucket)) = caches.iter_mut().find(|(name, _)| name == cache_name) {
            if let Some(i) = bucket.position(key) {
                bucket.entries.remove(i);
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn list_caches(&self) -> Result<Vec<String>> {
        let caches = self.caches.lock().await;
        Ok(caches.iter().map(|(name, _)| name.clone()).collect())
    }

    async fn delete_cache(&self, cache_name: &str) -> Result<bool> {
        let mut caches = self.caches.lock().await;
        let before = caches.len();
        caches.retain(|(name, _)| name != cache_name);
        let deleted = caches.len() != before;
        if deleted {
            debug!(cache = cache_name, "Deleted cache");
        }
        Ok(deleted)
    }
}
