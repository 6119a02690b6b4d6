//! # Eviction Policy
//!
//! Strict FIFO bound on a cache's entry count. Insertion order is the sole
//! ordering signal: a re-fetched entry moves to the new insertion position,
//! but merely reading a cached entry never refreshes it. This is deliberately
//! not LRU; audio access is dominated by sequential chapter reads, and the
//! bound stays correct without tracking access times.

use crate::error::Result;
use crate::store::{CacheHandle, NamedCacheStore};
use tracing::{debug, warn};

/// Delete the oldest entries until at most `max_entries` remain.
///
/// The key list is re-read at the moment this runs; a `put` interleaved since
/// any earlier snapshot is therefore always observed. Returns the number of
/// entries removed.
pub async fn enforce_entry_limit(
    store: &NamedCacheStore,
    handle: &CacheHandle,
    max_entries: usize,
) -> Result<usize> {
    let keys = store.keys(handle).await?;

    if keys.len() <= max_entries {
        return Ok(0);
    }

    let excess = keys.len() - max_entries;
    debug!(
        cache = handle.name(),
        count = keys.len(),
        max = max_entries,
        "Cache limit reached, evicting oldest entries"
    );

    let mut removed = 0;
    for key in keys.iter().take(excess) {
        match store.delete(handle, key).await {
            Ok(true) => removed += 1,
            // Already gone; an interleaved delete beat us to it.
            Ok(false) => {}
            Err(e) => warn!(cache = handle.name(), key = %key, error = %e, "Eviction delete failed"),
        }
    }

    debug!(cache = handle.name(), removed, "Eviction complete");
    Ok(removed)
}
