//! # Lifecycle Manager
//!
//! Governs install, activation, and update of the router itself: pre-warms
//! static assets on install, deletes caches whose version tag does not match
//! the current build on activation, and exposes a skip-waiting transition for
//! zero-downtime updates.

use crate::config::RouterConfig;
use crate::error::{CacheError, Result};
use crate::store::{entry_from_response, LogicalCache, NamedCacheStore};
use bridge_traits::http::{HttpClient, HttpRequest, RetryPolicy};
use core_runtime::events::{CoreEvent, EventBus, LifecycleEvent};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Lifecycle states of one router version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Pre-warming static assets.
    Installing,
    /// Installed, held back while an older version is still active.
    Waiting,
    /// Serving all clients.
    Active,
    /// Replaced by a newer active version.
    Superseded,
}

/// Outcome of the install pre-warm pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallReport {
    /// Manifest assets cached successfully.
    pub cached: usize,
    /// Manifest assets that failed to cache.
    pub failed: usize,
}

/// Manages install/activate/update of one router version.
///
/// Manifest population is best-effort, not atomic: a single failed asset is
/// logged and skipped rather than aborting the install. The trade-off is a
/// possibly incomplete shell cache until the next install, which the static
/// strategy covers by fetching misses from the network.
pub struct LifecycleManager {
    store: NamedCacheStore,
    http: Arc<dyn HttpClient>,
    config: RouterConfig,
    state: Mutex<LifecycleState>,
    event_bus: Option<Arc<EventBus>>,
}

impl LifecycleManager {
    pub fn new(
        config: RouterConfig,
        store: NamedCacheStore,
        http: Arc<dyn HttpClient>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            http,
            config,
            state: Mutex::new(LifecycleState::Installing),
            event_bus: None,
        })
    }

    /// Set event bus for lifecycle events.
    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> LifecycleState {
        *self.state.lock().await
    }

    /// Pre-warm the static cache with the fixed asset manifest.
    ///
    /// Each asset is fetched from the configured static origin and stored
    /// under its request key. Individual failures are logged and counted but
    /// do not abort installation. On completion the version transitions to
    /// `Waiting` until activated.
    #[instrument(skip(self))]
    pub async fn install(&self) -> Result<InstallReport> {
        {
            let state = self.state.lock().await;
            if *state != LifecycleState::Installing {
                return Err(CacheError::InvalidTransition(format!(
                    "install() requires Installing, was {:?}",
                    *state
                )));
            }
        }

        info!(version = self.config.cache_version, "Installing router version");
        let handle = self.store.open(LogicalCache::Static).await?;
        let origin = self.config.static_origin.trim_end_matches('/');

        let mut report = InstallReport { cached: 0, failed: 0 };

        for path in &self.config.static_manifest {
            let url = format!("{}{}", origin, path);
            let request = HttpRequest::get(&url).timeout(self.config.fetch_timeout);
            let key = request.cache_key();

            match self
                .http
                .execute_with_retry(request, RetryPolicy::none())
                .await
            {
                Ok(response) if response.status == 200 => {
                    match self
                        .store
                        .put(&handle, &key, entry_from_response(&response))
                        .await
                    {
                        Ok(()) => {
                            debug!(asset = %path, "Static asset cached");
                            report.cached += 1;
                        }
                        Err(e) => {
                            warn!(asset = %path, error = %e, "Static asset store failed");
                            report.failed += 1;
                        }
                    }
                }
                Ok(response) => {
                    warn!(asset = %path, status = response.status, "Static asset fetch rejected");
                    report.failed += 1;
                }
                Err(e) => {
                    warn!(asset = %path, error = %e, "Static asset fetch failed");
                    report.failed += 1;
                }
            }
        }

        *self.state.lock().await = LifecycleState::Waiting;

        info!(
            version = self.config.cache_version,
            cached = report.cached,
            failed = report.failed,
            "Install complete"
        );
        self.emit(LifecycleEvent::Installed {
            version: self.config.cache_version.clone(),
            assets_cached: report.cached,
            assets_failed: report.failed,
        });

        Ok(report)
    }

    /// Activate this version: delete every cache whose name is not one of the
    /// three current-version names, then take control of all clients
    /// immediately.
    ///
    /// Returns the number of stale caches removed.
    #[instrument(skip(self))]
    pub async fn activate(&self) -> Result<usize> {
        {
            let state = self.state.lock().await;
            match *state {
                LifecycleState::Installing | LifecycleState::Waiting => {}
                other => {
                    return Err(CacheError::InvalidTransition(format!(
                        "activate() requires Installing or Waiting, was {:?}",
                        other
                    )));
                }
            }
        }

        let current: HashSet<String> = self.store.current_names().into_iter().collect();
        let mut removed = 0;

        for name in self.store.list_cache_names().await? {
            if !current.contains(&name) {
                info!(cache = %name, "Deleting stale cache");
                if self.store.delete_cache(&name).await? {
                    removed += 1;
                }
            }
        }

        *self.state.lock().await = LifecycleState::Active;

        info!(
            version = self.config.cache_version,
            caches_removed = removed,
            "Router version activated"
        );
        self.emit(LifecycleEvent::Activated {
            version: self.config.cache_version.clone(),
            caches_removed: removed,
        });

        Ok(removed)
    }

    /// Promote a waiting version to active immediately.
    ///
    /// Triggered externally by a user-facing "update now" action; the caller
    /// is expected to reload afterwards to pick up the new static assets.
    #[instrument(skip(self))]
    pub async fn skip_waiting(&self) -> Result<usize> {
        {
            let state = self.state.lock().await;
            if *state != LifecycleState::Waiting {
                return Err(CacheError::InvalidTransition(format!(
                    "skip_waiting() requires Waiting, was {:?}",
                    *state
                )));
            }
        }

        info!(version = self.config.cache_version, "Skip-waiting requested");
        self.emit(LifecycleEvent::WaitingSkipped {
            version: self.config.cache_version.clone(),
        });

        self.activate().await
    }

    /// Mark this version as replaced by a newer active one.
    pub async fn mark_superseded(&self) {
        let mut state = self.state.lock().await;
        if *state == LifecycleState::Active {
            info!(version = self.config.cache_version, "Router version superseded");
        }
        *state = LifecycleState::Superseded;
    }

    fn emit(&self, event: LifecycleEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit(CoreEvent::Lifecycle(event)).ok();
        }
    }
}
