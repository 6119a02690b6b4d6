//! # Control Messages
//!
//! Inbound commands the host can send to the running router: promote a
//! waiting version, or clear named caches. Every command is acknowledged on
//! a reply value so the host can surface the result.

use crate::lifecycle::LifecycleManager;
use crate::store::{LogicalCache, NamedCacheStore};
use core_runtime::events::{CacheEvent, CoreEvent, EventBus};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Commands accepted by the control channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    /// Promote the waiting router version to active.
    SkipWaiting,
    /// Delete the audio cache for the current version.
    ClearAudioCache,
    /// Delete every cache, all versions.
    ClearAllCache,
}

/// Acknowledgement returned for every dispatched control message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlAck {
    pub success: bool,
}

/// Dispatches control messages against the lifecycle manager and cache store.
pub struct ControlChannel {
    lifecycle: Arc<LifecycleManager>,
    store: NamedCacheStore,
    event_bus: Option<Arc<EventBus>>,
}

impl ControlChannel {
    pub fn new(lifecycle: Arc<LifecycleManager>, store: NamedCacheStore) -> Self {
        Self {
            lifecycle,
            store,
            event_bus: None,
        }
    }

    /// Set event bus for cache events.
    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Handle one inbound command and acknowledge it.
    ///
    /// Failures are logged and reported through the ack; they never
    /// propagate as errors to the host message layer.
    #[instrument(skip(self))]
    pub async fn dispatch(&self, message: ControlMessage) -> ControlAck {
        info!(?message, "Control message received");

        let success = match message {
            ControlMessage::SkipWaiting => match self.lifecycle.skip_waiting().await {
                Ok(_) => true,
                Err(e) => {
                    warn!(error = %e, "Skip-waiting failed");
                    false
                }
            },
            ControlMessage::ClearAudioCache => match self.store.clear(LogicalCache::Audio).await {
                Ok(existed) => {
                    if existed {
                        self.emit_cleared(LogicalCache::Audio);
                    }
                    true
                }
                Err(e) => {
                    warn!(error = %e, "Audio cache clear failed");
                    false
                }
            },
            ControlMessage::ClearAllCache => self.clear_all().await,
        };

        ControlAck { success }
    }

    async fn clear_all(&self) -> bool {
        let names = match self.store.list_cache_names().await {
            Ok(names) => names,
            Err(e) => {
                warn!(error = %e, "Cache enumeration failed");
                return false;
            }
        };

        let mut all_ok = true;
        for name in names {
            match self.store.delete_cache(&name).await {
                Ok(_) => {
                    if let Some(bus) = &self.event_bus {
                        bus.emit(CoreEvent::Cache(CacheEvent::Cleared { cache: name }))
                            .ok();
                    }
                }
                Err(e) => {
                    warn!(cache = %name, error = %e, "Cache delete failed");
                    all_ok = false;
                }
            }
        }
        all_ok
    }

    fn emit_cleared(&self, logical: LogicalCache) {
        if let Some(bus) = &self.event_bus {
            let name = self
                .store
                .current_names()
                .into_iter()
                .find(|n| n.contains(logical.as_str()));
            if let Some(cache) = name {
                bus.emit(CoreEvent::Cache(CacheEvent::Cleared { cache })).ok();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_messages_use_wire_names() {
        assert_eq!(
            serde_json::to_string(&ControlMessage::SkipWaiting).unwrap(),
            "\"SKIP_WAITING\""
        );
        assert_eq!(
            serde_json::to_string(&ControlMessage::ClearAudioCache).unwrap(),
            "\"CLEAR_AUDIO_CACHE\""
        );
        assert_eq!(
            serde_json::to_string(&ControlMessage::ClearAllCache).unwrap(),
            "\"CLEAR_ALL_CACHE\""
        );

        let parsed: ControlMessage = serde_json::from_str("\"SKIP_WAITING\"").unwrap();
        assert_eq!(parsed, ControlMessage::SkipWaiting);
    }
}
