//! # Cache Router
//!
//! Intercepts every outgoing request, classifies it, and executes the
//! matching fetch/cache protocol. The router is infallible from the caller's
//! perspective: storage faults are absorbed and logged, network faults
//! degrade to cached copies or placeholder responses, and no path ever
//! returns an error.

use crate::config::RouterConfig;
use crate::error::Result;
use crate::eviction::enforce_entry_limit;
use crate::store::{entry_from_response, hash_body, CacheHandle, LogicalCache, NamedCacheStore};
use crate::strategy::{StrategyClassifier, StrategyLabel};
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse, RetryPolicy};
use bridge_traits::storage::StoredResponse;
use bytes::Bytes;
use core_runtime::events::{CacheEvent, CoreEvent, EventBus};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Where a router response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    /// Served from a named cache without a network call.
    Cache,
    /// Served from the network (and possibly stored on the way through).
    Network,
    /// Synthesized offline placeholder; nothing cached, network unreachable.
    Placeholder,
}

/// Response handed back to the caller for every intercepted request.
#[derive(Debug, Clone)]
pub struct RouterResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
    pub source: ResponseSource,
}

impl RouterResponse {
    /// HTTP success (2xx).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether this is the synthesized offline placeholder.
    pub fn is_offline_placeholder(&self) -> bool {
        self.source == ResponseSource::Placeholder
    }

    fn from_entry(entry: StoredResponse) -> Self {
        Self {
            status: entry.status,
            headers: entry.headers,
            body: entry.body,
            source: ResponseSource::Cache,
        }
    }

    fn from_network(response: HttpResponse) -> Self {
        Self {
            status: response.status,
            headers: response.headers,
            body: response.body,
            source: ResponseSource::Network,
        }
    }

    /// Audio-path placeholder: a synthetic 503 carrying a JSON error payload.
    fn audio_unavailable() -> Self {
        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        Self {
            status: 503,
            headers,
            body: Bytes::from_static(br#"{"error":"Audio not available offline"}"#),
            source: ResponseSource::Placeholder,
        }
    }

    /// Generic offline placeholder for non-audio paths.
    fn offline_placeholder() -> Self {
        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), "text/plain".to_string());
        Self {
            status: 503,
            headers,
            body: Bytes::from_static(b"Offline - Content not available"),
            source: ResponseSource::Placeholder,
        }
    }
}

/// The offline cache router.
///
/// Dependencies are constructor-injected so the router is testable with
/// fakes; it owns no ambient state beyond the named caches.
pub struct CacheRouter {
    classifier: StrategyClassifier,
    store: NamedCacheStore,
    http: Arc<dyn HttpClient>,
    config: RouterConfig,
    event_bus: Option<Arc<EventBus>>,
}

impl CacheRouter {
    pub fn new(
        config: RouterConfig,
        store: NamedCacheStore,
        http: Arc<dyn HttpClient>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            classifier: StrategyClassifier::new(&config),
            store,
            http,
            config,
            event_bus: None,
        })
    }

    /// Set event bus for cache events.
    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// The classifier in use, for hosts that want to pre-classify.
    pub fn classifier(&self) -> &StrategyClassifier {
        &self.classifier
    }

    /// Handle one intercepted request.
    ///
    /// Never fails: the worst outcome is an offline placeholder response.
    #[instrument(skip(self, request), fields(url = %request.url))]
    pub async fn handle(&self, request: HttpRequest) -> RouterResponse {
        let strategy = match Url::parse(&request.url) {
            Ok(url) => self.classifier.classify(&url),
            // Unparseable URLs get default semantics; the fetch itself will fail
            // and fall back like any other network error.
            Err(e) => {
                warn!(error = %e, "Unparseable request URL, using network-first");
                StrategyLabel::NetworkFirst
            }
        };

        debug!(?strategy, "Classified request");

        match strategy {
            StrategyLabel::AudioSecure => self.handle_audio(request).await,
            StrategyLabel::StaticFirst => self.handle_static(request).await,
            StrategyLabel::NetworkFirst => self.handle_network_first(request).await,
        }
    }

    /// Cache-first with network fill, FIFO eviction, and offline fallback.
    async fn handle_audio(&self, request: HttpRequest) -> RouterResponse {
        let key = request.cache_key();
        let handle = self.safe_open(LogicalCache::Audio).await;

        if let Some(handle) = &handle {
            if let Some(entry) = self.cache_lookup(handle, &key).await {
                debug!(key = %key, "Serving audio from cache");
                return RouterResponse::from_entry(entry);
            }
        }

        debug!(key = %key, "Audio cache miss, fetching from network");
        match self.fetch(request).await {
            Ok(response) if response.status == 200 => {
                // Clone-then-store: the entry owns its own copy of the bytes
                // before the response is surrendered to the caller.
                if let Some(handle) = &handle {
                    self.store_entry(handle, &key, &response).await;
                    self.run_eviction(handle).await;
                }
                RouterResponse::from_network(response)
            }
            Ok(response) => RouterResponse::from_network(response),
            Err(e) => {
                warn!(key = %key, error = %e, "Audio fetch failed, trying cache fallback");
                if let Some(handle) = &handle {
                    if let Some(entry) = self.cache_lookup(handle, &key).await {
                        info!(key = %key, "Returning cached audio (offline)");
                        self.emit(CacheEvent::ServedOffline { key });
                        return RouterResponse::from_entry(entry);
                    }
                }
                RouterResponse::audio_unavailable()
            }
        }
    }

    /// Cache-first over the fixed manifest; no eviction.
    async fn handle_static(&self, request: HttpRequest) -> RouterResponse {
        let key = request.cache_key();
        let handle = self.safe_open(LogicalCache::Static).await;

        if let Some(handle) = &handle {
            if let Some(entry) = self.cache_lookup(handle, &key).await {
                debug!(key = %key, "Serving static asset from cache");
                return RouterResponse::from_entry(entry);
            }
        }

        match self.fetch(request).await {
            Ok(response) => {
                if response.status == 200 {
                    if let Some(handle) = &handle {
                        self.store_entry(handle, &key, &response).await;
                    }
                }
                RouterResponse::from_network(response)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Static fetch failed");
                RouterResponse::offline_placeholder()
            }
        }
    }

    /// Network-first with runtime cache fallback; the default strategy.
    async fn handle_network_first(&self, request: HttpRequest) -> RouterResponse {
        let key = request.cache_key();
        let handle = self.safe_open(LogicalCache::Runtime).await;

        match self.fetch(request).await {
            Ok(response) => {
                if response.status == 200 {
                    if let Some(handle) = &handle {
                        self.store_entry(handle, &key, &response).await;
                    }
                }
                RouterResponse::from_network(response)
            }
            Err(e) => {
                debug!(key = %key, error = %e, "Network failed, trying runtime cache");
                if let Some(handle) = &handle {
                    if let Some(entry) = self.cache_lookup(handle, &key).await {
                        self.emit(CacheEvent::ServedOffline { key });
                        return RouterResponse::from_entry(entry);
                    }
                }
                RouterResponse::offline_placeholder()
            }
        }
    }

    /// Network fetch bounded by the configured timeout.
    ///
    /// The router layers its own fallback handling, so retries are disabled
    /// at the client level.
    async fn fetch(
        &self,
        request: HttpRequest,
    ) -> std::result::Result<HttpResponse, bridge_traits::BridgeError> {
        let request = request.timeout(self.config.fetch_timeout);
        match tokio::time::timeout(
            self.config.fetch_timeout,
            self.http.execute_with_retry(request, RetryPolicy::none()),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(bridge_traits::BridgeError::OperationFailed(
                "Fetch timed out".to_string(),
            )),
        }
    }

    /// Open a logical cache, absorbing storage faults.
    async fn safe_open(&self, logical: LogicalCache) -> Option<CacheHandle> {
        match self.store.open(logical).await {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!(cache = %logical, error = %e, "Cache open failed, continuing without cache");
                None
            }
        }
    }

    /// Cache lookup that absorbs storage faults and handles integrity.
    ///
    /// A corrupt audio entry is dropped and treated as a miss so the caller
    /// refetches instead of playing damaged bytes.
    async fn cache_lookup(&self, handle: &CacheHandle, key: &str) -> Option<StoredResponse> {
        let entry = match self.store.get(handle, key).await {
            Ok(entry) => entry?,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache read failed");
                return None;
            }
        };

        if self.config.verify_integrity
            && !entry.content_hash.is_empty()
            && hash_body(&entry.body) != entry.content_hash
        {
            warn!(key = %key, "Cache integrity check failed, discarding entry");
            self.store.delete(handle, key).await.ok();
            return None;
        }

        Some(entry)
    }

    /// Store a copy of a response, absorbing storage faults.
    async fn store_entry(&self, handle: &CacheHandle, key: &str, response: &HttpResponse) {
        let entry = entry_from_response(response);
        let size = entry.size() as u64;
        match self.store.put(handle, key, entry).await {
            Ok(()) => {
                debug!(key = %key, size_bytes = size, "Response cached");
                self.emit(CacheEvent::Stored {
                    cache: handle.name().to_string(),
                    key: key.to_string(),
                    size_bytes: size,
                });
            }
            Err(e) => warn!(key = %key, error = %e, "Cache write failed"),
        }
    }

    /// Apply the FIFO bound to the audio cache, absorbing storage faults.
    async fn run_eviction(&self, handle: &CacheHandle) {
        match enforce_entry_limit(&self.store, handle, self.config.max_audio_entries).await {
            Ok(0) => {}
            Ok(removed) => self.emit(CacheEvent::Evicted {
                cache: handle.name().to_string(),
                keys_removed: removed,
            }),
            Err(e) => warn!(error = %e, "Eviction failed"),
        }
    }

    fn emit(&self, event: CacheEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit(CoreEvent::Cache(event)).ok();
        }
    }
}
