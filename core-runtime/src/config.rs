//! # Core Configuration Module
//!
//! Provides configuration management for the Audiobook Platform Core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds all necessary dependencies and settings for the core
//! library. It enforces fail-fast validation to ensure all required bridges are
//! provided before initialization.
//!
//! ## Required Dependencies
//!
//! - `SettingsStore` - Required for the persisted client state mirrors
//! - `DocumentStore` - Required for catalog and entitlement records
//!
//! ## Optional Dependencies (with platform defaults)
//!
//! - `HttpClient` - HTTP operations (desktop default: reqwest)
//! - `CacheStorage` - Offline response caches (desktop default: in-memory)
//! - `Clock` - Time source (default: system clock)
//!
//! When the `desktop-shims` feature is enabled, desktop-ready defaults for
//! `SettingsStore` and `DocumentStore` are injected automatically if not
//! provided.
//!
//! ## Usage
//!
//! ### Basic Configuration with Desktop Defaults
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//!
//! let config = CoreConfig::builder()
//!     .build()
//!     .expect("Failed to build config");
//! ```
//!
//! ### Configuration with Custom Bridges
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .http_client(Arc::new(MyHttpClient))
//!     .cache_storage(Arc::new(MyCacheStorage))
//!     .settings_store(Arc::new(MySettingsStore))
//!     .document_store(Arc::new(MyDocumentStore))
//!     .enable_offline_playback(true)
//!     .build()
//!     .expect("Failed to build config");
//! ```
//!
//! ## Error Handling
//!
//! The builder validates all required dependencies and provides actionable error
//! messages when capabilities are missing.

use crate::error::{Error, Result};
use bridge_traits::{
    CacheStorage, Clock, DocumentStore, HttpClient, SettingsStore, SystemClock,
};
use std::sync::Arc;

/// Default event bus buffer size used by `CoreConfig`.
const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

/// Core configuration for the Audiobook Platform Core.
///
/// This struct holds all dependencies and settings required to initialize
/// the core library. Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// HTTP client for network fetches (optional with desktop default)
    pub http_client: Option<Arc<dyn HttpClient>>,

    /// Named response cache storage (optional, required for offline playback)
    pub cache_storage: Option<Arc<dyn CacheStorage>>,

    /// Client state storage (required)
    pub settings_store: Arc<dyn SettingsStore>,

    /// Remote document database (required)
    pub document_store: Arc<dyn DocumentStore>,

    /// Time source (defaults to system clock)
    pub clock: Arc<dyn Clock>,

    /// Event bus buffer size
    pub event_buffer_size: usize,

    /// Feature flags
    pub features: FeatureFlags,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field(
                "http_client",
                &self.http_client.as_ref().map(|_| "HttpClient { ... }"),
            )
            .field(
                "cache_storage",
                &self.cache_storage.as_ref().map(|_| "CacheStorage { ... }"),
            )
            .field("settings_store", &"SettingsStore { ... }")
            .field("document_store", &"DocumentStore { ... }")
            .field("event_buffer_size", &self.event_buffer_size)
            .field("features", &self.features)
            .finish()
    }
}

/// Feature flags control optional functionality.
///
/// Features can be enabled during configuration to unlock additional
/// capabilities, but may require corresponding bridge implementations to
/// function correctly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeatureFlags {
    /// Enable the offline cache router for audio and static assets
    pub enable_offline_playback: bool,

    /// Enable coin/membership gating for locked chapters
    pub enable_entitlements: bool,
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Event buffer size is reasonable (> 0 and <= 100,000)
    /// - Feature flags are consistent with available bridges
    pub fn validate(&self) -> Result<()> {
        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.event_buffer_size > 100_000 {
            return Err(Error::Config(
                "Event buffer size exceeds maximum of 100,000".to_string(),
            ));
        }

        if self.features.enable_offline_playback && self.cache_storage.is_none() {
            return Err(Error::Config(
                "Offline playback enabled but no CacheStorage provided. \
                 Disable the feature or inject a CacheStorage implementation."
                    .to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn settings_store_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "SettingsStore".to_string(),
        message: "SettingsStore implementation is required for client state mirrors. \
                 Desktop: ensure the 'desktop-shims' feature is enabled to use the default MemorySettingsStore. \
                 Mobile: inject platform-native settings (UserDefaults/DataStore). \
                 Web: inject local-storage-backed settings store."
            .to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn document_store_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "DocumentStore".to_string(),
        message: "DocumentStore implementation is required for catalog and entitlement records. \
                 Desktop: ensure the 'desktop-shims' feature is enabled to use the in-memory shim. \
                 Production: inject an adapter for the hosted document database."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_settings_store() -> Result<Arc<dyn SettingsStore>> {
    use bridge_desktop::MemorySettingsStore;

    let store: Arc<dyn SettingsStore> = Arc::new(MemorySettingsStore::new());
    Ok(store)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_settings_store() -> Result<Arc<dyn SettingsStore>> {
    Err(settings_store_missing_error())
}

#[cfg(feature = "desktop-shims")]
fn provide_default_document_store() -> Result<Arc<dyn DocumentStore>> {
    use bridge_desktop::MemoryDocumentStore;

    let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
    Ok(store)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_document_store() -> Result<Arc<dyn DocumentStore>> {
    Err(document_store_missing_error())
}

/// Builder for constructing [`CoreConfig`] instances.
///
/// Use this builder to incrementally set configuration options and then
/// call [`build()`](CoreConfigBuilder::build) to create the final config.
/// The builder validates required dependencies and provides helpful error
/// messages.
#[derive(Default)]
pub struct CoreConfigBuilder {
    http_client: Option<Arc<dyn HttpClient>>,
    cache_storage: Option<Arc<dyn CacheStorage>>,
    settings_store: Option<Arc<dyn SettingsStore>>,
    document_store: Option<Arc<dyn DocumentStore>>,
    clock: Option<Arc<dyn Clock>>,
    event_buffer_size: Option<usize>,
    features: FeatureFlags,
}

impl CoreConfigBuilder {
    /// Sets the HTTP client implementation.
    ///
    /// If not provided, the desktop default (reqwest-based) can be used by the
    /// host when the `desktop-shims` feature is enabled.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the cache storage implementation.
    ///
    /// Required when offline playback is enabled.
    pub fn cache_storage(mut self, storage: Arc<dyn CacheStorage>) -> Self {
        self.cache_storage = Some(storage);
        self
    }

    /// Sets the settings store implementation (required).
    ///
    /// The settings store holds the small client state mirrors (liked items,
    /// history, balance and membership flags).
    pub fn settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    /// Sets the document store implementation (required).
    ///
    /// The document store is the hosted database holding catalog, user, and
    /// transaction records.
    pub fn document_store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.document_store = Some(store);
        self
    }

    /// Sets the time source. Defaults to the system clock.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Sets the event bus buffer size.
    ///
    /// Default: 100
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Enables or disables offline playback.
    ///
    /// Requires a `CacheStorage` to be provided.
    ///
    /// Default: false
    pub fn enable_offline_playback(mut self, enabled: bool) -> Self {
        self.features.enable_offline_playback = enabled;
        self
    }

    /// Enables or disables entitlement gating.
    ///
    /// Default: false
    pub fn enable_entitlements(mut self, enabled: bool) -> Self {
        self.features.enable_entitlements = enabled;
        self
    }

    /// Sets all feature flags at once.
    pub fn features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// This validates all required dependencies are provided and returns
    /// an error with an actionable message if anything is missing.
    ///
    /// # Returns
    ///
    /// Returns `Ok(CoreConfig)` on success, or an error if:
    /// - Required bridges are missing (SettingsStore, DocumentStore)
    /// - Configuration values are invalid
    /// - Feature flags are inconsistent with available bridges
    pub fn build(self) -> Result<CoreConfig> {
        let settings_store = match self.settings_store {
            Some(store) => store,
            None => provide_default_settings_store()?,
        };

        let document_store = match self.document_store {
            Some(store) => store,
            None => provide_default_document_store()?,
        };

        let config = CoreConfig {
            http_client: self.http_client,
            cache_storage: self.cache_storage,
            settings_store,
            document_store,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            features: self.features,
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::documents::{Document, DocumentQuery};
    use bridge_traits::BridgeError;
    use std::sync::Arc;

    // Mock implementations for testing
    struct MockSettingsStore;

    #[async_trait]
    impl SettingsStore for MockSettingsStore {
        async fn set_string(
            &self,
            _key: &str,
            _value: &str,
        ) -> std::result::Result<(), BridgeError> {
            Ok(())
        }

        async fn get_string(&self, _key: &str) -> std::result::Result<Option<String>, BridgeError> {
            Ok(None)
        }

        async fn set_bool(&self, _key: &str, _value: bool) -> std::result::Result<(), BridgeError> {
            Ok(())
        }

        async fn get_bool(&self, _key: &str) -> std::result::Result<Option<bool>, BridgeError> {
            Ok(None)
        }

        async fn set_i64(&self, _key: &str, _value: i64) -> std::result::Result<(), BridgeError> {
            Ok(())
        }

        async fn get_i64(&self, _key: &str) -> std::result::Result<Option<i64>, BridgeError> {
            Ok(None)
        }

        async fn delete(&self, _key: &str) -> std::result::Result<(), BridgeError> {
            Ok(())
        }

        async fn has_key(&self, _key: &str) -> std::result::Result<bool, BridgeError> {
            Ok(false)
        }

        async fn list_keys(&self) -> std::result::Result<Vec<String>, BridgeError> {
            Ok(Vec::new())
        }

        async fn clear_all(&self) -> std::result::Result<(), BridgeError> {
            Ok(())
        }
    }

    struct MockDocumentStore;

    #[async_trait]
    impl DocumentStore for MockDocumentStore {
        async fn get(
            &self,
            _collection: &str,
            _id: &str,
        ) -> std::result::Result<Option<Document>, BridgeError> {
            Ok(None)
        }

        async fn set(
            &self,
            _collection: &str,
            _id: &str,
            _data: Document,
        ) -> std::result::Result<(), BridgeError> {
            Ok(())
        }

        async fn update(
            &self,
            _collection: &str,
            _id: &str,
            _fields: Document,
        ) -> std::result::Result<(), BridgeError> {
            Ok(())
        }

        async fn add(
            &self,
            _collection: &str,
            _data: Document,
        ) -> std::result::Result<String, BridgeError> {
            Ok("id".to_string())
        }

        async fn query(
            &self,
            _collection: &str,
            _query: DocumentQuery,
        ) -> std::result::Result<Vec<(String, Document)>, BridgeError> {
            Ok(Vec::new())
        }
    }

    #[cfg(feature = "desktop-shims")]
    #[test]
    fn test_build_with_desktop_defaults() {
        let config = CoreConfig::builder()
            .build()
            .expect("desktop defaults should succeed");

        assert_eq!(config.event_buffer_size, 100);
        assert!(config.http_client.is_none());
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_builder_requires_settings_store() {
        let result = CoreConfig::builder()
            .document_store(Arc::new(MockDocumentStore))
            .build();

        assert!(result.is_err());
        let err_msg = result.unwrap_err().to_string();
        assert!(err_msg.contains("SettingsStore"));
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_builder_requires_document_store() {
        let result = CoreConfig::builder()
            .settings_store(Arc::new(MockSettingsStore))
            .build();

        assert!(result.is_err());
        let err_msg = result.unwrap_err().to_string();
        assert!(err_msg.contains("DocumentStore"));
    }

    #[test]
    fn test_builder_with_all_required_fields() {
        let result = CoreConfig::builder()
            .settings_store(Arc::new(MockSettingsStore))
            .document_store(Arc::new(MockDocumentStore))
            .build();

        assert!(result.is_ok());
        let config = result.unwrap();
        assert_eq!(config.event_buffer_size, 100); // Default
    }

    #[test]
    fn test_validate_rejects_zero_buffer() {
        let result = CoreConfig::builder()
            .settings_store(Arc::new(MockSettingsStore))
            .document_store(Arc::new(MockDocumentStore))
            .event_buffer_size(0)
            .build();

        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("must be greater than 0"));
    }

    #[test]
    fn test_validate_rejects_excessive_buffer() {
        let result = CoreConfig::builder()
            .settings_store(Arc::new(MockSettingsStore))
            .document_store(Arc::new(MockDocumentStore))
            .event_buffer_size(1_000_000)
            .build();

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("exceeds maximum"));
    }

    #[test]
    fn test_validate_offline_playback_requires_cache_storage() {
        let result = CoreConfig::builder()
            .settings_store(Arc::new(MockSettingsStore))
            .document_store(Arc::new(MockDocumentStore))
            .enable_offline_playback(true)
            .build();

        assert!(result.is_err());
        let err_msg = result.unwrap_err().to_string();
        assert!(err_msg.contains("Offline playback enabled"));
        assert!(err_msg.contains("CacheStorage"));
    }

    #[test]
    fn test_feature_flags_default() {
        let flags = FeatureFlags::default();
        assert!(!flags.enable_offline_playback);
        assert!(!flags.enable_entitlements);
    }

    #[test]
    fn test_config_is_cloneable() {
        let config = CoreConfig::builder()
            .settings_store(Arc::new(MockSettingsStore))
            .document_store(Arc::new(MockDocumentStore))
            .event_buffer_size(200)
            .build()
            .unwrap();

        let cloned = config.clone();
        assert_eq!(cloned.event_buffer_size, config.event_buffer_size);
    }
}
