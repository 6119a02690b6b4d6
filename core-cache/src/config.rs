//! Router configuration

use crate::error::{CacheError, Result};
use std::time::Duration;

/// Default bound on the audio cache entry count.
pub const DEFAULT_MAX_AUDIO_ENTRIES: usize = 50;

/// Default timeout applied at the fetch boundary.
///
/// The original behavior let a hung fetch dangle forever; the router bounds
/// it so an offline fallback is always reached.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(20);

/// Configuration for the offline cache router and its lifecycle.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Opaque build tag suffixing all three cache names (e.g. "v1.0.3")
    pub cache_version: String,

    /// Application prefix for cache names (e.g. "apc" → "apc-audio-v1.0.3")
    pub name_prefix: String,

    /// Audio delivery hostname; a request whose host contains this string is
    /// classified `AudioSecure`
    pub audio_host: String,

    /// Path suffixes classified as audio regardless of host
    pub audio_extensions: Vec<String>,

    /// Exact request paths served cache-first from the static cache
    pub static_manifest: Vec<String>,

    /// Origin the static manifest is pre-warmed from on install
    pub static_origin: String,

    /// Maximum number of entries kept in the audio cache (FIFO bound)
    pub max_audio_entries: usize,

    /// Timeout applied to every network fetch the router performs
    pub fetch_timeout: Duration,

    /// Verify the stored content hash when serving audio cache hits
    pub verify_integrity: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            cache_version: "v1.0.0".to_string(),
            name_prefix: "apc".to_string(),
            audio_host: String::new(),
            audio_extensions: vec![".mp3".to_string(), ".m4a".to_string()],
            static_manifest: Vec::new(),
            static_origin: String::new(),
            max_audio_entries: DEFAULT_MAX_AUDIO_ENTRIES,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            verify_integrity: true,
        }
    }
}

impl RouterConfig {
    /// Create a configuration for the given build tag.
    pub fn new(cache_version: impl Into<String>) -> Self {
        Self {
            cache_version: cache_version.into(),
            ..Self::default()
        }
    }

    /// Set the cache name prefix.
    pub fn with_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = prefix.into();
        self
    }

    /// Set the audio delivery host.
    pub fn with_audio_host(mut self, host: impl Into<String>) -> Self {
        self.audio_host = host.into();
        self
    }

    /// Set the recognized audio path suffixes.
    pub fn with_audio_extensions(mut self, extensions: Vec<String>) -> Self {
        self.audio_extensions = extensions;
        self
    }

    /// Set the static-asset manifest (exact paths).
    pub fn with_static_manifest(mut self, manifest: Vec<String>) -> Self {
        self.static_manifest = manifest;
        self
    }

    /// Set the origin used to pre-warm the static manifest.
    pub fn with_static_origin(mut self, origin: impl Into<String>) -> Self {
        self.static_origin = origin.into();
        self
    }

    /// Set the audio cache entry bound.
    pub fn with_max_audio_entries(mut self, max: usize) -> Self {
        self.max_audio_entries = max;
        self
    }

    /// Set the fetch boundary timeout.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Enable or disable audio integrity verification on cache hits.
    pub fn with_verify_integrity(mut self, verify: bool) -> Self {
        self.verify_integrity = verify;
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        if self.cache_version.trim().is_empty() {
            return Err(CacheError::InvalidConfig(
                "cache_version cannot be empty".to_string(),
            ));
        }

        if self.name_prefix.trim().is_empty() {
            return Err(CacheError::InvalidConfig(
                "name_prefix cannot be empty".to_string(),
            ));
        }

        if self.max_audio_entries == 0 {
            return Err(CacheError::InvalidConfig(
                "max_audio_entries must be at least 1".to_string(),
            ));
        }

        if self.fetch_timeout.is_zero() {
            return Err(CacheError::InvalidConfig(
                "fetch_timeout must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RouterConfig::default();
        assert_eq!(config.max_audio_entries, 50);
        assert_eq!(config.audio_extensions, vec![".mp3", ".m4a"]);
        assert!(config.verify_integrity);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = RouterConfig::new("v2.1.0")
            .with_name_prefix("myapp")
            .with_audio_host("cdn.example.dev")
            .with_static_manifest(vec!["/".to_string(), "/index.html".to_string()])
            .with_static_origin("https://app.example.com")
            .with_max_audio_entries(10)
            .with_fetch_timeout(Duration::from_secs(5));

        assert_eq!(config.cache_version, "v2.1.0");
        assert_eq!(config.name_prefix, "myapp");
        assert_eq!(config.audio_host, "cdn.example.dev");
        assert_eq!(config.max_audio_entries, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        assert!(RouterConfig::new("").validate().is_err());
        assert!(RouterConfig::new("v1")
            .with_name_prefix("")
            .validate()
            .is_err());
        assert!(RouterConfig::new("v1")
            .with_max_audio_entries(0)
            .validate()
            .is_err());
        assert!(RouterConfig::new("v1")
            .with_fetch_timeout(Duration::ZERO)
            .validate()
            .is_err());
    }
}
