//! # Strategy Classifier
//!
//! Pure mapping from a request URL to a caching strategy. Derived per
//! request, never stored.

use crate::config::RouterConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use url::Url;

/// The caching strategy a request is routed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyLabel {
    /// Cache-first with network fill and FIFO eviction; enables offline
    /// playback of previously fetched audio.
    AudioSecure,
    /// Cache-first over the fixed static-asset manifest; no eviction.
    StaticFirst,
    /// Network-first with runtime cache fallback; the default for identity,
    /// document-store, and all other unclassified traffic.
    NetworkFirst,
}

/// Classifies requests by URL shape.
///
/// Precedence is fixed and order-sensitive:
/// 1. audio delivery host or recognized audio extension → [`StrategyLabel::AudioSecure`]
/// 2. exact match against the static manifest → [`StrategyLabel::StaticFirst`]
/// 3. everything else → [`StrategyLabel::NetworkFirst`]
#[derive(Debug, Clone)]
pub struct StrategyClassifier {
    audio_host: String,
    audio_extensions: Vec<String>,
    static_manifest: HashSet<String>,
}

impl StrategyClassifier {
    pub fn new(config: &RouterConfig) -> Self {
        Self {
            audio_host: config.audio_host.clone(),
            audio_extensions: config.audio_extensions.clone(),
            static_manifest: config.static_manifest.iter().cloned().collect(),
        }
    }

    /// Classify a request URL. Pure and total; no side effects.
    pub fn classify(&self, url: &Url) -> StrategyLabel {
        if self.is_audio(url) {
            return StrategyLabel::AudioSecure;
        }

        if self.static_manifest.contains(url.path()) {
            return StrategyLabel::StaticFirst;
        }

        StrategyLabel::NetworkFirst
    }

    fn is_audio(&self, url: &Url) -> bool {
        if !self.audio_host.is_empty() {
            if let Some(host) = url.host_str() {
                if host.contains(&self.audio_host) {
                    return true;
                }
            }
        }

        let path = url.path();
        self.audio_extensions.iter().any(|ext| path.ends_with(ext))
    }
}
