//! Player configuration

use crate::error::{PlayerError, Result};

/// Coins charged per locked chapter.
pub const CHAPTER_COST: u64 = 10;

/// Configuration for the chapter loader.
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    /// Base URL of the audio delivery endpoint
    pub delivery_host: String,

    /// Unlock cost per chapter in coins
    pub chapter_cost: u64,
}

impl PlayerConfig {
    pub fn new(delivery_host: impl Into<String>) -> Self {
        Self {
            delivery_host: delivery_host.into(),
            chapter_cost: CHAPTER_COST,
        }
    }

    /// Override the per-chapter unlock cost.
    pub fn with_chapter_cost(mut self, cost: u64) -> Self {
        self.chapter_cost = cost;
        self
    }

    /// Canonical audio URL for a chapter of an item.
    pub fn audio_url(&self, audio_slug: &str, chapter: u32) -> String {
        format!(
            "{}/{}/chapter-{}.mp3",
            self.delivery_host.trim_end_matches('/'),
            audio_slug,
            chapter
        )
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        if self.delivery_host.trim().is_empty() {
            return Err(PlayerError::PlaybackFailed(
                "delivery_host cannot be empty".to_string(),
            ));
        }
        if self.chapter_cost == 0 {
            return Err(PlayerError::PlaybackFailed(
                "chapter_cost must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
