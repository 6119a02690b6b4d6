//! # Player Traits
//!
//! Seams between the player core and its host: the platform audio sink and
//! the unlock confirmation surface. Both are constructor-injected so the
//! core is testable with fakes.

use crate::error::Result;
use crate::session::AudioHandle;
use async_trait::async_trait;
use core_catalog::CatalogItem;
use std::time::Duration;

/// Platform audio sink.
///
/// Playback control methods should be fast and non-blocking; a failed
/// `start` is reported to the transport, which reverts to paused rather than
/// pretending to play.
#[async_trait]
pub trait PlaybackAdapter: Send + Sync {
    /// Begin playback of a loaded audio source at the given speed and volume.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be opened or the audio device is
    /// unavailable.
    async fn start(&self, source: &AudioHandle, speed: f32, volume: f32) -> Result<()>;

    /// Pause playback without releasing resources.
    async fn pause(&self) -> Result<()>;

    /// Resume playback from the paused position.
    async fn resume(&self) -> Result<()>;

    /// Stop playback and release device resources.
    async fn stop(&self) -> Result<()>;

    /// Seek to an absolute position in the current chapter.
    async fn seek(&self, position: Duration) -> Result<()>;

    /// Set playback volume in `[0.0, 1.0]`.
    async fn set_volume(&self, volume: f32) -> Result<()>;

    /// Set the playback rate.
    async fn set_rate(&self, rate: f32) -> Result<()>;

    /// Current playback position.
    async fn position(&self) -> Result<Duration>;
}

/// Confirmation surface for coin unlocks.
///
/// The loader presents the unlock cost through this trait before any debit;
/// a decline is a normal abort.
#[async_trait]
pub trait UnlockPrompt: Send + Sync {
    /// Present the cost of unlocking a chapter. Returns `true` on confirm.
    async fn confirm_unlock(&self, item: &CatalogItem, chapter: u32, cost: u64) -> bool;
}

/// Prompt that confirms every unlock without asking.
///
/// For hosts that render their own confirmation ahead of time, and for tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoConfirm;

#[async_trait]
impl UnlockPrompt for AutoConfirm {
    async fn confirm_unlock(&self, _item: &CatalogItem, _chapter: u32, _cost: u64) -> bool {
        true
    }
}
