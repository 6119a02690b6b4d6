//! # Player Transport
//!
//! The playback state machine: owns transport state and sequencing rules and
//! exposes explicit command methods for the host UI to invoke. The core
//! exposes transitions, not event subscriptions.
//!
//! ```text
//! Idle ──open_chapter──> Loaded ──play──> Playing ⇄ Paused
//!                                            │
//!                                natural end │
//!                                            ▼
//!                                          Ended ──auto-advance──> Loaded → Playing
//! ```
//!
//! Failure semantics: a playback start failure reports the error and falls
//! back to `Paused`; it never silently becomes `Playing`.

use crate::error::{PlayerError, Result};
use crate::loader::ChapterLoader;
use crate::session::PlaybackSession;
use crate::traits::PlaybackAdapter;
use core_catalog::{CatalogItem, ClientStateStore};
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Transport states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    /// No catalog item open.
    Idle,
    /// A chapter is loaded and ready to play.
    Loaded,
    /// Audio is playing.
    Playing,
    /// Audio is paused.
    Paused,
    /// The current chapter finished and no new one has started.
    Ended,
}

/// Non-error outcomes of sequencing commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportNotice {
    /// Moved to the given chapter.
    Advanced { chapter: u32 },
    /// `previous` at the first chapter: a no-op, surfaced as a notification.
    AtFirstChapter,
    /// `next` (or auto-advance) past the last chapter: a no-op notification.
    NoMoreChapters,
}

/// The playback state machine.
///
/// Exactly one live [`PlaybackSession`] per transport instance; opening a new
/// item destroys the previous session and releases its audio source.
pub struct PlayerTransport {
    loader: ChapterLoader,
    adapter: Arc<dyn PlaybackAdapter>,
    session: Option<PlaybackSession>,
    state: TransportState,
    client_state: Option<Arc<ClientStateStore>>,
    event_bus: Option<Arc<EventBus>>,
}

impl PlayerTransport {
    pub fn new(loader: ChapterLoader, adapter: Arc<dyn PlaybackAdapter>) -> Self {
        Self {
            loader,
            adapter,
            session: None,
            state: TransportState::Idle,
            client_state: None,
            event_bus: None,
        }
    }

    /// Record opened items in the history mirror.
    pub fn with_client_state(mut self, client_state: Arc<ClientStateStore>) -> Self {
        self.client_state = Some(client_state);
        self
    }

    /// Set event bus for playback events.
    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    /// The live session, if an item is open.
    pub fn session(&self) -> Option<&PlaybackSession> {
        self.session.as_ref()
    }

    /// Open a catalog item and load its first chapter.
    ///
    /// Any previous session is destroyed first (its audio source released).
    #[instrument(skip(self, item), fields(item_id = %item.id))]
    pub async fn open_item(&mut self, item: CatalogItem) -> Result<()> {
        self.close().await;

        if let Some(client_state) = &self.client_state {
            if let Err(e) = client_state.record_history(&item).await {
                warn!(error = %e, "Failed to record history");
            }
        }

        info!(title = %item.title, "Opening catalog item");
        self.session = Some(PlaybackSession::new(item));
        self.open_chapter(1).await
    }

    /// Load a chapter through the entitlement gate.
    ///
    /// On success the transport is `Loaded` at position zero. On failure the
    /// previous chapter, source, and state are preserved.
    #[instrument(skip(self))]
    pub async fn open_chapter(&mut self, chapter: u32) -> Result<()> {
        let session = self.session.as_mut().ok_or(PlayerError::NoItemLoaded)?;

        self.loader.open_chapter(session, chapter).await?;
        session.is_playing = false;
        self.state = TransportState::Loaded;
        Ok(())
    }

    /// Start or resume playback.
    ///
    /// Valid from `Loaded`, `Paused`, and `Ended` (restart of the finished
    /// chapter). A start failure reverts to `Paused` and reports the error.
    #[instrument(skip(self))]
    pub async fn play(&mut self) -> Result<()> {
        match self.state {
            TransportState::Playing => Ok(()),
            TransportState::Idle => Err(PlayerError::NoItemLoaded),
            TransportState::Loaded | TransportState::Ended => {
                let session = self.session.as_mut().ok_or(PlayerError::NoItemLoaded)?;
                let speed = session.speed.as_f32();
                let volume = session.volume;
                let source = session.source().ok_or_else(|| {
                    PlayerError::PlaybackFailed("No audio source loaded".to_string())
                })?;

                match self.adapter.start(source, speed, volume).await {
                    Ok(()) => {
                        session.is_playing = true;
                        self.state = TransportState::Playing;
                        self.emit_started();
                        Ok(())
                    }
                    Err(e) => {
                        session.is_playing = false;
                        self.state = TransportState::Paused;
                        self.emit_error(&e, true);
                        Err(e)
                    }
                }
            }
            TransportState::Paused => match self.adapter.resume().await {
                Ok(()) => {
                    if let Some(session) = self.session.as_mut() {
                        session.is_playing = true;
                    }
                    self.state = TransportState::Playing;
                    self.emit_started();
                    Ok(())
                }
                Err(e) => {
                    self.state = TransportState::Paused;
                    self.emit_error(&e, true);
                    Err(e)
                }
            },
        }
    }

    /// Pause playback. A no-op outside `Playing`.
    #[instrument(skip(self))]
    pub async fn pause(&mut self) -> Result<()> {
        if self.state != TransportState::Playing {
            return Ok(());
        }

        self.adapter.pause().await?;
        let position_ms = self
            .adapter
            .position()
            .await
            .map(|p| p.as_millis() as u64)
            .unwrap_or(0);

        if let Some(session) = self.session.as_mut() {
            session.is_playing = false;
            session.position_ms = position_ms;
        }
        self.state = TransportState::Paused;
        self.emit_paused(position_ms);
        Ok(())
    }

    /// Toggle between playing and paused.
    pub async fn toggle_play(&mut self) -> Result<()> {
        if self.state == TransportState::Playing {
            self.pause().await
        } else {
            self.play().await
        }
    }

    /// Move to the next chapter; at the last chapter this is a no-op with a
    /// notification, not a failure. Playback resumes if it was running.
    #[instrument(skip(self))]
    pub async fn next(&mut self) -> Result<TransportNotice> {
        let session = self.session.as_ref().ok_or(PlayerError::NoItemLoaded)?;
        let current = session.current_chapter();
        if current >= session.item().total_chapters {
            debug!("Already at last chapter");
            return Ok(TransportNotice::NoMoreChapters);
        }

        self.switch_chapter(current + 1).await
    }

    /// Move to the previous chapter; at the first chapter this is a no-op
    /// with a notification, not a failure.
    #[instrument(skip(self))]
    pub async fn previous(&mut self) -> Result<TransportNotice> {
        let session = self.session.as_ref().ok_or(PlayerError::NoItemLoaded)?;
        let current = session.current_chapter();
        if current <= 1 {
            debug!("Already at first chapter");
            return Ok(TransportNotice::AtFirstChapter);
        }

        self.switch_chapter(current - 1).await
    }

    async fn switch_chapter(&mut self, chapter: u32) -> Result<TransportNotice> {
        let was_playing = self.state == TransportState::Playing;

        self.open_chapter(chapter).await?;
        if was_playing {
            self.play().await?;
        }
        Ok(TransportNotice::Advanced { chapter })
    }

    /// Natural end of the current chapter's audio.
    ///
    /// Transitions to `Ended`, then auto-advances to the next chapter through
    /// the entitlement gate. A gate failure (locked chapter, no balance)
    /// leaves the transport `Ended` at the finished chapter rather than
    /// silently advancing; past the last chapter it stays `Ended` idle.
    #[instrument(skip(self))]
    pub async fn on_chapter_ended(&mut self) -> Result<TransportNotice> {
        let session = self.session.as_mut().ok_or(PlayerError::NoItemLoaded)?;
        session.is_playing = false;
        let finished = session.current_chapter();
        let total = session.item().total_chapters;
        self.state = TransportState::Ended;
        self.emit_ended(finished);

        if finished >= total {
            info!(chapter = finished, "Final chapter finished");
            return Ok(TransportNotice::NoMoreChapters);
        }

        debug!(next = finished + 1, "Auto-advancing");
        match self.open_chapter(finished + 1).await {
            Ok(()) => {
                self.play().await?;
                Ok(TransportNotice::Advanced { chapter: finished + 1 })
            }
            Err(e) => {
                // Stay ended at the finished chapter; the caller surfaces the
                // gate outcome (e.g. an upsell for insufficient balance).
                self.state = TransportState::Ended;
                info!(error = %e, "Auto-advance stopped");
                Err(e)
            }
        }
    }

    /// Seek within the current chapter. State-preserving.
    pub async fn seek(&mut self, position: Duration) -> Result<()> {
        if self.session.is_none() {
            return Err(PlayerError::NoItemLoaded);
        }
        self.adapter.seek(position).await?;
        if let Some(session) = self.session.as_mut() {
            session.position_ms = position.as_millis() as u64;
        }
        Ok(())
    }

    /// Set the volume. State-preserving; validates the range.
    pub async fn set_volume(&mut self, volume: f32) -> Result<()> {
        if !(0.0..=1.0).contains(&volume) {
            return Err(PlayerError::InvalidVolume(volume));
        }
        let session = self.session.as_mut().ok_or(PlayerError::NoItemLoaded)?;
        self.adapter.set_volume(volume).await?;
        session.volume = volume;
        Ok(())
    }

    /// Cycle the playback speed through the fixed step set, wrapping.
    /// Returns the new speed. State-preserving.
    pub async fn cycle_speed(&mut self) -> Result<f32> {
        let session = self.session.as_mut().ok_or(PlayerError::NoItemLoaded)?;
        let next = session.speed.cycled();
        self.adapter.set_rate(next.as_f32()).await?;
        session.speed = next;
        debug!(speed = next.as_f32(), "Playback speed changed");
        Ok(next.as_f32())
    }

    /// Close the player: stop the adapter and destroy the session, releasing
    /// the audio source. Always leaves the transport `Idle`.
    #[instrument(skip(self))]
    pub async fn close(&mut self) {
        if self.state == TransportState::Playing {
            if let Err(e) = self.adapter.stop().await {
                warn!(error = %e, "Adapter stop failed during close");
            }
        }
        if let Some(mut session) = self.session.take() {
            session.close();
        }
        self.state = TransportState::Idle;
    }

    fn emit_started(&self) {
        if let (Some(bus), Some(session)) = (&self.event_bus, &self.session) {
            bus.emit(CoreEvent::Playback(PlaybackEvent::Started {
                item_id: session.item().id.to_string(),
                chapter: session.current_chapter(),
            }))
            .ok();
        }
    }

    fn emit_paused(&self, position_ms: u64) {
        if let (Some(bus), Some(session)) = (&self.event_bus, &self.session) {
            bus.emit(CoreEvent::Playback(PlaybackEvent::Paused {
                item_id: session.item().id.to_string(),
                chapter: session.current_chapter(),
                position_ms,
            }))
            .ok();
        }
    }

    fn emit_ended(&self, chapter: u32) {
        if let (Some(bus), Some(session)) = (&self.event_bus, &self.session) {
            bus.emit(CoreEvent::Playback(PlaybackEvent::Ended {
                item_id: session.item().id.to_string(),
                chapter,
            }))
            .ok();
        }
    }

    fn emit_error(&self, error: &PlayerError, recoverable: bool) {
        if let Some(bus) = &self.event_bus {
            bus.emit(CoreEvent::Playback(PlaybackEvent::Error {
                item_id: self.session.as_ref().map(|s| s.item().id.to_string()),
                message: error.to_string(),
                recoverable,
            }))
            .ok();
        }
    }
}
