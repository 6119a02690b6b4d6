//! # Chapter Loader
//!
//! Entitlement gate and byte fetcher for chapters: validates the index,
//! unlocks via membership or coin debit, then requests the audio through the
//! offline cache router and installs it as the session's audio source.

use crate::config::PlayerConfig;
use crate::error::{PlayerError, Result};
use crate::session::{AudioHandle, PlaybackSession};
use crate::traits::UnlockPrompt;
use bridge_traits::http::HttpRequest;
use core_cache::CacheRouter;
use core_entitlement::{BalanceService, DebitOutcome, PrincipalId};
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Entitlement-gated content loader.
///
/// The balance service is an optional capability checked once at
/// construction: hosts without an entitlement system get every chapter
/// without debits, matching a deployment where the coin module is absent.
pub struct ChapterLoader {
    config: PlayerConfig,
    router: Arc<CacheRouter>,
    balance: Option<Arc<dyn BalanceService>>,
    prompt: Arc<dyn UnlockPrompt>,
    principal: PrincipalId,
    event_bus: Option<Arc<EventBus>>,
}

impl ChapterLoader {
    pub fn new(
        config: PlayerConfig,
        router: Arc<CacheRouter>,
        balance: Option<Arc<dyn BalanceService>>,
        prompt: Arc<dyn UnlockPrompt>,
        principal: PrincipalId,
    ) -> Result<Self> {
        config.validate()?;
        if balance.is_none() {
            warn!("No balance service injected; locked chapters will unlock without debit");
        }
        Ok(Self {
            config,
            router,
            balance,
            prompt,
            principal,
            event_bus: None,
        })
    }

    /// Set event bus for playback events.
    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Open a chapter: gate, unlock if needed, fetch, install the source.
    ///
    /// On success the session points at the new chapter with a fresh audio
    /// source. On failure the session keeps its previous chapter and source,
    /// except that a debit-backed unlock persists: a failed fetch leaves the
    /// chapter unlocked, so retrying will not charge again.
    #[instrument(skip(self, session), fields(item_id = %session.item().id))]
    pub async fn open_chapter(
        &self,
        session: &mut PlaybackSession,
        chapter: u32,
    ) -> Result<()> {
        let total = session.item().total_chapters;
        if chapter == 0 || chapter > total {
            return Err(PlayerError::OutOfRange { chapter, total });
        }

        if !session.is_unlocked(chapter) {
            self.unlock_chapter(session, chapter).await?;
        }

        self.fetch_into_session(session, chapter).await
    }

    /// Gate a locked chapter behind membership or a coin debit.
    async fn unlock_chapter(&self, session: &mut PlaybackSession, chapter: u32) -> Result<()> {
        let Some(balance) = &self.balance else {
            debug!(chapter, "Unlocking without debit (no balance service)");
            session.unlock(chapter);
            self.emit_unlocked(session, chapter, false);
            return Ok(());
        };

        let entitlement = balance
            .entitlement_of(&self.principal)
            .await
            .map_err(|e| PlayerError::DebitFailed(e.to_string()))?;

        if entitlement.membership_active {
            info!(chapter, "Chapter unlocked via membership");
            session.unlock(chapter);
            self.emit_unlocked(session, chapter, true);
            return Ok(());
        }

        let cost = self.config.chapter_cost;
        if !self
            .prompt
            .confirm_unlock(session.item(), chapter, cost)
            .await
        {
            debug!(chapter, "Unlock declined by user");
            return Err(PlayerError::UserCancelled);
        }

        let description = format!(
            "Unlocked Chapter {} of {}",
            chapter,
            session.item().title
        );
        match balance
            .debit(&self.principal, cost, &description)
            .await
            .map_err(|e| PlayerError::DebitFailed(e.to_string()))?
        {
            DebitOutcome::Completed { new_balance } => {
                info!(chapter, new_balance, "Chapter unlocked via debit");
                session.unlock(chapter);
                self.emit_unlocked(session, chapter, false);
                Ok(())
            }
            DebitOutcome::InsufficientBalance { balance } => {
                Err(PlayerError::InsufficientBalance {
                    balance,
                    required: cost,
                })
            }
        }
    }

    /// Fetch the chapter bytes through the router and install the source.
    async fn fetch_into_session(
        &self,
        session: &mut PlaybackSession,
        chapter: u32,
    ) -> Result<()> {
        let url = self
            .config
            .audio_url(&session.item().audio_slug, chapter);
        debug!(url = %url, "Requesting chapter audio");

        let response = self.router.handle(HttpRequest::get(&url)).await;

        if !response.is_success() {
            warn!(
                chapter,
                status = response.status,
                offline = response.is_offline_placeholder(),
                "Chapter audio not available"
            );
            return Err(PlayerError::AudioUnavailable { chapter });
        }

        let content_type = response
            .headers
            .get("Content-Type")
            .cloned()
            .unwrap_or_else(|| "audio/mpeg".to_string());

        // The previous handle is revoked inside set_source before the new one
        // is installed.
        session.set_source(AudioHandle::new(response.body, content_type));
        session.set_current_chapter(chapter);

        info!(chapter, "Chapter loaded");
        if let Some(bus) = &self.event_bus {
            bus.emit(CoreEvent::Playback(PlaybackEvent::ChapterLoaded {
                item_id: session.item().id.to_string(),
                chapter,
            }))
            .ok();
        }
        Ok(())
    }

    fn emit_unlocked(&self, session: &PlaybackSession, chapter: u32, via_membership: bool) {
        if let Some(bus) = &self.event_bus {
            bus.emit(CoreEvent::Playback(PlaybackEvent::ChapterUnlocked {
                item_id: session.item().id.to_string(),
                chapter,
                via_membership,
            }))
            .ok();
        }
    }
}
