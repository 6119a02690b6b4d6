//! # Playback Session
//!
//! The explicitly owned per-item session value: current chapter, transport
//! flags, the set of unlocked chapters, and the transient audio source
//! handle. Created when a catalog item is opened, destroyed when the player
//! is closed or another item is opened.

use bytes::Bytes;
use core_catalog::CatalogItem;
use std::collections::BTreeSet;
use tracing::debug;

/// The fixed, ordered playback speed steps; cycling wraps around.
pub const SPEED_STEPS: [f32; 5] = [1.0, 1.25, 1.5, 1.75, 2.0];

/// Playback speed constrained to the fixed step set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackSpeed(f32);

impl PlaybackSpeed {
    pub fn normal() -> Self {
        Self(SPEED_STEPS[0])
    }

    /// Advance to the next step, wrapping after the fastest.
    pub fn cycled(self) -> Self {
        let index = SPEED_STEPS
            .iter()
            .position(|&step| (step - self.0).abs() < f32::EPSILON)
            .unwrap_or(0);
        Self(SPEED_STEPS[(index + 1) % SPEED_STEPS.len()])
    }

    pub fn as_f32(&self) -> f32 {
        self.0
    }
}

impl Default for PlaybackSpeed {
    fn default() -> Self {
        Self::normal()
    }
}

/// Revocable local audio source wrapping fetched audio bytes.
///
/// The platform does not release these automatically; the owner must revoke
/// the handle before replacing it and when the session is destroyed, on every
/// exit path. `Drop` revokes as a backstop.
#[derive(Debug)]
pub struct AudioHandle {
    data: Option<Bytes>,
    content_type: String,
}

impl AudioHandle {
    pub fn new(data: Bytes, content_type: impl Into<String>) -> Self {
        Self {
            data: Some(data),
            content_type: content_type.into(),
        }
    }

    /// The audio bytes, if the handle has not been revoked.
    pub fn bytes(&self) -> Option<&Bytes> {
        self.data.as_ref()
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn is_revoked(&self) -> bool {
        self.data.is_none()
    }

    /// Release the underlying bytes. Idempotent.
    pub fn revoke(&mut self) {
        if self.data.take().is_some() {
            debug!("Audio source handle revoked");
        }
    }
}

impl Drop for AudioHandle {
    fn drop(&mut self) {
        self.revoke();
    }
}

/// Per-item playback session.
///
/// Mutated only by the chapter loader and the transport; all fields reset
/// and the source handle released when the session is destroyed.
#[derive(Debug)]
pub struct PlaybackSession {
    item: CatalogItem,
    current_chapter: u32,
    pub is_playing: bool,
    pub speed: PlaybackSpeed,
    pub volume: f32,
    pub position_ms: u64,
    unlocked: BTreeSet<u32>,
    source: Option<AudioHandle>,
}

impl PlaybackSession {
    /// Open a session on a catalog item. Chapter 1 is always pre-unlocked.
    pub fn new(item: CatalogItem) -> Self {
        let mut unlocked = BTreeSet::new();
        unlocked.insert(1);

        Self {
            item,
            current_chapter: 1,
            is_playing: false,
            speed: PlaybackSpeed::normal(),
            volume: 1.0,
            position_ms: 0,
            unlocked,
            source: None,
        }
    }

    pub fn item(&self) -> &CatalogItem {
        &self.item
    }

    pub fn current_chapter(&self) -> u32 {
        self.current_chapter
    }

    /// Set the current chapter and reset the position.
    pub fn set_current_chapter(&mut self, chapter: u32) {
        self.current_chapter = chapter;
        self.position_ms = 0;
    }

    pub fn is_unlocked(&self, chapter: u32) -> bool {
        self.unlocked.contains(&chapter)
    }

    /// Record a chapter as unlocked for this session.
    pub fn unlock(&mut self, chapter: u32) {
        self.unlocked.insert(chapter);
    }

    pub fn unlocked_chapters(&self) -> impl Iterator<Item = u32> + '_ {
        self.unlocked.iter().copied()
    }

    pub fn source(&self) -> Option<&AudioHandle> {
        self.source.as_ref()
    }

    /// Install a new audio source, revoking the previous handle first.
    pub fn set_source(&mut self, handle: AudioHandle) {
        self.release_source();
        self.source = Some(handle);
    }

    /// Revoke and drop the current audio source, if any.
    pub fn release_source(&mut self) {
        if let Some(mut handle) = self.source.take() {
            handle.revoke();
        }
    }

    /// Destroy the session: release the handle and reset transport fields.
    pub fn close(&mut self) {
        self.release_source();
        self.is_playing = false;
        self.position_ms = 0;
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        self.release_source();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_catalog::BookId;

    fn item(total_chapters: u32) -> CatalogItem {
        CatalogItem {
            id: BookId::new("book-1"),
            title: "The Long Road".to_string(),
            author: "A. Writer".to_string(),
            cover_url: "https://cdn.example.com/cover.jpg".to_string(),
            audio_slug: "the-long-road".to_string(),
            total_chapters,
            plays: 0,
            rating: 4.5,
            created_at: 0,
        }
    }

    #[test]
    fn chapter_one_is_free_at_creation() {
        let session = PlaybackSession::new(item(5));
        assert!(session.is_unlocked(1));
        assert!(!session.is_unlocked(2));
        assert_eq!(session.current_chapter(), 1);
        assert!(!session.is_playing);
    }

    #[test]
    fn speed_cycles_through_fixed_steps_and_wraps() {
        let mut speed = PlaybackSpeed::normal();
        let mut seen = vec![speed.as_f32()];
        for _ in 0..5 {
            speed = speed.cycled();
            seen.push(speed.as_f32());
        }
        assert_eq!(seen, vec![1.0, 1.25, 1.5, 1.75, 2.0, 1.0]);
    }

    #[test]
    fn replacing_source_revokes_previous_handle() {
        let mut session = PlaybackSession::new(item(3));
        session.set_source(AudioHandle::new(Bytes::from_static(b"a"), "audio/mpeg"));
        assert!(session.source().is_some());

        session.set_source(AudioHandle::new(Bytes::from_static(b"b"), "audio/mpeg"));
        let source = session.source().unwrap();
        assert_eq!(source.bytes().map(|b| b.as_ref()), Some(b"b".as_ref()));
    }

    #[test]
    fn close_releases_source_and_resets_transport() {
        let mut session = PlaybackSession::new(item(3));
        session.set_source(AudioHandle::new(Bytes::from_static(b"a"), "audio/mpeg"));
        session.is_playing = true;
        session.position_ms = 1234;

        session.close();
        assert!(session.source().is_none());
        assert!(!session.is_playing);
        assert_eq!(session.position_ms, 0);
    }

    #[test]
    fn revoke_is_idempotent() {
        let mut handle = AudioHandle::new(Bytes::from_static(b"a"), "audio/mpeg");
        assert!(!handle.is_revoked());
        handle.revoke();
        handle.revoke();
        assert!(handle.is_revoked());
        assert!(handle.bytes().is_none());
    }

    #[test]
    fn set_current_chapter_resets_position() {
        let mut session = PlaybackSession::new(item(3));
        session.position_ms = 9000;
        session.set_current_chapter(2);
        assert_eq!(session.current_chapter(), 2);
        assert_eq!(session.position_ms, 0);
    }
}
