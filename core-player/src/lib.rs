//! # Player Core
//!
//! The entitlement-gated content loader and playback state machine sitting
//! directly above the offline cache router.
//!
//! ## Overview
//!
//! - [`ChapterLoader`] - decides whether a requested chapter requires a coin
//!   debit, invokes the external balance service, and fetches the audio bytes
//!   through the router
//! - [`PlayerTransport`] - owns transport state (current chapter, play/pause,
//!   position, speed) and sequencing rules (auto-advance, chapter boundaries)
//! - [`PlaybackSession`] - explicitly owned per-item session value; exactly
//!   one live session per player instance, no ambient globals
//! - [`AudioHandle`] - revocable local audio source, released on every exit
//!   path
//!
//! ## Data Flow
//!
//! The host asks the transport to open chapter N → the loader checks unlock
//! state → if locked, debits the balance externally → on success requests the
//! audio bytes through the router → the transport receives a playable source
//! and transitions to `Loaded`.

pub mod config;
pub mod error;
pub mod loader;
pub mod session;
pub mod traits;
pub mod transport;

pub use config::PlayerConfig;
pub use error::{PlayerError, Result};
pub use loader::ChapterLoader;
pub use session::{AudioHandle, PlaybackSession, PlaybackSpeed};
pub use traits::{AutoConfirm, PlaybackAdapter, UnlockPrompt};
pub use transport::{PlayerTransport, TransportNotice, TransportState};
