//! # Player Error Types

use thiserror::Error;

/// Errors surfaced by the chapter loader and transport.
#[derive(Error, Debug)]
pub enum PlayerError {
    /// Requested chapter index is outside `1..=total_chapters`.
    ///
    /// A programmer/UI error, never shown to the user as a fault.
    #[error("Chapter {chapter} out of range (1..={total})")]
    OutOfRange { chapter: u32, total: u32 },

    /// The user declined the unlock confirmation. A normal abort, not a fault.
    #[error("Unlock cancelled")]
    UserCancelled,

    /// Balance too low for the unlock cost. Recoverable; the caller surfaces
    /// an upsell action.
    #[error("Insufficient balance: have {balance}, need {required} coins")]
    InsufficientBalance { balance: u64, required: u64 },

    /// The router could not produce the audio bytes. Retryable by re-opening
    /// the chapter.
    #[error("Audio unavailable for chapter {chapter}")]
    AudioUnavailable { chapter: u32 },

    /// The external balance service failed. The chapter stays locked.
    #[error("Debit failed: {0}")]
    DebitFailed(String),

    /// Transport command issued with no catalog item open.
    #[error("No item loaded")]
    NoItemLoaded,

    /// Invalid volume value (must be in range [0.0, 1.0]).
    #[error("Invalid volume: {0} (must be between 0.0 and 1.0)")]
    InvalidVolume(f32),

    /// The playback adapter failed to start; the transport reverts to paused.
    #[error("Playback operation failed: {0}")]
    PlaybackFailed(String),
}

impl PlayerError {
    /// Returns `true` for the normal-abort case the caller should treat as a
    /// no-op rather than a fault.
    pub fn is_user_abort(&self) -> bool {
        matches!(self, PlayerError::UserCancelled)
    }

    /// Returns `true` if the operation can be retried after user action
    /// (top-up, regaining connectivity).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PlayerError::InsufficientBalance { .. } | PlayerError::AudioUnavailable { .. }
        )
    }
}

/// Result type for player operations.
pub type Result<T> = std::result::Result<T, PlayerError>;
