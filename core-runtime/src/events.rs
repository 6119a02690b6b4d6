//! # Event Bus System
//!
//! Provides an event-driven architecture for the Audiobook Platform Core using
//! `tokio::sync::broadcast`. This module enables decoupled communication between
//! core modules through typed events.
//!
//! ## Overview
//!
//! The event bus system consists of:
//! - **Event Types**: Strongly-typed enum hierarchies for different domains
//! - **EventBus**: Central broadcast channel for publishing events
//! - **EventStream**: Wrapper for consuming events with filtering
//! - **Subscription Management**: Multiple subscribers can listen independently
//!
//! ## Usage
//!
//! ### Creating an Event Bus
//!
//! ```rust
//! use core_runtime::events::EventBus;
//!
//! let event_bus = EventBus::new(100); // Buffer size of 100 events
//! ```
//!
//! ### Publishing Events
//!
//! ```rust
//! use core_runtime::events::{EventBus, CoreEvent, CacheEvent};
//!
//! # let event_bus = EventBus::new(100);
//! let event = CoreEvent::Cache(CacheEvent::Stored {
//!     cache: "audio-v1".to_string(),
//!     key: "GET https://cdn.example.com/slug/chapter-1.mp3".to_string(),
//!     size_bytes: 1024,
//! });
//!
//! event_bus.emit(event).ok();
//! ```
//!
//! ### Subscribing to Events
//!
//! ```rust
//! use core_runtime::events::{EventBus, CoreEvent};
//! use tokio::sync::broadcast::error::RecvError;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut stream = event_bus.subscribe();
//!
//! tokio::spawn(async move {
//!     loop {
//!         match stream.recv().await {
//!             Ok(event) => println!("Received: {:?}", event),
//!             Err(RecvError::Lagged(n)) => {
//!                 eprintln!("Missed {} events", n);
//!             }
//!             Err(RecvError::Closed) => break,
//!         }
//!     }
//! });
//! # }
//! ```
//!
//! ## Error Handling
//!
//! The event bus uses `tokio::sync::broadcast`, which can produce two types of
//! errors:
//!
//! - **`RecvError::Lagged(n)`**: Subscriber was too slow and missed `n` events.
//!   This is non-fatal; the subscriber can continue receiving new events.
//! - **`RecvError::Closed`**: All senders have been dropped. This indicates shutdown.
//!
//! Subscribers should handle `Lagged` gracefully and treat `Closed` as a signal
//! to exit.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

// Re-export commonly used types
pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// This value balances memory usage with the ability to handle bursts of events.
/// Subscribers that can't keep up will receive `RecvError::Lagged`.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
///
/// This is the main event type published and received through the event bus.
/// It wraps domain-specific event types for different modules.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Offline cache events
    Cache(CacheEvent),
    /// Router lifecycle events
    Lifecycle(LifecycleEvent),
    /// Entitlement and balance events
    Entitlement(EntitlementEvent),
    /// Playback events
    Playback(PlaybackEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Cache(e) => e.description(),
            CoreEvent::Lifecycle(e) => e.description(),
            CoreEvent::Entitlement(e) => e.description(),
            CoreEvent::Playback(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Playback(PlaybackEvent::Error { .. }) => EventSeverity::Error,
            CoreEvent::Entitlement(EntitlementEvent::DebitDeclined { .. }) => EventSeverity::Warning,
            CoreEvent::Lifecycle(_) => EventSeverity::Info,
            CoreEvent::Entitlement(EntitlementEvent::Debited { .. }) => EventSeverity::Info,
            CoreEvent::Cache(CacheEvent::Evicted { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Debug-level events (verbose)
    Debug,
    /// Informational events
    Info,
    /// Warning events
    Warning,
    /// Error events
    Error,
}

// ============================================================================
// Cache Events
// ============================================================================

/// Events emitted by the offline cache router and its stores.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum CacheEvent {
    /// A response was written to a named cache.
    Stored {
        /// Versioned cache name.
        cache: String,
        /// Request key of the stored entry.
        key: String,
        /// Body size in bytes.
        size_bytes: u64,
    },
    /// The eviction policy removed entries from a cache.
    Evicted {
        /// Versioned cache name.
        cache: String,
        /// Number of entries removed, oldest first.
        keys_removed: usize,
    },
    /// A request was answered from cache after the network failed.
    ServedOffline {
        /// Request key served from cache.
        key: String,
    },
    /// An entire named cache was cleared.
    Cleared {
        /// Versioned cache name.
        cache: String,
    },
}

impl CacheEvent {
    fn description(&self) -> &str {
        match self {
            CacheEvent::Stored { .. } => "Response cached",
            CacheEvent::Evicted { .. } => "Cache entries evicted",
            CacheEvent::ServedOffline { .. } => "Served from cache while offline",
            CacheEvent::Cleared { .. } => "Cache cleared",
        }
    }
}

// ============================================================================
// Lifecycle Events
// ============================================================================

/// Events emitted by the router lifecycle manager.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum LifecycleEvent {
    /// A new router version finished installing (static assets pre-warmed).
    Installed {
        /// The cache version tag that was installed.
        version: String,
        /// Number of manifest assets cached successfully.
        assets_cached: usize,
        /// Number of manifest assets that failed to cache.
        assets_failed: usize,
    },
    /// A router version became active and stale caches were removed.
    Activated {
        /// The now-active cache version tag.
        version: String,
        /// Number of stale caches deleted.
        caches_removed: usize,
    },
    /// A waiting version was promoted by an explicit skip-waiting request.
    WaitingSkipped {
        /// The promoted cache version tag.
        version: String,
    },
}

impl LifecycleEvent {
    fn description(&self) -> &str {
        match self {
            LifecycleEvent::Installed { .. } => "Router version installed",
            LifecycleEvent::Activated { .. } => "Router version activated",
            LifecycleEvent::WaitingSkipped { .. } => "Waiting version promoted",
        }
    }
}

// ============================================================================
// Entitlement Events
// ============================================================================

/// Events related to coin balance and membership changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum EntitlementEvent {
    /// Coins were debited from a principal's balance.
    Debited {
        /// The principal whose balance changed.
        principal_id: String,
        /// Amount debited.
        amount: u64,
        /// Balance after the debit.
        balance: u64,
    },
    /// A debit was declined for insufficient balance.
    DebitDeclined {
        /// The principal whose debit was declined.
        principal_id: String,
        /// Amount requested.
        amount: u64,
        /// Current balance.
        balance: u64,
    },
    /// Coins were credited after a successful charge.
    Granted {
        /// The principal whose balance changed.
        principal_id: String,
        /// Amount credited.
        amount: u64,
        /// Balance after the credit.
        balance: u64,
    },
    /// Membership was activated or renewed.
    MembershipActivated {
        /// The principal whose membership changed.
        principal_id: String,
        /// Expiry timestamp (Unix epoch seconds).
        expires_at: i64,
    },
    /// Membership lapsed at read time.
    MembershipExpired {
        /// The principal whose membership lapsed.
        principal_id: String,
    },
}

impl EntitlementEvent {
    fn description(&self) -> &str {
        match self {
            EntitlementEvent::Debited { .. } => "Coins debited",
            EntitlementEvent::DebitDeclined { .. } => "Debit declined",
            EntitlementEvent::Granted { .. } => "Coins granted",
            EntitlementEvent::MembershipActivated { .. } => "Membership activated",
            EntitlementEvent::MembershipExpired { .. } => "Membership expired",
        }
    }
}

// ============================================================================
// Playback Events
// ============================================================================

/// Events related to audiobook playback.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// A chapter's audio was loaded into the player.
    ChapterLoaded {
        /// The catalog item being played.
        item_id: String,
        /// Chapter index (1-based).
        chapter: u32,
    },
    /// A chapter was unlocked for the session.
    ChapterUnlocked {
        /// The catalog item being played.
        item_id: String,
        /// Chapter index (1-based).
        chapter: u32,
        /// Whether the unlock was covered by membership (no debit).
        via_membership: bool,
    },
    /// Playback started.
    Started {
        /// The catalog item being played.
        item_id: String,
        /// Chapter index (1-based).
        chapter: u32,
    },
    /// Playback paused.
    Paused {
        /// The catalog item being played.
        item_id: String,
        /// Chapter index (1-based).
        chapter: u32,
        /// Position when paused (milliseconds).
        position_ms: u64,
    },
    /// A chapter finished playing naturally.
    Ended {
        /// The catalog item being played.
        item_id: String,
        /// Chapter index (1-based).
        chapter: u32,
    },
    /// Playback error occurred.
    Error {
        /// The catalog item if available.
        item_id: Option<String>,
        /// Human-readable error message.
        message: String,
        /// Whether playback can be retried.
        recoverable: bool,
    },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::ChapterLoaded { .. } => "Chapter loaded",
            PlaybackEvent::ChapterUnlocked { .. } => "Chapter unlocked",
            PlaybackEvent::Started { .. } => "Playback started",
            PlaybackEvent::Paused { .. } => "Playback paused",
            PlaybackEvent::Ended { .. } => "Chapter completed",
            PlaybackEvent::Error { .. } => "Playback error",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Uses `tokio::sync::broadcast` internally, which provides:
/// - Multiple producers (clone the `EventBus`)
/// - Multiple consumers (each `subscribe()` creates a new receiver)
/// - Non-blocking sends (events are cloned for each subscriber)
/// - Lagging detection (slow subscribers get `RecvError::Lagged`)
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of events to buffer per subscriber.
    ///   When a subscriber falls behind by more than this amount, it will
    ///   receive a `RecvError::Lagged` error.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Creates a new event bus with the default buffer size.
    #[allow(clippy::should_implement_trait)]
    pub fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event.
    /// Returns an error if there are no active subscribers.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber to receive events.
    ///
    /// Each call creates an independent receiver that will receive all future
    /// events. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

/// Type alias for event filter functions.
type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with additional filtering capabilities.
///
/// This provides a more ergonomic API for consuming events with optional
/// filtering by event type or severity.
///
/// # Example
///
/// ```rust
/// use core_runtime::events::{EventBus, EventStream, CoreEvent};
///
/// # #[tokio::main]
/// # async fn main() {
/// let event_bus = EventBus::new(100);
/// let stream = EventStream::new(event_bus.subscribe());
///
/// // Filter for playback events only
/// let mut playback_stream = stream.filter(|event| {
///     matches!(event, CoreEvent::Playback(_))
/// });
/// # }
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    /// Creates a new event stream from a receiver.
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Adds a filter function to this stream.
    ///
    /// Only events that match the filter will be returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Receives the next event that passes the filter (if any).
    ///
    /// This will skip events that don't match the filter and return the next
    /// matching event.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;

            // If no filter, return immediately
            let Some(filter) = &self.filter else {
                return Ok(event);
            };

            // Apply filter
            if filter(&event) {
                return Ok(event);
            }

            // Event didn't match filter, continue to next event
        }
    }

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` if no events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    // If no filter, return immediately
                    let Some(filter) = &self.filter else {
                        return Some(Ok(event));
                    };

                    // Apply filter
                    if filter(&event) {
                        return Some(Ok(event));
                    }

                    // Event didn't match filter, continue
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
