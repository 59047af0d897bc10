//! # Runtime events emitted by the supervisor and its signal loops.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Signal lifecycle**: loop started, signal emitted, emission failed, loop stopped
//! - **Supervision**: replacement of a running loop, panicked loops
//! - **Shutdown**: shutdown requested, all stopped within grace, grace exceeded
//!
//! The [`Event`] struct carries additional metadata such as timestamps, channel key,
//! reasons, emission counters and exit reasons.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use signalvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::SignalFailed)
//!     .with_key("channel-42")
//!     .with_reason("503 service unavailable")
//!     .with_emission(3)
//!     .with_timeout(Duration::from_secs(2));
//!
//! assert_eq!(ev.kind, EventKind::SignalFailed);
//! assert_eq!(ev.key.as_deref(), Some("channel-42"));
//! assert_eq!(ev.reason.as_deref(), Some("503 service unavailable"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::core::LoopExit;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `key`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `key`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    // === Shutdown events ===
    /// Shutdown requested (OS signal observed or explicit call).
    ShutdownRequested,

    /// All loops stopped within the configured grace period.
    AllStoppedWithin,

    /// Grace period exceeded; some loops did not stop in time.
    GraceExceeded,

    // === Signal lifecycle events ===
    /// A signal loop was scheduled for a key.
    ///
    /// Sets:
    /// - `key`: channel key
    /// - `generation`: handle generation
    SignalStarted,

    /// A running loop was cancelled because `trigger` was called again for its key.
    ///
    /// Sets:
    /// - `key`: channel key
    /// - `generation`: generation of the replaced loop
    SignalReplaced,

    /// One signal was emitted toward the channel.
    ///
    /// Sets:
    /// - `key`: channel key
    /// - `emission`: emission number (1-based, per loop)
    SignalEmitted,

    /// Emission exceeded its per-emission deadline (always followed by `SignalFailed`).
    ///
    /// Sets:
    /// - `key`: channel key
    /// - `emission`: emission number
    /// - `timeout_ms`: configured deadline (ms)
    SignalTimeout,

    /// Emission failed for this cycle.
    ///
    /// Sets:
    /// - `key`: channel key
    /// - `emission`: emission number
    /// - `reason`: failure message
    SignalFailed,

    /// Loop reached a terminal state and released the channel.
    ///
    /// Sets:
    /// - `key`: channel key
    /// - `generation`: handle generation
    /// - `exit`: why the loop ended
    /// - `reason`: failure message (only for `LoopExit::Failed`)
    SignalStopped,

    /// Loop task panicked; observed while joining it.
    ///
    /// Sets:
    /// - `key`: channel key
    /// - `reason`: join error
    SignalPanicked,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,

    /// Emission deadline in milliseconds (compact).
    pub timeout_ms: Option<u32>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Emission count within one loop (starting from 1).
    pub emission: Option<u32>,
    /// Generation of the loop handle, if applicable.
    pub generation: Option<u64>,
    /// Channel key (or subscriber name for subscriber events).
    pub key: Option<Arc<str>>,
    /// Terminal state of a loop (only for `SignalStopped`).
    pub exit: Option<LoopExit>,
    /// Event classification.
    pub kind: EventKind,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            kind,
            at: SystemTime::now(),
            timeout_ms: None,
            reason: None,
            emission: None,
            generation: None,
            key: None,
            exit: None,
        }
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a channel key.
    #[inline]
    pub fn with_key(mut self, key: impl Into<Arc<str>>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Attaches a deadline (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.timeout_ms = Some(ms);
        self
    }

    /// Attaches an emission count.
    #[inline]
    pub fn with_emission(mut self, n: u32) -> Self {
        self.emission = Some(n);
        self
    }

    /// Attaches a handle generation.
    #[inline]
    pub fn with_generation(mut self, generation: u64) -> Self {
        self.generation = Some(generation);
        self
    }

    /// Attaches a loop exit reason.
    #[inline]
    pub fn with_exit(mut self, exit: LoopExit) -> Self {
        self.exit = Some(exit);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_key(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_key(subscriber)
            .with_reason(info)
    }
}
