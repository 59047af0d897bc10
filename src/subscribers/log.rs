//! # LogWriter: renders runtime events through `tracing`
//!
//! A minimal subscriber that turns incoming [`Event`]s into structured
//! `tracing` records. Install any `tracing` subscriber in the host application
//! to see them.
//!
//! ## Example output (with `tracing-subscriber` fmt layer)
//! ```text
//! INFO  signal started key="chan-1" generation=7
//! DEBUG signal emitted key="chan-1" emission=1
//! WARN  signal failed key="chan-1" emission=2 reason="503"
//! INFO  signal stopped key="chan-1" generation=7 exit=Exhausted
//! INFO  shutdown requested
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let key = e.key.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("-");

        match e.kind {
            EventKind::SignalStarted => {
                tracing::info!(key, generation = ?e.generation, "signal started");
            }
            EventKind::SignalReplaced => {
                tracing::info!(key, generation = ?e.generation, "signal replaced");
            }
            EventKind::SignalEmitted => {
                tracing::debug!(key, emission = ?e.emission, "signal emitted");
            }
            EventKind::SignalTimeout => {
                tracing::warn!(key, emission = ?e.emission, timeout_ms = ?e.timeout_ms, "signal timeout");
            }
            EventKind::SignalFailed => {
                tracing::warn!(key, emission = ?e.emission, reason, "signal failed");
            }
            EventKind::SignalStopped => {
                tracing::info!(key, generation = ?e.generation, exit = ?e.exit, "signal stopped");
            }
            EventKind::SignalPanicked => {
                tracing::error!(key, reason, "signal loop panicked");
            }
            EventKind::ShutdownRequested => {
                tracing::info!("shutdown requested");
            }
            EventKind::AllStoppedWithin => {
                tracing::info!("all signal loops stopped within grace");
            }
            EventKind::GraceExceeded => {
                tracing::warn!("shutdown grace exceeded");
            }
            EventKind::SubscriberOverflow => {
                tracing::warn!(subscriber = key, reason, "subscriber overflow");
            }
            EventKind::SubscriberPanicked => {
                tracing::error!(subscriber = key, reason, "subscriber panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
