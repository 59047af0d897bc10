//! # Sliding window of request timestamps for one caller.
//!
//! ## Rules
//! - Timestamps are kept in arrival order (monotonic clock, so also sorted)
//! - A timestamp is **active** while `now - t < per`; exactly `per` old is expired
//! - Pruning only ever pops from the front

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

/// Arrival times of the accepted requests still inside the window.
#[derive(Debug, Default)]
pub(crate) struct SlidingWindow {
    hits: VecDeque<Instant>,
}

impl SlidingWindow {
    /// Drops every timestamp that is `per` or more older than `now`.
    pub fn prune(&mut self, now: Instant, per: Duration) {
        while let Some(&oldest) = self.hits.front() {
            if now.saturating_duration_since(oldest) < per {
                break;
            }
            self.hits.pop_front();
        }
    }

    /// Prune, then accept `now` if fewer than `max` timestamps remain.
    pub fn try_admit(&mut self, now: Instant, per: Duration, max: u32) -> bool {
        self.prune(now, per);
        if self.hits.len() >= max as usize {
            return false;
        }
        self.hits.push_back(now);
        true
    }

    /// Time until the oldest active timestamp expires, assuming the window is pruned.
    pub fn retry_after(&self, now: Instant, per: Duration) -> Duration {
        self.hits
            .front()
            .map(|&oldest| per.saturating_sub(now.saturating_duration_since(oldest)))
            .unwrap_or(Duration::ZERO)
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}
