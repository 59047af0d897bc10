//! # SignalLoop: bounded, cancellable signaling for one channel.
//!
//! Drives one [`Channel`] with:
//! - a total time budget ([`LoopParams::max_time`]),
//! - a fixed interval between emissions ([`LoopParams::refresh_time`]),
//! - optional per-emission deadline,
//! - cooperative cancellation via [`CancellationToken`].
//!
//! ## Architecture
//! ```text
//! Supervisor::trigger() ──► SignalLoop::run()
//!
//! begin_signal()
//! while remaining > 0 {
//!   ├─► cancelled?          → Cancelled
//!   ├─► emit_once()
//!   │     ├─ Ok             → reset failure streak
//!   │     ├─ Canceled       → Cancelled
//!   │     ├─ retryable, streak < tolerated → continue
//!   │     └─ otherwise      → Failed
//!   ├─► sleep(refresh_time) (cancellable)
//!   └─► remaining -= refresh_time
//! }
//! end_signal()              (every exit path once begin was entered)
//! ```
//!
//! ## Rules
//! - One loop emits **sequentially** (never two emissions in flight)
//! - Cancellation is observed at least once per cycle (emission and sleep are both cancellable)
//! - The loop never removes itself from the registry; the supervisor's finalizer does

use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use tokio::{select, time};
use tokio_util::sync::CancellationToken;

use crate::{
    channels::ChannelRef,
    core::{config::SupervisorConfig, emitter::emit_once},
    error::{SignalError, panic_message},
    events::{Bus, Event, EventKind},
};

/// Terminal state of a signal loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// The time budget was consumed.
    Exhausted,
    /// The loop was cancelled (`stop`, replacement or shutdown).
    Cancelled,
    /// An emission error ended the loop.
    Failed,
}

/// What a finished loop reports to its finalizer.
#[derive(Debug)]
pub struct LoopReport {
    /// Why the loop ended.
    pub exit: LoopExit,
    /// Number of successful emissions.
    pub emissions: u32,
    /// The error that ended the loop (only for [`LoopExit::Failed`]).
    pub error: Option<SignalError>,
}

impl LoopReport {
    fn new(exit: LoopExit, emissions: u32) -> Self {
        Self {
            exit,
            emissions,
            error: None,
        }
    }

    pub(crate) fn failed(emissions: u32, error: SignalError) -> Self {
        Self {
            exit: LoopExit::Failed,
            emissions,
            error: Some(error),
        }
    }
}

/// Timing parameters of one loop.
///
/// Extracted from [`SupervisorConfig`] by the supervisor when spawning loops.
#[derive(Clone, Copy, Debug)]
pub struct LoopParams {
    /// Total signaling budget.
    pub max_time: Duration,
    /// Interval between emissions.
    pub refresh_time: Duration,
    /// Optional per-emission deadline.
    pub emit_timeout: Option<Duration>,
    /// Consecutive retryable failures tolerated.
    pub tolerated_failures: u32,
}

impl From<&SupervisorConfig> for LoopParams {
    fn from(cfg: &SupervisorConfig) -> Self {
        Self {
            max_time: cfg.max_time,
            refresh_time: cfg.refresh_time,
            emit_timeout: cfg.emit_deadline(),
            tolerated_failures: cfg.tolerated_failures,
        }
    }
}

/// Emits signals toward one channel until its budget runs out, it is
/// cancelled, or emission fails.
pub struct SignalLoop {
    channel: ChannelRef,
    params: LoopParams,
    bus: Bus,
}

impl SignalLoop {
    /// Creates a new loop.
    pub fn new(channel: ChannelRef, params: LoopParams, bus: Bus) -> Self {
        Self {
            channel,
            params,
            bus,
        }
    }

    /// Runs the loop until a terminal state.
    ///
    /// `end_signal` is called on every exit path once `begin_signal` was entered,
    /// including cancellation during `begin_signal` and a panicking emission.
    pub async fn run(self, token: CancellationToken) -> LoopReport {
        if token.is_cancelled() {
            return LoopReport::new(LoopExit::Cancelled, 0);
        }

        let begin = AssertUnwindSafe(self.channel.begin_signal()).catch_unwind();
        let begun = select! {
            r = begin => Some(r),
            _ = token.cancelled() => None,
        };
        let begun = match begun {
            None => {
                self.channel.end_signal().await;
                return LoopReport::new(LoopExit::Cancelled, 0);
            }
            Some(Ok(r)) => r,
            Some(Err(payload)) => Err(SignalError::Panicked {
                info: panic_message(&*payload),
            }),
        };
        if let Err(e) = begun {
            self.bus.publish(
                Event::new(EventKind::SignalFailed)
                    .with_key(self.channel.id())
                    .with_reason(e.to_string()),
            );
            return LoopReport::failed(0, e);
        }

        let mut emissions = 0;
        let driven = AssertUnwindSafe(self.drive(&token, &mut emissions))
            .catch_unwind()
            .await;
        let report = match driven {
            Ok(report) => report,
            Err(payload) => {
                let info = panic_message(&*payload);
                tracing::error!(key = self.channel.id(), %info, "channel panicked while emitting");
                self.bus.publish(
                    Event::new(EventKind::SignalPanicked)
                        .with_key(self.channel.id())
                        .with_reason(info.as_str()),
                );
                LoopReport::failed(emissions, SignalError::Panicked { info })
            }
        };
        self.channel.end_signal().await;
        report
    }

    async fn drive(&self, token: &CancellationToken, emissions: &mut u32) -> LoopReport {
        let refresh = self.params.refresh_time;
        let mut remaining = self.params.max_time;
        let mut cycle: u32 = 0;
        let mut streak: u32 = 0;

        while !remaining.is_zero() {
            if token.is_cancelled() {
                return LoopReport::new(LoopExit::Cancelled, *emissions);
            }

            cycle = cycle.saturating_add(1);
            let res = emit_once(
                self.channel.as_ref(),
                token,
                self.params.emit_timeout,
                cycle,
                &self.bus,
            )
            .await;

            match res {
                Ok(()) => {
                    *emissions += 1;
                    streak = 0;
                }
                Err(SignalError::Canceled) => {
                    return LoopReport::new(LoopExit::Cancelled, *emissions);
                }
                Err(e) if e.is_retryable() && streak < self.params.tolerated_failures => {
                    streak += 1;
                }
                Err(e) => return LoopReport::failed(*emissions, e),
            }

            let sleep = time::sleep(refresh);
            tokio::pin!(sleep);
            select! {
                _ = &mut sleep => {}
                _ = token.cancelled() => {
                    return LoopReport::new(LoopExit::Cancelled, *emissions);
                }
            }
            remaining = remaining.saturating_sub(refresh);
        }

        LoopReport::new(LoopExit::Exhausted, *emissions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::{Channel, EmitFn};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    fn params(max_secs: u64, refresh_secs: u64) -> LoopParams {
        LoopParams {
            max_time: Duration::from_secs(max_secs),
            refresh_time: Duration::from_secs(refresh_secs),
            emit_timeout: None,
            tolerated_failures: 0,
        }
    }

    /// Records emission offsets and scope calls.
    struct Indicator {
        start: Instant,
        at: Mutex<Vec<Duration>>,
        begun: AtomicU32,
        ended: AtomicU32,
        fail_from: Option<usize>,
    }

    impl Indicator {
        fn new(fail_from: Option<usize>) -> Arc<Self> {
            Arc::new(Self {
                start: Instant::now(),
                at: Mutex::new(Vec::new()),
                begun: AtomicU32::new(0),
                ended: AtomicU32::new(0),
                fail_from,
            })
        }
    }

    #[async_trait]
    impl Channel for Indicator {
        fn id(&self) -> &str {
            "typing"
        }

        async fn begin_signal(&self) -> Result<(), SignalError> {
            self.begun.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn emit_signal(&self) -> Result<(), SignalError> {
            let mut at = self.at.lock().unwrap();
            if self.fail_from.is_some_and(|n| at.len() >= n) {
                return Err(SignalError::emit("unavailable"));
            }
            at.push(self.start.elapsed());
            Ok(())
        }

        async fn end_signal(&self) {
            self.ended.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_twelve_refresh_five_emits_three_times() {
        let indicator = Indicator::new(None);
        let lp = SignalLoop::new(indicator.clone(), params(12, 5), Bus::new(16));

        let start = Instant::now();
        let report = lp.run(CancellationToken::new()).await;

        assert_eq!(report.exit, LoopExit::Exhausted);
        assert_eq!(report.emissions, 3);
        assert_eq!(
            *indicator.at.lock().unwrap(),
            vec![
                Duration::ZERO,
                Duration::from_secs(5),
                Duration::from_secs(10)
            ]
        );
        assert!(start.elapsed() >= Duration::from_secs(12));
        assert_eq!(indicator.begun.load(Ordering::SeqCst), 1);
        assert_eq!(indicator.ended.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_observed_within_one_refresh() {
        let indicator = Indicator::new(None);
        let lp = SignalLoop::new(indicator.clone(), params(600, 5), Bus::new(16));
        let token = CancellationToken::new();

        let handle = tokio::spawn(lp.run(token.clone()));
        time::sleep(Duration::from_secs(7)).await;
        let cancelled_at = Instant::now();
        token.cancel();

        let report = handle.await.unwrap();
        assert_eq!(report.exit, LoopExit::Cancelled);
        assert!(cancelled_at.elapsed() <= Duration::from_secs(5));
        assert_eq!(report.emissions, 2);
        assert_eq!(indicator.ended.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_emission_error_terminates_and_ends_scope() {
        let indicator = Indicator::new(Some(1));
        let lp = SignalLoop::new(indicator.clone(), params(60, 5), Bus::new(16));

        let report = lp.run(CancellationToken::new()).await;

        assert_eq!(report.exit, LoopExit::Failed);
        assert_eq!(report.emissions, 1);
        assert!(matches!(report.error, Some(SignalError::Emit { .. })));
        assert_eq!(indicator.ended.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retryable_failures_within_tolerance_keep_running() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let ch = EmitFn::arc("flaky", move || {
            let n = c.fetch_add(1, Ordering::SeqCst);
            async move {
                if n % 2 == 1 {
                    Err(SignalError::emit("blip"))
                } else {
                    Ok(())
                }
            }
        });
        let lp = SignalLoop::new(
            ch,
            LoopParams {
                tolerated_failures: 1,
                ..params(20, 5)
            },
            Bus::new(16),
        );

        let report = lp.run(CancellationToken::new()).await;
        assert_eq!(report.exit, LoopExit::Exhausted);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(report.emissions, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_error_ignores_tolerance() {
        let ch = EmitFn::arc("gone", || async { Err(SignalError::fatal("unknown channel")) });
        let lp = SignalLoop::new(
            ch,
            LoopParams {
                tolerated_failures: 10,
                ..params(20, 5)
            },
            Bus::new(16),
        );

        let report = lp.run(CancellationToken::new()).await;
        assert_eq!(report.exit, LoopExit::Failed);
        assert!(matches!(report.error, Some(SignalError::Fatal { .. })));
    }

    #[tokio::test]
    async fn test_pre_cancelled_loop_never_begins() {
        let indicator = Indicator::new(None);
        let lp = SignalLoop::new(indicator.clone(), params(10, 5), Bus::new(16));
        let token = CancellationToken::new();
        token.cancel();

        let report = lp.run(token).await;
        assert_eq!(report.exit, LoopExit::Cancelled);
        assert_eq!(indicator.begun.load(Ordering::SeqCst), 0);
        assert_eq!(indicator.ended.load(Ordering::SeqCst), 0);
    }

    /// Scope callbacks that take time, plus an emission that blows up on demand.
    struct Sluggish {
        begin_delay: Duration,
        panic_on: Option<u32>,
        calls: AtomicU32,
        ended: AtomicU32,
    }

    impl Sluggish {
        fn new(begin_delay: Duration, panic_on: Option<u32>) -> Arc<Self> {
            Arc::new(Self {
                begin_delay,
                panic_on,
                calls: AtomicU32::new(0),
                ended: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl Channel for Sluggish {
        fn id(&self) -> &str {
            "sluggish"
        }

        async fn begin_signal(&self) -> Result<(), SignalError> {
            time::sleep(self.begin_delay).await;
            Ok(())
        }

        async fn emit_signal(&self) -> Result<(), SignalError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.panic_on == Some(n) {
                panic!("kaboom at emission {n}");
            }
            Ok(())
        }

        async fn end_signal(&self) {
            self.ended.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_begin_still_ends_scope() {
        let ch = Sluggish::new(Duration::from_secs(2), None);
        let lp = SignalLoop::new(ch.clone(), params(60, 5), Bus::new(16));
        let token = CancellationToken::new();

        let handle = tokio::spawn(lp.run(token.clone()));
        time::sleep(Duration::from_secs(1)).await;
        token.cancel();

        let report = handle.await.unwrap();
        assert_eq!(report.exit, LoopExit::Cancelled);
        assert_eq!(report.emissions, 0);
        assert_eq!(ch.calls.load(Ordering::SeqCst), 0);
        assert_eq!(ch.ended.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_emission_fails_and_ends_scope() {
        let ch = Sluggish::new(Duration::ZERO, Some(2));
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let lp = SignalLoop::new(ch.clone(), params(60, 5), bus);

        let report = lp.run(CancellationToken::new()).await;

        assert_eq!(report.exit, LoopExit::Failed);
        assert_eq!(report.emissions, 1);
        match &report.error {
            Some(SignalError::Panicked { info }) => assert!(info.contains("kaboom at emission 2")),
            other => panic!("expected Panicked, got {other:?}"),
        }
        assert_eq!(ch.ended.load(Ordering::SeqCst), 1);

        let mut kinds = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            kinds.push(ev.kind);
        }
        assert_eq!(kinds, vec![EventKind::SignalEmitted, EventKind::SignalPanicked]);
    }
}
