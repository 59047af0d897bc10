use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use super::{config::RateLimit, window::SlidingWindow};

/// Result of an admission check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    /// The request was counted against the caller's window.
    Accepted,
    /// The window is full; the request was not counted.
    Rejected {
        /// Time until the oldest counted request leaves the window.
        retry_after: Duration,
    },
}

impl Admission {
    /// True for [`Admission::Accepted`].
    #[inline]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Admission::Accepted)
    }
}

/// Per-caller sliding-window rate limiter.
///
/// One mutex guards the whole map: the prune-check-append sequence for a key is
/// atomic and never suspends, so concurrent callers can not over-admit.
/// Callers with only expired timestamps stay in the map until [`sweep`](Self::sweep)
/// runs.
///
/// # Example
/// ```
/// use signalvisor::{AdmissionController, RateLimit};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let limiter = AdmissionController::new(RateLimit::per_seconds(2, 60).unwrap());
/// assert!(limiter.allow("alice"));
/// assert!(limiter.allow("alice"));
/// assert!(!limiter.allow("alice"));
/// assert!(limiter.allow("bob"));
/// # }
/// ```
#[derive(Debug)]
pub struct AdmissionController {
    limit: RateLimit,
    windows: Mutex<HashMap<String, SlidingWindow>>,
}

impl AdmissionController {
    /// Creates a controller enforcing `limit` for every caller.
    pub fn new(limit: RateLimit) -> Self {
        Self {
            limit,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the enforced limit.
    pub fn limit(&self) -> RateLimit {
        self.limit
    }

    /// Accepts (and records) or rejects one request from `caller`.
    pub fn allow(&self, caller: &str) -> bool {
        self.check(caller).is_accepted()
    }

    /// Like [`allow`](Self::allow), but reports how long a rejected caller should wait.
    pub fn check(&self, caller: &str) -> Admission {
        let now = Instant::now();
        let per = self.limit.per();
        let mut windows = self.lock();

        let window = windows.entry(caller.to_string()).or_default();

        if window.try_admit(now, per, self.limit.max_requests()) {
            tracing::trace!(caller, in_window = window.len(), "request admitted");
            Admission::Accepted
        } else {
            let retry_after = window.retry_after(now, per);
            tracing::debug!(caller, ?retry_after, "request rate limited");
            Admission::Rejected { retry_after }
        }
    }

    /// Remaining budget of `caller` in the current window, without recording a request.
    pub fn remaining(&self, caller: &str) -> u32 {
        let now = Instant::now();
        let mut windows = self.lock();
        let used = windows.get_mut(caller).map_or(0, |w| {
            w.prune(now, self.limit.per());
            w.len()
        });
        self.limit.max_requests().saturating_sub(used as u32)
    }

    /// Time until `caller` may be admitted again; `None` while budget is left.
    pub fn retry_after(&self, caller: &str) -> Option<Duration> {
        let now = Instant::now();
        let per = self.limit.per();
        let mut windows = self.lock();
        let window = windows.get_mut(caller)?;
        window.prune(now, per);
        (window.len() >= self.limit.max_requests() as usize)
            .then(|| window.retry_after(now, per))
    }

    /// Drops callers whose windows are empty after pruning. Returns how many were dropped.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let per = self.limit.per();
        let mut windows = self.lock();
        let before = windows.len();
        windows.retain(|_, w| {
            w.prune(now, per);
            !w.is_empty()
        });
        before - windows.len()
    }

    /// Number of callers currently holding a window entry.
    pub fn tracked_keys(&self) -> usize {
        self.lock().len()
    }

    /// Runs [`sweep`](Self::sweep) every `interval` until `token` is cancelled.
    pub fn spawn_sweeper(
        self: &Arc<Self>,
        interval: Duration,
        token: CancellationToken,
    ) -> JoinHandle<()> {
        let me = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let evicted = me.sweep();
                        if evicted > 0 {
                            tracing::debug!(evicted, "evicted idle rate windows");
                        }
                    }
                }
            }
        })
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SlidingWindow>> {
        self.windows.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max: u32, secs: u64) -> AdmissionController {
        AdmissionController::new(RateLimit::per_seconds(max, secs).unwrap())
    }

    #[tokio::test(start_paused = true)]
    async fn test_three_per_minute_then_recovers() {
        let l = limiter(3, 60);

        assert!(l.allow("x"));
        assert!(l.allow("x"));
        assert!(l.allow("x"));
        assert!(!l.allow("x"));

        time::advance(Duration::from_secs(60)).await;
        assert!(l.allow("x"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_slides_per_request() {
        let l = limiter(2, 10);

        assert!(l.allow("x"));
        time::advance(Duration::from_secs(6)).await;
        assert!(l.allow("x"));
        time::advance(Duration::from_secs(3)).await;
        assert!(!l.allow("x"));

        // first request expires at t=10, second at t=16
        time::advance(Duration::from_secs(1)).await;
        assert!(l.allow("x"));
        assert!(!l.allow("x"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejection_reports_retry_after() {
        let l = limiter(1, 30);
        assert_eq!(l.check("x"), Admission::Accepted);

        time::advance(Duration::from_secs(12)).await;
        assert_eq!(
            l.check("x"),
            Admission::Rejected {
                retry_after: Duration::from_secs(18)
            }
        );
        assert_eq!(l.retry_after("x"), Some(Duration::from_secs(18)));
        assert_eq!(l.retry_after("unknown"), None);

        time::advance(Duration::from_secs(18)).await;
        assert_eq!(l.retry_after("x"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_callers_are_independent() {
        let l = limiter(1, 60);
        assert!(l.allow("a"));
        assert!(!l.allow("a"));
        assert!(l.allow("b"));
        assert_eq!(l.remaining("a"), 0);
        assert_eq!(l.remaining("c"), 1);
        assert_eq!(l.tracked_keys(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_evicts_only_idle_callers() {
        let l = limiter(5, 60);
        l.allow("old");
        time::advance(Duration::from_secs(30)).await;
        l.allow("fresh");
        time::advance(Duration::from_secs(31)).await;

        assert_eq!(l.sweep(), 1);
        assert_eq!(l.tracked_keys(), 1);
        assert_eq!(l.remaining("fresh"), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_runs_until_cancelled() {
        let l = Arc::new(limiter(5, 10));
        l.allow("idle");

        let token = CancellationToken::new();
        let sweeper = l.spawn_sweeper(Duration::from_secs(15), token.clone());

        time::sleep(Duration::from_secs(16)).await;
        assert_eq!(l.tracked_keys(), 0);

        token.cancel();
        sweeper.await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_never_over_admit() {
        const MAX: u32 = 10;
        const EXTRA: usize = 40;

        let l = Arc::new(limiter(MAX, 3600));
        let barrier = Arc::new(tokio::sync::Barrier::new(MAX as usize + EXTRA));

        let tasks: Vec<_> = (0..MAX as usize + EXTRA)
            .map(|_| {
                let l = Arc::clone(&l);
                let barrier = Arc::clone(&barrier);
                tokio::spawn(async move {
                    barrier.wait().await;
                    l.allow("hot")
                })
            })
            .collect();

        let mut accepted = 0;
        let mut rejected = 0;
        for t in tasks {
            if t.await.unwrap() {
                accepted += 1;
            } else {
                rejected += 1;
            }
        }
        assert_eq!(accepted, MAX as usize);
        assert_eq!(rejected, EXTRA);
    }
}
