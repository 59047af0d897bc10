//! # Supervisor: one bounded signal loop per key.
//!
//! The [`Supervisor`] owns the event bus, the [`Registry`] of active loops and the
//! runtime cancellation token. It starts, replaces, stops and cleans up
//! [`SignalLoop`]s keyed by channel id.
//!
//! ## Key responsibilities
//! - `trigger`: start a loop for a channel, replacing any running loop for the same key
//! - `stop`: cancel a loop and **await** its termination (indicator retracted on return)
//! - `cleanup` / `shutdown`: stop everything, optionally bounded by [`SupervisorConfig::grace`]
//! - contain loop failures: they are published and logged, never returned to callers
//!
//! ## High-level architecture
//! ```text
//! trigger(channel)
//!   └─► Registry.replace(key) ─── under write lock ───────────────────────────┐
//!         ├─ prev handle? → prev.cancel() ; move prev.join into the new task   │
//!         ├─ publish SignalReplaced / SignalStarted                           │
//!         └─ spawn:                                                           │
//!              await prev.join        (no overlap between old and new loop)   │
//!              SignalLoop::run(token)                                         │
//!              Finalizer: Registry.remove_if_current(key, generation)         │
//!                         publish SignalStopped                               │
//!   ◄─────────────────────────────────────────────────────────────────────────┘
//!
//! stop(key)
//!   └─► Registry.take(key) → cancel → join (errors swallowed, panics published)
//!
//! shutdown()
//!   └─► publish ShutdownRequested → runtime_token.cancel() → drain → join within grace
//!         ├─ all joined    → publish AllStoppedWithin
//!         └─ grace elapsed → publish GraceExceeded, RuntimeError::GraceExceeded { stuck }
//! ```
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use signalvisor::{EmitFn, SignalError, Supervisor, SupervisorConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = SupervisorConfig {
//!         max_time: Duration::from_millis(30),
//!         refresh_time: Duration::from_millis(10),
//!         ..SupervisorConfig::default()
//!     };
//!     let sup = Supervisor::builder(cfg).build()?;
//!
//!     let chan = EmitFn::arc("general", || async { Ok::<_, SignalError>(()) });
//!     sup.trigger(chan).await;
//!     assert!(sup.is_active("general").await);
//!
//!     sup.stop("general").await;
//!     assert!(!sup.is_active("general").await);
//!     Ok(())
//! }
//! ```

use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::{FutureExt, StreamExt, future::join_all, stream::FuturesUnordered};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
    channels::ChannelRef,
    core::{
        builder::SupervisorBuilder,
        config::SupervisorConfig,
        registry::{Handle, Registry},
        shutdown,
        signal_loop::{LoopExit, LoopParams, LoopReport, SignalLoop},
    },
    error::{RuntimeError, SignalError, panic_message},
    events::{Bus, Event, EventKind},
};

/// Supervises at most one signal loop per key.
pub struct Supervisor {
    cfg: SupervisorConfig,
    bus: Bus,
    registry: Arc<Registry>,
    runtime_token: CancellationToken,
    listener_token: CancellationToken,
}

impl Supervisor {
    /// Returns a builder for a new supervisor.
    pub fn builder(cfg: SupervisorConfig) -> SupervisorBuilder {
        SupervisorBuilder::new(cfg)
    }

    pub(crate) fn new_internal(
        cfg: SupervisorConfig,
        bus: Bus,
        runtime_token: CancellationToken,
        listener_token: CancellationToken,
    ) -> Self {
        Self {
            cfg,
            bus,
            registry: Arc::new(Registry::new()),
            runtime_token,
            listener_token,
        }
    }

    /// Returns the configuration this supervisor was built with.
    pub fn config(&self) -> &SupervisorConfig {
        &self.cfg
    }

    /// Subscribes to runtime events published after this call.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Starts a signal loop for `channel`, replacing any loop running for its key.
    ///
    /// Does not wait for the loop. A replaced loop is cancelled, and the new loop
    /// emits only after the replaced one has fully terminated.
    pub async fn trigger(&self, channel: ChannelRef) {
        let key = channel.id().to_string();
        let params = LoopParams::from(&self.cfg);

        self.registry
            .replace(&key, |generation, prev| {
                let predecessor = prev.map(|h| {
                    h.cancel.cancel();
                    self.bus.publish(
                        Event::new(EventKind::SignalReplaced)
                            .with_key(key.as_str())
                            .with_generation(h.generation),
                    );
                    h.join
                });
                self.bus.publish(
                    Event::new(EventKind::SignalStarted)
                        .with_key(key.as_str())
                        .with_generation(generation),
                );

                let cancel = self.runtime_token.child_token();
                let token = cancel.clone();
                let signal_loop = SignalLoop::new(channel, params, self.bus.clone());
                let finalizer = Finalizer {
                    registry: Arc::clone(&self.registry),
                    bus: self.bus.clone(),
                    key: key.clone(),
                    generation,
                };

                let join = tokio::spawn(async move {
                    if let Some(prev) = predecessor {
                        finalizer.await_predecessor(prev).await;
                    }
                    let report = match AssertUnwindSafe(signal_loop.run(token))
                        .catch_unwind()
                        .await
                    {
                        Ok(report) => report,
                        Err(payload) => finalizer.panicked(panic_message(&*payload)),
                    };
                    finalizer.finish(&report).await;
                    report
                });

                Handle {
                    generation,
                    join,
                    cancel,
                }
            })
            .await;
    }

    /// Stops the loop for `key` and waits until it has terminated.
    ///
    /// No-op if no loop is active for `key`; calling it twice is safe.
    pub async fn stop(&self, key: &str) {
        let Some(handle) = self.registry.take(key).await else {
            return;
        };
        handle.cancel.cancel();
        join_and_report(&self.bus, key, handle.join).await;
    }

    /// Stops every active loop (snapshot of the current keys).
    pub async fn cleanup(&self) {
        let keys = self.registry.keys().await;
        join_all(keys.iter().map(|k| self.stop(k))).await;
    }

    /// Returns true if a loop is active for `key`.
    pub async fn is_active(&self, key: &str) -> bool {
        self.registry.contains(key).await
    }

    /// Returns sorted list of keys with an active loop.
    pub async fn active_keys(&self) -> Vec<String> {
        self.registry.keys().await
    }

    /// Number of active loops.
    pub async fn len(&self) -> usize {
        self.registry.len().await
    }

    /// Returns true if no loop is active.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Cancels all loops and waits for them within the configured grace period.
    ///
    /// Subscriber workers receive every event published up to the outcome
    /// (`AllStoppedWithin` or `GraceExceeded`) and then exit.
    /// After shutdown every new `trigger` produces an immediately cancelled loop.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        self.bus.publish(Event::new(EventKind::ShutdownRequested));
        self.runtime_token.cancel();

        let handles = self.registry.drain().await;
        let mut stuck: HashSet<String> = handles.iter().map(|(k, _)| k.clone()).collect();
        let mut pending: FuturesUnordered<_> = handles
            .into_iter()
            .map(|(key, h)| async move {
                join_and_report(&self.bus, &key, h.join).await;
                key
            })
            .collect();

        let grace = self.cfg.grace;
        let drained = tokio::time::timeout(grace, async {
            while let Some(key) = pending.next().await {
                stuck.remove(&key);
            }
        })
        .await;

        let res = match drained {
            Ok(()) => {
                self.bus.publish(Event::new(EventKind::AllStoppedWithin));
                Ok(())
            }
            Err(_) => {
                self.bus.publish(Event::new(EventKind::GraceExceeded));
                let mut stuck: Vec<String> = stuck.into_iter().collect();
                stuck.sort_unstable();
                Err(RuntimeError::GraceExceeded { grace, stuck })
            }
        };
        self.listener_token.cancel();
        res
    }

    /// Waits for an OS termination signal, then runs [`shutdown`](Self::shutdown).
    pub async fn run_until_signal(&self) -> Result<(), RuntimeError> {
        shutdown::wait_for_shutdown_signal().await?;
        self.shutdown().await
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        self.listener_token.cancel();
    }
}

/// Await a loop's join; a panic is published as `SignalPanicked`, cancellation is swallowed.
async fn join_and_report(bus: &Bus, key: &str, join: JoinHandle<LoopReport>) {
    if let Err(je) = join.await {
        if je.is_panic() {
            tracing::error!(key, "signal loop panicked");
            bus.publish(
                Event::new(EventKind::SignalPanicked)
                    .with_key(key)
                    .with_reason(je.to_string()),
            );
        }
    }
}

/// Terminal bookkeeping executed by the loop task itself.
struct Finalizer {
    registry: Arc<Registry>,
    bus: Bus,
    key: String,
    generation: u64,
}

impl Finalizer {
    async fn await_predecessor(&self, prev: JoinHandle<LoopReport>) {
        join_and_report(&self.bus, &self.key, prev).await;
    }

    /// Report for a loop that unwound outside its own panic boundary (scope callbacks).
    fn panicked(&self, info: String) -> LoopReport {
        tracing::error!(key = %self.key, %info, "signal loop panicked");
        self.bus.publish(
            Event::new(EventKind::SignalPanicked)
                .with_key(self.key.as_str())
                .with_reason(info.as_str()),
        );
        LoopReport::failed(0, SignalError::Panicked { info })
    }

    async fn finish(&self, report: &LoopReport) {
        self.registry
            .remove_if_current(&self.key, self.generation)
            .await;

        let mut ev = Event::new(EventKind::SignalStopped)
            .with_key(self.key.as_str())
            .with_generation(self.generation)
            .with_exit(report.exit);

        match (&report.exit, &report.error) {
            (LoopExit::Failed, Some(e)) => {
                tracing::warn!(key = %self.key, error = %e, label = e.as_label(), "signal loop failed");
                ev = ev.with_reason(e.to_string());
            }
            (exit, _) => {
                tracing::debug!(key = %self.key, ?exit, emissions = report.emissions, "signal loop finished");
            }
        }
        self.bus.publish(ev);
    }
}
