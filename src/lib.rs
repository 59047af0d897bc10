//! # signalvisor
//!
//! **Signalvisor** is a small concurrency kernel for chat bots and dashboards.
//!
//! It provides two independent building blocks sharing one discipline
//! (concurrent tasks over an owned, lock-guarded key map):
//! - a per-key [`Supervisor`] of bounded, cancellable signaling loops
//!   (e.g. "is typing" indicators), and
//! - a per-caller sliding-window [`AdmissionController`] composed with
//!   authentication and authorization guards into an [`AccessPipeline`].
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   caller event (message, HTTP request)
//!          │
//!          ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  AccessPipeline::invoke(request, op)                              │
//! │   AUTHENTICATE ─► AUTHORIZE ─► ADMIT ─► EXECUTE                   │
//! │   (IdentityProvider) (AuthorizationProvider) (AdmissionController)│
//! └──────────────────────────────────┬────────────────────────────────┘
//!                                    ▼ op
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Supervisor                                                       │
//! │  - Registry (key → Handle { generation, join, cancel })           │
//! │  - Bus (broadcast lifecycle events)                               │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!   ┌────────────┐     ┌────────────┐     ┌────────────┐
//!   │ SignalLoop │     │ SignalLoop │     │ SignalLoop │
//!   │  (chan A)  │     │  (chan B)  │     │  (chan C)  │
//!   └─────┬──────┘     └─────┬──────┘     └─────┬──────┘
//!         └──── publish ─────┴──► Bus ──► SubscriberSet ──► LogWriter / custom
//! ```
//!
//! ### Loop lifecycle
//! ```text
//! trigger(channel) ──► cancel + await previous loop for the key
//!                  ──► begin_signal
//!                      loop { emit ; sleep(refresh) ; budget -= refresh }
//!                  ──► end_signal
//!                  ──► remove own key (if still current) ; publish SignalStopped
//! ```
//!
//! ## Features
//! | Area              | Description                                              | Key types / traits                          |
//! |-------------------|----------------------------------------------------------|---------------------------------------------|
//! | **Supervision**   | One bounded signal loop per key, awaited cancellation.   | [`Supervisor`], [`SignalLoop`], [`Channel`] |
//! | **Admission**     | Sliding-window rate limiting per caller key.             | [`AdmissionController`], [`RateLimit`]      |
//! | **Access**        | Ordered guard chain with tagged rejections.              | [`AccessPipeline`], [`Guard`], [`Rejection`]|
//! | **Subscriber API**| Hook into loop lifecycle events.                         | [`Subscribe`], [`Event`]                    |
//! | **Errors**        | Typed errors with stable labels.                         | [`SignalError`], [`RuntimeError`]           |
//! | **Configuration** | Centralized timing and shutdown settings.                | [`SupervisorConfig`]                        |
//!
//! ## Optional features
//! - `logging`: exports the built-in [`LogWriter`] subscriber (renders events via `tracing`).
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use async_trait::async_trait;
//! use signalvisor::{
//!     AccessPipeline, AdmissionController, EmitFn, Identity, IdentityProvider, RateLimit,
//!     SignalError, Supervisor, SupervisorConfig,
//! };
//!
//! struct ByUser;
//!
//! #[async_trait]
//! impl IdentityProvider<str> for ByUser {
//!     async fn resolve_identity(&self, user: &str) -> Option<Identity> {
//!         (!user.is_empty()).then(|| Identity::new(user))
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sup = Supervisor::builder(SupervisorConfig {
//!         max_time: Duration::from_millis(50),
//!         refresh_time: Duration::from_millis(10),
//!         ..SupervisorConfig::default()
//!     })
//!     .build()?;
//!
//!     let limiter = Arc::new(AdmissionController::new(RateLimit::per_seconds(3, 60)?));
//!     let pipeline = AccessPipeline::<str>::builder(Arc::new(ByUser))
//!         .rate_limit(limiter)
//!         .build();
//!
//!     // "user sent a message in #general" → show typing while we work
//!     let typing = Arc::clone(&sup);
//!     pipeline
//!         .invoke("alice", |_id| async move {
//!             typing
//!                 .trigger(EmitFn::arc("general", || async { Ok::<_, SignalError>(()) }))
//!                 .await;
//!             Ok::<_, SignalError>(())
//!         })
//!         .await?;
//!
//!     sup.cleanup().await;
//!     assert!(sup.is_empty().await);
//!     Ok(())
//! }
//! ```

mod admission;
mod channels;
mod core;
mod error;
mod events;
mod pipeline;
mod subscribers;

// ---- Public re-exports ----

pub use admission::{Admission, AdmissionController, RateLimit};
pub use channels::{Channel, ChannelRef, EmitFn};
pub use core::{
    LoopExit, LoopParams, LoopReport, SignalLoop, Supervisor, SupervisorBuilder, SupervisorConfig,
};
pub use error::{ConfigError, PipelineError, Rejection, RuntimeError, SignalError};
pub use events::{Bus, Event, EventKind};
pub use pipeline::{
    AccessPipeline, AccessPipelineBuilder, AuthorizationProvider, CapabilitySet, Guard, Identity,
    IdentityProvider, RateLimitGuard, RequireCapabilities, Stage, StaticGrants,
};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a built-in tracing-backed subscriber.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
