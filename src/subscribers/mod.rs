//! # Event subscribers for the signalvisor runtime.
//!
//! This module provides the [`Subscribe`] trait and the [`SubscriberSet`] fan-out
//! used to deliver runtime events broadcast through the [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   SignalLoop ── publish(Event) ──► Bus ──► Supervisor listener ──► SubscriberSet
//!                                                                        │
//!                                                             ┌──────────┼──────────┐
//!                                                             ▼          ▼          ▼
//!                                                         LogWriter   Metrics    Custom
//! ```
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use signalvisor::{Subscribe, Event, EventKind};
//! use async_trait::async_trait;
//!
//! struct StopCounter;
//!
//! #[async_trait]
//! impl Subscribe for StopCounter {
//!     async fn on_event(&self, event: &Event) {
//!         if let EventKind::SignalStopped = event.kind {
//!             // increment counter
//!         }
//!     }
//! }
//! ```

mod set;
mod subscribe;

#[cfg(feature = "logging")]
mod log;

pub use set::SubscriberSet;
pub use subscribe::Subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
