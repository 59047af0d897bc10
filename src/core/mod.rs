//! Runtime core: per-key supervision of signal loops.
//!
//! The public API from this module is [`Supervisor`] (with its builder and
//! config) and the loop exit types.
//!
//! Internal modules:
//! - [`emitter`]: emits one signal with deadline/cancellation and event publishing;
//! - [`signal_loop`]: runs one bounded emit/sleep loop for a channel;
//! - [`registry`]: key → handle map with generation-checked removal;
//! - [`supervisor`]: trigger/stop/cleanup/shutdown;
//! - [`shutdown`]: cross-platform shutdown signal handling.

mod builder;
mod config;
mod emitter;
mod registry;
mod shutdown;
mod signal_loop;
mod supervisor;

pub use builder::SupervisorBuilder;
pub use config::SupervisorConfig;
pub use signal_loop::{LoopExit, LoopParams, LoopReport, SignalLoop};
pub use supervisor::Supervisor;
