//! # Per-caller admission control
//!
//! [`AdmissionController`] answers "may this caller proceed now?" with a sliding
//! time window per caller key.
//!
//! ## Algorithm
//! ```text
//! allow(key):
//!   ├─► prune window[key]: drop t where now - t >= per
//!   ├─► len >= max_requests → reject (nothing recorded)
//!   └─► push now            → accept
//! ```
//!
//! ## Invariants
//! - The three steps are atomic under one lock; concurrent callers can not over-admit.
//! - Admission never fails: the answer is always accept or reject.
//! - Idle callers are only evicted by an explicit [`AdmissionController::sweep`]
//!   (or the background [`AdmissionController::spawn_sweeper`]).

mod config;
mod controller;
mod window;

pub use config::RateLimit;
pub use controller::{Admission, AdmissionController};
