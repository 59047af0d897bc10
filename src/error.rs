//! Error types used by the signalvisor runtime, signal loops and the access pipeline.
//!
//! This module defines the error enums of the crate:
//!
//! - [`RuntimeError`]: errors raised by the supervisor itself (shutdown).
//! - [`SignalError`]: errors raised while emitting a signal toward a channel.
//! - [`ConfigError`]: invalid configuration values.
//! - [`Rejection`] / [`PipelineError`]: results of the access pipeline guards.
//!
//! All types provide `as_label` for stable snake_case labels in logs/metrics.

use std::any::Any;
use std::time::Duration;

use thiserror::Error;

use crate::pipeline::{CapabilitySet, Stage};

/// # Errors produced by the signalvisor runtime.
///
/// These represent failures in the supervision layer itself,
/// such as a shutdown sequence exceeding its grace period.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Shutdown grace period was exceeded; some loops did not terminate in time.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Keys whose loops did not shut down in time.
        stuck: Vec<String>,
    },

    /// OS signal listener could not be installed.
    #[error("failed to listen for shutdown signal: {0}")]
    Signal(#[from] std::io::Error),
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use signalvisor::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::Signal(_) => "runtime_signal_listener",
        }
    }
}

/// # Errors produced while signaling a channel.
///
/// These never leave the supervisor: a loop that hits one either tolerates it
/// (retryable, within the configured budget) or terminates and cleans itself up.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SignalError {
    /// Emission exceeded the per-emission deadline.
    #[error("emission timed out after {timeout:?}")]
    Timeout {
        /// The deadline that was exceeded.
        timeout: Duration,
    },

    /// Non-recoverable failure: the channel is gone or refuses signals.
    #[error("fatal emission error: {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },

    /// Emission failed but the next cycle may succeed.
    #[error("emission failed: {error}")]
    Emit {
        /// The underlying error message.
        error: String,
    },

    /// Emission was interrupted by cancellation of the loop.
    #[error("signal cancelled")]
    Canceled,

    /// The channel panicked while opening its scope or emitting.
    #[error("channel panicked: {info}")]
    Panicked {
        /// Panic payload rendered as text.
        info: String,
    },
}

impl SignalError {
    /// Shorthand for a retryable [`SignalError::Emit`].
    pub fn emit(error: impl Into<String>) -> Self {
        SignalError::Emit {
            error: error.into(),
        }
    }

    /// Shorthand for [`SignalError::Fatal`].
    pub fn fatal(error: impl Into<String>) -> Self {
        SignalError::Fatal {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            SignalError::Timeout { .. } => "signal_timeout",
            SignalError::Fatal { .. } => "signal_fatal",
            SignalError::Emit { .. } => "signal_emit_failed",
            SignalError::Canceled => "signal_canceled",
            SignalError::Panicked { .. } => "signal_panicked",
        }
    }

    /// Indicates whether the next emission cycle may be attempted.
    ///
    /// Returns `true` for [`SignalError::Emit`] and [`SignalError::Timeout`].
    ///
    /// # Example
    /// ```
    /// use signalvisor::SignalError;
    ///
    /// assert!(SignalError::emit("503").is_retryable());
    /// assert!(!SignalError::fatal("unknown channel").is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(self, SignalError::Emit { .. } | SignalError::Timeout { .. })
    }
}

/// Renders a caught panic payload (`&str` or `String`), `"unknown panic"` otherwise.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Invalid configuration value.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// `refresh_time` must be positive, otherwise the loop never consumes its budget.
    #[error("refresh_time must be greater than zero")]
    ZeroRefresh,

    /// `max_requests` must be positive.
    #[error("max_requests must be greater than zero")]
    ZeroRequests,

    /// The admission window must be positive.
    #[error("rate window must be greater than zero")]
    ZeroWindow,
}

/// Why the access pipeline refused an invocation.
///
/// A rejection always means the protected operation did **not** run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// No valid identity could be resolved from the request.
    #[error("unauthenticated")]
    Unauthenticated,

    /// The caller lacks some of the required capabilities.
    #[error("forbidden: missing {missing}")]
    Forbidden {
        /// Required capabilities the caller was not granted.
        missing: CapabilitySet,
    },

    /// The caller exceeded its request budget for the current window.
    #[error("rate limited; retry after {retry_after:?}")]
    RateLimited {
        /// Time until the oldest request in the window expires.
        retry_after: Duration,
    },
}

impl Rejection {
    /// Returns the pipeline stage that produced this rejection.
    pub fn stage(&self) -> Stage {
        match self {
            Rejection::Unauthenticated => Stage::Authenticate,
            Rejection::Forbidden { .. } => Stage::Authorize,
            Rejection::RateLimited { .. } => Stage::Admit,
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use signalvisor::Rejection;
    ///
    /// assert_eq!(Rejection::Unauthenticated.as_label(), "unauthenticated");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            Rejection::Unauthenticated => "unauthenticated",
            Rejection::Forbidden { .. } => "forbidden",
            Rejection::RateLimited { .. } => "rate_limited",
        }
    }
}

/// Result error of [`AccessPipeline::invoke`](crate::AccessPipeline::invoke).
#[derive(Error, Debug)]
pub enum PipelineError<E> {
    /// A guard stage refused the invocation; the operation did not run.
    #[error("rejected at {stage}: {0}", stage = .0.stage())]
    Rejected(Rejection),

    /// The operation ran and returned an error.
    #[error("operation failed: {0}")]
    Operation(E),
}

impl<E> PipelineError<E> {
    /// Returns the rejection, if the invocation was refused by a guard.
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            PipelineError::Rejected(r) => Some(r),
            PipelineError::Operation(_) => None,
        }
    }
}

impl<E> From<Rejection> for PipelineError<E> {
    fn from(r: Rejection) -> Self {
        PipelineError::Rejected(r)
    }
}
