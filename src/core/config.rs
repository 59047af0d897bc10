//! # Supervisor configuration.
//!
//! Provides [`SupervisorConfig`] centralized settings for signal loops and the
//! supervisor runtime. Values are fixed at build time; there is no runtime
//! reconfiguration.
//!
//! ## Sentinel values
//! - `emit_timeout = 0s` → no per-emission deadline
//! - `tolerated_failures = 0` → the first emission error terminates the loop

use std::time::Duration;

use crate::error::ConfigError;

/// Global configuration for the supervisor runtime.
///
/// ## Field semantics
/// - `max_time`: total signaling budget of one loop
/// - `refresh_time`: interval between emissions (must be `> 0`)
/// - `emit_timeout`: deadline for one emission call (`0s` = none)
/// - `tolerated_failures`: consecutive retryable emission errors a loop survives
/// - `bus_capacity`: event bus ring buffer size (min 1)
/// - `grace`: maximum wait for loops to stop during shutdown
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Total signaling budget of one loop.
    ///
    /// The loop emits while the remaining budget is positive; each cycle
    /// consumes `refresh_time`.
    pub max_time: Duration,

    /// Interval between two emissions. Also bounds how long cancellation takes
    /// to be observed.
    pub refresh_time: Duration,

    /// Deadline for a single emission call.
    pub emit_timeout: Duration,

    /// Number of consecutive retryable emission failures tolerated before the
    /// loop terminates. Fatal errors always terminate.
    pub tolerated_failures: u32,

    /// Capacity of the event bus broadcast channel ring buffer.
    pub bus_capacity: usize,

    /// Maximum time to wait for loops to stop on shutdown.
    pub grace: Duration,
}

impl SupervisorConfig {
    /// Returns the emission deadline as an `Option`.
    #[inline]
    pub fn emit_deadline(&self) -> Option<Duration> {
        if self.emit_timeout == Duration::ZERO {
            None
        } else {
            Some(self.emit_timeout)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Checks that the configuration can drive a terminating loop.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.refresh_time == Duration::ZERO {
            return Err(ConfigError::ZeroRefresh);
        }
        Ok(())
    }
}

impl Default for SupervisorConfig {
    /// Default configuration:
    ///
    /// - `max_time = 10s`, `refresh_time = 5s` (typing indicators expire after ~10s)
    /// - `emit_timeout = 0s` (no deadline)
    /// - `tolerated_failures = 0`
    /// - `bus_capacity = 1024`
    /// - `grace = 5s`
    fn default() -> Self {
        Self {
            max_time: Duration::from_secs(10),
            refresh_time: Duration::from_secs(5),
            emit_timeout: Duration::ZERO,
            tolerated_failures: 0,
            bus_capacity: 1024,
            grace: Duration::from_secs(5),
        }
    }
}
