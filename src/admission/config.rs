use std::time::Duration;

use crate::error::ConfigError;

/// Request budget of one guarded operation: at most `max_requests` per `per`.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use signalvisor::RateLimit;
///
/// let limit = RateLimit::new(3, Duration::from_secs(60)).unwrap();
/// assert_eq!(limit.max_requests(), 3);
/// assert!(RateLimit::new(0, Duration::from_secs(60)).is_err());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimit {
    max_requests: u32,
    per: Duration,
}

impl RateLimit {
    /// Creates a limit; both values must be positive.
    pub fn new(max_requests: u32, per: Duration) -> Result<Self, ConfigError> {
        if max_requests == 0 {
            return Err(ConfigError::ZeroRequests);
        }
        if per.is_zero() {
            return Err(ConfigError::ZeroWindow);
        }
        Ok(Self { max_requests, per })
    }

    /// Shorthand for a window measured in whole seconds.
    pub fn per_seconds(max_requests: u32, seconds: u64) -> Result<Self, ConfigError> {
        Self::new(max_requests, Duration::from_secs(seconds))
    }

    /// Maximum accepted requests per window.
    #[inline]
    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Window length.
    #[inline]
    pub fn per(&self) -> Duration {
        self.per
    }
}
