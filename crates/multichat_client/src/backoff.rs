//! Reconnection backoff policy.

use std::time::Duration;

/// Minimum delay between reconnection attempts.
pub const RETRY_INTERVAL_MIN: Duration = Duration::from_secs(5);

/// Maximum delay between reconnection attempts.
pub const RETRY_INTERVAL_MAX: Duration = Duration::from_secs(3600);

/// Exponential backoff state for the reconnect loop.
///
/// The interval starts at the minimum, doubles after every connection loss
/// and is clamped to the maximum. Successful registration resets it. The
/// value returned by [`next`](RetryBackoff::next) is always within
/// `[min, max]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryBackoff {
    current: Duration,
    min: Duration,
    max: Duration,
}

impl RetryBackoff {
    /// Creates a backoff policy bounded by `[min, max]`.
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            current: min,
            min,
            max,
        }
    }

    /// Returns the delay currently scheduled for the next attempt.
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Returns the delay to use for this failure, then doubles the interval
    /// (clamped to the maximum) for the one after. Report-then-advance: the
    /// returned value is what a user-visible notice should display.
    pub fn next(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    /// Resets the interval to the minimum. Called on successful
    /// registration.
    pub fn reset(&mut self) {
        self.current = self.min;
    }
}

impl Default for RetryBackoff {
    fn default() -> Self {
        Self::new(RETRY_INTERVAL_MIN, RETRY_INTERVAL_MAX)
    }
}
