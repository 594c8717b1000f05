//! Retry policy for background prefetch fetches
//!
//! Only prefetch retries. The active unit is fetched once so playback never
//! stalls behind a retry loop; the listener just hears the next unit.

use std::time::Duration;

/// Bounded fixed-delay retry policy
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum total fetch attempts per unit
    pub max_attempts: u32,
    /// Fixed delay before each retry
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Delay before the next attempt, or `None` when the unit is abandoned.
    ///
    /// `failures` is the number of attempts that have already failed.
    #[must_use]
    pub const fn next_delay(&self, failures: u32) -> Option<Duration> {
        if failures < self.max_attempts {
            Some(self.delay)
        } else {
            None
        }
    }

    /// Whether a unit with this many failed attempts is abandoned
    #[must_use]
    pub const fn exhausted(&self, failures: u32) -> bool {
        failures >= self.max_attempts
    }
}
