//! Timeout and retry settings for tile fetches.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use quadstream::scheduler::{FetchPolicy, RetryPolicy};
//!
//! let policy = FetchPolicy::default()
//!     .with_timeout(Duration::from_secs(10))
//!     .with_retry(RetryPolicy::exponential(5));
//! assert_eq!(policy.retry.max_attempts(), 5);
//! assert_eq!(policy.retry.delay_after(2), Some(Duration::from_millis(500)));
//! ```

use std::time::Duration;

/// Delay before the first retry of a failed tile.
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 250;

/// Upper bound on the delay between retries.
pub const DEFAULT_MAX_DELAY_SECS: u64 = 30;

/// Growth of the retry delay per failure.
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

/// Fetch attempts per tile, counting the first.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// A fetch still running after this many seconds fails.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// When a tile whose fetch failed may be requested again.
///
/// A failed tile goes back to `Missing` and stays unrequestable until the
/// delay returned by [`delay_after`](Self::delay_after) has passed. Once
/// `max_attempts` fetches have failed the tile is given up on.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
}

impl RetryPolicy {
    /// Doubling delays from 250 ms, capped at 30 s.
    pub fn exponential(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::from_millis(DEFAULT_INITIAL_DELAY_MS),
            max_delay: Duration::from_secs(DEFAULT_MAX_DELAY_SECS),
            multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }

    /// The same delay before every retry.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay: delay,
            max_delay: delay,
            multiplier: 1.0,
        }
    }

    /// A single failure is final.
    pub fn never() -> Self {
        Self::fixed(1, Duration::ZERO)
    }

    /// Overrides the backoff curve.
    pub fn with_backoff(mut self, initial_delay: Duration, max_delay: Duration, multiplier: f64) -> Self {
        self.initial_delay = initial_delay;
        self.max_delay = max_delay.max(initial_delay);
        self.multiplier = multiplier.max(1.0);
        self
    }

    /// Delay before the next attempt after `failures` consecutive failures,
    /// or `None` once the attempts are used up.
    pub fn delay_after(&self, failures: u32) -> Option<Duration> {
        if failures == 0 {
            return Some(Duration::ZERO);
        }
        if failures >= self.max_attempts {
            return None;
        }
        let factor = self.multiplier.powi(failures as i32 - 1);
        let delay = self.initial_delay.as_secs_f64() * factor;
        Some(Duration::from_secs_f64(delay.min(self.max_delay.as_secs_f64())))
    }

    /// Fetch attempts allowed per tile, counting the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::exponential(DEFAULT_MAX_ATTEMPTS)
    }
}

/// Timeout and retry behavior applied to every tile fetch.
#[derive(Clone, Debug, PartialEq)]
pub struct FetchPolicy {
    /// A fetch running longer than this fails with a timeout.
    pub timeout: Duration,
    /// Retry schedule after failures.
    pub retry: RetryPolicy,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            retry: RetryPolicy::default(),
        }
    }
}

impl FetchPolicy {
    /// Sets the fetch timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}
