//! # Bounded retry counter.
//!
//! [`RetryPolicy`] pairs a [`BackoffPolicy`] curve with a maximum number of
//! attempts. Each call to [`RetryPolicy::next_delay`] consumes one attempt:
//!
//! ```text
//! call k (0-indexed) ─► Some(min(first × factor^k, max))   while k < max_attempts
//!                    ─► None                               afterwards, until reset()
//! ```
//!
//! The counter is plain `u32` state. The launch loop owns its policy
//! exclusively, so no synchronization is involved.

use crate::policies::BackoffPolicy;
use std::time::Duration;

/// Exponential backoff with a bounded attempt count.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    backoff: BackoffPolicy,
    max_attempts: u32,
    attempt: u32,
}

impl RetryPolicy {
    /// Reference attempt bound.
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

    /// Creates a policy with a zeroed counter.
    pub fn new(backoff: BackoffPolicy, max_attempts: u32) -> Self {
        Self {
            backoff,
            max_attempts,
            attempt: 0,
        }
    }

    /// Returns the delay before the next retry, or `None` once attempts are exhausted.
    ///
    /// # Example
    /// ```
    /// use std::time::Duration;
    /// use daemonvisor::RetryPolicy;
    ///
    /// let mut policy = RetryPolicy::default();
    /// assert_eq!(policy.next_delay(), Some(Duration::from_secs(2)));
    /// assert_eq!(policy.next_delay(), Some(Duration::from_secs(4)));
    /// ```
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempt >= self.max_attempts {
            return None;
        }
        let delay = self.backoff.delay(self.attempt);
        self.attempt += 1;
        Some(delay)
    }

    /// Zeroes the counter.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Number of delays handed out since the last reset.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Configured attempt bound.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// The underlying delay curve.
    pub fn backoff(&self) -> BackoffPolicy {
        self.backoff
    }
}

impl Default for RetryPolicy {
    /// Reference policy: 2s, 4s, 8s, 16s, 30s, then exhausted.
    fn default() -> Self {
        Self::new(BackoffPolicy::default(), Self::DEFAULT_MAX_ATTEMPTS)
    }
}
