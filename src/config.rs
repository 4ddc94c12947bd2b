//! # Supervisor configuration.
//!
//! Provides [`SupervisorConfig`] centralized settings for the lifecycle supervisor.
//!
//! ## Sentinel values
//! - `max_attempts = 0` → no retries (first start failure ends in `Error`)
//! - `bus_capacity = 0` → clamped to 1
//! - `command_capacity = 0` → clamped to 1
//! - `guard_timeout = 0s` → the startup guard never expires on its own

use std::time::Duration;

use crate::core::HostVisibility;
use crate::policies::{BackoffPolicy, RetryPolicy};

/// Global configuration for the supervisor.
///
/// Defines:
/// - **Retry behavior**: backoff curve and attempt bound for failed starts
/// - **Status cadence**: notifier throttle and health-poll intervals
/// - **Resource guard**: hard timeout of the startup guard
/// - **Queues**: event bus and command queue capacities
///
/// ## Notes
/// All fields are public for flexibility. Prefer the helper accessors to avoid
/// sprinkling sentinel checks across the codebase.
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Delay curve between failed start attempts.
    pub backoff: BackoffPolicy,

    /// Number of retries after the first failed start before giving up.
    pub max_attempts: u32,

    /// Minimum interval between two status renders of the same state.
    ///
    /// A state change always renders immediately.
    pub min_update_interval: Duration,

    /// Health-poll interval while the host UI is visible.
    pub poll_foreground: Duration,

    /// Health-poll interval while the host is backgrounded.
    pub poll_background: Duration,

    /// Hard timeout of the startup guard, independent of the retry loop.
    pub guard_timeout: Duration,

    /// Capacity of the event bus broadcast ring buffer.
    ///
    /// Slow receivers that lag behind more than `bus_capacity` events skip older items.
    pub bus_capacity: usize,

    /// Capacity of the supervisor's command queue.
    ///
    /// When full, command calls wait for room.
    pub command_capacity: usize,
}

impl SupervisorConfig {
    /// Builds a fresh [`RetryPolicy`] with a zeroed counter.
    #[inline]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.backoff, self.max_attempts)
    }

    /// Returns the health-poll interval for the given host visibility.
    #[inline]
    pub fn poll_interval(&self, visibility: HostVisibility) -> Duration {
        match visibility {
            HostVisibility::Foreground => self.poll_foreground,
            HostVisibility::Background => self.poll_background,
        }
    }

    /// Returns the guard timeout as an `Option`.
    ///
    /// - `None` → the guard is held until explicitly released
    /// - `Some(d)` → the guard releases itself after `d`
    #[inline]
    pub fn guard_deadline(&self) -> Option<Duration> {
        if self.guard_timeout == Duration::ZERO {
            None
        } else {
            Some(self.guard_timeout)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Returns a command queue capacity clamped to a minimum of 1.
    #[inline]
    pub fn command_capacity_clamped(&self) -> usize {
        self.command_capacity.max(1)
    }
}

impl Default for SupervisorConfig {
    /// Default configuration:
    ///
    /// - `backoff = 2s × 2^n, capped at 30s`
    /// - `max_attempts = 5`
    /// - `min_update_interval = 30s`
    /// - `poll_foreground = 5s`, `poll_background = 60s`
    /// - `guard_timeout = 180s`
    /// - `bus_capacity = 1024`, `command_capacity = 64`
    fn default() -> Self {
        Self {
            backoff: BackoffPolicy::default(),
            max_attempts: RetryPolicy::DEFAULT_MAX_ATTEMPTS,
            min_update_interval: Duration::from_secs(30),
            poll_foreground: Duration::from_secs(5),
            poll_background: Duration::from_secs(60),
            guard_timeout: Duration::from_secs(180),
            bus_capacity: 1024,
            command_capacity: 64,
        }
    }
}
