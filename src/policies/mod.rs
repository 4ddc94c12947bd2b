//! Retry policies.
//!
//! This module groups the knobs that control **how long** to wait between
//! start attempts and **when** to give up.
//!
//! ## Contents
//! - [`BackoffPolicy`] how retry delays evolve (first / factor / max)
//! - [`RetryPolicy`]   bounded attempt counter over a backoff curve
//!
//! ## Quick wiring
//! ```text
//! SupervisorConfig { backoff, max_attempts }
//!      └─► core::launch::LaunchLoop owns a fresh RetryPolicy per run:
//!           - next_delay() → Some(d): sleep d (cancellable), try again
//!           - next_delay() → None:    give up, supervisor enters Error
//! ```

mod backoff;
mod retry;

pub use backoff::BackoffPolicy;
pub use retry::RetryPolicy;
