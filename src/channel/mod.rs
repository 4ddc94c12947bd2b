//! # Boundary to the managed process.
//!
//! The supervisor never talks to the managed process directly. It goes through
//! two host-provided traits:
//!
//! - [`ProcessControlChannel`]: blocking `start` / `stop` / `poll_health` / `send`
//! - [`ConfigSource`]: builds a fresh [`LaunchConfig`] for every start
//!
//! Blocking calls are executed by the [`ChannelWorker`], which runs them one
//! at a time in submission order on the blocking thread pool.
//!
//! ```text
//! actor / loops ── call(job) ──► [job queue] ──► dispatcher ──► spawn_blocking(channel.start()/stop()/...)
//!        ▲                                                            │
//!        └──────────────────── oneshot reply ◄────────────────────────┘  (panics → InternalPanic)
//! ```

mod types;
mod worker;

pub use types::{ComponentHealth, HealthSnapshot, LaunchConfig, StartupParameters};
pub use worker::{ChannelWorker, MAX_MESSAGE_BYTES};

use crate::error::ProcessError;

/// Blocking control interface of the managed process.
///
/// Implementations wrap whatever actually hosts the process (FFI bindings,
/// a child process, an in-process runtime). Every call may block; the
/// supervisor only invokes them from the blocking thread pool.
///
/// # Example
/// ```rust
/// use daemonvisor::{HealthSnapshot, LaunchConfig, ProcessControlChannel, ProcessError};
///
/// struct Noop;
///
/// impl ProcessControlChannel for Noop {
///     fn start(&self, _cfg: &LaunchConfig) -> Result<(), ProcessError> { Ok(()) }
///     fn stop(&self) -> Result<(), ProcessError> { Ok(()) }
///     fn poll_health(&self) -> Result<HealthSnapshot, ProcessError> {
///         Ok(HealthSnapshot::default())
///     }
///     fn send(&self, message: &str) -> Result<String, ProcessError> {
///         Ok(message.to_string())
///     }
/// }
/// ```
pub trait ProcessControlChannel: Send + Sync + 'static {
    /// Starts the process. Fails with `State` if it is already running.
    fn start(&self, config: &LaunchConfig) -> Result<(), ProcessError>;

    /// Stops the process.
    fn stop(&self) -> Result<(), ProcessError>;

    /// Reports the current health of the process.
    fn poll_health(&self) -> Result<HealthSnapshot, ProcessError>;

    /// Sends a message and returns the process' reply.
    fn send(&self, message: &str) -> Result<String, ProcessError>;
}

/// Produces the [`LaunchConfig`] for a start attempt.
///
/// Called once per start sequence (start, retry, resume), never cached, so
/// settings edited while the process was down always take effect.
/// A [`ProcessError::Config`] from here ends the sequence without retries.
///
/// Any `Fn() -> Result<LaunchConfig, ProcessError>` closure implements it.
pub trait ConfigSource: Send + Sync + 'static {
    /// Builds a fresh launch configuration.
    fn build(&self) -> Result<LaunchConfig, ProcessError>;
}

impl<F> ConfigSource for F
where
    F: Fn() -> Result<LaunchConfig, ProcessError> + Send + Sync + 'static,
{
    fn build(&self) -> Result<LaunchConfig, ProcessError> {
        self()
    }
}
