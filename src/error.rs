//! Error types used by the supervisor, the process channel and the recovery store.
//!
//! This module defines three enums:
//!
//! - [`ProcessError`]: failures reported by the managed process boundary.
//! - [`StoreError`]: failures of a recovery-store partition.
//! - [`SupervisorError`]: failures of calls made through a [`Supervisor`](crate::Supervisor) handle.
//!
//! [`ProcessError`] and [`StoreError`] provide `as_label` for logs, and
//! [`ProcessError::is_retryable`] drives the retry loop.

use std::path::PathBuf;

use thiserror::Error;

/// # Errors produced by the managed process boundary.
///
/// Every variant carries a `detail` string; the supervisor surfaces it verbatim
/// as the last error and feeds it to [`is_credential_rejection`](crate::is_credential_rejection).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcessError {
    /// Malformed startup parameters, missing fields or invalid paths.
    #[error("config error: {detail}")]
    Config {
        /// Description of the configuration problem.
        detail: String,
    },

    /// Process already running, or not running when expected.
    #[error("state error: {detail}")]
    State {
        /// Description of the state mismatch.
        detail: String,
    },

    /// Runtime bootstrap or component spawn failure.
    #[error("spawn error: {detail}")]
    Spawn {
        /// Description of the spawn failure.
        detail: String,
    },

    /// Internal state of the process is irrecoverably corrupt.
    ///
    /// The only recovery path is restarting the host.
    #[error("internal state corrupted: {detail}")]
    StateCorrupted {
        /// Description of the corruption.
        detail: String,
    },

    /// Graceful shutdown failure.
    #[error("shutdown error: {detail}")]
    Shutdown {
        /// Description of the shutdown failure.
        detail: String,
    },

    /// The channel implementation panicked.
    #[error("internal panic: {detail}")]
    InternalPanic {
        /// Panic payload, when it was a string.
        detail: String,
    },
}

impl ProcessError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use daemonvisor::ProcessError;
    ///
    /// let err = ProcessError::Spawn { detail: "bind failed".into() };
    /// assert_eq!(err.as_label(), "process_spawn");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ProcessError::Config { .. } => "process_config",
            ProcessError::State { .. } => "process_state",
            ProcessError::Spawn { .. } => "process_spawn",
            ProcessError::StateCorrupted { .. } => "process_state_corrupted",
            ProcessError::Shutdown { .. } => "process_shutdown",
            ProcessError::InternalPanic { .. } => "process_panic",
        }
    }

    /// Returns the detail string without the variant prefix.
    pub fn detail(&self) -> &str {
        match self {
            ProcessError::Config { detail }
            | ProcessError::State { detail }
            | ProcessError::Spawn { detail }
            | ProcessError::StateCorrupted { detail }
            | ProcessError::Shutdown { detail }
            | ProcessError::InternalPanic { detail } => detail,
        }
    }

    /// Indicates whether a failed start with this error may be retried.
    ///
    /// Configuration errors and corrupted state never heal on their own, so
    /// they end the retry loop immediately.
    ///
    /// # Example
    /// ```
    /// use daemonvisor::ProcessError;
    ///
    /// assert!(ProcessError::Spawn { detail: "boom".into() }.is_retryable());
    /// assert!(!ProcessError::Config { detail: "bad toml".into() }.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            ProcessError::Config { .. } | ProcessError::StateCorrupted { .. }
        )
    }

    pub(crate) fn config(detail: impl Into<String>) -> Self {
        ProcessError::Config {
            detail: detail.into(),
        }
    }

    pub(crate) fn corrupted(detail: impl Into<String>) -> Self {
        ProcessError::StateCorrupted {
            detail: detail.into(),
        }
    }
}

/// # Errors produced by a recovery-store partition.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("partition io error at {path}: {source}")]
    Io {
        /// File the partition is backed by.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Partition contents could not be encoded or decoded.
    #[error("partition serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Partition is not available (e.g. a locked or reset keystore).
    #[error("partition unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            StoreError::Io { .. } => "store_io",
            StoreError::Serialize(_) => "store_serialize",
            StoreError::Unavailable(_) => "store_unavailable",
        }
    }
}

/// # Errors returned by [`Supervisor`](crate::Supervisor) handle calls.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SupervisorError {
    /// The supervisor task has exited (shutdown or all handles dropped).
    #[error("supervisor is closed")]
    Closed,

    /// The call needs a running managed process.
    #[error("managed process is not running")]
    NotRunning,

    /// The managed process rejected the call.
    #[error(transparent)]
    Process(#[from] ProcessError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_strips_prefix() {
        let err = ProcessError::Shutdown {
            detail: "gateway hung".into(),
        };
        assert_eq!(err.detail(), "gateway hung");
        assert_eq!(err.to_string(), "shutdown error: gateway hung");
    }

    #[test]
    fn only_config_and_corruption_are_terminal() {
        let retryable = [
            ProcessError::State { detail: String::new() },
            ProcessError::Spawn { detail: String::new() },
            ProcessError::Shutdown { detail: String::new() },
            ProcessError::InternalPanic { detail: String::new() },
        ];
        assert!(retryable.iter().all(ProcessError::is_retryable));
        assert!(!ProcessError::config("x").is_retryable());
        assert!(!ProcessError::corrupted("x").is_retryable());
    }

    #[test]
    fn supervisor_error_wraps_process_error() {
        let err: SupervisorError = ProcessError::Spawn {
            detail: "nope".into(),
        }
        .into();
        assert_eq!(err.to_string(), "spawn error: nope");
    }
}
