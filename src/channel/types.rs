//! Values that cross the process boundary.
//!
//! - [`StartupParameters`]: opaque serialized settings, treated as secret
//! - [`LaunchConfig`]: everything one `start()` call needs
//! - [`HealthSnapshot`] / [`ComponentHealth`]: what `poll_health()` reports

use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ProcessError;

/// Serialized user settings handed to the managed process.
///
/// Opaque to the supervisor. May embed API keys, so `Debug` never prints it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StartupParameters(String);

impl StartupParameters {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The raw parameter blob.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for StartupParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StartupParameters(<{} bytes redacted>)", self.0.len())
    }
}

impl From<String> for StartupParameters {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl From<&str> for StartupParameters {
    fn from(raw: &str) -> Self {
        Self(raw.to_owned())
    }
}

/// Inputs of a single `start()` call.
///
/// Built fresh by a [`ConfigSource`](crate::ConfigSource) on every start,
/// retry and resume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchConfig {
    /// Serialized settings.
    pub parameters: StartupParameters,
    /// Absolute directory the process may write to.
    pub data_dir: PathBuf,
    /// Bind host of the process' local gateway.
    pub host: String,
    /// Bind port of the process' local gateway.
    pub port: u16,
}

impl LaunchConfig {
    /// Checks the fields the supervisor can verify without the process.
    ///
    /// Fails with [`ProcessError::Config`] when:
    /// - `data_dir` is relative or contains a `..` segment
    /// - `host` is empty or has characters outside `[A-Za-z0-9.:-]`; an IPv6
    ///   literal may be wrapped in one pair of brackets (`[::1]`)
    /// - `port` is zero
    pub fn validate(&self) -> Result<(), ProcessError> {
        check_data_dir(&self.data_dir)?;

        if self.host.is_empty() {
            return Err(ProcessError::config("host must not be empty"));
        }
        check_host(&self.host)?;
        if self.port == 0 {
            return Err(ProcessError::config("port must be non-zero"));
        }
        Ok(())
    }
}

fn check_host(host: &str) -> Result<(), ProcessError> {
    let (inner, bracketed) = match host.strip_prefix('[').and_then(|h| h.strip_suffix(']')) {
        Some(inner) => (inner, true),
        None => (host, false),
    };
    let valid = !inner.is_empty()
        && (!bracketed || inner.contains(':'))
        && inner
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | ':' | '-'));
    if !valid {
        return Err(ProcessError::config("host contains invalid characters"));
    }
    Ok(())
}

fn check_data_dir(dir: &Path) -> Result<(), ProcessError> {
    if !dir.is_absolute() {
        return Err(ProcessError::config("data_dir must be an absolute path"));
    }
    if dir.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(ProcessError::config(
            "data_dir must not contain '..' segments",
        ));
    }
    Ok(())
}

/// Health of one component inside the managed process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentHealth {
    /// Component name (e.g. "gateway", "scheduler").
    pub name: String,
    /// Status string as reported: "ok", "error", "starting", ...
    pub status: String,
    /// Last error message, if any.
    #[serde(default)]
    pub last_error: Option<String>,
    /// Restarts performed by the process' own supervisor.
    #[serde(default)]
    pub restart_count: u64,
}

impl ComponentHealth {
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok")
    }
}

/// Result of one health poll.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HealthSnapshot {
    /// Whether the process reports its runtime as up.
    pub daemon_running: bool,
    /// OS process id.
    #[serde(default)]
    pub pid: u32,
    /// Seconds since the process started.
    #[serde(default)]
    pub uptime_seconds: u64,
    /// Per-component breakdown.
    #[serde(default)]
    pub components: Vec<ComponentHealth>,
}

impl HealthSnapshot {
    /// Looks up a component by name.
    pub fn component(&self, name: &str) -> Option<&ComponentHealth> {
        self.components.iter().find(|c| c.name == name)
    }

    /// Components whose status is not "ok".
    pub fn degraded(&self) -> impl Iterator<Item = &ComponentHealth> {
        self.components.iter().filter(|c| !c.is_ok())
    }

    /// One-line rendering for the status indicator.
    ///
    /// # Example
    /// ```
    /// use daemonvisor::{ComponentHealth, HealthSnapshot};
    ///
    /// let snap = HealthSnapshot {
    ///     daemon_running: true,
    ///     pid: 42,
    ///     uptime_seconds: 3_725,
    ///     components: vec![
    ///         ComponentHealth { name: "gateway".into(), status: "ok".into(), last_error: None, restart_count: 0 },
    ///         ComponentHealth { name: "scheduler".into(), status: "error".into(), last_error: None, restart_count: 2 },
    ///     ],
    /// };
    /// assert_eq!(snap.summary(), "up 1h 2m, 1/2 components ok (degraded: scheduler)");
    /// ```
    pub fn summary(&self) -> String {
        if !self.daemon_running {
            return "runtime not running".to_string();
        }
        let total = self.components.len();
        let degraded: Vec<&str> = self.degraded().map(|c| c.name.as_str()).collect();
        let ok = total - degraded.len();
        let uptime = format_uptime(self.uptime_seconds);
        if degraded.is_empty() {
            format!("up {uptime}, {ok}/{total} components ok")
        } else {
            format!(
                "up {uptime}, {ok}/{total} components ok (degraded: {})",
                degraded.join(", ")
            )
        }
    }
}

fn format_uptime(secs: u64) -> String {
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h}h {m}m")
    } else if m > 0 {
        format!("{m}m {s}s")
    } else {
        format!("{s}s")
    }
}
