//! # Lifecycle state and the observable status.
//!
//! [`LifecycleState`] is the single source of truth for "what is the managed
//! process doing". Only the supervisor actor writes it; everyone else reads a
//! [`SupervisorStatus`] snapshot published through a `tokio::sync::watch` channel.
//!
//! ```text
//! Stopped ──start──► Starting ──success──► Running ──stop──► Stopping ──► Stopped
//! Starting ──retries exhausted──► Error ──retry──► Starting
//! Error ──stop──► Stopped
//! ```

use std::fmt;
use std::sync::{Arc, Mutex};

use crate::channel::HealthSnapshot;

/// Lifecycle state of the managed process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LifecycleState {
    /// Not running, no start in flight. Quiescent.
    #[default]
    Stopped,
    /// Start attempts in progress (including backoff sleeps).
    Starting,
    /// Started successfully; health polling active.
    Running,
    /// Stop issued, waiting for the channel to return.
    Stopping,
    /// Start attempts exhausted or rejected. Quiescent.
    Error,
}

impl LifecycleState {
    /// True for states in which no work is in flight (`Stopped`, `Error`).
    pub fn is_quiescent(self) -> bool {
        matches!(self, LifecycleState::Stopped | LifecycleState::Error)
    }

    /// True when a `start` command would be accepted.
    pub fn accepts_start(self) -> bool {
        self.is_quiescent()
    }

    /// Short lowercase name for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleState::Stopped => "stopped",
            LifecycleState::Starting => "starting",
            LifecycleState::Running => "running",
            LifecycleState::Stopping => "stopping",
            LifecycleState::Error => "error",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the host UI is currently visible; selects the health-poll interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HostVisibility {
    /// Host UI visible: poll often.
    #[default]
    Foreground,
    /// Host backgrounded: poll rarely.
    Background,
}

/// Snapshot of everything the supervisor exposes to observers.
#[derive(Debug, Clone, Default)]
pub struct SupervisorStatus {
    /// Current lifecycle state.
    pub state: LifecycleState,
    /// Detail of the last lifecycle failure; cleared on the next successful start.
    pub last_error: Option<String>,
    /// Last health snapshot; cleared when the process stops.
    pub last_health: Option<HealthSnapshot>,
    /// Detail of the last failed health poll; cleared by the next good poll.
    pub health_warning: Option<String>,
    /// Retries consumed by the current start sequence.
    pub retry_attempt: u32,
    /// Informational: host reports a validated network path.
    pub network_validated: bool,
}

/// One-shot latch for the "credential rejected" signal.
///
/// Set by the supervisor when a failure detail matches
/// [`is_credential_rejection`](crate::is_credential_rejection); cleared by
/// whoever [`take`](CredentialLatch::take)s it first.
#[derive(Debug, Clone, Default)]
pub struct CredentialLatch {
    slot: Arc<Mutex<Option<String>>>,
}

impl CredentialLatch {
    pub(crate) fn set(&self, detail: &str) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some(detail.to_owned());
        }
    }

    /// Returns the pending rejection detail and clears the latch.
    pub fn take(&self) -> Option<String> {
        self.slot.lock().ok().and_then(|mut slot| slot.take())
    }
}
