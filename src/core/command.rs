//! Messages flowing into the supervisor actor.
//!
//! - [`Command`]: external requests from [`Supervisor`](crate::Supervisor) handles
//! - [`Report`]: results from the launch and health loops and from `stop()`, tagged with the run epoch

use tokio::sync::oneshot;

use crate::channel::{HealthSnapshot, LaunchConfig};
use crate::core::LifecycleState;
use crate::error::ProcessError;

pub(crate) enum Command {
    Start {
        ack: oneshot::Sender<LifecycleState>,
    },
    Stop {
        ack: oneshot::Sender<LifecycleState>,
    },
    Retry {
        ack: oneshot::Sender<LifecycleState>,
    },
    /// `ack` carries whether a resume was started.
    Resume {
        ack: oneshot::Sender<bool>,
    },
    Shutdown {
        ack: oneshot::Sender<()>,
    },
}

/// Loop results. Reports whose epoch differs from the actor's current run are dropped.
pub(crate) enum Report {
    /// `start()` succeeded with `config`.
    Started { epoch: u64, config: LaunchConfig },
    /// `start()` failed; retry `attempt` is scheduled.
    Retrying {
        epoch: u64,
        attempt: u32,
        error: ProcessError,
    },
    /// The start sequence ended without success.
    GaveUp { epoch: u64, error: ProcessError },
    /// One health poll finished.
    Health {
        epoch: u64,
        result: Result<HealthSnapshot, ProcessError>,
    },
    /// `stop()` returned.
    Stopped {
        epoch: u64,
        result: Result<(), ProcessError>,
    },
}

impl Report {
    pub(crate) fn epoch(&self) -> u64 {
        match self {
            Report::Started { epoch, .. }
            | Report::Retrying { epoch, .. }
            | Report::GaveUp { epoch, .. }
            | Report::Health { epoch, .. }
            | Report::Stopped { epoch, .. } => *epoch,
        }
    }
}
