//! # Supervisor: the public handle.
//!
//! [`Supervisor`] is a cheap, cloneable handle to the actor task spawned by
//! [`SupervisorBuilder::build`](crate::SupervisorBuilder::build).
//!
//! ## Command surface
//! - [`start`](Supervisor::start) / [`stop`](Supervisor::stop) / [`retry`](Supervisor::retry)
//! - [`resume`](Supervisor::resume): the single cold-start entry point
//! - [`shutdown`](Supervisor::shutdown): end the supervisor, keep the recovery record
//! - [`send`](Supervisor::send): message the running process
//!
//! ## Observable surface
//! - [`status`](Supervisor::status) / [`subscribe`](Supervisor::subscribe): `watch`-backed status
//! - [`events`](Supervisor::events): raw event stream
//! - [`recent_events`](Supervisor::recent_events): bounded history
//! - [`take_credential_rejection`](Supervisor::take_credential_rejection): one-shot latch
//!
//! ## Example
//! ```rust,no_run
//! use std::path::PathBuf;
//! use std::sync::Arc;
//! use daemonvisor::{
//!     HealthSnapshot, LaunchConfig, ProcessControlChannel, ProcessError, RecoveryStore,
//!     SupervisorBuilder, SupervisorConfig,
//! };
//!
//! struct Runtime;
//!
//! impl ProcessControlChannel for Runtime {
//!     fn start(&self, _cfg: &LaunchConfig) -> Result<(), ProcessError> { Ok(()) }
//!     fn stop(&self) -> Result<(), ProcessError> { Ok(()) }
//!     fn poll_health(&self) -> Result<HealthSnapshot, ProcessError> {
//!         Ok(HealthSnapshot::default())
//!     }
//!     fn send(&self, m: &str) -> Result<String, ProcessError> { Ok(m.into()) }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config_source = || -> Result<LaunchConfig, ProcessError> {
//!         Ok(LaunchConfig {
//!             parameters: "default_model = \"local\"".into(),
//!             data_dir: PathBuf::from("/var/lib/app"),
//!             host: "127.0.0.1".into(),
//!             port: 42617,
//!         })
//!     };
//!
//!     let sup = SupervisorBuilder::new(
//!         SupervisorConfig::default(),
//!         Arc::new(Runtime),
//!         Arc::new(config_source),
//!         RecoveryStore::open_dir("/var/lib/app"),
//!     )
//!     .build();
//!
//!     if !sup.resume().await? {
//!         sup.start().await?;
//!     }
//!     println!("{:?}", sup.status().state);
//!     sup.shutdown().await?;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot, watch};

use crate::{
    channel::ChannelWorker,
    connectivity::ConnectivityObserver,
    core::{
        CredentialLatch, HostVisibility, LifecycleState, SupervisorStatus, actor::flag_credentials,
        command::Command,
    },
    error::SupervisorError,
    events::{Bus, Event, EventKind},
    subscribers::EventHistory,
};

/// Handle to a running lifecycle supervisor.
#[derive(Clone)]
pub struct Supervisor {
    pub(crate) commands: mpsc::Sender<Command>,
    pub(crate) status: watch::Receiver<SupervisorStatus>,
    pub(crate) visibility: Arc<watch::Sender<HostVisibility>>,
    pub(crate) connectivity: ConnectivityObserver,
    pub(crate) credential: CredentialLatch,
    pub(crate) history: Arc<EventHistory>,
    pub(crate) worker: ChannelWorker,
    pub(crate) bus: Bus,
}

impl Supervisor {
    /// Requests a start. Returns the state after the request was handled
    /// (`Starting` when accepted, the unchanged state otherwise).
    pub async fn start(&self) -> Result<LifecycleState, SupervisorError> {
        self.request(|ack| Command::Start { ack }).await
    }

    /// Requests a stop and waits until the process is stopped.
    ///
    /// Stopping an already stopped supervisor is a no-op.
    pub async fn stop(&self) -> Result<LifecycleState, SupervisorError> {
        self.request(|ack| Command::Stop { ack }).await
    }

    /// Restarts a start sequence from `Error` with freshly built configuration.
    pub async fn retry(&self) -> Result<LifecycleState, SupervisorError> {
        self.request(|ack| Command::Retry { ack }).await
    }

    /// Resumes the process if the recovery record says it was intentionally running.
    ///
    /// Returns `true` when a start sequence was begun. Only the first call per
    /// supervisor does anything.
    pub async fn resume(&self) -> Result<bool, SupervisorError> {
        self.request(|ack| Command::Resume { ack }).await
    }

    /// Ends the supervisor: cancels both loops and releases the startup guard.
    ///
    /// The managed process is not stopped and the recovery record is left
    /// intact, so the next cold-start can resume. Later calls on any handle
    /// return [`SupervisorError::Closed`].
    pub async fn shutdown(&self) -> Result<(), SupervisorError> {
        self.request(|ack| Command::Shutdown { ack }).await
    }

    /// Sends a message to the running process and returns its reply.
    ///
    /// Not serialized behind lifecycle commands. Fails with
    /// [`SupervisorError::NotRunning`] unless the state is `Running`.
    pub async fn send(&self, message: impl Into<String>) -> Result<String, SupervisorError> {
        if self.status.borrow().state != LifecycleState::Running {
            return Err(SupervisorError::NotRunning);
        }
        self.worker.send(message.into()).await.map_err(|e| {
            flag_credentials(&self.credential, &self.bus, &e);
            SupervisorError::Process(e)
        })
    }

    /// Current status snapshot.
    pub fn status(&self) -> SupervisorStatus {
        self.status.borrow().clone()
    }

    /// Receiver notified on every status change.
    pub fn subscribe(&self) -> watch::Receiver<SupervisorStatus> {
        self.status.clone()
    }

    /// Raw event stream (only events published after this call).
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Up to `limit` most recent events, oldest first.
    pub fn recent_events(&self, limit: usize) -> Vec<Event> {
        self.history.recent(limit)
    }

    /// Reports host visibility; selects the health-poll interval.
    pub fn set_visibility(&self, visibility: HostVisibility) {
        let changed = self.visibility.send_if_modified(|cur| {
            if *cur == visibility {
                false
            } else {
                *cur = visibility;
                true
            }
        });
        if changed {
            self.bus
                .publish(Event::new(EventKind::VisibilityChanged).with_visibility(visibility));
        }
    }

    /// Handle for host network callbacks.
    pub fn connectivity(&self) -> &ConnectivityObserver {
        &self.connectivity
    }

    /// Returns the pending credential-rejection detail, clearing it.
    pub fn take_credential_rejection(&self) -> Option<String> {
        self.credential.take()
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, SupervisorError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(make(tx))
            .await
            .map_err(|_| SupervisorError::Closed)?;
        rx.await.map_err(|_| SupervisorError::Closed)
    }
}
