//! # Supervisor actor: the single writer of lifecycle state.
//!
//! Every state transition happens here, on one task. External commands and
//! loop reports are multiplexed in one `select!`:
//!
//! ```text
//!  Supervisor handles ── Command ──►┐
//!  Launch / Health loops ── Report ─┼──► Actor::run() ──► watch<SupervisorStatus>
//!  ConnectivityObserver ── watch ──►┘         │
//!                                             ├──► StatusNotifier ──► StatusSink
//!                                             ├──► RecoveryStore
//!                                             └──► Bus (StateChanged, ...)
//! ```
//!
//! ## Runs and epochs
//! Each start sequence is a *run*: an epoch number, a [`CancellationToken`]
//! shared by its launch and health loops, and the startup guard. Cancelling a
//! run bumps the epoch, so any report still in flight from the old loops is
//! discarded on arrival.
//!
//! ## Rules
//! - `start` is accepted only from `Stopped` / `Error`
//! - `retry` is accepted only from `Error`
//! - `stop` from `Stopped` does nothing; from `Error` it clears the resume
//!   intent without touching the channel; otherwise it passes through `Stopping`
//!   and always ends in `Stopped`
//! - the channel `stop()` runs off the actor; its result comes back as a
//!   report, and every `stop` ack waits for it
//! - `resume` is honoured once per actor lifetime
//! - store failures are logged and published, never fatal

use std::sync::Arc;

use tokio::{
    select,
    sync::{mpsc, oneshot, watch},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    channel::{ChannelWorker, ConfigSource},
    classify::is_credential_rejection,
    config::SupervisorConfig,
    core::{
        CredentialLatch, HostVisibility, LifecycleState, SupervisorStatus,
        command::{Command, Report},
        health::HealthLoop,
        launch::Launch,
    },
    error::ProcessError,
    events::{Bus, Event, EventKind},
    guard::{StartupGuard, WakeLock},
    notifier::StatusNotifier,
    store::RecoveryStore,
};

/// The current start sequence.
pub(crate) struct Run {
    token: CancellationToken,
    guard: Option<StartupGuard>,
}

impl Run {
    fn release_guard(&mut self) {
        if let Some(guard) = self.guard.take() {
            guard.release();
        }
    }
}

pub(crate) struct Actor {
    pub(crate) cfg: SupervisorConfig,
    pub(crate) commands: mpsc::Receiver<Command>,
    pub(crate) reports_tx: mpsc::UnboundedSender<Report>,
    pub(crate) reports_rx: mpsc::UnboundedReceiver<Report>,
    pub(crate) status: watch::Sender<SupervisorStatus>,
    pub(crate) visibility: watch::Receiver<HostVisibility>,
    pub(crate) connectivity: watch::Receiver<bool>,
    pub(crate) worker: ChannelWorker,
    pub(crate) config_source: Arc<dyn ConfigSource>,
    pub(crate) store: RecoveryStore,
    pub(crate) notifier: StatusNotifier,
    pub(crate) wake_lock: Arc<dyn WakeLock>,
    pub(crate) credential: CredentialLatch,
    pub(crate) bus: Bus,
    pub(crate) epoch: u64,
    pub(crate) run: Option<Run>,
    pub(crate) resumed: bool,
    /// Stop acks answered once the in-flight `stop()` reports back.
    pub(crate) stop_waiters: Vec<oneshot::Sender<LifecycleState>>,
}

impl Actor {
    /// Processes commands and reports until shutdown or until every handle is dropped.
    pub(crate) async fn run(mut self) {
        loop {
            select! {
                biased;

                cmd = self.commands.recv() => match cmd {
                    Some(Command::Shutdown { ack }) => {
                        self.shutdown();
                        let _ = ack.send(());
                        break;
                    }
                    Some(cmd) => self.handle(cmd),
                    None => {
                        self.shutdown();
                        break;
                    }
                },
                Some(report) = self.reports_rx.recv() => self.on_report(report),
                Ok(()) = self.connectivity.changed() => {
                    let validated = *self.connectivity.borrow_and_update();
                    self.update(|s| s.network_validated = validated);
                }
            }
        }
        debug!("supervisor actor exited");
    }

    fn handle(&mut self, cmd: Command) {
        match cmd {
            Command::Start { ack } => {
                self.request_start("start");
                let _ = ack.send(self.state());
            }
            Command::Retry { ack } => {
                if self.state() == LifecycleState::Error {
                    self.request_start("retry");
                } else {
                    debug!(state = %self.state(), "retry ignored");
                }
                let _ = ack.send(self.state());
            }
            Command::Stop { ack } => self.request_stop(ack),
            Command::Resume { ack } => {
                let resumed = self.resume();
                let _ = ack.send(resumed);
            }
            // Intercepted in `run`.
            Command::Shutdown { ack } => {
                let _ = ack.send(());
            }
        }
    }

    fn state(&self) -> LifecycleState {
        self.status.borrow().state
    }

    fn request_start(&mut self, origin: &'static str) {
        let state = self.state();
        if !state.accepts_start() {
            debug!(%state, origin, "start ignored");
            return;
        }
        self.cancel_run();

        let token = CancellationToken::new();
        let guard = StartupGuard::acquire(
            Arc::clone(&self.wake_lock),
            self.cfg.guard_deadline(),
            self.bus.clone(),
        );
        self.run = Some(Run {
            token: token.clone(),
            guard: Some(guard),
        });

        info!(origin, epoch = self.epoch, "start sequence begins");
        self.notifier.set_foreground(true);
        self.transition(LifecycleState::Starting, |s| s.retry_attempt = 0);

        let launch = Launch {
            epoch: self.epoch,
            worker: self.worker.clone(),
            config_source: Arc::clone(&self.config_source),
            policy: self.cfg.retry_policy(),
            bus: self.bus.clone(),
            reports: self.reports_tx.clone(),
            token,
        };
        tokio::spawn(launch.run());
    }

    fn request_stop(&mut self, ack: oneshot::Sender<LifecycleState>) {
        match self.state() {
            LifecycleState::Stopped => {
                debug!("stop ignored: already stopped");
                let _ = ack.send(LifecycleState::Stopped);
            }
            LifecycleState::Stopping => self.stop_waiters.push(ack),
            LifecycleState::Error => {
                self.cancel_run();
                self.clear_intent();
                self.notifier.set_foreground(false);
                self.transition(LifecycleState::Stopped, |s| s.retry_attempt = 0);
                let _ = ack.send(LifecycleState::Stopped);
            }
            LifecycleState::Starting | LifecycleState::Running => {
                self.cancel_run();
                self.clear_intent();
                self.transition(LifecycleState::Stopping, |_| {});
                self.stop_waiters.push(ack);

                // Queued on the worker now, behind any in-flight start().
                let stop = self.worker.stop();
                let epoch = self.epoch;
                let reports = self.reports_tx.clone();
                tokio::spawn(async move {
                    let result = stop.await;
                    let _ = reports.send(Report::Stopped { epoch, result });
                });
            }
        }
    }

    fn finish_stop(&mut self, result: Result<(), ProcessError>) {
        if let Err(e) = result {
            warn!(error = %e, label = e.as_label(), "stop failed; treating process as stopped");
            self.bus
                .publish(Event::new(EventKind::StopFailed).with_reason(e.to_string()));
        }

        self.notifier.set_foreground(false);
        self.transition(LifecycleState::Stopped, |s| {
            s.retry_attempt = 0;
            s.last_health = None;
            s.health_warning = None;
        });
        for ack in self.stop_waiters.drain(..) {
            let _ = ack.send(LifecycleState::Stopped);
        }
    }

    fn resume(&mut self) -> bool {
        if self.resumed {
            debug!("resume already handled");
            return false;
        }
        self.resumed = true;

        match self.store.try_restore() {
            Some(record) if self.state().accepts_start() => {
                info!(host = %record.host, port = record.port, "resuming after restart");
                self.bus.publish(Event::new(EventKind::ResumeRequested));
                self.request_start("resume");
                true
            }
            Some(_) => {
                debug!(state = %self.state(), "resume skipped: start already in progress");
                false
            }
            None => {
                self.bus.publish(Event::new(EventKind::ResumeSkipped));
                false
            }
        }
    }

    fn on_report(&mut self, report: Report) {
        if report.epoch() != self.epoch {
            debug!(epoch = report.epoch(), current = self.epoch, "stale report dropped");
            return;
        }
        match report {
            Report::Started { config, .. } => {
                if let Some(run) = self.run.as_mut() {
                    run.release_guard();
                }
                if let Err(e) = self
                    .store
                    .record_running(&config.parameters, &config.host, config.port)
                {
                    self.store_failed(&e);
                }
                self.transition(LifecycleState::Running, |s| {
                    s.retry_attempt = 0;
                    s.last_error = None;
                    s.health_warning = None;
                });
                self.spawn_health();
            }
            Report::Retrying { attempt, error, .. } => {
                self.flag_credentials(&error);
                self.update(|s| {
                    s.retry_attempt = attempt;
                    s.last_error = Some(error.to_string());
                });
            }
            Report::GaveUp { error, .. } => {
                self.flag_credentials(&error);
                warn!(error = %error, label = error.as_label(), "start sequence gave up");
                self.cancel_run();
                self.clear_intent();
                self.notifier.set_foreground(false);
                self.transition(LifecycleState::Error, |s| {
                    s.last_error = Some(error.to_string());
                });
            }
            Report::Stopped { result, .. } => self.finish_stop(result),
            Report::Health { result, .. } => {
                if self.state() != LifecycleState::Running {
                    return;
                }
                match result {
                    Ok(snapshot) => self.update(|s| {
                        s.last_health = Some(snapshot);
                        s.health_warning = None;
                    }),
                    Err(e) => self.update(|s| s.health_warning = Some(e.to_string())),
                }
            }
        }
    }

    fn spawn_health(&mut self) {
        let Some(run) = self.run.as_ref() else {
            return;
        };
        let health = HealthLoop {
            epoch: self.epoch,
            worker: self.worker.clone(),
            cfg: self.cfg.clone(),
            visibility: self.visibility.clone(),
            bus: self.bus.clone(),
            reports: self.reports_tx.clone(),
            token: run.token.clone(),
        };
        tokio::spawn(health.run());
    }

    /// Cancels both loops, releases the guard and invalidates pending reports.
    fn cancel_run(&mut self) {
        if let Some(mut run) = self.run.take() {
            run.token.cancel();
            run.release_guard();
        }
        self.epoch += 1;
    }

    fn clear_intent(&self) {
        if let Err(e) = self.store.record_stopped() {
            self.store_failed(&e);
        }
    }

    fn store_failed(&self, e: &crate::error::StoreError) {
        warn!(error = %e, label = e.as_label(), "recovery store write failed");
        self.bus
            .publish(Event::new(EventKind::StoreFailed).with_reason(e.to_string()));
    }

    fn flag_credentials(&self, error: &ProcessError) {
        flag_credentials(&self.credential, &self.bus, error);
    }

    fn shutdown(&mut self) {
        let state = self.state();
        info!(%state, "supervisor shutting down");
        self.cancel_run();
        for ack in self.stop_waiters.drain(..) {
            let _ = ack.send(state);
        }
    }

    /// Changes the state, publishes `StateChanged` and renders the indicator.
    fn transition(&mut self, next: LifecycleState, f: impl FnOnce(&mut SupervisorStatus)) {
        let prev = self.state();
        self.status.send_modify(|s| {
            s.state = next;
            f(s);
        });
        if prev != next {
            info!(from = %prev, to = %next, "lifecycle transition");
            let mut ev = Event::state_changed(next);
            if next == LifecycleState::Error {
                if let Some(err) = self.status.borrow().last_error.as_deref() {
                    ev = ev.with_reason(err);
                }
            }
            self.bus.publish(ev);
        }
        self.render();
    }

    /// Mutates the status without changing state.
    fn update(&mut self, f: impl FnOnce(&mut SupervisorStatus)) {
        self.status.send_modify(f);
        self.render();
    }

    fn render(&mut self) {
        let status = self.status.borrow().clone();
        self.notifier.publish_status(&status);
    }
}

/// Sets the credential latch when `error` looks like a credential rejection.
pub(crate) fn flag_credentials(latch: &CredentialLatch, bus: &Bus, error: &ProcessError) {
    let detail = error.detail();
    if is_credential_rejection(detail) {
        warn!(detail, "credential rejected by provider");
        latch.set(detail);
        bus.publish(Event::new(EventKind::CredentialRejected).with_reason(detail));
    }
}
