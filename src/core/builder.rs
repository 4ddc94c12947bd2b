use std::sync::Arc;

use tokio::sync::{broadcast::error::RecvError, mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::{
    CredentialLatch, HostVisibility, SupervisorStatus, actor::Actor, supervisor::Supervisor,
};
use crate::{
    channel::{ChannelWorker, ConfigSource, ProcessControlChannel},
    config::SupervisorConfig,
    connectivity::ConnectivityObserver,
    events::Bus,
    guard::{NoopWakeLock, WakeLock},
    notifier::{LogSink, StatusNotifier, StatusSink},
    store::RecoveryStore,
    subscribers::{EventHistory, Subscribe, SubscriberSet},
};

/// Builder for constructing a [`Supervisor`] with optional host integrations.
pub struct SupervisorBuilder {
    cfg: SupervisorConfig,
    channel: Arc<dyn ProcessControlChannel>,
    config_source: Arc<dyn ConfigSource>,
    store: RecoveryStore,
    wake_lock: Arc<dyn WakeLock>,
    sink: Arc<dyn StatusSink>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl SupervisorBuilder {
    /// Creates a builder with the required collaborators.
    ///
    /// Defaults: [`NoopWakeLock`], [`LogSink`], no extra subscribers.
    pub fn new(
        cfg: SupervisorConfig,
        channel: Arc<dyn ProcessControlChannel>,
        config_source: Arc<dyn ConfigSource>,
        store: RecoveryStore,
    ) -> Self {
        Self {
            cfg,
            channel,
            config_source,
            store,
            wake_lock: Arc::new(NoopWakeLock),
            sink: Arc::new(LogSink),
            subscribers: Vec::new(),
        }
    }

    /// Sets the host wake lock held during start sequences.
    pub fn with_wake_lock(mut self, wake_lock: Arc<dyn WakeLock>) -> Self {
        self.wake_lock = wake_lock;
        self
    }

    /// Sets the host status indicator.
    pub fn with_status_sink(mut self, sink: Arc<dyn StatusSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Sets event subscribers.
    ///
    /// Subscribers receive every event through dedicated workers with bounded
    /// queues. An [`EventHistory`] is always registered in addition.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Spawns the actor, the channel worker and the subscriber fan-out, and
    /// returns the handle.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn build(self) -> Supervisor {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let runtime_token = CancellationToken::new();

        let history = Arc::new(EventHistory::new());
        let mut subs = self.subscribers;
        subs.push(history.clone());
        spawn_listener(SubscriberSet::new(subs, bus.clone()), &bus, runtime_token.clone());

        let worker = ChannelWorker::spawn(self.channel);
        let connectivity = ConnectivityObserver::new(bus.clone());
        let credential = CredentialLatch::default();

        let (status_tx, status_rx) = watch::channel(SupervisorStatus {
            network_validated: connectivity.is_validated(),
            ..SupervisorStatus::default()
        });
        let (visibility_tx, visibility_rx) = watch::channel(HostVisibility::default());
        let (cmd_tx, cmd_rx) = mpsc::channel(self.cfg.command_capacity_clamped());
        let (reports_tx, reports_rx) = mpsc::unbounded_channel();

        let actor = Actor {
            notifier: StatusNotifier::new(self.sink, self.cfg.min_update_interval),
            cfg: self.cfg,
            commands: cmd_rx,
            reports_tx,
            reports_rx,
            status: status_tx,
            visibility: visibility_rx,
            connectivity: connectivity.subscribe(),
            worker: worker.clone(),
            config_source: self.config_source,
            store: self.store,
            wake_lock: self.wake_lock,
            credential: credential.clone(),
            bus: bus.clone(),
            epoch: 0,
            run: None,
            resumed: false,
            stop_waiters: Vec::new(),
        };
        tokio::spawn(async move {
            actor.run().await;
            runtime_token.cancel();
        });

        Supervisor {
            commands: cmd_tx,
            status: status_rx,
            visibility: Arc::new(visibility_tx),
            connectivity,
            credential,
            history,
            worker,
            bus,
        }
    }
}

/// Forwards bus events to the subscriber set until the actor exits.
fn spawn_listener(set: SubscriberSet, bus: &Bus, token: CancellationToken) {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                ev = rx.recv() => match ev {
                    Ok(ev) => set.emit(&ev),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "subscriber listener lagged behind the bus");
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }
        while let Ok(ev) = rx.try_recv() {
            set.emit(&ev);
        }
        set.shutdown().await;
    });
}
