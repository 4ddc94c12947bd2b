//! Test doubles and helpers shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::mpsc as std_mpsc;
use std::time::Duration;

use daemonvisor::{
    Event, EventKind, HealthSnapshot, LaunchConfig, LifecycleState, ProcessControlChannel,
    ProcessError, RecoveryStore, StatusSink, StatusView, Supervisor, SupervisorBuilder,
    SupervisorConfig, SupervisorStatus, WakeLock,
};
use tokio::sync::broadcast;

/// Upper bound for any wait in virtual time.
pub const WAIT: Duration = Duration::from_secs(600);

pub fn spawn_error(detail: &str) -> ProcessError {
    ProcessError::Spawn {
        detail: detail.to_string(),
    }
}

/// Scriptable channel: queued start failures, switchable health result.
#[derive(Default)]
pub struct MockChannel {
    pub start_failures: Mutex<VecDeque<ProcessError>>,
    pub always_fail: Mutex<Option<ProcessError>>,
    pub health_error: Mutex<Option<ProcessError>>,
    pub stop_error: Mutex<Option<ProcessError>>,
    pub started_with: Mutex<Vec<LaunchConfig>>,
    pub start_calls: AtomicU32,
    pub stop_calls: AtomicU32,
    pub poll_calls: AtomicU32,
    pub double_starts: AtomicU32,
    pub running: AtomicBool,
    /// When set, `start()` blocks until the paired sender fires or is dropped.
    pub start_gate: Mutex<Option<std_mpsc::Receiver<()>>>,
}

impl MockChannel {
    pub fn failing_times(n: usize, detail: &str) -> Self {
        let chan = Self::default();
        chan.start_failures
            .lock()
            .unwrap()
            .extend((0..n).map(|_| spawn_error(detail)));
        chan
    }

    pub fn always_failing(err: ProcessError) -> Self {
        let chan = Self::default();
        *chan.always_fail.lock().unwrap() = Some(err);
        chan
    }

    /// A channel whose first `start()` blocks until the returned sender is used.
    pub fn gated() -> (Self, std_mpsc::Sender<()>) {
        let (tx, rx) = std_mpsc::channel();
        let chan = Self::default();
        *chan.start_gate.lock().unwrap() = Some(rx);
        (chan, tx)
    }

    pub fn starts(&self) -> u32 {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> u32 {
        self.stop_calls.load(Ordering::SeqCst)
    }

    pub fn polls(&self) -> u32 {
        self.poll_calls.load(Ordering::SeqCst)
    }
}

impl ProcessControlChannel for MockChannel {
    fn start(&self, config: &LaunchConfig) -> Result<(), ProcessError> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.start_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.recv();
        }
        if let Some(err) = self.always_fail.lock().unwrap().clone() {
            return Err(err);
        }
        if let Some(err) = self.start_failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        if self.running.swap(true, Ordering::SeqCst) {
            self.double_starts.fetch_add(1, Ordering::SeqCst);
            return Err(ProcessError::State {
                detail: "daemon already running".into(),
            });
        }
        self.started_with.lock().unwrap().push(config.clone());
        Ok(())
    }

    fn stop(&self) -> Result<(), ProcessError> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
        match self.stop_error.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn poll_health(&self) -> Result<HealthSnapshot, ProcessError> {
        self.poll_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.health_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(HealthSnapshot {
            daemon_running: self.running.load(Ordering::SeqCst),
            pid: 4242,
            uptime_seconds: 1,
            components: Vec::new(),
        })
    }

    fn send(&self, message: &str) -> Result<String, ProcessError> {
        if message.contains("reject") {
            return Err(ProcessError::Spawn {
                detail: "provider returned 401 Unauthorized".into(),
            });
        }
        Ok(format!("echo: {message}"))
    }
}

/// Config source producing `gen-<n>` parameters on the n-th build.
#[derive(Default)]
pub struct MockConfig {
    pub builds: AtomicU32,
    pub fail_with: Mutex<Option<ProcessError>>,
    pub port: Mutex<Option<u16>>,
}

impl MockConfig {
    pub fn builds(&self) -> u32 {
        self.builds.load(Ordering::SeqCst)
    }
}

impl daemonvisor::ConfigSource for MockConfig {
    fn build(&self) -> Result<LaunchConfig, ProcessError> {
        let n = self.builds.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(err) = self.fail_with.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(LaunchConfig {
            parameters: format!("gen-{n}").into(),
            data_dir: PathBuf::from("/data/daemonvisor"),
            host: "127.0.0.1".into(),
            port: self.port.lock().unwrap().unwrap_or(42617),
        })
    }
}

#[derive(Default)]
pub struct CountingWakeLock {
    pub acquired: AtomicU32,
    pub released: AtomicU32,
}

impl CountingWakeLock {
    pub fn counts(&self) -> (u32, u32) {
        (
            self.acquired.load(Ordering::SeqCst),
            self.released.load(Ordering::SeqCst),
        )
    }
}

impl WakeLock for CountingWakeLock {
    fn acquire(&self, _timeout: Option<Duration>) {
        self.acquired.fetch_add(1, Ordering::SeqCst);
    }

    fn release(&self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub views: Mutex<Vec<StatusView>>,
    pub foreground: Mutex<Vec<bool>>,
}

impl RecordingSink {
    pub fn last_view(&self) -> Option<StatusView> {
        self.views.lock().unwrap().last().cloned()
    }

    pub fn last_foreground(&self) -> Option<bool> {
        self.foreground.lock().unwrap().last().copied()
    }
}

impl StatusSink for RecordingSink {
    fn show(&self, view: &StatusView) {
        self.views.lock().unwrap().push(view.clone());
    }

    fn set_foreground(&self, active: bool) {
        self.foreground.lock().unwrap().push(active);
    }
}

/// A supervisor wired to mocks.
pub struct Harness {
    pub sup: Supervisor,
    pub channel: Arc<MockChannel>,
    pub config: Arc<MockConfig>,
    pub lock: Arc<CountingWakeLock>,
    pub sink: Arc<RecordingSink>,
    pub store: RecoveryStore,
}

impl Harness {
    pub fn new(channel: MockChannel) -> Self {
        Self::with_store(channel, RecoveryStore::in_memory())
    }

    pub fn with_store(channel: MockChannel, store: RecoveryStore) -> Self {
        Self::build(channel, MockConfig::default(), store, SupervisorConfig::default())
    }

    pub fn build(
        channel: MockChannel,
        config: MockConfig,
        store: RecoveryStore,
        cfg: SupervisorConfig,
    ) -> Self {
        init_tracing();
        let channel = Arc::new(channel);
        let config = Arc::new(config);
        let lock = Arc::new(CountingWakeLock::default());
        let sink = Arc::new(RecordingSink::default());

        let sup = SupervisorBuilder::new(cfg, channel.clone(), config.clone(), store.clone())
            .with_wake_lock(lock.clone())
            .with_status_sink(sink.clone())
            .build();

        Self {
            sup,
            channel,
            config,
            lock,
            sink,
            store,
        }
    }

    pub async fn wait_state(&self, state: LifecycleState) -> SupervisorStatus {
        self.wait_for(|s| s.state == state).await
    }

    pub async fn wait_for(&self, f: impl FnMut(&SupervisorStatus) -> bool) -> SupervisorStatus {
        let mut rx = self.sup.subscribe();
        let status = tokio::time::timeout(WAIT, rx.wait_for(f))
            .await
            .expect("timed out waiting for status")
            .expect("supervisor closed");
        status.clone()
    }
}

/// Waits for the first event of `kind`.
pub async fn next_event(rx: &mut broadcast::Receiver<Event>, kind: EventKind) -> Event {
    tokio::time::timeout(WAIT, async {
        loop {
            let ev = rx.recv().await.expect("bus closed");
            if ev.kind == kind {
                return ev;
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

/// Drains everything already buffered in `rx`.
pub fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut out = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        out.push(ev);
    }
    out
}

pub fn backoff_delays(events: &[Event]) -> Vec<u32> {
    events
        .iter()
        .filter(|e| e.kind == EventKind::BackoffScheduled)
        .filter_map(|e| e.delay_ms)
        .collect()
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
