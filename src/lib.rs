//! # daemonvisor
//!
//! **Daemonvisor** supervises the lifecycle of one long-running background
//! worker process (the *managed process*) on behalf of a host application that
//! cannot keep the worker alive on its own.
//!
//! It decides when to start, stop and retry the process, persists just enough
//! state to resume it after the host restarts, throttles its status indicator
//! and exposes a small, race-free state machine to every caller.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   host UI / platform callbacks
//!     start · stop · retry · resume · set_visibility · connectivity().update()
//!            │
//!            ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Supervisor (cloneable handle)                                    │
//! │  - command queue (mpsc)          - status (watch)                 │
//! │  - EventHistory                  - credential latch               │
//! └──────────────────────────────┬────────────────────────────────────┘
//!                                ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Actor (single writer of LifecycleState)                          │
//! │  - RecoveryStore (plain + secret partitions)                      │
//! │  - StatusNotifier ──► StatusSink                                  │
//! │  - StartupGuard   ──► WakeLock                                    │
//! └──────┬───────────────────────────────────────┬────────────────────┘
//!        │ spawns per run (epoch + token)        │ spawns while Running
//!        ▼                                       ▼
//!  ┌──────────────┐                       ┌──────────────┐
//!  │  Launch loop │                       │  Health loop │
//!  │ (retry loop) │                       │ (5s / 60s)   │
//!  └──────┬───────┘                       └──────┬───────┘
//!         └──────────────┬───────────────────────┘
//!                        ▼
//!              ChannelWorker (FIFO, blocking pool)
//!                        ▼
//!              ProcessControlChannel (host)
//!
//!  all of the above ── publish(Event) ──► Bus ──► SubscriberSet ──► LogWriter, EventHistory, ...
//! ```
//!
//! ### Lifecycle
//! ```text
//! Stopped ──start──► Starting ──success──► Running ──stop──► Stopping ──► Stopped
//!                       │
//!                       ├─ failure ─► BackoffScheduled ─► sleep(2s, 4s, 8s, 16s, 30s) ─► retry
//!                       ├─ retries exhausted ─► Error ──retry──► Starting
//!                       └─ config error ──────► Error ──stop───► Stopped
//! ```
//!
//! ## Features
//! | Area              | Description                                                      | Key types                               |
//! |-------------------|------------------------------------------------------------------|-----------------------------------------|
//! | **Lifecycle**     | Single-writer state machine with start/stop/retry/resume.        | [`Supervisor`], [`LifecycleState`]      |
//! | **Retries**       | Exponential backoff with a bounded attempt count.                | [`RetryPolicy`], [`BackoffPolicy`]      |
//! | **Recovery**      | "Was intentionally running" record split into two partitions.    | [`RecoveryStore`], [`Partition`]        |
//! | **Status**        | Rate-limited indicator, immediate on state change.               | [`StatusNotifier`], [`StatusSink`]      |
//! | **Observability** | Event bus, subscribers, tracing, bounded history.                | [`Event`], [`Subscribe`], [`LogWriter`] |
//! | **Host hooks**    | Wake lock guard, visibility, validated-network signal.           | [`WakeLock`], [`ConnectivityObserver`]  |
//!
//! ## Example
//! ```rust
//! use std::path::PathBuf;
//! use std::sync::Arc;
//! use daemonvisor::{
//!     HealthSnapshot, LaunchConfig, LifecycleState, ProcessControlChannel, ProcessError,
//!     RecoveryStore, SupervisorBuilder, SupervisorConfig,
//! };
//!
//! struct Echo;
//!
//! impl ProcessControlChannel for Echo {
//!     fn start(&self, _cfg: &LaunchConfig) -> Result<(), ProcessError> { Ok(()) }
//!     fn stop(&self) -> Result<(), ProcessError> { Ok(()) }
//!     fn poll_health(&self) -> Result<HealthSnapshot, ProcessError> {
//!         Ok(HealthSnapshot { daemon_running: true, ..HealthSnapshot::default() })
//!     }
//!     fn send(&self, message: &str) -> Result<String, ProcessError> { Ok(message.to_string()) }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config_source = || -> Result<LaunchConfig, ProcessError> {
//!         Ok(LaunchConfig {
//!             parameters: "default_model = \"local\"".into(),
//!             data_dir: PathBuf::from("/tmp/daemonvisor-doc"),
//!             host: "127.0.0.1".into(),
//!             port: 42617,
//!         })
//!     };
//!
//!     let sup = SupervisorBuilder::new(
//!         SupervisorConfig::default(),
//!         Arc::new(Echo),
//!         Arc::new(config_source),
//!         RecoveryStore::in_memory(),
//!     )
//!     .build();
//!
//!     sup.start().await?;
//!     let mut status = sup.subscribe();
//!     status.wait_for(|s| s.state == LifecycleState::Running).await?;
//!
//!     assert_eq!(sup.send("ping").await?, "ping");
//!     sup.stop().await?;
//!     sup.shutdown().await?;
//!     Ok(())
//! }
//! ```

mod channel;
mod classify;
mod config;
mod connectivity;
mod core;
mod error;
mod events;
mod guard;
mod notifier;
mod policies;
mod store;
mod subscribers;

// ---- Public re-exports ----

pub use channel::{
    ChannelWorker, ComponentHealth, ConfigSource, HealthSnapshot, LaunchConfig,
    MAX_MESSAGE_BYTES, ProcessControlChannel, StartupParameters,
};
pub use classify::is_credential_rejection;
pub use config::SupervisorConfig;
pub use connectivity::ConnectivityObserver;
pub use self::core::{
    CredentialLatch, HostVisibility, LifecycleState, Supervisor, SupervisorBuilder,
    SupervisorStatus,
};
pub use error::{ProcessError, StoreError, SupervisorError};
pub use events::{Bus, Event, EventKind};
pub use guard::{NoopWakeLock, StartupGuard, WakeLock};
pub use notifier::{
    LogSink, StatusAction, StatusNotifier, StatusSink, StatusView, Tone, render, render_status,
};
pub use policies::{BackoffPolicy, RetryPolicy};
pub use store::{
    FilePartition, MemoryPartition, PLAIN_FILE, Partition, RecoveryRecord, RecoveryStore,
    SECRET_FILE,
};
pub use subscribers::{EventHistory, LogWriter, Subscribe, SubscriberSet};
