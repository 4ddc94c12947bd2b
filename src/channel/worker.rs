//! # Serialized executor for blocking channel calls.
//!
//! [`ChannelWorker`] owns one dispatcher task. Lifecycle calls (`start`,
//! `stop`, `poll_health`) are queued to it as boxed jobs; the dispatcher runs
//! each job on the blocking thread pool and waits for it before taking the
//! next one. A `stop()` submitted while a `start()` is still running therefore
//! executes after that `start()` returns.
//!
//! ## Rules
//! - Submission happens when the call is made, not when the returned future is polled
//! - A panic inside the channel becomes [`ProcessError::InternalPanic`]; the dispatcher survives
//! - If the dispatcher is gone, calls fail with [`ProcessError::StateCorrupted`]
//! - `send` bypasses the queue (its own `spawn_blocking`), so a long `start`
//!   never delays a user message
//! - The dispatcher exits once every worker handle is dropped

use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use super::{HealthSnapshot, LaunchConfig, ProcessControlChannel};
use crate::error::ProcessError;
use crate::subscribers::panic_message;

/// Largest message accepted by [`ChannelWorker::send`] (1 MiB).
pub const MAX_MESSAGE_BYTES: usize = 1_048_576;

type Job = Box<dyn FnOnce(&dyn ProcessControlChannel) + Send>;

/// Serializing executor for a [`ProcessControlChannel`].
#[derive(Clone)]
pub struct ChannelWorker {
    jobs: mpsc::UnboundedSender<Job>,
    channel: Arc<dyn ProcessControlChannel>,
}

impl ChannelWorker {
    /// Spawns the dispatcher task. Must be called inside a Tokio runtime.
    pub fn spawn(channel: Arc<dyn ProcessControlChannel>) -> Self {
        let (jobs, mut rx) = mpsc::unbounded_channel::<Job>();
        let dispatch_channel = Arc::clone(&channel);
        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                let ch = Arc::clone(&dispatch_channel);
                if let Err(e) = tokio::task::spawn_blocking(move || job(ch.as_ref())).await {
                    tracing::error!(error = %e, "channel job aborted");
                }
            }
            tracing::debug!("channel worker exiting");
        });
        Self { jobs, channel }
    }

    /// Queues `f` behind earlier calls and returns a future for its result.
    pub fn call<T, F>(&self, f: F) -> impl Future<Output = Result<T, ProcessError>> + Send + 'static
    where
        T: Send + 'static,
        F: FnOnce(&dyn ProcessControlChannel) -> Result<T, ProcessError> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job = Box::new(move |ch: &dyn ProcessControlChannel| {
            let res = catch_unwind(AssertUnwindSafe(|| f(ch))).unwrap_or_else(|payload| {
                Err(ProcessError::InternalPanic {
                    detail: panic_message(&*payload),
                })
            });
            let _ = tx.send(res);
        });
        let submitted = self.jobs.send(job).is_ok();

        async move {
            if !submitted {
                return Err(ProcessError::corrupted("channel worker is gone"));
            }
            rx.await
                .map_err(|_| ProcessError::corrupted("channel worker dropped the call"))?
        }
    }

    pub fn start(
        &self,
        config: LaunchConfig,
    ) -> impl Future<Output = Result<(), ProcessError>> + Send + 'static {
        self.call(move |ch| ch.start(&config))
    }

    pub fn stop(&self) -> impl Future<Output = Result<(), ProcessError>> + Send + 'static {
        self.call(|ch| ch.stop())
    }

    pub fn poll_health(
        &self,
    ) -> impl Future<Output = Result<HealthSnapshot, ProcessError>> + Send + 'static {
        self.call(|ch| ch.poll_health())
    }

    /// Sends `message` on a blocking-pool thread, outside the lifecycle queue.
    ///
    /// Messages over [`MAX_MESSAGE_BYTES`] are rejected with
    /// [`ProcessError::Config`] before reaching the channel.
    pub async fn send(&self, message: String) -> Result<String, ProcessError> {
        if message.len() > MAX_MESSAGE_BYTES {
            return Err(ProcessError::config(format!(
                "message too large ({} bytes, max {MAX_MESSAGE_BYTES})",
                message.len()
            )));
        }
        let ch = Arc::clone(&self.channel);
        let joined =
            tokio::task::spawn_blocking(move || catch_unwind(AssertUnwindSafe(|| ch.send(&message))))
                .await;
        match joined {
            Ok(Ok(res)) => res,
            Ok(Err(payload)) => Err(ProcessError::InternalPanic {
                detail: panic_message(&*payload),
            }),
            Err(join_err) => Err(ProcessError::InternalPanic {
                detail: join_err.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct Slow {
        log: Mutex<Vec<&'static str>>,
    }

    impl ProcessControlChannel for Slow {
        fn start(&self, _cfg: &LaunchConfig) -> Result<(), ProcessError> {
            std::thread::sleep(Duration::from_millis(50));
            self.log.lock().unwrap().push("start");
            Ok(())
        }
        fn stop(&self) -> Result<(), ProcessError> {
            self.log.lock().unwrap().push("stop");
            Ok(())
        }
        fn poll_health(&self) -> Result<HealthSnapshot, ProcessError> {
            panic!("health exploded");
        }
        fn send(&self, message: &str) -> Result<String, ProcessError> {
            Ok(format!("echo: {message}"))
        }
    }

    fn cfg() -> LaunchConfig {
        LaunchConfig {
            parameters: "".into(),
            data_dir: PathBuf::from("/data"),
            host: "127.0.0.1".into(),
            port: 42617,
        }
    }

    #[tokio::test]
    async fn stop_queued_during_start_runs_after_it() {
        let channel = Arc::new(Slow::default());
        let worker = ChannelWorker::spawn(channel.clone());

        let start = worker.start(cfg());
        let stop = worker.stop();
        let (a, b) = tokio::join!(stop, start);
        assert!(a.is_ok() && b.is_ok());

        assert_eq!(*channel.log.lock().unwrap(), vec!["start", "stop"]);
    }

    #[tokio::test]
    async fn panic_becomes_internal_panic_and_worker_survives() {
        let worker = ChannelWorker::spawn(Arc::new(Slow::default()));

        let err = worker.poll_health().await.unwrap_err();
        assert_eq!(
            err,
            ProcessError::InternalPanic {
                detail: "health exploded".into()
            }
        );
        assert!(worker.stop().await.is_ok());
    }

    #[tokio::test]
    async fn send_enforces_size_limit() {
        let worker = ChannelWorker::spawn(Arc::new(Slow::default()));

        assert_eq!(worker.send("hi".into()).await.unwrap(), "echo: hi");

        let big = "x".repeat(MAX_MESSAGE_BYTES + 1);
        let err = worker.send(big).await.unwrap_err();
        assert!(matches!(err, ProcessError::Config { .. }));
    }
}
