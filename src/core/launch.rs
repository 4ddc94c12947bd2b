//! # Launch loop: one start sequence with retries.
//!
//! Spawned by the actor for every start, retry and resume. Builds a fresh
//! configuration, then calls `start()` until it succeeds, fails terminally or
//! the retry policy runs out.
//!
//! ```text
//! build config ──err──► StartRejected ──► GaveUp
//!      │
//!      ▼
//! loop {
//!   ├─► publish StartAttempt
//!   ├─► worker.start(config) ──ok──► Started ──► return
//!   ├─► publish StartFailed
//!   ├─► not retryable ──► StartRejected ──► GaveUp ──► return
//!   ├─► policy.next_delay()
//!   │     ├─► None    → RetriesExhausted ──► GaveUp ──► return
//!   │     └─► Some(d) → BackoffScheduled ──► Retrying
//!   └─► sleep(d)  (cancellable)
//! }
//! ```
//!
//! ## Rules
//! - Attempts run sequentially; the configuration is built once per sequence
//! - Cancellation is observed while `start()` is in flight and during backoff;
//!   a cancelled loop sends nothing
//! - An in-flight `start()` keeps running on the worker after cancellation;
//!   the `stop()` that caused the cancellation is queued behind it

use std::sync::Arc;

use tokio::{select, sync::mpsc, time};
use tokio_util::sync::CancellationToken;

use crate::{
    channel::{ChannelWorker, ConfigSource, LaunchConfig},
    core::command::Report,
    error::ProcessError,
    events::{Bus, Event, EventKind},
    policies::RetryPolicy,
};

pub(crate) struct Launch {
    pub(crate) epoch: u64,
    pub(crate) worker: ChannelWorker,
    pub(crate) config_source: Arc<dyn ConfigSource>,
    pub(crate) policy: RetryPolicy,
    pub(crate) bus: Bus,
    pub(crate) reports: mpsc::UnboundedSender<Report>,
    pub(crate) token: CancellationToken,
}

impl Launch {
    pub(crate) async fn run(mut self) {
        let config = match self.build_config() {
            Ok(config) => config,
            Err(e) => return self.reject(e),
        };

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            self.bus
                .publish(Event::new(EventKind::StartAttempt).with_attempt(attempt));

            let res = select! {
                _ = self.token.cancelled() => return,
                r = self.worker.start(config.clone()) => r,
            };
            let err = match res {
                Ok(()) => {
                    let _ = self.reports.send(Report::Started {
                        epoch: self.epoch,
                        config,
                    });
                    return;
                }
                Err(e) => e,
            };

            self.bus.publish(
                Event::new(EventKind::StartFailed)
                    .with_attempt(attempt)
                    .with_reason(err.to_string()),
            );
            if !err.is_retryable() {
                return self.reject(err);
            }

            let Some(delay) = self.policy.next_delay() else {
                self.bus.publish(
                    Event::new(EventKind::RetriesExhausted)
                        .with_attempt(attempt)
                        .with_reason(err.to_string()),
                );
                let _ = self.reports.send(Report::GaveUp {
                    epoch: self.epoch,
                    error: err,
                });
                return;
            };

            let retry = self.policy.attempt();
            self.bus.publish(
                Event::new(EventKind::BackoffScheduled)
                    .with_attempt(retry)
                    .with_delay(delay)
                    .with_reason(err.to_string()),
            );
            let _ = self.reports.send(Report::Retrying {
                epoch: self.epoch,
                attempt: retry,
                error: err,
            });

            select! {
                _ = self.token.cancelled() => return,
                _ = time::sleep(delay) => {}
            }
        }
    }

    fn build_config(&self) -> Result<LaunchConfig, ProcessError> {
        let config = self.config_source.build()?;
        config.validate()?;
        Ok(config)
    }

    fn reject(&self, err: ProcessError) {
        self.bus.publish(Event::new(EventKind::StartRejected).with_reason(err.to_string()));
        let _ = self.reports.send(Report::GaveUp {
            epoch: self.epoch,
            error: err,
        });
    }
}
