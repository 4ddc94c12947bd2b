//! # LogWriter: events as `tracing` records
//!
//! A subscriber that turns every [`Event`] into a structured `tracing` record
//! under the `daemonvisor::events` target. Failures log at `warn`/`error`,
//! routine progress at `info`/`debug`.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO  daemonvisor::events: state changed state=starting
//! WARN  daemonvisor::events: start failed attempt=1 reason="spawn error: bind failed"
//! INFO  daemonvisor::events: backoff scheduled attempt=1 delay_ms=2000
//! ERROR daemonvisor::events: retries exhausted attempt=6 reason="spawn error: bind failed"
//! ```

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

const TARGET: &str = "daemonvisor::events";

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let state = e.state.map(|s| s.as_str());
        let reason = e.reason.as_deref();

        match e.kind {
            EventKind::StateChanged => {
                info!(target: TARGET, seq = e.seq, state, reason, "state changed");
            }
            EventKind::StartAttempt => {
                debug!(target: TARGET, seq = e.seq, attempt = e.attempt, "start attempt");
            }
            EventKind::StartFailed => {
                warn!(target: TARGET, seq = e.seq, attempt = e.attempt, reason, "start failed");
            }
            EventKind::BackoffScheduled => {
                info!(
                    target: TARGET,
                    seq = e.seq,
                    attempt = e.attempt,
                    delay_ms = e.delay_ms,
                    "backoff scheduled"
                );
            }
            EventKind::RetriesExhausted => {
                error!(target: TARGET, seq = e.seq, attempt = e.attempt, reason, "retries exhausted");
            }
            EventKind::StartRejected => {
                error!(target: TARGET, seq = e.seq, reason, "start rejected");
            }
            EventKind::StopFailed => {
                warn!(target: TARGET, seq = e.seq, reason, "stop failed");
            }
            EventKind::ResumeRequested => {
                info!(target: TARGET, seq = e.seq, "resuming after restart");
            }
            EventKind::ResumeSkipped => {
                debug!(target: TARGET, seq = e.seq, "nothing to resume");
            }
            EventKind::StoreFailed => {
                warn!(target: TARGET, seq = e.seq, reason, "recovery store write failed");
            }
            EventKind::CredentialRejected => {
                warn!(target: TARGET, seq = e.seq, reason, "credential rejected");
            }
            EventKind::HealthPolled => {
                debug!(target: TARGET, seq = e.seq, "health polled");
            }
            EventKind::HealthPollFailed => {
                warn!(target: TARGET, seq = e.seq, reason, "health poll failed");
            }
            EventKind::ConnectivityChanged => {
                info!(target: TARGET, seq = e.seq, validated = e.validated, "connectivity changed");
            }
            EventKind::VisibilityChanged => {
                debug!(target: TARGET, seq = e.seq, visibility = ?e.visibility, "visibility changed");
            }
            EventKind::GuardAcquired => {
                debug!(target: TARGET, seq = e.seq, timeout_ms = e.timeout_ms, "startup guard acquired");
            }
            EventKind::GuardReleased => {
                debug!(target: TARGET, seq = e.seq, "startup guard released");
            }
            EventKind::GuardExpired => {
                warn!(target: TARGET, seq = e.seq, "startup guard expired");
            }
            EventKind::SubscriberOverflow => {
                warn!(target: TARGET, seq = e.seq, subscriber = e.source.as_deref(), reason, "subscriber overflow");
            }
            EventKind::SubscriberPanicked => {
                error!(target: TARGET, seq = e.seq, subscriber = e.source.as_deref(), reason, "subscriber panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
