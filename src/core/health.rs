//! # Health-poll loop.
//!
//! Runs while the process is `Running`. Polls immediately, then every
//! [`SupervisorConfig::poll_interval`] for the current host visibility.
//! A visibility change re-arms the wait against the new interval, measured
//! from the previous poll.
//!
//! Poll failures are reported and published; deciding what they mean is the
//! actor's job (it never changes state because of them).

use tokio::{select, sync::mpsc, sync::watch, time};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::{
    channel::ChannelWorker,
    config::SupervisorConfig,
    core::{HostVisibility, command::Report},
    events::{Bus, Event, EventKind},
};

pub(crate) struct HealthLoop {
    pub(crate) epoch: u64,
    pub(crate) worker: ChannelWorker,
    pub(crate) cfg: SupervisorConfig,
    pub(crate) visibility: watch::Receiver<HostVisibility>,
    pub(crate) bus: Bus,
    pub(crate) reports: mpsc::UnboundedSender<Report>,
    pub(crate) token: CancellationToken,
}

impl HealthLoop {
    pub(crate) async fn run(mut self) {
        loop {
            let polled_at = time::Instant::now();
            let result = select! {
                _ = self.token.cancelled() => return,
                r = self.worker.poll_health() => r,
            };
            match &result {
                Ok(_) => self.bus.publish(Event::new(EventKind::HealthPolled)),
                Err(e) => {
                    warn!(error = %e, label = e.as_label(), "health poll failed");
                    self.bus
                        .publish(Event::new(EventKind::HealthPollFailed).with_reason(e.to_string()));
                }
            }
            let report = Report::Health {
                epoch: self.epoch,
                result,
            };
            if self.reports.send(report).is_err() {
                return;
            }

            loop {
                let interval = self.cfg.poll_interval(*self.visibility.borrow_and_update());
                select! {
                    _ = self.token.cancelled() => return,
                    _ = time::sleep_until(polled_at + interval) => break,
                    changed = self.visibility.changed() => {
                        if changed.is_err() {
                            return;
                        }
                    }
                }
            }
        }
    }
}
