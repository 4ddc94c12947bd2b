//! # Validated-network signal.
//!
//! The host reports whether it currently has a validated, internet-capable
//! network path. The supervisor mirrors the flag into
//! [`SupervisorStatus::network_validated`](crate::SupervisorStatus) and logs
//! transitions. It never starts, stops or retries anything because of it.

use tokio::sync::watch;
use tracing::info;

use crate::events::{Bus, Event, EventKind};

/// Cloneable handle for host connectivity callbacks.
#[derive(Clone, Debug)]
pub struct ConnectivityObserver {
    tx: watch::Sender<bool>,
    bus: Bus,
}

impl ConnectivityObserver {
    pub(crate) fn new(bus: Bus) -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx, bus }
    }

    /// Records the latest validated-network value. Repeated values are ignored.
    pub fn update(&self, validated: bool) {
        let changed = self.tx.send_if_modified(|cur| {
            if *cur == validated {
                false
            } else {
                *cur = validated;
                true
            }
        });
        if changed {
            info!(validated, "network connectivity changed");
            self.bus
                .publish(Event::new(EventKind::ConnectivityChanged).with_validated(validated));
        }
    }

    /// Current value.
    pub fn is_validated(&self) -> bool {
        *self.tx.borrow()
    }

    /// Receiver notified on every change.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}
