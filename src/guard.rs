//! # Startup resource guard.
//!
//! While a start sequence runs (attempts plus backoff sleeps) the host must not
//! suspend the CPU. [`StartupGuard`] wraps a host [`WakeLock`] and guarantees
//! the lock is released exactly once:
//!
//! - explicitly, via [`StartupGuard::release`] (success, give-up, stop)
//! - on timeout, after the hard deadline elapses
//! - on drop of the last clone (cancellation, panics, shutdown)

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::events::{Bus, Event, EventKind};

/// Host primitive that keeps the CPU awake.
pub trait WakeLock: Send + Sync + 'static {
    /// Acquires the lock. `timeout` is the guard's own deadline, for hosts whose
    /// primitive supports one natively.
    fn acquire(&self, timeout: Option<Duration>);

    /// Releases the lock.
    fn release(&self);
}

/// Wake lock for hosts without one.
#[derive(Debug, Default)]
pub struct NoopWakeLock;

impl WakeLock for NoopWakeLock {
    fn acquire(&self, _timeout: Option<Duration>) {}
    fn release(&self) {}
}

/// Shared RAII handle over an acquired [`WakeLock`].
///
/// Clones share the same underlying acquisition.
#[derive(Clone)]
pub struct StartupGuard {
    inner: Arc<Inner>,
}

struct Inner {
    lock: Arc<dyn WakeLock>,
    released: AtomicBool,
    bus: Bus,
    timer: CancellationToken,
}

impl StartupGuard {
    /// Acquires `lock`. With `deadline = Some(d)` the guard releases itself after `d`.
    ///
    /// Must be called inside a Tokio runtime when a deadline is given.
    pub fn acquire(lock: Arc<dyn WakeLock>, deadline: Option<Duration>, bus: Bus) -> Self {
        lock.acquire(deadline);

        let mut ev = Event::new(EventKind::GuardAcquired);
        if let Some(d) = deadline {
            ev = ev.with_timeout(d);
        }
        bus.publish(ev);

        let inner = Arc::new(Inner {
            lock,
            released: AtomicBool::new(false),
            bus,
            timer: CancellationToken::new(),
        });

        if let Some(d) = deadline {
            let weak = Arc::downgrade(&inner);
            let timer = inner.timer.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = timer.cancelled() => {}
                    _ = tokio::time::sleep(d) => {
                        if let Some(inner) = weak.upgrade() {
                            inner.release(true);
                        }
                    }
                }
            });
        }

        Self { inner }
    }

    /// Releases the lock. Returns `false` if it was already released.
    pub fn release(&self) -> bool {
        self.inner.release(false)
    }

    pub fn is_released(&self) -> bool {
        self.inner.released.load(Ordering::Acquire)
    }
}

impl Inner {
    fn release(&self, expired: bool) -> bool {
        if self.released.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.timer.cancel();
        self.lock.release();
        if expired {
            warn!("startup guard hit its deadline");
            self.bus.publish(Event::new(EventKind::GuardExpired));
        } else {
            debug!("startup guard released");
            self.bus.publish(Event::new(EventKind::GuardReleased));
        }
        true
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.release(false);
    }
}
