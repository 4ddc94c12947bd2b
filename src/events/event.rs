//! # Runtime events emitted by the supervisor.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Lifecycle events**: state transitions, start attempts, backoff, exhaustion
//! - **Health events**: poll results and failures while running
//! - **Host events**: connectivity, visibility, startup guard
//! - **Subscriber events**: overflow and panics in the fan-out
//!
//! The [`Event`] struct carries additional metadata such as the lifecycle state,
//! attempt number, backoff delay and a human-readable reason.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use daemonvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::BackoffScheduled)
//!     .with_attempt(2)
//!     .with_delay(Duration::from_secs(4))
//!     .with_reason("spawn error: bind failed");
//!
//! assert_eq!(ev.kind, EventKind::BackoffScheduled);
//! assert_eq!(ev.delay_ms, Some(4_000));
//! assert_eq!(ev.reason.as_deref(), Some("spawn error: bind failed"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::core::{HostVisibility, LifecycleState};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Lifecycle events ===
    /// Lifecycle state changed.
    ///
    /// Sets:
    /// - `state`: the new state
    /// - `reason`: error detail when entering `Error`
    StateChanged,

    /// A `start()` call is about to be issued.
    ///
    /// Sets:
    /// - `attempt`: attempt number (1-based, per start sequence)
    StartAttempt,

    /// A `start()` call failed.
    ///
    /// Sets:
    /// - `attempt`: attempt number
    /// - `reason`: failure message
    StartFailed,

    /// Next start attempt scheduled after a failure.
    ///
    /// Sets:
    /// - `attempt`: retries consumed so far (1-based)
    /// - `delay_ms`: delay before the next attempt (ms)
    /// - `reason`: last failure message
    BackoffScheduled,

    /// Retry policy exhausted; supervisor gives up.
    ///
    /// Sets:
    /// - `attempt`: last attempt number
    /// - `reason`: last failure message
    RetriesExhausted,

    /// Start failed with a non-retryable error (bad configuration).
    ///
    /// Sets:
    /// - `reason`: failure message
    StartRejected,

    /// `stop()` on the channel failed; state still moves to `Stopped`.
    ///
    /// Sets:
    /// - `reason`: failure message
    StopFailed,

    /// Cold-start resume found a record and is starting the process.
    ResumeRequested,

    /// Cold-start resume found nothing to resume.
    ResumeSkipped,

    /// Writing the recovery record failed.
    ///
    /// Sets:
    /// - `reason`: store error
    StoreFailed,

    /// A failure detail matched the credential-rejection patterns.
    ///
    /// Sets:
    /// - `reason`: the matching detail
    CredentialRejected,

    // === Health events ===
    /// Health poll succeeded.
    HealthPolled,

    /// Health poll failed (no state change).
    ///
    /// Sets:
    /// - `reason`: failure message
    HealthPollFailed,

    // === Host events ===
    /// Validated-network signal changed.
    ///
    /// Sets:
    /// - `validated`: new value
    ConnectivityChanged,

    /// Host visibility changed.
    ///
    /// Sets:
    /// - `visibility`: new value
    VisibilityChanged,

    /// Startup guard acquired.
    ///
    /// Sets:
    /// - `timeout_ms`: hard timeout, if any
    GuardAcquired,

    /// Startup guard released.
    GuardReleased,

    /// Startup guard hit its hard timeout and released itself.
    GuardExpired,

    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `source`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `source`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Lifecycle state, for `StateChanged`.
    pub state: Option<LifecycleState>,
    /// Attempt count (starting from 1).
    pub attempt: Option<u32>,
    /// Backoff delay before next attempt in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Guard timeout in milliseconds (compact).
    pub timeout_ms: Option<u32>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Name of the emitting subscriber, for subscriber events.
    pub source: Option<Arc<str>>,
    /// Validated-network flag, for `ConnectivityChanged`.
    pub validated: Option<bool>,
    /// Host visibility, for `VisibilityChanged`.
    pub visibility: Option<HostVisibility>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            state: None,
            attempt: None,
            delay_ms: None,
            timeout_ms: None,
            reason: None,
            source: None,
            validated: None,
            visibility: None,
        }
    }

    /// Attaches a lifecycle state.
    #[inline]
    pub fn with_state(mut self, state: LifecycleState) -> Self {
        self.state = Some(state);
        self
    }

    /// Attaches an attempt count.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a backoff delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay_ms = Some(compact_ms(d));
        self
    }

    /// Attaches a timeout duration (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        self.timeout_ms = Some(compact_ms(d));
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches the validated-network flag.
    #[inline]
    pub fn with_validated(mut self, validated: bool) -> Self {
        self.validated = Some(validated);
        self
    }

    /// Attaches host visibility.
    #[inline]
    pub fn with_visibility(mut self, visibility: HostVisibility) -> Self {
        self.visibility = Some(visibility);
        self
    }

    /// Creates a `StateChanged` event.
    #[inline]
    pub fn state_changed(state: LifecycleState) -> Self {
        Event::new(EventKind::StateChanged).with_state(state)
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        let mut ev = Event::new(EventKind::SubscriberOverflow)
            .with_reason(format!("subscriber={subscriber} reason={reason}"));
        ev.source = Some(subscriber.into());
        ev
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        let mut ev = Event::new(EventKind::SubscriberPanicked).with_reason(info);
        ev.source = Some(subscriber.into());
        ev
    }
}

fn compact_ms(d: Duration) -> u32 {
    d.as_millis().min(u128::from(u32::MAX)) as u32
}
