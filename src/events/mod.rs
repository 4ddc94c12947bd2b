//! Supervisor events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: the supervisor actor, `LaunchLoop`, `HealthLoop`,
//!   `StartupGuard`, `ConnectivityObserver`, `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the supervisor's fan-out listener (feeds `SubscriberSet`)
//!   and anyone holding a receiver from [`Supervisor::events`](crate::Supervisor::events).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
