//! # Event subscribers for the supervisor.
//!
//! This module provides the [`Subscribe`] trait and built-in implementations
//! for handling events broadcast through the [`Bus`](crate::events::Bus).
//! Registering a subscriber is the supported way to observe the supervisor;
//! there is no ambient global state.
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   Actor/Loops ── publish(Event) ──► Bus ──► fan-out listener ──► SubscriberSet
//!                                                                      │
//!                                                   ┌──────────────┬───┴──────────┐
//!                                                   ▼              ▼              ▼
//!                                               LogWriter    EventHistory    custom ...
//! ```
//!
//! ## Built-ins
//! - [`LogWriter`]: maps events to `tracing` records
//! - [`EventHistory`]: bounded ring buffer of recent events (always registered)

mod history;
mod log;
mod set;
mod subscribe;

pub use history::EventHistory;
pub use log::LogWriter;
pub(crate) use set::panic_message;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
