//! Runtime core: the lifecycle state machine and its loops.
//!
//! The public API from this module is [`Supervisor`] (the handle),
//! [`SupervisorBuilder`] and the state types.
//!
//! Internal modules:
//! - [`actor`]: single writer of lifecycle state; owns runs, guard, store and notifier;
//! - [`launch`]: one start sequence with retry and backoff;
//! - [`health`]: periodic health polling while running;
//! - [`command`]: commands and loop reports consumed by the actor;
//! - [`supervisor`] / [`builder`]: the handle and how it is assembled.

mod actor;
mod builder;
mod command;
mod health;
mod launch;
mod state;
mod supervisor;

pub use builder::SupervisorBuilder;
pub use state::{CredentialLatch, HostVisibility, LifecycleState, SupervisorStatus};
pub use supervisor::Supervisor;
