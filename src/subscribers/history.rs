//! # EventHistory: bounded buffer of recent events
//!
//! Keeps the last [`EventHistory::DEFAULT_CAPACITY`] events so a diagnostics
//! screen can show what happened before it was opened. The oldest event is
//! evicted when the buffer is full.
//!
//! The supervisor always registers one instance and exposes it through
//! [`Supervisor::recent_events`](crate::Supervisor::recent_events).

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::events::Event;
use crate::subscribers::Subscribe;

/// Ring buffer of recent events.
pub struct EventHistory {
    buf: Mutex<VecDeque<Event>>,
    capacity: usize,
}

impl EventHistory {
    /// Default number of retained events.
    pub const DEFAULT_CAPACITY: usize = 500;

    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Creates a buffer retaining at most `capacity` events (minimum 1).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buf: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Returns up to `limit` most recent events, oldest first.
    #[must_use]
    pub fn recent(&self, limit: usize) -> Vec<Event> {
        let Ok(buf) = self.buf.lock() else {
            return Vec::new();
        };
        let skip = buf.len().saturating_sub(limit);
        buf.iter().skip(skip).cloned().collect()
    }

    /// Number of retained events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.lock().map(|b| b.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&self, ev: &Event) {
        if let Ok(mut buf) = self.buf.lock() {
            if buf.len() >= self.capacity {
                buf.pop_front();
            }
            buf.push_back(ev.clone());
        }
    }
}

impl Default for EventHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Subscribe for EventHistory {
    async fn on_event(&self, ev: &Event) {
        self.push(ev);
    }

    fn name(&self) -> &'static str {
        "EventHistory"
    }

    fn queue_capacity(&self) -> usize {
        self.capacity
    }
}
