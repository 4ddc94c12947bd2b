//! # Rate-limited status indicator.
//!
//! [`StatusNotifier`] turns lifecycle state into a [`StatusView`] and hands it to
//! the host's [`StatusSink`] (a persistent notification, a tray icon, a status line).
//!
//! ## Throttle
//! ```text
//! publish(state, detail)
//!   ├─ state != last shown state         → show now
//!   ├─ now - last shown >= min interval  → show now
//!   └─ otherwise                         → dropped (returns false)
//! ```
//!
//! The throttle is keyed on state only: a new detail for the same state waits
//! for the interval, a state change never does.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::core::{LifecycleState, SupervisorStatus};

/// Action affordance attached to the indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusAction {
    /// Offer to stop the running process.
    Stop,
    /// Offer to retry after a failure.
    Retry,
}

/// Visual tone of the indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Neutral,
    Progress,
    Ok,
    Warning,
    Error,
}

/// Rendered indicator contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusView {
    pub state: LifecycleState,
    pub title: &'static str,
    pub text: String,
    pub action: Option<StatusAction>,
    pub tone: Tone,
}

/// Host surface that displays the indicator.
pub trait StatusSink: Send + Sync + 'static {
    /// Replaces the displayed indicator.
    fn show(&self, view: &StatusView);

    /// Enters or leaves the host's foreground-presence mode.
    ///
    /// Entered when a start sequence begins, left on stop and on give-up.
    fn set_foreground(&self, _active: bool) {}
}

/// Sink that only logs; used when the host registers none.
#[derive(Debug, Default)]
pub struct LogSink;

impl StatusSink for LogSink {
    fn show(&self, view: &StatusView) {
        tracing::info!(
            state = %view.state,
            title = view.title,
            text = %view.text,
            tone = ?view.tone,
            "status"
        );
    }
}

/// Builds the indicator for `state` with an optional detail line.
///
/// # Example
/// ```
/// use daemonvisor::{LifecycleState, StatusAction, Tone, render};
///
/// let view = render(LifecycleState::Error, Some("spawn error: bind failed"));
/// assert_eq!(view.action, Some(StatusAction::Retry));
/// assert_eq!(view.tone, Tone::Error);
/// assert_eq!(view.text, "spawn error: bind failed");
/// ```
pub fn render(state: LifecycleState, detail: Option<&str>) -> StatusView {
    let (title, fallback, action, tone) = match state {
        LifecycleState::Stopped => ("Stopped", "Not running", None, Tone::Neutral),
        LifecycleState::Starting => ("Starting", "Starting up", None, Tone::Progress),
        LifecycleState::Running => ("Running", "Running", Some(StatusAction::Stop), Tone::Ok),
        LifecycleState::Stopping => ("Stopping", "Shutting down", None, Tone::Progress),
        LifecycleState::Error => (
            "Error",
            "Failed to start",
            Some(StatusAction::Retry),
            Tone::Error,
        ),
    };
    StatusView {
        state,
        title,
        text: detail.filter(|d| !d.is_empty()).unwrap_or(fallback).to_string(),
        action,
        tone,
    }
}

/// Builds the indicator from a full status snapshot.
///
/// - `Error` shows the last error
/// - `Running` shows the health summary, or the health warning with [`Tone::Warning`]
/// - `Starting` shows the retry counter once a retry is in progress
pub fn render_status(status: &SupervisorStatus) -> StatusView {
    match status.state {
        LifecycleState::Error => render(status.state, status.last_error.as_deref()),
        LifecycleState::Running => {
            if let Some(warning) = &status.health_warning {
                let mut view = render(status.state, Some(&format!("Health check failed: {warning}")));
                view.tone = Tone::Warning;
                view
            } else {
                let summary = status.last_health.as_ref().map(|h| h.summary());
                render(status.state, summary.as_deref())
            }
        }
        LifecycleState::Starting if status.retry_attempt > 0 => render(
            status.state,
            Some(&format!("Retrying (attempt {})", status.retry_attempt + 1)),
        ),
        state => render(state, None),
    }
}

/// Throttled front of a [`StatusSink`].
pub struct StatusNotifier {
    sink: Arc<dyn StatusSink>,
    min_interval: Duration,
    last: Option<(Instant, LifecycleState)>,
}

impl StatusNotifier {
    pub fn new(sink: Arc<dyn StatusSink>, min_interval: Duration) -> Self {
        Self {
            sink,
            min_interval,
            last: None,
        }
    }

    /// Renders and shows the indicator unless throttled. Returns whether it was shown.
    pub fn publish(&mut self, state: LifecycleState, detail: Option<&str>) -> bool {
        self.show(render(state, detail))
    }

    /// Like [`publish`](Self::publish), rendering through [`render_status`].
    pub fn publish_status(&mut self, status: &SupervisorStatus) -> bool {
        self.show(render_status(status))
    }

    /// Forwards to [`StatusSink::set_foreground`].
    pub fn set_foreground(&self, active: bool) {
        self.sink.set_foreground(active);
    }

    fn show(&mut self, view: StatusView) -> bool {
        let now = Instant::now();
        if let Some((at, state)) = self.last {
            if state == view.state && now.duration_since(at) < self.min_interval {
                return false;
            }
        }
        self.sink.show(&view);
        self.last = Some((now, view.state));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Shown(Mutex<Vec<StatusView>>);

    impl StatusSink for Shown {
        fn show(&self, view: &StatusView) {
            self.0.lock().unwrap().push(view.clone());
        }
    }

    fn notifier() -> (Arc<Shown>, StatusNotifier) {
        let sink = Arc::new(Shown::default());
        let n = StatusNotifier::new(sink.clone(), Duration::from_secs(30));
        (sink, n)
    }

    #[tokio::test(start_paused = true)]
    async fn same_state_is_throttled_for_min_interval() {
        let (sink, mut n) = notifier();

        assert!(n.publish(LifecycleState::Running, Some("a")));
        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(!n.publish(LifecycleState::Running, Some("b")));
        tokio::time::advance(Duration::from_secs(20)).await;
        assert!(n.publish(LifecycleState::Running, Some("c")));

        let texts: Vec<_> = sink.0.lock().unwrap().iter().map(|v| v.text.clone()).collect();
        assert_eq!(texts, vec!["a", "c"]);
    }

    #[tokio::test(start_paused = true)]
    async fn burst_within_a_second_renders_once_until_state_changes() {
        let (sink, mut n) = notifier();

        let shown: Vec<bool> = {
            let mut out = Vec::new();
            for _ in 0..10 {
                out.push(n.publish(LifecycleState::Starting, Some("Retrying (attempt 2)")));
                tokio::time::advance(Duration::from_millis(100)).await;
            }
            out
        };
        assert_eq!(shown.iter().filter(|s| **s).count(), 1);
        assert_eq!(sink.0.lock().unwrap().len(), 1);

        tokio::time::advance(Duration::from_secs(30)).await;
        sink.0.lock().unwrap().clear();
        let mut shown = Vec::new();
        for call in 1..=10 {
            let state = if call < 5 {
                LifecycleState::Starting
            } else {
                LifecycleState::Running
            };
            shown.push(n.publish(state, None));
            tokio::time::advance(Duration::from_millis(100)).await;
        }
        assert_eq!(
            shown,
            vec![true, false, false, false, true, false, false, false, false, false]
        );
        let states: Vec<_> = sink.0.lock().unwrap().iter().map(|v| v.state).collect();
        assert_eq!(states, vec![LifecycleState::Starting, LifecycleState::Running]);
    }

    #[tokio::test(start_paused = true)]
    async fn state_change_bypasses_throttle() {
        let (sink, mut n) = notifier();

        assert!(n.publish(LifecycleState::Running, None));
        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(n.publish(LifecycleState::Error, Some("boom")));
        assert!(n.publish(LifecycleState::Starting, None));

        let shown = sink.0.lock().unwrap();
        assert_eq!(shown.len(), 3);
        assert_eq!(shown[1].action, Some(StatusAction::Retry));
    }

    #[test]
    fn running_with_warning_renders_warning_tone() {
        let status = SupervisorStatus {
            state: LifecycleState::Running,
            health_warning: Some("timeout".into()),
            ..SupervisorStatus::default()
        };
        let view = render_status(&status);
        assert_eq!(view.tone, Tone::Warning);
        assert_eq!(view.action, Some(StatusAction::Stop));
        assert_eq!(view.text, "Health check failed: timeout");
    }

    #[test]
    fn empty_detail_falls_back() {
        assert_eq!(render(LifecycleState::Stopped, Some("")).text, "Not running");
    }
}
