mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use common::*;
use daemonvisor::{
    Event, EventKind, HostVisibility, LifecycleState, ProcessError, RecoveryStore, Subscribe,
    SupervisorBuilder, SupervisorConfig, SupervisorError, Tone,
};

#[tokio::test(start_paused = true)]
async fn health_failure_warns_but_keeps_running() {
    let h = Harness::new(MockChannel::default());
    *h.channel.health_error.lock().unwrap() = Some(ProcessError::State {
        detail: "gateway not responding".into(),
    });

    h.sup.start().await.unwrap();
    let status = h.wait_for(|s| s.health_warning.is_some()).await;

    assert_eq!(status.state, LifecycleState::Running);
    assert_eq!(
        status.health_warning.as_deref(),
        Some("state error: gateway not responding")
    );
    assert_eq!(h.channel.starts(), 1);

    *h.channel.health_error.lock().unwrap() = None;
    let status = h.wait_for(|s| s.last_health.is_some()).await;
    assert_eq!(status.health_warning, None);
    assert_eq!(status.state, LifecycleState::Running);
}

#[tokio::test(start_paused = true)]
async fn health_warning_renders_with_warning_tone() {
    let h = Harness::new(MockChannel::default());
    *h.channel.health_error.lock().unwrap() = Some(ProcessError::State {
        detail: "gateway not responding".into(),
    });

    h.sup.start().await.unwrap();
    h.wait_state(LifecycleState::Running).await;
    h.wait_for(|s| s.health_warning.is_some()).await;
    // The Running view was shown moments ago; the warning waits out the throttle.
    tokio::time::sleep(Duration::from_secs(36)).await;

    let view = h.sink.last_view().unwrap();
    assert_eq!(view.state, LifecycleState::Running);
    assert_eq!(view.tone, Tone::Warning);
}

#[tokio::test(start_paused = true)]
async fn poll_interval_follows_visibility() {
    let h = Harness::new(MockChannel::default());
    h.sup.start().await.unwrap();
    h.wait_state(LifecycleState::Running).await;

    let before = h.channel.polls();
    tokio::time::sleep(Duration::from_secs(60)).await;
    let foreground = h.channel.polls() - before;
    assert!(foreground >= 10, "foreground polls: {foreground}");

    h.sup.set_visibility(HostVisibility::Background);
    tokio::time::sleep(Duration::from_secs(5)).await;
    let before = h.channel.polls();
    tokio::time::sleep(Duration::from_secs(180)).await;
    let background = h.channel.polls() - before;
    assert!(background <= 4, "background polls: {background}");
}

#[tokio::test(start_paused = true)]
async fn no_polling_while_stopped() {
    let h = Harness::new(MockChannel::default());
    h.sup.start().await.unwrap();
    h.wait_state(LifecycleState::Running).await;
    h.sup.stop().await.unwrap();

    let before = h.channel.polls();
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(h.channel.polls(), before);
}

#[tokio::test(start_paused = true)]
async fn connectivity_changes_never_touch_lifecycle() {
    let h = Harness::new(MockChannel::default());
    h.sup.start().await.unwrap();
    h.wait_state(LifecycleState::Running).await;

    h.sup.connectivity().update(true);
    let status = h.wait_for(|s| s.network_validated).await;
    assert_eq!(status.state, LifecycleState::Running);

    h.sup.connectivity().update(false);
    let status = h.wait_for(|s| !s.network_validated).await;
    assert_eq!(status.state, LifecycleState::Running);

    assert_eq!(h.channel.starts(), 1);
    assert_eq!(h.channel.stops(), 0);
}

#[tokio::test(start_paused = true)]
async fn send_requires_running_process() {
    let h = Harness::new(MockChannel::default());
    assert!(matches!(
        h.sup.send("hello").await,
        Err(SupervisorError::NotRunning)
    ));

    h.sup.start().await.unwrap();
    h.wait_state(LifecycleState::Running).await;
    assert_eq!(h.sup.send("hello").await.unwrap(), "echo: hello");
}

#[tokio::test(start_paused = true)]
async fn oversized_message_is_a_config_error() {
    let h = Harness::new(MockChannel::default());
    h.sup.start().await.unwrap();
    h.wait_state(LifecycleState::Running).await;

    let big = "x".repeat(daemonvisor::MAX_MESSAGE_BYTES + 1);
    let err = h.sup.send(big).await.unwrap_err();
    assert!(matches!(
        err,
        SupervisorError::Process(ProcessError::Config { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn credential_rejection_latches_once() {
    let h = Harness::new(MockChannel::always_failing(ProcessError::Spawn {
        detail: "provider said: 401 Unauthorized".into(),
    }));
    let mut events = h.sup.events();

    h.sup.start().await.unwrap();
    next_event(&mut events, EventKind::CredentialRejected).await;

    assert_eq!(
        h.sup.take_credential_rejection().as_deref(),
        Some("provider said: 401 Unauthorized")
    );
    h.sup.stop().await.unwrap();
    assert_eq!(h.sup.take_credential_rejection(), None);
}

#[tokio::test(start_paused = true)]
async fn rejected_send_sets_credential_latch() {
    let h = Harness::new(MockChannel::default());
    h.sup.start().await.unwrap();
    h.wait_state(LifecycleState::Running).await;

    assert!(h.sup.send("please reject").await.is_err());
    assert!(h.sup.take_credential_rejection().is_some());
}

struct Counter(Arc<AtomicU32>);

#[async_trait]
impl Subscribe for Counter {
    async fn on_event(&self, ev: &Event) {
        if ev.kind == EventKind::StateChanged {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn name(&self) -> &'static str {
        "state-counter"
    }
}

#[tokio::test(start_paused = true)]
async fn subscribers_and_history_see_transitions() {
    let seen = Arc::new(AtomicU32::new(0));
    let sup = SupervisorBuilder::new(
        SupervisorConfig::default(),
        Arc::new(MockChannel::default()),
        Arc::new(MockConfig::default()),
        RecoveryStore::in_memory(),
    )
    .with_subscribers(vec![Arc::new(Counter(seen.clone()))])
    .build();

    sup.start().await.unwrap();
    let mut rx = sup.subscribe();
    rx.wait_for(|s| s.state == LifecycleState::Running)
        .await
        .unwrap();
    sup.stop().await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    // Starting, Running, Stopping, Stopped
    assert_eq!(seen.load(Ordering::SeqCst), 4);

    let states: Vec<_> = sup
        .recent_events(usize::MAX)
        .into_iter()
        .filter(|e| e.kind == EventKind::StateChanged)
        .filter_map(|e| e.state)
        .collect();
    assert_eq!(
        states,
        vec![
            LifecycleState::Starting,
            LifecycleState::Running,
            LifecycleState::Stopping,
            LifecycleState::Stopped,
        ]
    );
}
