// End-to-end scenarios for the trigger engine: bootstrap, monitor
// lifecycle, sensor-driven firing and failure containment.

use common::config::Settings;
use common::events::EventKind;
use common::gpio::{Level, SimulatedGpio};
use common::models::WebHook;
use common::monitor::{initialize_monitors, EngineHandle, MonitorRegistry, TriggerEngine};
use common::store::MemoryStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Harness {
    store: Arc<MemoryStore>,
    gpio: SimulatedGpio,
    handle: EngineHandle,
    registry: Arc<MonitorRegistry>,
    shutdown: CancellationToken,
    engine_task: JoinHandle<()>,
}

impl Harness {
    async fn stop(self) {
        self.shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), self.engine_task)
            .await
            .expect("engine did not stop")
            .unwrap();
    }
}

async fn start_engine() -> Harness {
    let mut settings = Settings::default();
    // Fast polling keeps the tests snappy; semantics are interval-agnostic
    settings.monitor.poll_interval_ms = 20;
    settings.webhook.timeout_seconds = 2;

    let store = Arc::new(MemoryStore::new());
    let gpio = SimulatedGpio::new();
    let (engine, handle) =
        TriggerEngine::new(&settings, store.clone(), Arc::new(gpio.clone())).expect("engine build");
    let registry = engine.registry();

    let shutdown = CancellationToken::new();
    let engine_task = tokio::spawn(engine.run(shutdown.clone()));

    Harness {
        store,
        gpio,
        handle,
        registry,
        shutdown,
        engine_task,
    }
}

/// Poll `check` every 10 ms until it holds or `timeout_ms` elapses
async fn wait_until<F: FnMut() -> bool>(timeout_ms: u64, mut check: F) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
    loop {
        if check() {
            return true;
        }
        if tokio::time::Instant::now() > deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Wait until the store holds at least `minimum` events of `kind`
async fn wait_for_events(
    store: &MemoryStore,
    kind: EventKind,
    minimum: usize,
    timeout_ms: u64,
) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
    loop {
        if store.get_events_of_kind(kind).await.len() >= minimum {
            return true;
        }
        if tokio::time::Instant::now() > deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn test_bootstrap_starts_only_enabled_monitors() {
    let harness = start_engine().await;

    let enabled_a = harness
        .store
        .add_trigger("door", "", 17, vec![], 0)
        .await
        .unwrap();
    let enabled_b = harness
        .store
        .add_trigger("window", "", 18, vec![], 0)
        .await
        .unwrap();
    let mut disabled = harness
        .store
        .add_trigger("garage", "", 19, vec![], 0)
        .await
        .unwrap();
    disabled.enabled = false;
    harness.store.update_trigger(disabled.clone()).await.unwrap();

    let started = initialize_monitors(harness.store.as_ref(), &harness.handle).await;
    assert_eq!(started, 2);

    let registry = harness.registry.clone();
    assert!(wait_until(2_000, || registry.len() == 2).await);
    assert!(harness.registry.contains(&enabled_a.id));
    assert!(harness.registry.contains(&enabled_b.id));
    assert!(!harness.registry.contains(&disabled.id));

    harness.stop().await;
}

#[tokio::test]
async fn test_remove_monitor_and_unknown_id_noop() {
    let harness = start_engine().await;

    let keep = harness
        .store
        .add_trigger("keep", "", 4, vec![], 0)
        .await
        .unwrap();
    let stop = harness
        .store
        .add_trigger("stop", "", 5, vec![], 0)
        .await
        .unwrap();
    initialize_monitors(harness.store.as_ref(), &harness.handle).await;

    let registry = harness.registry.clone();
    assert!(wait_until(2_000, || registry.len() == 2).await);

    harness
        .handle
        .remove_monitor
        .send(stop.id.clone())
        .await
        .unwrap();
    assert!(wait_until(2_000, || registry.len() == 1).await);
    assert!(harness.registry.contains(&keep.id));

    // Removing an id with no active monitor is a no-op
    harness
        .handle
        .remove_monitor
        .send("no-such-trigger".to_string())
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(harness.registry.len(), 1);
    assert!(harness.registry.contains(&keep.id));

    harness.stop().await;
}

#[tokio::test]
async fn test_duplicate_add_keeps_single_monitor() {
    let harness = start_engine().await;

    let trigger = harness
        .store
        .add_trigger("hall", "", 22, vec![], 0)
        .await
        .unwrap();

    harness
        .handle
        .add_monitor
        .send(trigger.clone())
        .await
        .unwrap();
    harness
        .handle
        .add_monitor
        .send(trigger.clone())
        .await
        .unwrap();

    // The replaced poll task audits its own stop as it unwinds
    assert!(wait_for_events(&harness.store, EventKind::MonitoringStopped, 1, 2_000).await);

    let registry = harness.registry.clone();
    let trigger_id = trigger.id.clone();
    assert!(wait_until(2_000, || registry.contains(&trigger_id) && registry.len() == 1).await);

    harness.stop().await;
}

#[tokio::test]
async fn test_manual_fire_reaches_every_webhook() {
    let harness = start_engine().await;
    let server = MockServer::start().await;

    for hook_path in ["/hooks/a", "/hooks/b"] {
        Mock::given(method("POST"))
            .and(path(hook_path))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
    }

    let trigger = harness
        .store
        .add_trigger(
            "manual",
            "fire-now request",
            27,
            vec![
                WebHook::post(format!("{}/hooks/a", server.uri())),
                WebHook::post(format!("{}/hooks/b", server.uri())),
            ],
            0,
        )
        .await
        .unwrap();

    // Fire without any monitor: manual dispatch bypasses sensor polling
    harness.handle.fire_trigger.send(trigger).await.unwrap();

    assert!(wait_for_events(&harness.store, EventKind::TriggerFired, 1, 5_000).await);
    server.verify().await;

    harness.stop().await;
}

#[tokio::test]
async fn test_motion_edge_fires_webhook_end_to_end() {
    let harness = start_engine().await;
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/notify"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let trigger = harness
        .store
        .add_trigger(
            "pir",
            "",
            21,
            vec![WebHook::post(format!("{}/notify", server.uri()))],
            0,
        )
        .await
        .unwrap();
    harness
        .handle
        .add_monitor
        .send(trigger.clone())
        .await
        .unwrap();

    let registry = harness.registry.clone();
    let trigger_id = trigger.id.clone();
    assert!(wait_until(2_000, || registry.contains(&trigger_id)).await);

    harness.gpio.set_level(21, Level::High);

    assert!(wait_for_events(&harness.store, EventKind::TriggerFired, 1, 5_000).await);
    server.verify().await;

    harness.stop().await;
}

#[tokio::test]
async fn test_debounce_window_suppresses_rapid_retrigger() {
    let harness = start_engine().await;

    let trigger = harness
        .store
        .add_trigger("slow", "", 23, vec![], 3600)
        .await
        .unwrap();
    harness
        .handle
        .add_monitor
        .send(trigger.clone())
        .await
        .unwrap();

    let registry = harness.registry.clone();
    let trigger_id = trigger.id.clone();
    assert!(wait_until(2_000, || registry.contains(&trigger_id)).await);

    // First edge fires
    harness.gpio.set_level(23, Level::High);
    assert!(wait_for_events(&harness.store, EventKind::MotionDetected, 1, 2_000).await);

    // Drop and rise again well inside the one-hour window
    harness.gpio.set_level(23, Level::Low);
    assert!(wait_for_events(&harness.store, EventKind::MotionReset, 1, 2_000).await);
    harness.gpio.set_level(23, Level::High);
    assert!(wait_for_events(&harness.store, EventKind::MotionSuppressed, 1, 2_000).await);

    // Still exactly one accepted fire
    assert_eq!(
        harness
            .store
            .get_events_of_kind(EventKind::MotionDetected)
            .await
            .len(),
        1
    );

    harness.stop().await;
}

#[tokio::test]
async fn test_pin_open_failure_is_contained() {
    let harness = start_engine().await;
    harness.gpio.fail_pin(5);

    let broken = harness
        .store
        .add_trigger("broken", "", 5, vec![], 0)
        .await
        .unwrap();
    let healthy = harness
        .store
        .add_trigger("healthy", "", 6, vec![], 0)
        .await
        .unwrap();

    initialize_monitors(harness.store.as_ref(), &harness.handle).await;

    // The failed monitor reports an error and disappears; its neighbor and
    // the engine itself keep running
    assert!(wait_for_events(&harness.store, EventKind::TriggerError, 1, 2_000).await);

    let registry = harness.registry.clone();
    let healthy_id = healthy.id.clone();
    assert!(wait_until(2_000, || registry.contains(&healthy_id)).await);
    let broken_id = broken.id.clone();
    assert!(wait_until(2_000, || !registry.contains(&broken_id)).await);

    let errors = harness
        .store
        .get_events_of_kind(EventKind::TriggerError)
        .await;
    assert!(errors[0].details.contains(&broken.id));

    harness.stop().await;
}

#[tokio::test]
async fn test_shutdown_stops_engine_and_all_monitors() {
    let harness = start_engine().await;

    let trigger = harness
        .store
        .add_trigger("door", "", 12, vec![], 0)
        .await
        .unwrap();
    harness.handle.add_monitor.send(trigger).await.unwrap();

    let registry = harness.registry.clone();
    assert!(wait_until(2_000, || registry.len() == 1).await);

    let store = harness.store.clone();
    harness.stop().await;

    // Monitors observe the shutdown token and unwind on their own
    assert!(wait_for_events(&store, EventKind::MonitoringStopped, 1, 2_000).await);
    assert!(wait_until(2_000, || registry.is_empty()).await);
}
