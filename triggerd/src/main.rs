// Trigger daemon entry point

use anyhow::Context;
use common::config::Settings;
use common::events::EventKind;
use common::gpio::SimulatedGpio;
use common::models::TriggerType;
use common::monitor::{initialize_monitors, TriggerEngine};
use common::store::{MemoryStore, TriggerStore};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "triggerd=info,common=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting trigger daemon");

    let settings = Settings::load().map_err(|e| {
        error!(error = %e, "Failed to load configuration");
        e
    })?;
    settings
        .validate()
        .map_err(|e| anyhow::anyhow!(e))
        .context("Invalid configuration")?;

    info!(
        poll_interval_ms = settings.monitor.poll_interval_ms,
        webhook_timeout_seconds = settings.webhook.timeout_seconds,
        drain_dispatch = settings.shutdown.drain_dispatch,
        "Configuration loaded"
    );

    let store = Arc::new(MemoryStore::new());
    // Pin access is behind the Gpio trait; platform backends (rppal and
    // friends) slot in here. The simulated controller keeps the daemon
    // runnable on boards without usable pins.
    let gpio = Arc::new(SimulatedGpio::new());

    let event_ttl = settings.history.event_ttl();
    if let Err(e) = store
        .add_event(
            EventKind::SystemStartup,
            TriggerType::System,
            "trigger daemon starting",
            "localhost",
            event_ttl,
        )
        .await
    {
        warn!(error = %e, "Failed to record startup event");
    }

    let (engine, handle) = TriggerEngine::new(&settings, store.clone(), gpio)
        .context("Failed to build trigger engine")?;
    info!("Trigger engine created");

    let shutdown = CancellationToken::new();
    let shutdown_for_signal = shutdown.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for Ctrl+C");
        info!("Received Ctrl+C signal, initiating shutdown");
        shutdown_for_signal.cancel();
    });

    let engine_task = tokio::spawn(engine.run(shutdown));

    let started = initialize_monitors(store.as_ref(), &handle).await;
    info!(monitors = started, "Monitors initialized");

    engine_task.await.context("Engine task panicked")?;
    info!("Trigger daemon stopped");
    Ok(())
}
