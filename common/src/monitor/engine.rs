// Control loop: single-threaded coordinator over the add-monitor,
// remove-monitor and fire-trigger channels.

use crate::config::Settings;
use crate::errors::DispatchError;
use crate::events::EventKind;
use crate::gpio::Gpio;
use crate::models::{Trigger, TriggerType};
use crate::monitor::audit;
use crate::monitor::dispatch::WebhookDispatcher;
use crate::monitor::poll::SensorPollTask;
use crate::monitor::registry::MonitorRegistry;
use crate::store::TriggerStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// Producer side of the engine's three inbound channels. Cloneable;
/// handed to whatever layer drives the engine (API handlers, bootstrap).
/// All sends are fire-and-forget, with no acknowledgement.
#[derive(Clone)]
pub struct EngineHandle {
    pub add_monitor: mpsc::Sender<Trigger>,
    pub remove_monitor: mpsc::Sender<String>,
    pub fire_trigger: mpsc::Sender<Trigger>,
}

/// The trigger monitoring and dispatch engine.
///
/// Owns the monitor registry and the receiving side of the three signal
/// channels. The loop itself never performs blocking I/O; pin polling and
/// webhook delivery run in spawned tasks.
pub struct TriggerEngine {
    registry: Arc<MonitorRegistry>,
    dispatcher: Arc<WebhookDispatcher>,
    store: Arc<dyn TriggerStore>,
    gpio: Arc<dyn Gpio>,
    add_rx: mpsc::Receiver<Trigger>,
    remove_rx: mpsc::Receiver<String>,
    fire_rx: mpsc::Receiver<Trigger>,
    /// Cloned into each poll task so sensor edges reach the fire channel
    fire_tx: mpsc::Sender<Trigger>,
    dispatches: TaskTracker,
    poll_interval: Duration,
    event_ttl: Duration,
    drain_dispatch: bool,
    drain_timeout: Duration,
}

impl TriggerEngine {
    pub fn new(
        settings: &Settings,
        store: Arc<dyn TriggerStore>,
        gpio: Arc<dyn Gpio>,
    ) -> Result<(Self, EngineHandle), DispatchError> {
        let capacity = settings.monitor.channel_capacity;
        let (add_tx, add_rx) = mpsc::channel(capacity);
        let (remove_tx, remove_rx) = mpsc::channel(capacity);
        let (fire_tx, fire_rx) = mpsc::channel(capacity);

        let event_ttl = settings.history.event_ttl();
        let dispatcher = Arc::new(WebhookDispatcher::new(
            &settings.webhook,
            Arc::clone(&store),
            event_ttl,
        )?);

        let engine = Self {
            registry: Arc::new(MonitorRegistry::new()),
            dispatcher,
            store,
            gpio,
            add_rx,
            remove_rx,
            fire_rx,
            fire_tx: fire_tx.clone(),
            dispatches: TaskTracker::new(),
            poll_interval: settings.poll_interval(),
            event_ttl,
            drain_dispatch: settings.shutdown.drain_dispatch,
            drain_timeout: Duration::from_secs(settings.shutdown.drain_timeout_seconds),
        };

        let handle = EngineHandle {
            add_monitor: add_tx,
            remove_monitor: remove_tx,
            fire_trigger: fire_tx,
        };

        Ok((engine, handle))
    }

    /// Shared view of the live-monitor registry, for observability
    pub fn registry(&self) -> Arc<MonitorRegistry> {
        Arc::clone(&self.registry)
    }

    /// Number of webhook fan-outs currently in flight
    pub fn in_flight_dispatches(&self) -> usize {
        self.dispatches.len()
    }

    /// Run the control loop until `shutdown` is cancelled. Selection over
    /// the three channels is first-ready-wins with no priority ordering.
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!("trigger engine started");

        loop {
            tokio::select! {
                Some(trigger) = self.add_rx.recv() => {
                    self.start_monitor(trigger, &shutdown);
                }
                Some(id) = self.remove_rx.recv() => {
                    if self.registry.unregister(&id) {
                        debug!(trigger_id = %id, "monitor removal requested");
                    } else {
                        debug!(trigger_id = %id, "no active monitor to remove");
                    }
                }
                Some(trigger) = self.fire_rx.recv() => {
                    self.start_dispatch(trigger);
                }
                _ = shutdown.cancelled() => {
                    break;
                }
                else => {
                    break;
                }
            }
        }

        audit(
            &*self.store,
            EventKind::SystemShutdown,
            TriggerType::System,
            "trigger engine stopping".to_string(),
            self.event_ttl,
        )
        .await;

        // Poll tasks carry child tokens of `shutdown`, so they are already
        // unwinding. Dispatches are abandoned unless draining is configured.
        if self.drain_dispatch {
            self.dispatches.close();
            info!(
                in_flight = self.dispatches.len(),
                "draining in-flight webhook dispatches"
            );
            if timeout(self.drain_timeout, self.dispatches.wait())
                .await
                .is_err()
            {
                warn!(
                    in_flight = self.dispatches.len(),
                    "drain timeout elapsed, abandoning remaining dispatches"
                );
            }
        } else {
            debug!(
                in_flight = self.dispatches.len(),
                "stopping without draining dispatches"
            );
        }

        info!("trigger engine stopped");
    }

    /// Spawn a poll task for `trigger`, replacing (and cancelling) any
    /// existing monitor for the same id. The task's token is a child of the
    /// engine shutdown token, so process shutdown stops every monitor.
    fn start_monitor(&self, trigger: Trigger, shutdown: &CancellationToken) {
        let token = shutdown.child_token();
        let generation = self.registry.register(&trigger.id, token.clone());

        info!(
            trigger_id = %trigger.id,
            gpio_pin = trigger.gpio_pin,
            "starting monitor"
        );

        let task = SensorPollTask::new(
            trigger,
            Arc::clone(&self.registry),
            Arc::clone(&self.store),
            self.fire_tx.clone(),
            token,
            generation,
            self.poll_interval,
            self.event_ttl,
        );
        let gpio = Arc::clone(&self.gpio);
        tokio::spawn(task.run(gpio));
    }

    /// Spawn one detached dispatch task for a fire request. A slow hook can
    /// never stall polling or other dispatches.
    fn start_dispatch(&self, trigger: Trigger) {
        debug!(
            trigger_id = %trigger.id,
            webhooks = trigger.webhooks.len(),
            "dispatching trigger"
        );
        let dispatcher = Arc::clone(&self.dispatcher);
        self.dispatches.spawn(async move {
            dispatcher.dispatch(&trigger).await;
        });
    }
}
