// Sensor poll task: samples one GPIO pin on a fixed interval and applies
// edge-detection plus debounce policy.

use crate::events::EventKind;
use crate::gpio::{Gpio, Level};
use crate::models::{Trigger, TriggerType};
use crate::monitor::audit;
use crate::monitor::registry::MonitorRegistry;
use crate::store::TriggerStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// What one pin sample amounted to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Level unchanged since the previous sample
    NoChange,
    /// Inactive-to-active edge outside the debounce window
    Fired,
    /// Inactive-to-active edge inside the debounce window
    Suppressed,
    /// Active-to-inactive edge
    Reset,
}

/// Edge latch plus debounce window. Task-local: only the poll task that
/// owns it ever observes a sample, so fire decisions for one trigger are
/// strictly ordered.
#[derive(Debug)]
pub struct Debounce {
    last_level: Level,
    last_fired: Option<Instant>,
    minimum_seconds: u32,
}

impl Debounce {
    pub fn new(minimum_seconds: u32) -> Self {
        Self {
            last_level: Level::Low,
            last_fired: None,
            minimum_seconds,
        }
    }

    /// Classify one sample taken at `now`. The elapsed-time comparison uses
    /// fractional seconds and is strict, so a window of 0 fires on every
    /// inactive-to-active edge. The first edge ever always fires.
    pub fn observe(&mut self, level: Level, now: Instant) -> PollOutcome {
        if level == self.last_level {
            return PollOutcome::NoChange;
        }
        self.last_level = level;

        if !level.is_active() {
            return PollOutcome::Reset;
        }

        let window_elapsed = match self.last_fired {
            None => true,
            Some(fired_at) => {
                now.duration_since(fired_at).as_secs_f64() > f64::from(self.minimum_seconds)
            }
        };

        if window_elapsed {
            self.last_fired = Some(now);
            PollOutcome::Fired
        } else {
            PollOutcome::Suppressed
        }
    }
}

/// One cooperative unit per monitored trigger. Owns the debounce state and
/// the opened pin; emits fire requests on the shared fire channel.
pub(crate) struct SensorPollTask {
    trigger: Trigger,
    registry: Arc<MonitorRegistry>,
    store: Arc<dyn TriggerStore>,
    fire_tx: mpsc::Sender<Trigger>,
    token: CancellationToken,
    generation: u64,
    poll_interval: Duration,
    event_ttl: Duration,
}

impl SensorPollTask {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        trigger: Trigger,
        registry: Arc<MonitorRegistry>,
        store: Arc<dyn TriggerStore>,
        fire_tx: mpsc::Sender<Trigger>,
        token: CancellationToken,
        generation: u64,
        poll_interval: Duration,
        event_ttl: Duration,
    ) -> Self {
        Self {
            trigger,
            registry,
            store,
            fire_tx,
            token,
            generation,
            poll_interval,
            event_ttl,
        }
    }

    pub(crate) async fn run(self, gpio: Arc<dyn Gpio>) {
        let trigger_id = self.trigger.id.clone();

        // A pin that cannot be opened is fatal for this monitor only; the
        // rest of the engine keeps running.
        let mut pin = match gpio.open_pin(self.trigger.gpio_pin) {
            Ok(pin) => pin,
            Err(e) => {
                error!(
                    trigger_id = %trigger_id,
                    gpio_pin = self.trigger.gpio_pin,
                    error = %e,
                    "failed to open GPIO pin, monitor not started"
                );
                audit(
                    &*self.store,
                    EventKind::TriggerError,
                    TriggerType::Motion,
                    format!("trigger {}: {}", trigger_id, e),
                    self.event_ttl,
                )
                .await;
                self.registry.release(&trigger_id, self.generation);
                return;
            }
        };

        debug!(
            trigger_id = %trigger_id,
            gpio_pin = self.trigger.gpio_pin,
            "monitoring started"
        );
        audit(
            &*self.store,
            EventKind::MonitoringStarted,
            TriggerType::Motion,
            format!("trigger {} on pin {}", trigger_id, self.trigger.gpio_pin),
            self.event_ttl,
        )
        .await;

        let mut debounce = Debounce::new(self.trigger.minimum_seconds_before_retrigger);
        let mut ticker = interval(self.poll_interval);

        loop {
            tokio::select! {
                _ = self.token.cancelled() => {
                    debug!(trigger_id = %trigger_id, "monitoring stopped");
                    audit(
                        &*self.store,
                        EventKind::MonitoringStopped,
                        TriggerType::Motion,
                        format!("trigger {}", trigger_id),
                        self.event_ttl,
                    )
                    .await;
                    self.registry.release(&trigger_id, self.generation);
                    return;
                }
                _ = ticker.tick() => {
                    let level = pin.read();
                    match debounce.observe(level, Instant::now()) {
                        PollOutcome::NoChange => {}
                        PollOutcome::Fired => {
                            debug!(
                                trigger_id = %trigger_id,
                                gpio_pin = self.trigger.gpio_pin,
                                "motion detected, firing trigger"
                            );
                            audit(
                                &*self.store,
                                EventKind::MotionDetected,
                                TriggerType::Motion,
                                format!("trigger {}", trigger_id),
                                self.event_ttl,
                            )
                            .await;
                            // Non-blocking enqueue: the poll loop must never
                            // stall on the fire channel.
                            if let Err(e) = self.fire_tx.try_send(self.trigger.clone()) {
                                warn!(
                                    trigger_id = %trigger_id,
                                    error = %e,
                                    "fire channel unavailable, dropping fire request"
                                );
                            }
                        }
                        PollOutcome::Suppressed => {
                            debug!(
                                trigger_id = %trigger_id,
                                minimum_seconds = self.trigger.minimum_seconds_before_retrigger,
                                "motion detected inside debounce window, not firing"
                            );
                            audit(
                                &*self.store,
                                EventKind::MotionSuppressed,
                                TriggerType::Motion,
                                format!("trigger {}: debounce window not elapsed", trigger_id),
                                self.event_ttl,
                            )
                            .await;
                        }
                        PollOutcome::Reset => {
                            debug!(trigger_id = %trigger_id, "motion reset");
                            audit(
                                &*self.store,
                                EventKind::MotionReset,
                                TriggerType::Motion,
                                format!("trigger {}", trigger_id),
                                self.event_ttl,
                            )
                            .await;
                        }
                    }
                }
            }
        }
    }
}
