// Trigger monitoring and dispatch engine: one poll task per monitored
// trigger, one dispatch task per fire request, coordinated by a single
// control loop over three channels.

use crate::events::EventKind;
use crate::models::TriggerType;
use crate::store::TriggerStore;
use std::time::Duration;
use tracing::warn;

pub mod bootstrap;
pub mod dispatch;
pub mod engine;
pub mod poll;
pub mod registry;

pub use bootstrap::initialize_monitors;
pub use dispatch::WebhookDispatcher;
pub use engine::{EngineHandle, TriggerEngine};
pub use registry::MonitorRegistry;

/// Source recorded on engine-generated audit events
const ENGINE_SOURCE: &str = "localhost";

/// Record an audit event through the store; a store failure is logged and
/// never surfaced, since audit points are one-way notifications.
pub(crate) async fn audit(
    store: &dyn TriggerStore,
    kind: EventKind,
    trigger_type: TriggerType,
    details: String,
    ttl: Duration,
) {
    if let Err(e) = store
        .add_event(kind, trigger_type, &details, ENGINE_SOURCE, ttl)
        .await
    {
        warn!(kind = %kind, error = %e, "failed to record audit event");
    }
}
