// Startup pass: enqueue a monitor for every enabled trigger in the store

use crate::monitor::engine::EngineHandle;
use crate::store::TriggerStore;
use tracing::{debug, error, warn};

/// Read all triggers and request monitoring for each enabled one. A store
/// failure is logged and leaves the engine running with zero monitors
/// rather than aborting the process. Returns how many monitors were
/// enqueued; order of enablement across triggers is unspecified.
pub async fn initialize_monitors(store: &dyn TriggerStore, handle: &EngineHandle) -> usize {
    let triggers = match store.get_all_triggers().await {
        Ok(triggers) => triggers,
        Err(e) => {
            error!(error = %e, "failed to list triggers, starting with no monitors");
            return 0;
        }
    };

    debug!(trigger_count = triggers.len(), "initializing monitors");

    let mut started = 0;
    for trigger in triggers.into_iter().filter(|t| t.enabled) {
        let trigger_id = trigger.id.clone();
        if handle.add_monitor.send(trigger).await.is_err() {
            warn!(trigger_id = %trigger_id, "engine stopped, cannot enqueue monitor");
            break;
        }
        started += 1;
    }
    started
}
