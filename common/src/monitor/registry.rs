// Registry of live monitors, keyed by trigger id

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Per-trigger runtime record: the cancellation token that stops the poll
/// task, plus the generation it was registered under.
struct MonitorHandle {
    generation: u64,
    token: CancellationToken,
}

/// Concurrent map from trigger id to monitor handle.
///
/// The control loop is the sole writer through `register`/`unregister`;
/// poll tasks remove their own entry through `release` when they observe
/// cancellation. Generations keep a replaced monitor's late self-removal
/// from evicting its successor. Critical sections are O(1) map operations;
/// no I/O ever happens under the lock.
#[derive(Default)]
pub struct MonitorRegistry {
    next_generation: AtomicU64,
    monitors: Mutex<HashMap<String, MonitorHandle>>,
}

impl MonitorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a handle for `id`, cancelling and replacing any prior handle.
    /// Returns the generation the caller's poll task releases itself with.
    /// At most one live poll task per trigger id follows from this.
    pub fn register(&self, id: &str, token: CancellationToken) -> u64 {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let mut monitors = self.monitors.lock().expect("registry lock poisoned");
        if let Some(previous) = monitors.insert(id.to_string(), MonitorHandle { generation, token })
        {
            previous.token.cancel();
        }
        generation
    }

    /// Cancel and remove the handle for `id` if present; no-op otherwise.
    /// Returns whether a handle existed.
    pub fn unregister(&self, id: &str) -> bool {
        let mut monitors = self.monitors.lock().expect("registry lock poisoned");
        match monitors.remove(id) {
            Some(handle) => {
                handle.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Self-removal path for a poll task that observed cancellation. Only
    /// removes the entry if it still belongs to the caller's generation.
    pub fn release(&self, id: &str, generation: u64) {
        let mut monitors = self.monitors.lock().expect("registry lock poisoned");
        if monitors.get(id).map(|handle| handle.generation) == Some(generation) {
            monitors.remove(id);
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        let monitors = self.monitors.lock().expect("registry lock poisoned");
        monitors.contains_key(id)
    }

    pub fn len(&self) -> usize {
        let monitors = self.monitors.lock().expect("registry lock poisoned");
        monitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
