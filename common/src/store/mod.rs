// Trigger store collaborator: the engine reads trigger definitions at
// startup and appends audit events; persistence itself lives elsewhere.

use crate::errors::StoreError;
use crate::events::{Event, EventKind};
use crate::models::{Trigger, TriggerType};
use async_trait::async_trait;
use std::time::Duration;

pub mod memory;

pub use memory::MemoryStore;

/// The store operations the engine consumes
#[async_trait]
pub trait TriggerStore: Send + Sync {
    /// Get all triggers in the system
    async fn get_all_triggers(&self) -> Result<Vec<Trigger>, StoreError>;

    /// Append an audit event, retained for `ttl`
    async fn add_event(
        &self,
        kind: EventKind,
        trigger_type: TriggerType,
        details: &str,
        source_ip: &str,
        ttl: Duration,
    ) -> Result<Event, StoreError>;
}
