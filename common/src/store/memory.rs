// In-memory trigger store with TTL-expiring audit events

use super::TriggerStore;
use crate::errors::StoreError;
use crate::events::{Event, EventKind};
use crate::models::{Trigger, TriggerType, WebHook};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

struct StoredEvent {
    event: Event,
    expires_at: DateTime<Utc>,
}

/// Key-value trigger store held entirely in memory. Events expire lazily:
/// anything past its TTL is pruned the next time the event log is touched.
#[derive(Default)]
pub struct MemoryStore {
    triggers: RwLock<HashMap<String, Trigger>>,
    events: RwLock<Vec<StoredEvent>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a trigger to the system. New triggers start enabled.
    pub async fn add_trigger(
        &self,
        name: &str,
        description: &str,
        gpio_pin: u8,
        webhooks: Vec<WebHook>,
        minimum_seconds_before_retrigger: u32,
    ) -> Result<Trigger, StoreError> {
        let trigger = Trigger {
            id: Uuid::new_v4().to_string(),
            enabled: true,
            created: Utc::now(),
            name: name.to_string(),
            description: description.to_string(),
            gpio_pin,
            webhooks,
            minimum_seconds_before_retrigger,
        };

        let mut triggers = self.triggers.write().await;
        triggers.insert(trigger.id.clone(), trigger.clone());
        Ok(trigger)
    }

    /// Replace a stored trigger with an updated copy
    pub async fn update_trigger(&self, updated: Trigger) -> Result<Trigger, StoreError> {
        let mut triggers = self.triggers.write().await;
        if !triggers.contains_key(&updated.id) {
            return Err(StoreError::TriggerNotFound(updated.id));
        }
        triggers.insert(updated.id.clone(), updated.clone());
        Ok(updated)
    }

    /// Get information about a single trigger based on its id
    pub async fn get_trigger(&self, id: &str) -> Result<Trigger, StoreError> {
        let triggers = self.triggers.read().await;
        triggers
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::TriggerNotFound(id.to_string()))
    }

    /// Delete a trigger from the system
    pub async fn delete_trigger(&self, id: &str) -> Result<(), StoreError> {
        let mut triggers = self.triggers.write().await;
        triggers
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::TriggerNotFound(id.to_string()))
    }

    /// All non-expired audit events, oldest first
    pub async fn get_events(&self) -> Vec<Event> {
        let mut events = self.events.write().await;
        Self::prune(&mut events);
        events.iter().map(|stored| stored.event.clone()).collect()
    }

    /// Non-expired audit events of one kind, oldest first
    pub async fn get_events_of_kind(&self, kind: EventKind) -> Vec<Event> {
        self.get_events()
            .await
            .into_iter()
            .filter(|event| event.kind == kind)
            .collect()
    }

    fn prune(events: &mut Vec<StoredEvent>) {
        let now = Utc::now();
        events.retain(|stored| now < stored.expires_at);
    }
}

#[async_trait]
impl TriggerStore for MemoryStore {
    async fn get_all_triggers(&self) -> Result<Vec<Trigger>, StoreError> {
        let triggers = self.triggers.read().await;
        Ok(triggers.values().cloned().collect())
    }

    async fn add_event(
        &self,
        kind: EventKind,
        trigger_type: TriggerType,
        details: &str,
        source_ip: &str,
        ttl: Duration,
    ) -> Result<Event, StoreError> {
        let created = Utc::now();
        let ttl = ChronoDuration::from_std(ttl)
            .map_err(|e| StoreError::EventSaveFailed(format!("TTL out of range: {}", e)))?;

        let event = Event {
            id: Uuid::new_v4().to_string(),
            created,
            source_ip: source_ip.to_string(),
            kind,
            trigger_type,
            details: details.to_string(),
        };

        let mut events = self.events.write().await;
        Self::prune(&mut events);
        events.push(StoredEvent {
            event: event.clone(),
            expires_at: created + ttl,
        });
        Ok(event)
    }
}
