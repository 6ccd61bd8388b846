// Audit events recorded by the engine through the trigger store

use crate::models::TriggerType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kinds of audit events the engine emits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    SystemStartup,
    SystemShutdown,
    MonitoringStarted,
    MonitoringStopped,
    /// An inactive-to-active pin transition accepted for firing
    MotionDetected,
    /// A transition inside the debounce window, not fired
    MotionSuppressed,
    /// An active-to-inactive pin transition
    MotionReset,
    /// A webhook fan-out completed for a trigger
    TriggerFired,
    TriggerError,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::SystemStartup => "System startup",
            EventKind::SystemShutdown => "System shutdown",
            EventKind::MonitoringStarted => "Monitoring started",
            EventKind::MonitoringStopped => "Monitoring stopped",
            EventKind::MotionDetected => "Motion detected",
            EventKind::MotionSuppressed => "Motion suppressed",
            EventKind::MotionReset => "Motion reset",
            EventKind::TriggerFired => "Trigger fired",
            EventKind::TriggerError => "Trigger error",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Event represents an audit entry in the system. Events can be logged or
/// passed (as meta information) to other systems.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique event ID
    pub id: String,
    pub created: DateTime<Utc>,
    /// Source IP address of the event
    pub source_ip: String,
    pub kind: EventKind,
    /// The type of trigger involved
    pub trigger_type: TriggerType,
    /// Additional information (like the trigger id involved)
    pub details: String,
}
