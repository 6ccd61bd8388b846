use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Trigger represents a sensor or button configuration bound to a GPIO pin.
///
/// Triggers are owned by the store; the engine only ever holds a transient
/// copy passed through its channels and never mutates one it is given.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trigger {
    /// Unique trigger ID, immutable after creation
    pub id: String,
    pub enabled: bool,
    pub created: DateTime<Utc>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// The GPIO pin the sensor or button is on
    pub gpio_pin: u8,
    /// The webhooks to send when the trigger fires
    #[serde(default)]
    pub webhooks: Vec<WebHook>,
    /// Minimum time (in seconds) before the trigger may fire again
    #[serde(default)]
    pub minimum_seconds_before_retrigger: u32,
}

/// WebHook represents a notification message sent to an HTTP endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebHook {
    pub url: String,
    #[serde(default)]
    pub http_verb: HttpVerb,
    /// Baseline Content-Type for the request; custom headers may override it
    #[serde(default = "default_content_type")]
    pub content_type: String,
    /// Custom headers, keys unique, order irrelevant
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// The HTTP body to send. This can be empty
    #[serde(default)]
    pub body: Vec<u8>,
}

fn default_content_type() -> String {
    "application/json".to_string()
}

impl WebHook {
    /// Convenience constructor for a JSON POST hook with no body
    pub fn post(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            http_verb: HttpVerb::Post,
            content_type: default_content_type(),
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }
}

/// HTTP verb used for a webhook call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpVerb {
    Get,
    #[default]
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpVerb {
    pub fn as_method(&self) -> reqwest::Method {
        match self {
            HttpVerb::Get => reqwest::Method::GET,
            HttpVerb::Post => reqwest::Method::POST,
            HttpVerb::Put => reqwest::Method::PUT,
            HttpVerb::Patch => reqwest::Method::PATCH,
            HttpVerb::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Classifies the source of a trigger on audit events. Carried as metadata
/// only; it never gates any engine logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TriggerType {
    Motion,
    Button,
    Time,
    System,
    #[default]
    Unknown,
}

impl fmt::Display for TriggerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TriggerType::Motion => "Motion",
            TriggerType::Button => "Button",
            TriggerType::Time => "Time",
            TriggerType::System => "System",
            TriggerType::Unknown => "Unknown",
        };
        write!(f, "{}", name)
    }
}
