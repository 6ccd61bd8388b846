// Configuration management with layered configuration (file, env)

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main settings structure containing all configuration options
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub shutdown: ShutdownConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// How often each monitor samples its GPIO pin
    pub poll_interval_ms: u64,
    /// Capacity of the add/remove/fire channels; sized so API-layer
    /// producers are never stalled by the engine
    pub channel_capacity: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            channel_capacity: 64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Hard per-call timeout for webhook delivery
    pub timeout_seconds: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self { timeout_seconds: 10 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// How long audit events are retained before TTL expiry
    pub event_ttl_hours: u64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { event_ttl_hours: 24 }
    }
}

impl HistoryConfig {
    pub fn event_ttl(&self) -> Duration {
        Duration::from_secs(self.event_ttl_hours * 3600)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownConfig {
    /// Wait for in-flight webhook dispatches on shutdown instead of
    /// abandoning them
    pub drain_dispatch: bool,
    /// Upper bound on the drain wait
    pub drain_timeout_seconds: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            drain_dispatch: false,
            drain_timeout_seconds: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Load configuration with layered precedence: defaults → file → env
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path("config")
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Start with default configuration
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Add local configuration (not committed to git)
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            // Add environment-specific configuration
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.monitor.poll_interval_ms)
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), String> {
        if self.monitor.poll_interval_ms == 0 {
            return Err("Monitor poll_interval_ms must be greater than 0".to_string());
        }
        if self.monitor.channel_capacity == 0 {
            return Err("Monitor channel_capacity must be greater than 0".to_string());
        }
        if self.webhook.timeout_seconds == 0 {
            return Err("Webhook timeout_seconds must be greater than 0".to_string());
        }
        if self.history.event_ttl_hours == 0 {
            return Err("History event_ttl_hours must be greater than 0".to_string());
        }
        if self.shutdown.drain_dispatch && self.shutdown.drain_timeout_seconds == 0 {
            return Err(
                "Shutdown drain_timeout_seconds must be greater than 0 when draining".to_string(),
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.monitor.poll_interval_ms, 500);
        assert_eq!(settings.monitor.channel_capacity, 64);
        assert_eq!(settings.webhook.timeout_seconds, 10);
        assert_eq!(settings.history.event_ttl_hours, 24);
        assert!(!settings.shutdown.drain_dispatch);
        assert_eq!(settings.observability.log_level, "info");
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_poll_interval() {
        let mut settings = Settings::default();
        settings.monitor.poll_interval_ms = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_webhook_timeout() {
        let mut settings = Settings::default();
        settings.webhook.timeout_seconds = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_drain_timeout_when_draining() {
        let mut settings = Settings::default();
        settings.shutdown.drain_timeout_seconds = 0;
        assert!(settings.validate().is_ok());

        settings.shutdown.drain_dispatch = true;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_load_from_missing_dir_uses_defaults() {
        let settings = Settings::load_from_path("does-not-exist").unwrap();
        assert_eq!(settings.monitor.poll_interval_ms, 500);
    }

    #[test]
    fn test_event_ttl_conversion() {
        let history = HistoryConfig { event_ttl_hours: 2 };
        assert_eq!(history.event_ttl(), Duration::from_secs(7200));
    }
}
