// Error types for the trigger engine, grouped by failure domain

use thiserror::Error;

/// Trigger store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Trigger not found: {0}")]
    TriggerNotFound(String),

    #[error("Problem saving the trigger: {0}")]
    TriggerSaveFailed(String),

    #[error("Problem saving the event: {0}")]
    EventSaveFailed(String),

    #[error("Problem getting the list of triggers: {0}")]
    ListTriggersFailed(String),
}

/// GPIO pin access errors
#[derive(Error, Debug)]
pub enum GpioError {
    #[error("Failed to open GPIO pin {pin}: {reason}")]
    OpenFailed { pin: u8, reason: String },
}

/// Webhook delivery errors. Always local to a single hook attempt; a failed
/// hook never fails the trigger fire itself.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Failed to create HTTP client: {0}")]
    ClientBuild(String),

    #[error("Invalid header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("Request to {url} failed: {reason}")]
    RequestFailed { url: String, reason: String },
}
