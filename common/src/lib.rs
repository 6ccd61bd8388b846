// Common library shared by the trigger daemon and integration tests

pub mod config;
pub mod errors;
pub mod events;
pub mod gpio;
pub mod models;
pub mod monitor;
pub mod store;
