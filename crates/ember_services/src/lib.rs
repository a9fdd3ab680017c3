//! Ember Services Layer
//!
//! Configuration for the runtime driver.

pub mod settings;

pub use settings::{LogSettings, PoolSettings, RuntimeSettings, Settings, SettingsError};
