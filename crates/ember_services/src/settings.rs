//! Settings management

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed settings: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid setting {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Runtime settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub runtime: RuntimeSettings,
    pub pools: PoolSettings,
    pub logging: LogSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    /// Degree of parallelism of the worker pool (at least 2).
    pub worker_threads: usize,
    pub tick_rate_hz: u32,
    /// Ticks to run before shutting down (at least 1).
    pub max_ticks: u64,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            worker_threads: 4,
            tick_rate_hz: 60,
            max_ticks: 600,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolSettings {
    /// Owner capacity of pools registered without an explicit one.
    pub default_capacity: usize,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            default_capacity: 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// One of trace, debug, info, warn, error.
    pub level: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
        }
    }
}

impl LogSettings {
    pub fn level(&self) -> Result<tracing::Level, SettingsError> {
        self.level.parse().map_err(|_| SettingsError::Invalid {
            field: "logging.level",
            reason: format!("unknown level '{}'", self.level),
        })
    }
}

impl Settings {
    /// Reads and validates a JSON settings file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_json_str(&text)?;
        tracing::debug!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    /// Parses and validates. Missing fields take their defaults.
    pub fn from_json_str(text: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json_pretty(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.runtime.worker_threads < 2 {
            return Err(SettingsError::Invalid {
                field: "runtime.worker_threads",
                reason: format!("must be at least 2, got {}", self.runtime.worker_threads),
            });
        }
        if self.runtime.tick_rate_hz == 0 {
            return Err(SettingsError::Invalid {
                field: "runtime.tick_rate_hz",
                reason: "must be positive".to_owned(),
            });
        }
        if self.runtime.max_ticks == 0 {
            return Err(SettingsError::Invalid {
                field: "runtime.max_ticks",
                reason: "must be at least 1".to_owned(),
            });
        }
        self.logging.level()?;
        Ok(())
    }
}
