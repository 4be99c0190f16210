//! TOML-based application configuration.
//!
//! Stores scheduling policy:
//! - Per-domain daily quota minutes and the sleep reservation
//! - Per-domain working windows ("HH:MM" open/close)
//! - Priority scoring weights
//! - Allocator look-ahead bound
//!
//! Configuration is stored at `~/.config/quadra/config.toml`. Weights and
//! windows are validated when converted into engine form, not on load, so
//! a hand-edited file fails with a pointed message at startup.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::data_dir;
use crate::allocator::DEFAULT_LOOK_AHEAD_DAYS;
use crate::domain::Domain;
use crate::error::ConfigError;
use crate::quota::QuotaPolicy;
use crate::scoring::ScoreWeights;
use crate::window::{WorkingHours, WorkingWindow};

/// One domain's working window as config strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_open")]
    pub open: String,
    #[serde(default = "default_close")]
    pub close: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            open: default_open(),
            close: default_close(),
        }
    }
}

/// Working windows for all domains.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WindowsConfig {
    #[serde(default)]
    pub academic: WindowConfig,
    #[serde(default)]
    pub income: WindowConfig,
    #[serde(default)]
    pub growth: WindowConfig,
    #[serde(default)]
    pub life: WindowConfig,
}

/// Allocator section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocatorSection {
    #[serde(default = "default_look_ahead_days")]
    pub look_ahead_days: u32,
}

impl Default for AllocatorSection {
    fn default() -> Self {
        Self {
            look_ahead_days: default_look_ahead_days(),
        }
    }
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/quadra/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub quotas: QuotaPolicy,
    #[serde(default)]
    pub windows: WindowsConfig,
    #[serde(default)]
    pub scoring: ScoreWeights,
    #[serde(default)]
    pub allocator: AllocatorSection,
}

// Default functions
fn default_open() -> String {
    "09:00".to_string()
}
fn default_close() -> String {
    "17:00".to_string()
}
fn default_look_ahead_days() -> u32 {
    DEFAULT_LOOK_AHEAD_DAYS
}

impl Config {
    /// Path to the config file.
    pub fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("~/.config/quadra"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load from disk, falling back to defaults when the file is absent.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&path).map_err(|e| ConfigError::LoadFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        toml::from_str(&raw).map_err(|e| ConfigError::LoadFailed {
            path,
            message: e.to_string(),
        })
    }

    /// Save to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path()?;
        let raw = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, raw).map_err(|e| ConfigError::SaveFailed {
            path,
            message: e.to_string(),
        })
    }

    /// Parse and validate the working windows.
    pub fn working_hours(&self) -> Result<WorkingHours, ConfigError> {
        Ok(WorkingHours {
            academic: parse_window(Domain::Academic, &self.windows.academic)?,
            income: parse_window(Domain::Income, &self.windows.income)?,
            growth: parse_window(Domain::Growth, &self.windows.growth)?,
            life: parse_window(Domain::Life, &self.windows.life)?,
        })
    }

    /// Validated scoring weights.
    pub fn score_weights(&self) -> Result<ScoreWeights, ConfigError> {
        self.scoring.validate()?;
        Ok(self.scoring)
    }
}

fn parse_window(domain: Domain, config: &WindowConfig) -> Result<WorkingWindow, ConfigError> {
    WorkingWindow::parse(&config.open, &config.close).map_err(|e| ConfigError::InvalidValue {
        key: format!("windows.{domain}"),
        message: e.to_string(),
    })
}
