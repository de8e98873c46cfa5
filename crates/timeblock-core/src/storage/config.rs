//! TOML-based application configuration.
//!
//! Stores:
//! - Planning defaults (horizon length, placement strategy)
//! - The zone catalog
//! - Location of the local task/calendar store
//!
//! Configuration is stored at `~/.config/timeblock/config.toml`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;
use crate::horizon::{PlanningHorizon, MAX_HORIZON_DAYS, MIN_HORIZON_DAYS};
use crate::scheduler::StrategyKind;
use crate::zone::{TimeBlockZone, ZoneCatalog};

/// Planning defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanningConfig {
    /// Horizon length in days, 21 to 28.
    #[serde(default = "default_horizon_days")]
    pub horizon_days: u32,
    #[serde(default)]
    pub strategy: StrategyKind,
}

/// Local store configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// JSON store file; defaults to `store.json` in the data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/timeblock/config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub planning: PlanningConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default = "ZoneCatalog::default_zones")]
    pub zones: Vec<TimeBlockZone>,
}

fn default_horizon_days() -> u32 {
    21
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self {
            horizon_days: default_horizon_days(),
            strategy: StrategyKind::default(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            planning: PlanningConfig::default(),
            store: StoreConfig::default(),
            zones: ZoneCatalog::default_zones(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = match current {
                serde_json::Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
                other => other.get(part)?,
            };
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::InvalidValue {
            key: key.to_string(),
            message: "unknown config key".into(),
        };
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().map_or(true, |p| p.is_empty()) {
            return Err(invalid("config key is empty".into()));
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let slot = match current {
                serde_json::Value::Array(items) => {
                    let index = part.parse::<usize>().map_err(|_| unknown())?;
                    items.get_mut(index).ok_or_else(unknown)?
                }
                serde_json::Value::Object(obj) => obj.get_mut(part).ok_or_else(unknown)?,
                _ => return Err(unknown()),
            };

            if parts.peek().is_none() {
                let new_value = match slot {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => value
                        .parse::<i64>()
                        .map(|n| serde_json::Value::Number(n.into()))
                        .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?,
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };
                *slot = new_value;
                return Ok(());
            }
            current = slot;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk, writing the default if no file exists yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Like [`Config::load`] for an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                tracing::debug!(path = %path.display(), "wrote default configuration");
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| failed(e.to_string()))
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!("falling back to default configuration: {e}");
            Self::default()
        })
    }

    /// Get a config value as string by dot-separated key. Zone entries are
    /// addressed by index, e.g. `zones.0.buffer_minutes`.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Update a value in memory. The new value must keep its type and the
    /// resulting configuration must validate.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the updated configuration is invalid.
    pub fn update(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// [`Config::update`] followed by [`Config::save`].
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.update(key, value)?;
        self.save()
    }

    /// Check every setting and build the zone catalog.
    pub fn validate(&self) -> Result<ZoneCatalog, ConfigError> {
        let days = i64::from(self.planning.horizon_days);
        if !(MIN_HORIZON_DAYS..=MAX_HORIZON_DAYS).contains(&days) {
            return Err(ConfigError::InvalidValue {
                key: "planning.horizon_days".into(),
                message: format!("{days} is outside {MIN_HORIZON_DAYS}-{MAX_HORIZON_DAYS}"),
            });
        }
        ZoneCatalog::new(self.zones.clone()).map_err(|e| ConfigError::InvalidValue {
            key: "zones".into(),
            message: e.to_string(),
        })
    }

    /// Planning horizon of the configured length starting on `start`.
    pub fn horizon(&self, start: NaiveDate, days: Option<u32>) -> Result<PlanningHorizon, ConfigError> {
        let days = days.unwrap_or(self.planning.horizon_days);
        PlanningHorizon::starting(start, days).map_err(|e| ConfigError::InvalidValue {
            key: "planning.horizon_days".into(),
            message: e.to_string(),
        })
    }

    /// Path of the JSON store file.
    pub fn store_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.store.path {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join("store.json")),
        }
    }
}
