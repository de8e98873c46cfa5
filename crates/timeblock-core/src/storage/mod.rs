mod config;

pub use config::{Config, PlanningConfig, StoreConfig};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/timeblock[-dev]/` based on TIMEBLOCK_ENV.
///
/// Set TIMEBLOCK_ENV=dev to use development data directory.
/// TIMEBLOCK_DATA_DIR overrides the location entirely.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("TIMEBLOCK_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("TIMEBLOCK_ENV").unwrap_or_else(|_| "production".to_string());

            if env == "dev" {
                base_dir.join("timeblock-dev")
            } else {
                base_dir.join("timeblock")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::LoadFailed {
        path: dir.clone(),
        message: e.to_string(),
    })?;
    Ok(dir)
}
