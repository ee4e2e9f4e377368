mod config;

pub use config::{Config, ExtractionConfig, GoogleConfig, NotionConfig};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/calnotion[-dev]/` based on CALNOTION_ENV.
///
/// Set CALNOTION_ENV=dev to use a development config directory.
///
/// # Errors
/// Returns an error if there is no home directory or creating the config
/// directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .ok_or(ConfigError::NoConfigDir)?
        .join(".config");

    let env = std::env::var("CALNOTION_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("calnotion-dev")
    } else {
        base_dir.join("calnotion")
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::SaveFailed {
        path: dir.clone(),
        message: e.to_string(),
    })?;
    Ok(dir)
}
