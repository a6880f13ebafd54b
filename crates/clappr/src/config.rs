//! Player configuration loaded from TOML.
//!
//! ```toml
//! [logging]
//! level = "debug"
//! json_format = false
//!
//! [options]
//! sourceUrl = "http://clappr.io/highline.mp4"
//! autoplay = true
//! startAt = 10
//! ```

use clappr_core::{keys, Options};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::info;

const VALID_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Config serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Options conversion error: {0}")]
    Options(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Player configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Logging configuration settings
    #[serde(default)]
    pub logging: LoggingSettings,
    /// Options bag handed to the player, keyed like the options themselves
    #[serde(default)]
    pub options: toml::Table,
}

/// Logging system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Whether to output logs in JSON format
    #[serde(default)]
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl PlayerConfig {
    /// Load the configuration at `path`, writing the default one there if the file does not exist.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: PlayerConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = PlayerConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            std::fs::write(path, toml_content)?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !VALID_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "Invalid log level: {}. Must be one of: {VALID_LEVELS:?}",
                &self.logging.level
            )));
        }

        for key in [keys::SOURCE_URL, keys::POSTER_URL, keys::MIME_TYPE] {
            if let Some(value) = self.options.get(key) {
                if !value.is_str() {
                    return Err(ConfigError::Invalid(format!("{key} must be a string")));
                }
            }
        }

        if let Some(start_at) = self.options.get(keys::START_AT) {
            let seconds = start_at
                .as_float()
                .or_else(|| start_at.as_integer().map(|i| i as f64));
            if !seconds.is_some_and(|s| s >= 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "{} must be a non-negative number",
                    keys::START_AT
                )));
            }
        }

        Ok(())
    }

    /// Build the options bag from the `[options]` table
    pub fn to_options(&self) -> Result<Options, ConfigError> {
        let value = serde_json::to_value(&self.options)?;
        Ok(Options::from_json(value))
    }
}
