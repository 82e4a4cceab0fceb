//! Application configuration file.
//!
//! One TOML file describes the dataset files, how the current dataset
//! version names its columns, and the map defaults. Every section is
//! optional; a missing file means "use the defaults".

use std::path::{Path, PathBuf};

use accident_map_analysis_models::{ColumnMapping, MapSettings};
use accident_map_dataset::config::DatasetConfig;
use serde::Deserialize;

/// Default config file name, resolved against the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "accident_map.toml";

/// Errors reading the config file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("Failed to read config {}: {source}", .path.display())]
    Io {
        /// Config file path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The file is not valid TOML or does not match the expected shape.
    #[error("Invalid config {}: {source}", .path.display())]
    Parse {
        /// Config file path.
        path: PathBuf,
        /// Underlying error.
        source: toml::de::Error,
    },
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Dataset file locations and formats.
    pub dataset: DatasetConfig,
    /// Column names of the current dataset version.
    pub columns: ColumnMapping,
    /// Map defaults and labels.
    pub map: MapSettings,
}

impl AppConfig {
    /// Reads the config file at `path`, falling back to defaults if it does
    /// not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file exists but cannot be read or
    /// parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::warn!("Config {} not found, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source: e,
                });
            }
        };

        let config = Self::parse(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parses config TOML.
    ///
    /// # Errors
    ///
    /// Returns the TOML error if the text is malformed.
    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}
