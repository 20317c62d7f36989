//! Configuration file handling for ~/.plategen/config.ini.
//!
//! Loads and saves user configuration with sensible defaults. Parsing lives
//! in [`super::parser`], serialization in [`super::writer`].

use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;

use crate::pipeline::PipelineConfig;
use crate::texture::TileEncoding;
use crate::thumbnail::DEFAULT_THUMBNAIL_MAX_EDGE;

/// Name of the directory holding configuration and logs.
pub const CONFIG_DIR_NAME: &str = ".plategen";

/// Default log file name.
pub const DEFAULT_LOG_FILE_NAME: &str = "plategen.log";

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Failed to write config file
    #[error("Failed to write config file: {0}")]
    WriteError(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    /// Failed to create config directory
    #[error("Failed to create config directory: {0}")]
    DirectoryError(std::io::Error),
}

/// `[output]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSettings {
    /// Longer edge of the thumbnail in pixels
    pub thumbnail_max_edge: u32,
    /// Payload encoding of plate file tiles
    pub tile_encoding: TileEncoding,
}

/// `[workers]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerSettings {
    /// Worker threads; 0 uses every available core
    pub threads: usize,
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    /// Log file path
    pub file: PathBuf,
}

/// User configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub output: OutputSettings,
    pub workers: WorkerSettings,
    pub logging: LoggingSettings,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            output: OutputSettings {
                thumbnail_max_edge: DEFAULT_THUMBNAIL_MAX_EDGE,
                tile_encoding: TileEncoding::default(),
            },
            workers: WorkerSettings { threads: 0 },
            logging: LoggingSettings {
                file: config_directory().join(DEFAULT_LOG_FILE_NAME),
            },
        }
    }
}

impl ConfigFile {
    /// Load configuration from the default path (~/.plategen/config.ini).
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        super::parser::parse_ini(&ini)
    }

    /// Save configuration to the default path (~/.plategen/config.ini).
    pub fn save(&self) -> Result<(), ConfigFileError> {
        self.save_to(&config_file_path())
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigFileError::DirectoryError)?;
        }

        let content = super::writer::to_config_string(self);
        std::fs::write(path, content).map_err(|e| ConfigFileError::WriteError(e.to_string()))
    }

    /// Create the default config file if it doesn't exist.
    ///
    /// Returns the path to the config file.
    pub fn ensure_exists() -> Result<PathBuf, ConfigFileError> {
        let path = config_file_path();
        if !path.exists() {
            Self::default().save_to(&path)?;
        }
        Ok(path)
    }

    /// Pipeline settings derived from this file.
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig::default()
            .with_threads(self.workers.threads)
            .with_thumbnail_max_edge(self.output.thumbnail_max_edge)
            .with_encoding(self.output.tile_encoding)
    }
}

/// Get the path to the config directory (~/.plategen).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
}

/// Get the path to the config file (~/.plategen/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}
