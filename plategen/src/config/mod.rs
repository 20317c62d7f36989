//! User configuration.
//!
//! Settings are read from `~/.plategen/config.ini`:
//!
//! ```ini
//! [output]
//! thumbnail_max_edge = 96
//! tile_encoding = png
//!
//! [workers]
//! threads = 0
//!
//! [logging]
//! file = ~/.plategen/plategen.log
//! ```
//!
//! A missing file yields defaults. [`ConfigFile::pipeline_config`] turns the
//! file into a [`PipelineConfig`](crate::pipeline::PipelineConfig), which
//! command-line flags may override further.

mod file;
mod parser;
mod writer;

pub use file::{
    config_directory, config_file_path, ConfigFile, ConfigFileError, LoggingSettings,
    OutputSettings, WorkerSettings, CONFIG_DIR_NAME, DEFAULT_LOG_FILE_NAME,
};
