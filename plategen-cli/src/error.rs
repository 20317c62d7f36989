//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::path::PathBuf;
use std::process;

use plategen::config::ConfigFileError;
use plategen::plate::PlateReadError;
use plategen::{ErrorKind, PyramidError};

/// Exit code used when the user cancelled the job.
const EXIT_CANCELLED: i32 = 130;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// Invalid command-line argument
    InvalidArgument(String),
    /// Pyramid generation failed or was cancelled
    Generation(PyramidError),
    /// Failed to read a plate file
    Plate(PlateReadError),
    /// Failed to write output file
    FileWrite { path: PathBuf, error: String },
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Generation(e) if e.is_cancelled() => {
                eprintln!("No output was written.");
                process::exit(EXIT_CANCELLED)
            }
            CliError::Generation(e) if e.kind() == ErrorKind::InvalidBounds => {
                eprintln!();
                eprintln!("Bounds are given as TOP LEFT BOTTOM RIGHT, for example:");
                eprintln!("  plategen generate world.png --bounds 90 -180 -90 180");
                eprintln!("Mercator output only covers latitudes within ±85.05113°.");
            }
            CliError::Generation(_) => {
                eprintln!("Partial output was removed.");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            CliError::Generation(e) => write!(f, "{}", e),
            CliError::Plate(e) => write!(f, "Invalid plate file: {}", e),
            CliError::FileWrite { path, error } => {
                write!(f, "Failed to write file '{}': {}", path.display(), error)
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Generation(e) => Some(e),
            CliError::Plate(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PyramidError> for CliError {
    fn from(e: PyramidError) -> Self {
        CliError::Generation(e)
    }
}

impl From<PlateReadError> for CliError {
    fn from(e: PlateReadError) -> Self {
        CliError::Plate(e)
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e.to_string())
    }
}
