//! CLI runner for common setup.
//!
//! Encapsulates config loading and logging initialization so command
//! handlers start from the same state.

use tracing::info;

use plategen::config::ConfigFile;
use plategen::logging::{init_logging, split_log_path, LoggingGuard};

use crate::error::CliError;

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Logging guard - keeps logging active while runner exists
    #[allow(dead_code)]
    logging_guard: LoggingGuard,
    /// Loaded configuration file
    config: ConfigFile,
}

impl CliRunner {
    /// Create a new CLI runner, loading config and initializing logging.
    ///
    /// When stdout is a TTY, stdout logging is disabled so log lines do not
    /// tear through the progress bar. `stdout_logging = false` keeps log lines
    /// off stdout entirely, for when it carries JSON lines.
    ///
    /// # Arguments
    ///
    /// * `debug_mode` - When true, defaults plategen to debug-level logging
    /// * `stdout_logging` - Allow mirroring log lines to a non-TTY stdout
    pub fn with_options(debug_mode: bool, stdout_logging: bool) -> Result<Self, CliError> {
        let config = ConfigFile::load()?;

        let (log_dir, log_file) = split_log_path(&config.logging.file);
        let stdout_enabled = stdout_logging && !atty::is(atty::Stream::Stdout);

        let logging_guard = init_logging(&log_dir, &log_file, stdout_enabled, debug_mode)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            logging_guard,
            config,
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("Plategen v{}", plategen::VERSION);
        info!("Plategen CLI: {} command", command);
    }
}
