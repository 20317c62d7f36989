//! Configuration management CLI commands.
//!
//! Provides `config path`, `config show` and `config init` for locating,
//! viewing and creating the configuration file.

use clap::Subcommand;
use plategen::config::{config_file_path, ConfigFile};

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the configuration file path
    Path,

    /// Show the effective settings (file values or defaults)
    Show,

    /// Write a default configuration file if none exists
    Init,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Path => run_path(),
        ConfigCommands::Show => run_show(),
        ConfigCommands::Init => run_init(),
    }
}

/// Show the configuration file path.
fn run_path() -> Result<(), CliError> {
    println!("{}", config_file_path().display());
    Ok(())
}

/// Show the effective configuration.
fn run_show() -> Result<(), CliError> {
    let path = config_file_path();
    let config = ConfigFile::load()?;

    println!("Configuration Settings");
    println!("======================");
    if path.exists() {
        println!("File: {}", path.display());
    } else {
        println!("File: {} (not created, showing defaults)", path.display());
    }
    println!();

    print!("{}", render(&config));
    Ok(())
}

/// Create the default configuration file.
fn run_init() -> Result<(), CliError> {
    let path = config_file_path();
    if path.exists() {
        println!("Configuration already exists: {}", path.display());
        return Ok(());
    }

    let path = ConfigFile::ensure_exists()?;
    println!("Created {}", path.display());
    Ok(())
}

fn render(config: &ConfigFile) -> String {
    let threads = match config.workers.threads {
        0 => "0 (all cores)".to_string(),
        n => n.to_string(),
    };

    format!(
        "[output]\n  thumbnail_max_edge = {}\n  tile_encoding = {}\n\n\
         [workers]\n  threads = {}\n\n\
         [logging]\n  file = {}\n",
        config.output.thumbnail_max_edge,
        config.output.tile_encoding,
        threads,
        config.logging.file.display(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_defaults() {
        let text = render(&ConfigFile::default());
        assert!(text.contains("[output]"));
        assert!(text.contains("thumbnail_max_edge = 96"));
        assert!(text.contains("tile_encoding = png"));
        assert!(text.contains("threads = 0 (all cores)"));
    }

    #[test]
    fn test_render_explicit_threads() {
        let mut config = ConfigFile::default();
        config.workers.threads = 6;
        assert!(render(&config).contains("threads = 6\n"));
    }
}
