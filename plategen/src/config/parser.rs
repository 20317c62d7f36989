//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.

use std::path::PathBuf;

use ini::Ini;

use super::file::{ConfigFile, ConfigFileError};
use crate::texture::TileEncoding;

/// Largest accepted thumbnail edge.
const MAX_THUMBNAIL_EDGE: u32 = 4096;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [output] section
    if let Some(section) = ini.section(Some("output")) {
        if let Some(v) = section.get("thumbnail_max_edge") {
            let edge: u32 = v.trim().parse().map_err(|_| invalid(
                "output",
                "thumbnail_max_edge",
                v,
                "expected a positive number of pixels",
            ))?;
            if edge == 0 || edge > MAX_THUMBNAIL_EDGE {
                return Err(invalid(
                    "output",
                    "thumbnail_max_edge",
                    v,
                    &format!("must be between 1 and {}", MAX_THUMBNAIL_EDGE),
                ));
            }
            config.output.thumbnail_max_edge = edge;
        }
        if let Some(v) = section.get("tile_encoding") {
            config.output.tile_encoding = v.parse::<TileEncoding>().map_err(|_| {
                invalid("output", "tile_encoding", v, "must be one of: png, deflate")
            })?;
        }
    }

    // [workers] section
    if let Some(section) = ini.section(Some("workers")) {
        if let Some(v) = section.get("threads") {
            config.workers.threads = v.trim().parse().map_err(|_| {
                invalid(
                    "workers",
                    "threads",
                    v,
                    "expected a number of threads (0 = all cores)",
                )
            })?;
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = expand_tilde(v);
            }
        }
    }

    Ok(config)
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Expand a leading `~/` to the home directory.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Result<ConfigFile, ConfigFileError> {
        let ini = Ini::load_from_str(content).unwrap();
        parse_ini(&ini)
    }

    #[test]
    fn test_empty_ini_is_default() {
        assert_eq!(parse("").unwrap(), ConfigFile::default());
    }

    #[test]
    fn test_overlays_values() {
        let config = parse(
            "[output]\nthumbnail_max_edge = 200\ntile_encoding = Deflate\n\
             [workers]\nthreads = 6\n[logging]\nfile = /tmp/plategen.log\n",
        )
        .unwrap();

        assert_eq!(config.output.thumbnail_max_edge, 200);
        assert_eq!(config.output.tile_encoding, TileEncoding::Deflate);
        assert_eq!(config.workers.threads, 6);
        assert_eq!(config.logging.file, PathBuf::from("/tmp/plategen.log"));
    }

    #[test]
    fn test_partial_section_keeps_defaults() {
        let config = parse("[workers]\nthreads = 2\n").unwrap();
        assert_eq!(config.workers.threads, 2);
        assert_eq!(config.output, ConfigFile::default().output);
    }

    #[test]
    fn test_invalid_encoding() {
        let err = parse("[output]\ntile_encoding = dds\n").unwrap_err();
        match err {
            ConfigFileError::InvalidValue {
                section, key, value, ..
            } => {
                assert_eq!(section, "output");
                assert_eq!(key, "tile_encoding");
                assert_eq!(value, "dds");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_invalid_thumbnail_edge() {
        assert!(parse("[output]\nthumbnail_max_edge = 0\n").is_err());
        assert!(parse("[output]\nthumbnail_max_edge = big\n").is_err());
        assert!(parse("[output]\nthumbnail_max_edge = 99999\n").is_err());
    }

    #[test]
    fn test_invalid_threads() {
        assert!(parse("[workers]\nthreads = -1\n").is_err());
    }

    #[test]
    fn test_expand_tilde() {
        assert_eq!(expand_tilde("/abs/path"), PathBuf::from("/abs/path"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde("~/logs/a.log"), home.join("logs/a.log"));
        }
    }
}
