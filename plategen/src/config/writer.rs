//! INI serialization logic for converting `ConfigFile` → INI string.
//!
//! Produces the commented INI representation written to `config.ini`.

use std::path::Path;

use super::file::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    format!(
        r#"[output]
; Longer edge of thumbnail.png in pixels (1-4096)
thumbnail_max_edge = {}
; Encoding of tiles inside plate files:
;   png     - PNG, viewable with any image tool
;   deflate - raw RGBA compressed with zlib (faster to write)
tile_encoding = {}

[workers]
; Worker threads used for tile rendering (0 = all cores)
threads = {}

[logging]
; Log file, cleared at the start of every run
file = {}
"#,
        config.output.thumbnail_max_edge,
        config.output.tile_encoding,
        config.workers.threads,
        path_to_string(&config.logging.file),
    )
}

fn path_to_string(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ini::Ini;

    #[test]
    fn test_output_is_valid_ini() {
        let content = to_config_string(&ConfigFile::default());
        let ini = Ini::load_from_str(&content).unwrap();

        let output = ini.section(Some("output")).unwrap();
        assert_eq!(output.get("thumbnail_max_edge"), Some("96"));
        assert_eq!(output.get("tile_encoding"), Some("png"));
        assert_eq!(ini.section(Some("workers")).unwrap().get("threads"), Some("0"));
        assert!(ini.section(Some("logging")).unwrap().get("file").is_some());
    }
}
