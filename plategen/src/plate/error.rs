//! Errors raised while reading plate files.

use std::io;

use thiserror::Error;

use crate::texture::TextureError;

/// Errors that can occur when opening or reading a plate file.
#[derive(Debug, Error)]
pub enum PlateReadError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Not a plate file (magic {found:?})")]
    BadMagic { found: [u8; 4] },

    #[error("Unsupported plate format version {0}")]
    UnsupportedVersion(u16),

    #[error("Plate level {level} exceeds the deepest supported level {max}")]
    UnsupportedLevel { level: u8, max: u8 },

    #[error("Unknown tile encoding: {0}")]
    Encoding(#[source] TextureError),

    #[error("File too short for a plate file: {len} bytes")]
    Truncated { len: u64 },

    #[error("Corrupt plate index: {0}")]
    CorruptIndex(String),

    #[error("No tile at row {row}, col {col}")]
    TileNotFound { row: u32, col: u32 },

    #[error("Failed to decode tile payload: {0}")]
    Decode(#[source] TextureError),
}
