//! TileEncoder trait and the encoding selector.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use super::{DeflateTileEncoder, PngTileEncoder, TextureError};

/// Trait for tile payload encoders.
///
/// Implementations must be thread-safe (`Send + Sync`); tiles are encoded on
/// the worker pool.
pub trait TileEncoder: Send + Sync {
    /// Encode a rendered tile into a self-contained payload.
    fn encode(&self, image: &RgbaImage) -> Result<Vec<u8>, TextureError>;

    /// Decode a payload previously produced by [`encode`](Self::encode).
    fn decode(&self, payload: &[u8]) -> Result<RgbaImage, TextureError>;

    /// Which encoding this is; recorded in plate headers.
    fn encoding(&self) -> TileEncoding;

    /// Human-readable encoder name.
    fn name(&self) -> &str;

    /// File extension for an extracted payload (without the dot).
    fn extension(&self) -> &str;
}

/// Tile payload encodings a plate file can hold.
///
/// The discriminant is the byte stored in the plate header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TileEncoding {
    /// PNG, readable by any image viewer.
    #[default]
    Png = 0,
    /// Raw RGBA pixels compressed with zlib.
    Deflate = 1,
}

impl TileEncoding {
    /// Header byte for this encoding.
    pub fn id(self) -> u8 {
        self as u8
    }

    /// Encoding for a header byte.
    pub fn from_id(id: u8) -> Result<Self, TextureError> {
        match id {
            0 => Ok(TileEncoding::Png),
            1 => Ok(TileEncoding::Deflate),
            other => Err(TextureError::UnsupportedFormat(format!(
                "encoding id {}",
                other
            ))),
        }
    }

    /// Configuration name of this encoding.
    pub fn name(self) -> &'static str {
        match self {
            TileEncoding::Png => "png",
            TileEncoding::Deflate => "deflate",
        }
    }

    /// Shared encoder instance for this encoding.
    pub fn encoder(self) -> Arc<dyn TileEncoder> {
        match self {
            TileEncoding::Png => Arc::new(PngTileEncoder::new()),
            TileEncoding::Deflate => Arc::new(DeflateTileEncoder::new()),
        }
    }
}

impl fmt::Display for TileEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TileEncoding {
    type Err = TextureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "png" => Ok(TileEncoding::Png),
            "deflate" | "zlib" => Ok(TileEncoding::Deflate),
            other => Err(TextureError::UnsupportedFormat(other.to_string())),
        }
    }
}
