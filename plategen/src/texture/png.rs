//! PNG tile encoder.

use std::io::Cursor;

use image::{ImageFormat, RgbaImage};

use super::{TextureError, TileEncoder, TileEncoding};

/// Encodes tiles as PNG.
///
/// # Example
///
/// ```
/// use plategen::texture::{PngTileEncoder, TileEncoder};
///
/// let encoder = PngTileEncoder::new();
/// assert_eq!(encoder.extension(), "png");
/// assert_eq!(encoder.name(), "PNG");
/// ```
#[derive(Debug, Clone, Default)]
pub struct PngTileEncoder;

impl PngTileEncoder {
    pub fn new() -> Self {
        Self
    }
}

impl TileEncoder for PngTileEncoder {
    fn encode(&self, image: &RgbaImage) -> Result<Vec<u8>, TextureError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(TextureError::InvalidDimensions {
                width: image.width(),
                height: image.height(),
                reason: "empty image".to_string(),
            });
        }

        let mut buffer = Cursor::new(Vec::new());
        image
            .write_to(&mut buffer, ImageFormat::Png)
            .map_err(|e| TextureError::EncodingFailed(e.to_string()))?;
        Ok(buffer.into_inner())
    }

    fn decode(&self, payload: &[u8]) -> Result<RgbaImage, TextureError> {
        let image = image::load_from_memory_with_format(payload, ImageFormat::Png)
            .map_err(|e| TextureError::DecodingFailed(e.to_string()))?;
        Ok(image.to_rgba8())
    }

    fn encoding(&self) -> TileEncoding {
        TileEncoding::Png
    }

    fn name(&self) -> &str {
        "PNG"
    }

    fn extension(&self) -> &str {
        "png"
    }
}
