//! Raw RGBA + zlib tile encoder.
//!
//! Payload layout: width (u32 LE), height (u32 LE), then the zlib stream of
//! the row-major RGBA bytes. Cheaper to produce than PNG and trivially
//! decodable by anything with zlib.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::RgbaImage;

use super::{TextureError, TileEncoder, TileEncoding};

const DIMENSIONS_LEN: usize = 8;

/// Encodes tiles as zlib-compressed raw RGBA.
#[derive(Debug, Clone)]
pub struct DeflateTileEncoder {
    level: Compression,
}

impl DeflateTileEncoder {
    /// Create an encoder with the default compression level.
    pub fn new() -> Self {
        Self {
            level: Compression::default(),
        }
    }

    /// Set the zlib compression level (0-9).
    pub fn with_level(mut self, level: u32) -> Self {
        self.level = Compression::new(level.min(9));
        self
    }
}

impl Default for DeflateTileEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl TileEncoder for DeflateTileEncoder {
    fn encode(&self, image: &RgbaImage) -> Result<Vec<u8>, TextureError> {
        let mut payload = Vec::with_capacity(DIMENSIONS_LEN + image.as_raw().len() / 4);
        payload.extend_from_slice(&image.width().to_le_bytes());
        payload.extend_from_slice(&image.height().to_le_bytes());

        let mut encoder = ZlibEncoder::new(payload, self.level);
        encoder
            .write_all(image.as_raw())
            .map_err(|e| TextureError::EncodingFailed(e.to_string()))?;
        encoder
            .finish()
            .map_err(|e| TextureError::EncodingFailed(e.to_string()))
    }

    fn decode(&self, payload: &[u8]) -> Result<RgbaImage, TextureError> {
        if payload.len() < DIMENSIONS_LEN {
            return Err(TextureError::DecodingFailed(format!(
                "payload too short: {} bytes",
                payload.len()
            )));
        }

        let (dims, stream) = payload.split_at(DIMENSIONS_LEN);
        let width = u32::from_le_bytes([dims[0], dims[1], dims[2], dims[3]]);
        let height = u32::from_le_bytes([dims[4], dims[5], dims[6], dims[7]]);

        let mut pixels = Vec::new();
        ZlibDecoder::new(stream)
            .read_to_end(&mut pixels)
            .map_err(|e| TextureError::DecodingFailed(e.to_string()))?;

        RgbaImage::from_raw(width, height, pixels).ok_or_else(|| TextureError::InvalidDimensions {
            width,
            height,
            reason: "pixel data does not match dimensions".to_string(),
        })
    }

    fn encoding(&self) -> TileEncoding {
        TileEncoding::Deflate
    }

    fn name(&self) -> &str {
        "Deflate RGBA"
    }

    fn extension(&self) -> &str {
        "rgba.z"
    }
}
