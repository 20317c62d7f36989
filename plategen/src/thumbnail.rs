//! Thumbnail generation.
//!
//! A single low-resolution preview of the whole source raster, saved next to
//! the plate files as `thumbnail.png`.

use std::path::Path;

use image::imageops::{self, FilterType};
use image::RgbaImage;
use tracing::debug;

use crate::raster::SourceRaster;

/// File name of the thumbnail inside the output folder.
pub const THUMBNAIL_FILE_NAME: &str = "thumbnail.png";

/// Default length of the thumbnail's longer edge in pixels.
pub const DEFAULT_THUMBNAIL_MAX_EDGE: u32 = 96;

/// Thumbnail dimensions for a `width × height` source.
///
/// The longer edge becomes `max_edge`; the shorter edge keeps the aspect
/// ratio and is at least one pixel.
pub fn thumbnail_dimensions(width: u32, height: u32, max_edge: u32) -> (u32, u32) {
    let max_edge = max_edge.max(1);
    let scale = |short: u32, long: u32| -> u32 {
        let scaled = (short as f64 * max_edge as f64 / long as f64).round() as u32;
        scaled.clamp(1, max_edge)
    };

    if width >= height {
        (max_edge, scale(height, width.max(1)))
    } else {
        (scale(width, height), max_edge)
    }
}

/// Downscale the source raster into a thumbnail.
pub fn generate(source: &SourceRaster, max_edge: u32) -> RgbaImage {
    let (width, height) = thumbnail_dimensions(source.width(), source.height(), max_edge);
    debug!(width = width, height = height, "Generating thumbnail");
    imageops::resize(source.image(), width, height, FilterType::Triangle)
}

/// Encode a thumbnail as PNG at `path`.
pub fn save(thumbnail: &RgbaImage, path: &Path) -> image::ImageResult<()> {
    thumbnail.save_with_format(path, image::ImageFormat::Png)
}
