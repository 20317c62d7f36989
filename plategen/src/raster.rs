//! Source raster loading.
//!
//! The source raster is decoded once into an RGBA buffer and then shared
//! read-only between the tile workers and the thumbnail generator.

use std::path::{Path, PathBuf};

use image::RgbaImage;
use tracing::{debug, info};

use crate::error::{PyramidError, PyramidResult};

/// A decoded source raster.
#[derive(Debug, Clone)]
pub struct SourceRaster {
    image: RgbaImage,
    path: Option<PathBuf>,
}

impl SourceRaster {
    /// Decode a raster from disk.
    ///
    /// Any format the `image` crate can decode is accepted; the pixels are
    /// converted to 8-bit RGBA.
    ///
    /// # Errors
    ///
    /// Returns [`PyramidError::SourceRasterDecode`] if the file cannot be read
    /// or decoded, or if it has no pixels.
    pub fn open(path: &Path) -> PyramidResult<Self> {
        debug!(path = %path.display(), "Decoding source raster");

        let decoded = image::open(path).map_err(|e| PyramidError::SourceRasterDecode {
            path: path.to_path_buf(),
            cause: e.to_string(),
        })?;
        let image = decoded.to_rgba8();

        if image.width() == 0 || image.height() == 0 {
            return Err(PyramidError::SourceRasterDecode {
                path: path.to_path_buf(),
                cause: "raster has no pixels".to_string(),
            });
        }

        info!(
            path = %path.display(),
            width = image.width(),
            height = image.height(),
            "Source raster loaded"
        );

        Ok(Self {
            image,
            path: Some(path.to_path_buf()),
        })
    }

    /// Wrap an already decoded image.
    pub fn from_image(image: RgbaImage) -> Self {
        Self { image, path: None }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Path the raster was loaded from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The decoded pixels.
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }
}
