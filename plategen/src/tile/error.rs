//! Error types for tile generation.
//!
//! Provides a unified error type for the tile generation abstraction. The
//! orchestrator attaches the failing tile's position when it converts these
//! into [`crate::error::PyramidError::TileGeneration`].

use std::fmt;

use super::TileId;

/// Errors that can occur while generating a single tile.
#[derive(Debug, Clone, PartialEq)]
pub enum TileGeneratorError {
    /// The tile lies outside the pyramid being generated
    OutOfPyramid {
        /// The rejected tile
        tile: TileId,
        /// Deepest level of the pyramid
        max_level: u8,
    },
    /// Resampling the source raster failed
    ResampleFailed(String),
    /// Tile payload encoding failed
    EncodingFailed(String),
    /// Internal error
    Internal(String),
}

impl fmt::Display for TileGeneratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TileGeneratorError::OutOfPyramid { tile, max_level } => {
                write!(
                    f,
                    "Tile {} is outside the pyramid (max level {})",
                    tile, max_level
                )
            }
            TileGeneratorError::ResampleFailed(msg) => {
                write!(f, "Resampling failed: {}", msg)
            }
            TileGeneratorError::EncodingFailed(msg) => {
                write!(f, "Tile encoding failed: {}", msg)
            }
            TileGeneratorError::Internal(msg) => {
                write!(f, "Internal error: {}", msg)
            }
        }
    }
}

impl std::error::Error for TileGeneratorError {}

impl From<crate::texture::TextureError> for TileGeneratorError {
    fn from(err: crate::texture::TextureError) -> Self {
        TileGeneratorError::EncodingFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_pyramid_display() {
        let err = TileGeneratorError::OutOfPyramid {
            tile: TileId::new(5, 0, 0),
            max_level: 3,
        };
        assert_eq!(
            err.to_string(),
            "Tile L5/0/0 is outside the pyramid (max level 3)"
        );
    }

    #[test]
    fn test_resample_failed_display() {
        let err = TileGeneratorError::ResampleFailed("bad footprint".to_string());
        assert_eq!(err.to_string(), "Resampling failed: bad footprint");
    }

    #[test]
    fn test_from_texture_error() {
        let err: TileGeneratorError =
            crate::texture::TextureError::EncodingFailed("png".to_string()).into();
        assert!(matches!(err, TileGeneratorError::EncodingFailed(_)));
    }

    #[test]
    fn test_error_trait() {
        fn assert_error<E: std::error::Error>() {}
        assert_error::<TileGeneratorError>();
    }
}
