//! Error taxonomy for pyramid generation.
//!
//! Every component failure that reaches the orchestrator is expressed as a
//! [`PyramidError`]. Snapshots and UI consumers only need the coarse
//! [`ErrorKind`], which is `Copy` and serializable.

use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::coord::CoordError;

/// Result type for pyramid generation.
pub type PyramidResult<T> = Result<T, PyramidError>;

/// Errors that terminate a generation job.
#[derive(Debug, Error)]
pub enum PyramidError {
    /// Bounding box out of range or without area.
    #[error("Invalid bounds: {0}")]
    InvalidBounds(String),

    /// Projection name not recognised.
    #[error("Unsupported projection: {0}")]
    UnsupportedProjection(String),

    /// The source raster could not be read or decoded.
    #[error("Failed to decode source raster {}: {cause}", path.display())]
    SourceRasterDecode { path: PathBuf, cause: String },

    /// A single tile could not be resampled or encoded.
    #[error("Tile generation failed at level {level}, row {row}, col {col}: {cause}")]
    TileGeneration {
        level: u8,
        row: u32,
        col: u32,
        cause: String,
    },

    /// Writing a level's plate file failed.
    #[error("Plate file I/O failed for level {level}: {cause}")]
    PlateFileIo {
        level: u8,
        #[source]
        cause: io::Error,
    },

    /// Writing the descriptor document failed.
    #[error("Failed to write descriptor: {0}")]
    DescriptorWrite(String),

    /// Creating, writing into, or cleaning up the output folder failed.
    #[error("Output folder error at {}: {cause}", path.display())]
    OutputFolder {
        path: PathBuf,
        #[source]
        cause: io::Error,
    },

    /// Encoding or writing the thumbnail image failed.
    #[error("Failed to write thumbnail {}: {cause}", path.display())]
    ThumbnailWrite {
        path: PathBuf,
        #[source]
        cause: image::ImageError,
    },

    /// The worker pool could not be created.
    #[error("Failed to start worker pool: {0}")]
    WorkerPool(String),

    /// The job was cancelled before completing.
    #[error("Generation cancelled")]
    Cancelled,
}

impl PyramidError {
    /// Coarse classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PyramidError::InvalidBounds(_) => ErrorKind::InvalidBounds,
            PyramidError::UnsupportedProjection(_) => ErrorKind::UnsupportedProjection,
            PyramidError::SourceRasterDecode { .. } => ErrorKind::SourceRasterDecode,
            PyramidError::TileGeneration { .. } => ErrorKind::TileGeneration,
            PyramidError::PlateFileIo { .. } => ErrorKind::PlateFileIo,
            PyramidError::DescriptorWrite(_) => ErrorKind::DescriptorWrite,
            PyramidError::OutputFolder { .. } | PyramidError::ThumbnailWrite { .. } => {
                ErrorKind::OutputFolder
            }
            PyramidError::WorkerPool(_) => ErrorKind::WorkerPool,
            PyramidError::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Whether this error is a user cancellation rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PyramidError::Cancelled)
    }
}

impl From<CoordError> for PyramidError {
    fn from(err: CoordError) -> Self {
        match err {
            CoordError::UnsupportedProjection(name) => PyramidError::UnsupportedProjection(name),
            other => PyramidError::InvalidBounds(other.to_string()),
        }
    }
}

/// Coarse error classification carried by progress snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidBounds,
    UnsupportedProjection,
    SourceRasterDecode,
    TileGeneration,
    PlateFileIo,
    DescriptorWrite,
    OutputFolder,
    WorkerPool,
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_generation_display_includes_position() {
        let err = PyramidError::TileGeneration {
            level: 2,
            row: 1,
            col: 3,
            cause: "resample failed".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Tile generation failed at level 2, row 1, col 3: resample failed"
        );
        assert_eq!(err.kind(), ErrorKind::TileGeneration);
    }

    #[test]
    fn test_plate_io_has_source() {
        use std::error::Error;

        let err = PyramidError::PlateFileIo {
            level: 4,
            cause: io::Error::other("disk full"),
        };
        assert!(err.source().is_some());
        assert!(err.to_string().contains("level 4"));
    }

    #[test]
    fn test_thumbnail_write_keeps_image_error() {
        use std::error::Error;

        let err = PyramidError::ThumbnailWrite {
            path: PathBuf::from("/out/thumb.png"),
            cause: image::ImageError::IoError(io::Error::other("read-only volume")),
        };
        assert_eq!(err.kind(), ErrorKind::OutputFolder);
        let source = err.source().unwrap();
        assert!(source.downcast_ref::<image::ImageError>().is_some());
        assert!(err.to_string().contains("thumb.png"));
    }

    #[test]
    fn test_from_coord_error() {
        let err: PyramidError = CoordError::InvalidLatitude(95.0).into();
        assert_eq!(err.kind(), ErrorKind::InvalidBounds);

        let err: PyramidError = CoordError::UnsupportedProjection("toast".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::UnsupportedProjection);
    }

    #[test]
    fn test_cancelled() {
        assert!(PyramidError::Cancelled.is_cancelled());
        assert!(!PyramidError::DescriptorWrite("x".to_string()).is_cancelled());
    }
}
