//! Common types and utilities shared across CLI commands.

use clap::ValueEnum;
use plategen::coord::{BoundingBox, Projection};
use plategen::texture::TileEncoding;

use crate::error::CliError;

/// Projection selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum ProjectionArg {
    /// Plate carrée: latitude maps linearly to rows
    #[value(alias = "equirect")]
    Equirectangular,
    /// Web Mercator, clamped to ±85.05113°
    Mercator,
}

impl From<ProjectionArg> for Projection {
    fn from(arg: ProjectionArg) -> Self {
        match arg {
            ProjectionArg::Equirectangular => Projection::EquiRectangular,
            ProjectionArg::Mercator => Projection::Mercator,
        }
    }
}

/// Tile encoding selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum EncodingArg {
    /// PNG tiles, readable by any image tool
    Png,
    /// Raw RGBA compressed with zlib
    Deflate,
}

impl From<EncodingArg> for TileEncoding {
    fn from(arg: EncodingArg) -> Self {
        match arg {
            EncodingArg::Png => TileEncoding::Png,
            EncodingArg::Deflate => TileEncoding::Deflate,
        }
    }
}

/// Build a bounding box from `[top, left, bottom, right]`.
pub fn parse_bounds(values: &[f64]) -> Result<BoundingBox, CliError> {
    match values {
        [top, left, bottom, right] => BoundingBox::new(*top, *left, *bottom, *right)
            .map_err(|e| CliError::InvalidArgument(format!("--bounds: {}", e))),
        _ => Err(CliError::InvalidArgument(format!(
            "--bounds takes 4 values (TOP LEFT BOTTOM RIGHT), got {}",
            values.len()
        ))),
    }
}

/// Parse a `ROW,COL` tile position.
pub fn parse_tile_position(value: &str) -> Result<(u32, u32), CliError> {
    let invalid = || {
        CliError::InvalidArgument(format!(
            "expected ROW,COL (e.g. 1,3), got '{}'",
            value
        ))
    };

    let (row, col) = value.split_once(',').ok_or_else(invalid)?;
    let row = row.trim().parse().map_err(|_| invalid())?;
    let col = col.trim().parse().map_err(|_| invalid())?;
    Ok((row, col))
}

/// Format a byte count for display.
pub fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    let b = bytes as f64;
    if b >= GB {
        format!("{:.2} GB", b / GB)
    } else if b >= MB {
        format!("{:.2} MB", b / MB)
    } else if b >= KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{} B", bytes)
    }
}
