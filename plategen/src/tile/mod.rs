//! Tile addressing and generation.
//!
//! A pyramid level `n` is a square grid of `2^n × 2^n` tiles, each
//! [`TILE_SIZE`] pixels on a side. Tiles are addressed by [`TileId`] and
//! enumerated row-major within a level.
//!
//! Rendering a tile is abstracted behind the [`TileGenerator`] trait; the
//! production implementation is [`RasterTileGenerator`], which resamples the
//! decoded source raster.

mod error;
mod generator;
mod id;
mod resample;

pub use crate::coord::TILE_SIZE;
pub use error::TileGeneratorError;
pub use generator::TileGenerator;
pub use id::{max_level_for, tile_count, tiles_per_axis, total_tile_count, LevelTiles, TileId};
pub use resample::RasterTileGenerator;
