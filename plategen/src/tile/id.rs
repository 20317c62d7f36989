//! Tile identifiers and pyramid level arithmetic.
//!
//! Level 0 is a single tile covering the whole bounding box; level `n` is a
//! `2^n × 2^n` grid of 256×256 tiles. Tiles are always enumerated
//! breadth-first by level and row-major within a level, which is the order
//! the plate packer appends them in.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::coord::{level_grid_size, MAX_LEVEL, TILE_SIZE};

/// Identifies one tile in the pyramid.
///
/// # Example
///
/// ```
/// use plategen::tile::TileId;
///
/// let tile = TileId::new(2, 1, 3);
/// assert_eq!(tile.level(), 2);
/// assert_eq!(tile.index_in_level(), 7);
/// assert_eq!(TileId::from_index(2, 7), tile);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileId {
    /// Pyramid level (0 = coarsest)
    level: u8,
    /// Row within the level, increasing southward
    row: u32,
    /// Column within the level, increasing eastward
    col: u32,
}

impl TileId {
    /// Create a new tile identifier.
    pub fn new(level: u8, row: u32, col: u32) -> Self {
        Self { level, row, col }
    }

    /// Build a tile identifier from its row-major index within a level.
    pub fn from_index(level: u8, index: u64) -> Self {
        let per_axis = tiles_per_axis(level) as u64;
        Self {
            level,
            row: (index / per_axis) as u32,
            col: (index % per_axis) as u32,
        }
    }

    /// Get the pyramid level.
    pub fn level(&self) -> u8 {
        self.level
    }

    /// Get the tile row.
    pub fn row(&self) -> u32 {
        self.row
    }

    /// Get the tile column.
    pub fn col(&self) -> u32 {
        self.col
    }

    /// Row-major index of this tile within its level.
    pub fn index_in_level(&self) -> u64 {
        self.row as u64 * tiles_per_axis(self.level) as u64 + self.col as u64
    }

    /// Whether the row and column fall inside the level's grid.
    pub fn is_valid(&self) -> bool {
        if self.level > MAX_LEVEL {
            return false;
        }
        let per_axis = tiles_per_axis(self.level);
        self.row < per_axis && self.col < per_axis
    }

    /// Top-left pixel of this tile on its level's pixel grid.
    pub fn pixel_origin(&self) -> (u64, u64) {
        (
            self.col as u64 * TILE_SIZE as u64,
            self.row as u64 * TILE_SIZE as u64,
        )
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}/{}/{}", self.level, self.row, self.col)
    }
}

/// Number of tiles along each axis at a level: `2^level`.
#[inline]
pub fn tiles_per_axis(level: u8) -> u32 {
    1u32 << level
}

/// Number of tiles at a level: `4^level`.
#[inline]
pub fn tile_count(level: u8) -> u64 {
    1u64 << (2 * level as u32)
}

/// Number of tiles across levels `0..=max_level`.
pub fn total_tile_count(max_level: u8) -> u64 {
    (0..=max_level).map(tile_count).sum()
}

/// Deepest level needed for a source raster.
///
/// This is the smallest level whose pixel grid meets or exceeds the raster's
/// longer edge, so the finest level never discards native resolution.
pub fn max_level_for(width: u32, height: u32) -> u8 {
    let longest = width.max(height) as u64;
    let mut level = 0;
    while level < MAX_LEVEL && level_grid_size(level) < longest {
        level += 1;
    }
    level
}

/// Row-major iterator over the tiles of one level.
#[derive(Debug, Clone)]
pub struct LevelTiles {
    level: u8,
    next: u64,
    end: u64,
}

impl LevelTiles {
    /// Iterate over every tile of `level`.
    pub fn new(level: u8) -> Self {
        Self::window(level, 0, tile_count(level))
    }

    /// Iterate over the tiles of `level` with row-major index in
    /// `start..end`, clamped to the level.
    pub fn window(level: u8, start: u64, end: u64) -> Self {
        let end = end.min(tile_count(level));
        Self {
            level,
            next: start.min(end),
            end,
        }
    }
}

impl Iterator for LevelTiles {
    type Item = TileId;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        let tile = TileId::from_index(self.level, self.next);
        self.next += 1;
        Some(tile)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.end - self.next) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for LevelTiles {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_count_is_four_to_the_level() {
        for level in 0..=10u8 {
            assert_eq!(tile_count(level), 4u64.pow(level as u32));
            assert_eq!(LevelTiles::new(level).count() as u64, tile_count(level));
            assert_eq!(
                tiles_per_axis(level) as u64 * TILE_SIZE as u64,
                level_grid_size(level)
            );
        }
    }

    #[test]
    fn test_total_tile_count() {
        assert_eq!(total_tile_count(0), 1);
        assert_eq!(total_tile_count(1), 5);
        assert_eq!(total_tile_count(2), 21);
    }

    #[test]
    fn test_max_level_for() {
        assert_eq!(max_level_for(1, 1), 0);
        assert_eq!(max_level_for(256, 256), 0);
        assert_eq!(max_level_for(257, 10), 1);
        assert_eq!(max_level_for(512, 512), 1);
        // Longer axis drives the level
        assert_eq!(max_level_for(1024, 512), 2);
        assert_eq!(max_level_for(300, 1025), 3);
    }

    #[test]
    fn test_level_tiles_row_major() {
        let tiles: Vec<_> = LevelTiles::new(1).collect();
        assert_eq!(
            tiles,
            vec![
                TileId::new(1, 0, 0),
                TileId::new(1, 0, 1),
                TileId::new(1, 1, 0),
                TileId::new(1, 1, 1),
            ]
        );
    }

    #[test]
    fn test_level_tiles_window() {
        let tiles: Vec<_> = LevelTiles::window(2, 3, 6).collect();
        assert_eq!(
            tiles,
            vec![TileId::new(2, 0, 3), TileId::new(2, 1, 0), TileId::new(2, 1, 1)]
        );

        // Clamped to the level
        assert_eq!(LevelTiles::window(1, 2, 100).len(), 2);
        assert_eq!(LevelTiles::window(1, 9, 100).count(), 0);
    }

    #[test]
    fn test_index_roundtrip() {
        for tile in LevelTiles::new(3) {
            assert_eq!(TileId::from_index(3, tile.index_in_level()), tile);
            assert!(tile.is_valid());
        }
        assert!(!TileId::new(1, 2, 0).is_valid());
    }

    #[test]
    fn test_level_beyond_max_is_invalid() {
        assert!(TileId::new(MAX_LEVEL, 0, 0).is_valid());
        assert!(!TileId::new(MAX_LEVEL + 1, 0, 0).is_valid());
        assert!(!TileId::new(40, 0, 0).is_valid());
    }

    #[test]
    fn test_pixel_origin() {
        assert_eq!(TileId::new(2, 1, 3).pixel_origin(), (768, 256));
    }

    #[test]
    fn test_display() {
        assert_eq!(TileId::new(2, 1, 3).to_string(), "L2/1/3");
    }
}
