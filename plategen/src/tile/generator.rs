//! TileGenerator trait for abstracting tile generation strategies.
//!
//! The orchestrator only ever talks to a `dyn TileGenerator`, so the
//! production resampler can be wrapped by decorators (throttling, fault
//! injection in tests) without the pipeline knowing.
//!
//! # Example
//!
//! ```
//! use plategen::tile::{TileGenerator, TileId};
//!
//! fn render_root(generator: &dyn TileGenerator) {
//!     let root = TileId::new(0, 0, 0);
//!     println!("Pyramid has {} levels", generator.max_level() + 1);
//!     // In real code: let image = generator.generate(root)?;
//!     let _ = root;
//! }
//! ```

use image::RgbaImage;

use crate::tile::{TileGeneratorError, TileId};

/// Trait for tile generation strategies.
///
/// Implementations must be thread-safe (`Send + Sync`): tiles of one level
/// are rendered concurrently on the worker pool.
///
/// # Implementors
///
/// - [`RasterTileGenerator`](super::RasterTileGenerator) - Resamples a
///   source raster through the projection mapper
pub trait TileGenerator: Send + Sync {
    /// Render one 256×256 tile.
    ///
    /// # Errors
    ///
    /// Returns `TileGeneratorError` if the tile is outside the pyramid or
    /// resampling fails. A failure is fatal to the whole job.
    fn generate(&self, tile: TileId) -> Result<RgbaImage, TileGeneratorError>;

    /// Deepest level this generator produces.
    fn max_level(&self) -> u8;
}
