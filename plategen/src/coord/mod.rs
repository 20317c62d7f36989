//! Coordinate conversion module
//!
//! Provides the projection mapper: conversions between geographic coordinates
//! (latitude/longitude) and pixel positions, either on a pyramid level's pixel
//! grid (`256 · 2^level` per axis) or on an arbitrary raster grid such as the
//! source image.
//!
//! Pixel `y` grows southward, pixel `x` grows eastward. The bounding box is
//! stretched over the whole grid on both axes.

mod types;

pub use types::{
    BoundingBox, CoordError, Projection, MAX_LAT, MAX_LON, MERCATOR_MAX_LAT, MIN_LAT, MIN_LON,
};

use std::f64::consts::FRAC_PI_4;

/// Edge length of a tile in pixels.
pub const TILE_SIZE: u32 = 256;

/// Highest pyramid level the mapper accepts.
///
/// Level 24 is a 4-gigapixel-wide grid; anything beyond that would overflow
/// tile addressing long before it was useful.
pub const MAX_LEVEL: u8 = 24;

/// Pixel grid edge length at a pyramid level: `256 · 2^level`.
#[inline]
pub fn level_grid_size(level: u8) -> u64 {
    (TILE_SIZE as u64) << level
}

/// Maps between geographic coordinates and pixel grids for one bounding box
/// and projection.
///
/// The mapper is immutable and cheap to copy; every method is a pure
/// function of the box, the projection and the target grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionMapper {
    bounds: BoundingBox,
    projection: Projection,
    /// Projected northing of the top edge.
    top_y: f64,
    /// Projected northing of the bottom edge.
    bottom_y: f64,
}

impl ProjectionMapper {
    /// Create a mapper for the given bounds and projection.
    ///
    /// # Errors
    ///
    /// Returns [`CoordError::DegenerateBounds`] if the box has no height once
    /// projected (e.g. a Mercator box lying entirely beyond ±85.05113°).
    pub fn new(bounds: BoundingBox, projection: Projection) -> Result<Self, CoordError> {
        let top_y = forward(projection, bounds.top());
        let bottom_y = forward(projection, bounds.bottom());

        if top_y - bottom_y <= f64::EPSILON {
            return Err(CoordError::DegenerateBounds(format!(
                "bounds {} have no height in {} projection",
                bounds, projection
            )));
        }
        if bounds.width() <= f64::EPSILON {
            return Err(CoordError::DegenerateBounds(format!(
                "bounds {} have no width",
                bounds
            )));
        }

        Ok(Self {
            bounds,
            projection,
            top_y,
            bottom_y,
        })
    }

    /// The bounding box this mapper covers.
    pub fn bounds(&self) -> &BoundingBox {
        &self.bounds
    }

    /// The projection this mapper uses.
    pub fn projection(&self) -> Projection {
        self.projection
    }

    /// Convert a geographic coordinate to a pixel position on a level grid.
    #[inline]
    pub fn geo_to_pixel(&self, lat: f64, lon: f64, level: u8) -> (f64, f64) {
        let size = level_grid_size(level) as f64;
        self.geo_to_raster(lat, lon, size, size)
    }

    /// Convert a pixel position on a level grid to a geographic coordinate.
    ///
    /// Returns `(lat, lon)`.
    #[inline]
    pub fn pixel_to_geo(&self, x: f64, y: f64, level: u8) -> (f64, f64) {
        let size = level_grid_size(level) as f64;
        self.raster_to_geo(x, y, size, size)
    }

    /// Convert a geographic coordinate to a pixel position on a raster of
    /// `width × height` pixels covering the bounding box.
    #[inline]
    pub fn geo_to_raster(&self, lat: f64, lon: f64, width: f64, height: f64) -> (f64, f64) {
        let u = (lon - self.bounds.left()) / self.bounds.width();
        let v = (self.top_y - forward(self.projection, lat)) / (self.top_y - self.bottom_y);
        (u * width, v * height)
    }

    /// Convert a pixel position on a `width × height` raster covering the
    /// bounding box to a geographic coordinate.
    ///
    /// Returns `(lat, lon)`.
    #[inline]
    pub fn raster_to_geo(&self, x: f64, y: f64, width: f64, height: f64) -> (f64, f64) {
        let lon = self.bounds.left() + (x / width) * self.bounds.width();
        let northing = self.top_y - (y / height) * (self.top_y - self.bottom_y);
        (inverse(self.projection, northing), lon)
    }
}

/// Projected northing of a latitude.
///
/// Equirectangular northing is the latitude itself; Mercator northing is
/// `ln(tan(π/4 + φ/2))` with φ clamped to ±[`MERCATOR_MAX_LAT`].
#[inline]
fn forward(projection: Projection, lat: f64) -> f64 {
    match projection {
        Projection::EquiRectangular => lat,
        Projection::Mercator => {
            let phi = lat.clamp(-MERCATOR_MAX_LAT, MERCATOR_MAX_LAT).to_radians();
            (FRAC_PI_4 + phi / 2.0).tan().ln()
        }
    }
}

/// Latitude of a projected northing.
#[inline]
fn inverse(projection: Projection, northing: f64) -> f64 {
    match projection {
        Projection::EquiRectangular => northing,
        Projection::Mercator => (2.0 * northing.exp().atan() - 2.0 * FRAC_PI_4).to_degrees(),
    }
}
