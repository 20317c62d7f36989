//! Raster resampling into pyramid tiles.
//!
//! Each output pixel's footprint is mapped onto the source raster through
//! two projection mappers: one for the pyramid grid and one for the source
//! raster. Longitude is linear in both projections and latitude depends only
//! on the row, so footprints are separable and computed once per column and
//! once per row of a tile.
//!
//! Per axis, a footprint wider than one source pixel is area-averaged
//! (every covered source pixel weighted by its overlap). A footprint of one
//! source pixel or less is sampled directly at its center. Footprints that
//! fall outside the source raster produce transparent pixels.

use std::sync::Arc;

use image::{Rgba, RgbaImage};

use super::{max_level_for, TileGenerator, TileGeneratorError, TileId};
use crate::coord::{
    BoundingBox, CoordError, Projection, ProjectionMapper, MERCATOR_MAX_LAT, TILE_SIZE,
};
use crate::raster::SourceRaster;

/// Source pixels contributing to one output pixel along one axis.
type AxisSpan = Vec<(u32, f32)>;

/// Production tile generator: resamples a source raster.
#[derive(Debug, Clone)]
pub struct RasterTileGenerator {
    raster: Arc<SourceRaster>,
    output: ProjectionMapper,
    source: ProjectionMapper,
    max_level: u8,
}

impl RasterTileGenerator {
    /// Create a generator for a raster covering `bounds`.
    ///
    /// # Arguments
    ///
    /// * `raster` - Decoded source raster
    /// * `bounds` - Geographic extent of the raster and of the pyramid
    /// * `projection` - Projection of the generated pyramid
    /// * `source_projection` - Projection the raster itself is in
    ///
    /// # Errors
    ///
    /// Returns an error if the bounds degenerate under either projection.
    pub fn new(
        raster: Arc<SourceRaster>,
        bounds: BoundingBox,
        projection: Projection,
        source_projection: Projection,
    ) -> Result<Self, CoordError> {
        let output = ProjectionMapper::new(bounds, projection)?;
        let source = ProjectionMapper::new(bounds, source_projection)?;
        let max_level = max_level_for(raster.width(), raster.height());

        Ok(Self {
            raster,
            output,
            source,
            max_level,
        })
    }

    /// The mapper for the pyramid grid.
    pub fn mapper(&self) -> &ProjectionMapper {
        &self.output
    }

    /// Source span of every column of a tile.
    fn column_spans(&self, tile: TileId) -> Vec<AxisSpan> {
        let (origin_x, origin_y) = tile.pixel_origin();
        let (center_lat, _) = self.output.bounds().center();
        let width = self.raster.width() as f64;
        let height = self.raster.height() as f64;

        let edge = |i: u32| {
            let (_, lon) =
                self.output
                    .pixel_to_geo((origin_x + i as u64) as f64, origin_y as f64, tile.level());
            self.source.geo_to_raster(center_lat, lon, width, height).0
        };

        (0..TILE_SIZE)
            .map(|i| axis_span(edge(i), edge(i + 1), self.raster.width()))
            .collect()
    }

    /// Source span of every row of a tile.
    fn row_spans(&self, tile: TileId) -> Vec<AxisSpan> {
        let (origin_x, origin_y) = tile.pixel_origin();
        let (_, center_lon) = self.output.bounds().center();
        let width = self.raster.width() as f64;
        let height = self.raster.height() as f64;
        let mercator_source = self.source.projection() == Projection::Mercator;

        let edge_lat = |i: u32| {
            self.output
                .pixel_to_geo(origin_x as f64, (origin_y + i as u64) as f64, tile.level())
                .0
        };

        (0..TILE_SIZE)
            .map(|i| {
                let (lat_a, lat_b) = (edge_lat(i), edge_lat(i + 1));

                // A Mercator raster holds nothing beyond the clamp latitude
                if mercator_source && ((lat_a + lat_b) / 2.0).abs() > MERCATOR_MAX_LAT {
                    return Vec::new();
                }

                let a = self.source.geo_to_raster(lat_a, center_lon, width, height).1;
                let b = self.source.geo_to_raster(lat_b, center_lon, width, height).1;
                axis_span(a, b, self.raster.height())
            })
            .collect()
    }
}

impl TileGenerator for RasterTileGenerator {
    fn generate(&self, tile: TileId) -> Result<RgbaImage, TileGeneratorError> {
        if !tile.is_valid() || tile.level() > self.max_level {
            return Err(TileGeneratorError::OutOfPyramid {
                tile,
                max_level: self.max_level,
            });
        }

        let columns = self.column_spans(tile);
        let rows = self.row_spans(tile);
        let mut image = RgbaImage::new(TILE_SIZE, TILE_SIZE);

        for (py, row) in rows.iter().enumerate() {
            if row.is_empty() {
                continue;
            }
            for (px, column) in columns.iter().enumerate() {
                if column.is_empty() {
                    continue;
                }
                let pixel = sample(&self.raster, row, column).ok_or_else(|| {
                    TileGeneratorError::ResampleFailed(format!(
                        "empty footprint at pixel ({}, {}) of {}",
                        px, py, tile
                    ))
                })?;
                image.put_pixel(px as u32, py as u32, pixel);
            }
        }

        Ok(image)
    }

    fn max_level(&self) -> u8 {
        self.max_level
    }
}

/// Source pixels covered by the interval `[a, b)` on an axis of `limit`
/// pixels.
fn axis_span(a: f64, b: f64, limit: u32) -> AxisSpan {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };

    if hi - lo <= 1.0 {
        let center = ((lo + hi) / 2.0).floor();
        if center < 0.0 || center >= limit as f64 {
            return Vec::new();
        }
        return vec![(center as u32, 1.0)];
    }

    let start = lo.floor().max(0.0) as u32;
    let end = (hi.ceil().min(limit as f64)).max(0.0) as u32;

    (start..end)
        .filter_map(|i| {
            let overlap = hi.min(i as f64 + 1.0) - lo.max(i as f64);
            (overlap > 0.0).then_some((i, overlap as f32))
        })
        .collect()
}

/// Weighted average of the source pixels under a row × column footprint.
#[inline]
fn sample(raster: &SourceRaster, row: &AxisSpan, column: &AxisSpan) -> Option<Rgba<u8>> {
    let image = raster.image();

    if let ([(y, _)], [(x, _)]) = (row.as_slice(), column.as_slice()) {
        return Some(*image.get_pixel(*x, *y));
    }

    let mut sum = [0.0f64; 4];
    let mut total = 0.0f64;
    for &(y, wy) in row {
        for &(x, wx) in column {
            let weight = (wy * wx) as f64;
            let pixel = image.get_pixel(x, y);
            for (acc, channel) in sum.iter_mut().zip(pixel.0) {
                *acc += channel as f64 * weight;
            }
            total += weight;
        }
    }

    if total <= 0.0 {
        return None;
    }
    Some(Rgba(sum.map(|acc| (acc / total).round().clamp(0.0, 255.0) as u8)))
}
