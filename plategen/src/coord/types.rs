//! Coordinate types: bounding boxes, projections and their errors.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Minimum valid latitude in degrees.
pub const MIN_LAT: f64 = -90.0;

/// Maximum valid latitude in degrees.
pub const MAX_LAT: f64 = 90.0;

/// Minimum valid longitude in degrees.
pub const MIN_LON: f64 = -180.0;

/// Maximum valid longitude in degrees.
pub const MAX_LON: f64 = 180.0;

/// Latitude magnitude the Mercator transform is clamped to.
///
/// This is the latitude at which a square Web Mercator world ends, and keeps
/// the transform away from the singularity at the poles.
pub const MERCATOR_MAX_LAT: f64 = 85.05113;

/// Errors raised while validating coordinates or projections.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordError {
    /// Latitude outside [-90, 90]
    InvalidLatitude(f64),
    /// Longitude outside [-180, 180]
    InvalidLongitude(f64),
    /// Bounding box has no area (or an inverted axis)
    DegenerateBounds(String),
    /// Projection name not recognised
    UnsupportedProjection(String),
}

impl fmt::Display for CoordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordError::InvalidLatitude(lat) => {
                write!(f, "Invalid latitude: {} (must be between -90 and 90)", lat)
            }
            CoordError::InvalidLongitude(lon) => {
                write!(
                    f,
                    "Invalid longitude: {} (must be between -180 and 180)",
                    lon
                )
            }
            CoordError::DegenerateBounds(reason) => write!(f, "Degenerate bounds: {}", reason),
            CoordError::UnsupportedProjection(name) => {
                write!(f, "Unsupported projection: '{}'", name)
            }
        }
    }
}

impl std::error::Error for CoordError {}

/// Geographic bounding box of a source raster.
///
/// Stored as the top-left (north-west) and bottom-right (south-east)
/// corners. The box never crosses the antimeridian and always has a
/// positive width and height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BoundingBoxFields")]
pub struct BoundingBox {
    top_left_lat: f64,
    top_left_lon: f64,
    bottom_right_lat: f64,
    bottom_right_lon: f64,
}

/// Unvalidated wire form of [`BoundingBox`].
#[derive(Deserialize)]
struct BoundingBoxFields {
    top_left_lat: f64,
    top_left_lon: f64,
    bottom_right_lat: f64,
    bottom_right_lon: f64,
}

impl TryFrom<BoundingBoxFields> for BoundingBox {
    type Error = CoordError;

    fn try_from(fields: BoundingBoxFields) -> Result<Self, Self::Error> {
        BoundingBox::new(
            fields.top_left_lat,
            fields.top_left_lon,
            fields.bottom_right_lat,
            fields.bottom_right_lon,
        )
    }
}

impl BoundingBox {
    /// Create a validated bounding box.
    ///
    /// # Errors
    ///
    /// Returns an error if any coordinate is out of range, or if the box has
    /// zero (or negative) height or width.
    pub fn new(
        top_left_lat: f64,
        top_left_lon: f64,
        bottom_right_lat: f64,
        bottom_right_lon: f64,
    ) -> Result<Self, CoordError> {
        for lat in [top_left_lat, bottom_right_lat] {
            if !(MIN_LAT..=MAX_LAT).contains(&lat) {
                return Err(CoordError::InvalidLatitude(lat));
            }
        }
        for lon in [top_left_lon, bottom_right_lon] {
            if !(MIN_LON..=MAX_LON).contains(&lon) {
                return Err(CoordError::InvalidLongitude(lon));
            }
        }
        if top_left_lat <= bottom_right_lat {
            return Err(CoordError::DegenerateBounds(format!(
                "top latitude {} must be greater than bottom latitude {}",
                top_left_lat, bottom_right_lat
            )));
        }
        if top_left_lon >= bottom_right_lon {
            return Err(CoordError::DegenerateBounds(format!(
                "left longitude {} must be less than right longitude {}",
                top_left_lon, bottom_right_lon
            )));
        }

        Ok(Self {
            top_left_lat,
            top_left_lon,
            bottom_right_lat,
            bottom_right_lon,
        })
    }

    /// The whole globe: `{90, -180, -90, 180}`.
    pub fn world() -> Self {
        Self {
            top_left_lat: MAX_LAT,
            top_left_lon: MIN_LON,
            bottom_right_lat: MIN_LAT,
            bottom_right_lon: MAX_LON,
        }
    }

    /// Northern edge latitude.
    pub fn top(&self) -> f64 {
        self.top_left_lat
    }

    /// Western edge longitude.
    pub fn left(&self) -> f64 {
        self.top_left_lon
    }

    /// Southern edge latitude.
    pub fn bottom(&self) -> f64 {
        self.bottom_right_lat
    }

    /// Eastern edge longitude.
    pub fn right(&self) -> f64 {
        self.bottom_right_lon
    }

    /// Width in degrees of longitude.
    pub fn width(&self) -> f64 {
        self.bottom_right_lon - self.top_left_lon
    }

    /// Height in degrees of latitude.
    pub fn height(&self) -> f64 {
        self.top_left_lat - self.bottom_right_lat
    }

    /// Center point as `(lat, lon)`.
    pub fn center(&self) -> (f64, f64) {
        (
            (self.top_left_lat + self.bottom_right_lat) / 2.0,
            (self.top_left_lon + self.bottom_right_lon) / 2.0,
        )
    }

    /// Whether the point lies inside the box (edges inclusive).
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        (self.bottom_right_lat..=self.top_left_lat).contains(&lat)
            && (self.top_left_lon..=self.bottom_right_lon).contains(&lon)
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{{}, {}, {}, {}}}",
            self.top_left_lat, self.top_left_lon, self.bottom_right_lat, self.bottom_right_lon
        )
    }
}

/// Map projection used for the pixel↔geo mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Projection {
    /// Plate carrée: latitude and longitude both map linearly.
    EquiRectangular,
    /// Longitude linear, latitude through the Mercator transform.
    Mercator,
}

impl Projection {
    /// Name used in descriptor documents and config files.
    pub fn name(&self) -> &'static str {
        match self {
            Projection::EquiRectangular => "Equirectangular",
            Projection::Mercator => "Mercator",
        }
    }
}

impl fmt::Display for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Projection {
    type Err = CoordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "equirectangular" | "equirect" => Ok(Projection::EquiRectangular),
            "mercator" => Ok(Projection::Mercator),
            _ => Err(CoordError::UnsupportedProjection(s.to_string())),
        }
    }
}
