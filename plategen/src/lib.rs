//! Plategen - raster to tile pyramid generation
//!
//! This library turns a georeferenced source raster into a multi-level tile
//! pyramid. Every level is packed into a single indexed plate file, and the
//! output folder also receives a thumbnail and a WTML descriptor.
//!
//! The entry point is [`pipeline::PyramidPipeline`]; the other modules are
//! its building blocks and can be used on their own (e.g. [`plate`] to read
//! generated plate files).

pub mod config;
pub mod coord;
pub mod descriptor;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod plate;
pub mod progress;
pub mod raster;
pub mod texture;
pub mod thumbnail;
pub mod tile;

pub use error::{ErrorKind, PyramidError, PyramidResult};

/// Version of the plategen library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
