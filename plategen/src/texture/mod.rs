//! Tile payload encoding.
//!
//! Rendered tiles are RGBA images; before they are appended to a plate file
//! they are encoded into a self-contained byte payload. The encoding is
//! abstracted behind the [`TileEncoder`] trait so plate writers and readers
//! only deal in bytes.
//!
//! ```text
//! ┌─────────────────────┐
//! │    Orchestrator     │
//! │                     │
//! │ Arc<dyn TileEncoder>│
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │    TileEncoder      │ (trait)
//! └──────────┬──────────┘
//!            │
//!       ┌────┴─────┐
//!       ▼          ▼
//! ┌──────────┐ ┌──────────┐
//! │   Png    │ │ Deflate  │
//! │ Encoder  │ │ Encoder  │
//! └──────────┘ └──────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use plategen::texture::{TileEncoder, TileEncoding};
//! use image::RgbaImage;
//!
//! let encoder = TileEncoding::Png.encoder();
//! let payload = encoder.encode(&RgbaImage::new(256, 256)).unwrap();
//! let decoded = encoder.decode(&payload).unwrap();
//!
//! assert_eq!(encoder.extension(), "png");
//! assert_eq!(decoded.dimensions(), (256, 256));
//! ```

mod deflate;
mod encoder;
mod error;
mod png;

pub use deflate::DeflateTileEncoder;
pub use encoder::{TileEncoder, TileEncoding};
pub use error::TextureError;
pub use png::PngTileEncoder;
