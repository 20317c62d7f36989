//! Plate files: one packed file of encoded tiles per pyramid level.
//!
//! See [`format`] for the byte layout. [`PlateFileWriter`] produces a file
//! during generation and [`PlateFileReader`] gives random access to a
//! finalized one.

mod error;
pub mod format;
mod reader;
mod writer;

pub use error::PlateReadError;
pub use format::{plate_file_name, PlateHeader, PlateIndex, PlateSlot};
pub use reader::PlateFileReader;
pub use writer::{PlateFileRef, PlateFileWriter};
