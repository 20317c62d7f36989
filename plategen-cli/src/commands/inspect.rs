//! Inspect command - validate a plate file and optionally extract a tile.

use std::path::{Path, PathBuf};

use plategen::plate::PlateFileReader;
use plategen::tile::tiles_per_axis;

use super::common::{format_size, parse_tile_position};
use crate::error::CliError;

/// Slots listed before the index output is truncated.
const MAX_LISTED_SLOTS: usize = 16;

/// Arguments for the inspect command.
pub struct InspectArgs {
    pub plate: PathBuf,
    pub extract: Option<String>,
    pub out: Option<PathBuf>,
}

/// Run the inspect command.
///
/// Opening the reader validates the header, footer and index, so a file
/// that prints at all is structurally sound.
pub fn run(args: InspectArgs) -> Result<(), CliError> {
    let reader = PlateFileReader::open(&args.plate)?;
    print_report(&reader);

    if let Some(position) = args.extract {
        let (row, col) = parse_tile_position(&position)?;
        let out = args.out.ok_or_else(|| {
            CliError::InvalidArgument("--extract requires --out FILE".to_string())
        })?;
        extract_tile(&reader, row, col, &out)?;
        println!();
        println!("Extracted tile ({}, {}) to {}", row, col, out.display());
    }

    Ok(())
}

fn print_report(reader: &PlateFileReader) {
    let header = reader.header();
    let footer = reader.footer();
    let index = reader.index();
    let file_size = std::fs::metadata(reader.path()).map(|m| m.len()).unwrap_or(0);
    let payload_bytes: u64 = index.slots.iter().map(|s| s.length as u64).sum();
    let expected = tiles_per_axis(header.level) as u64 * tiles_per_axis(header.level) as u64;

    println!("Plate file: {}", reader.path().display());
    println!("  Size:        {}", format_size(file_size));
    println!("  Version:     {}", header.version);
    println!("  Level:       {}", header.level);
    println!("  Encoding:    {}", header.encoding);
    println!("  Tile size:   {}", header.tile_size);
    println!("  Tiles:       {} of {}", index.slots.len(), expected);
    println!("  Payload:     {}", format_size(payload_bytes));
    println!(
        "  Index:       {} at offset {}",
        format_size(footer.index_length as u64),
        footer.index_offset
    );
    println!();
    println!("  {:>6} {:>6} {:>12} {:>10}", "row", "col", "offset", "length");
    for slot in index.slots.iter().take(MAX_LISTED_SLOTS) {
        println!(
            "  {:>6} {:>6} {:>12} {:>10}",
            slot.row, slot.col, slot.offset, slot.length
        );
    }
    if index.slots.len() > MAX_LISTED_SLOTS {
        println!("  ... {} more", index.slots.len() - MAX_LISTED_SLOTS);
    }
}

/// Decode one tile and save it as PNG.
fn extract_tile(
    reader: &PlateFileReader,
    row: u32,
    col: u32,
    out: &Path,
) -> Result<(), CliError> {
    let image = reader.decode_tile(row, col)?;
    image
        .save_with_format(out, image::ImageFormat::Png)
        .map_err(|e| CliError::FileWrite {
            path: out.to_path_buf(),
            error: e.to_string(),
        })
}
