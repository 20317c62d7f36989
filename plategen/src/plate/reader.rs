//! Plate file reader.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use image::RgbaImage;
use parking_lot::Mutex;

use super::format::{
    PlateFooter, PlateHeader, PlateIndex, PlateSlot, FOOTER_LEN, HEADER_LEN,
};
use super::PlateReadError;
use crate::tile::tiles_per_axis;

/// Random access to the tiles of a finalized plate file.
///
/// The header, footer and index are validated on open; afterwards tiles can
/// be read concurrently through a shared reference.
#[derive(Debug)]
pub struct PlateFileReader {
    path: PathBuf,
    file: Mutex<File>,
    header: PlateHeader,
    footer: PlateFooter,
    index: PlateIndex,
    lookup: HashMap<(u32, u32), usize>,
}

impl PlateFileReader {
    /// Open and validate a plate file.
    pub fn open(path: &Path) -> Result<Self, PlateReadError> {
        let mut file = File::open(path)?;
        let len = file.metadata()?.len();
        if len < HEADER_LEN + FOOTER_LEN {
            return Err(PlateReadError::Truncated { len });
        }

        let mut header_bytes = [0u8; HEADER_LEN as usize];
        file.read_exact(&mut header_bytes)?;
        let header = PlateHeader::from_bytes(&header_bytes)?;

        let mut footer_bytes = [0u8; FOOTER_LEN as usize];
        file.seek(SeekFrom::Start(len - FOOTER_LEN))?;
        file.read_exact(&mut footer_bytes)?;
        let footer = PlateFooter::from_bytes(&footer_bytes)?;

        let index_end = footer
            .index_offset
            .checked_add(footer.index_length as u64)
            .and_then(|end| end.checked_add(FOOTER_LEN));
        if footer.index_offset < HEADER_LEN || index_end != Some(len) {
            return Err(PlateReadError::CorruptIndex(format!(
                "index at {}+{} does not fit a {} byte file",
                footer.index_offset, footer.index_length, len
            )));
        }

        let mut index_bytes = vec![0u8; footer.index_length as usize];
        file.seek(SeekFrom::Start(footer.index_offset))?;
        file.read_exact(&mut index_bytes)?;
        let index: PlateIndex = bincode::deserialize(&index_bytes)
            .map_err(|e| PlateReadError::CorruptIndex(e.to_string()))?;

        let lookup = validate_index(&header, &footer, &index)?;

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
            header,
            footer,
            index,
            lookup,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &PlateHeader {
        &self.header
    }

    pub fn footer(&self) -> &PlateFooter {
        &self.footer
    }

    pub fn index(&self) -> &PlateIndex {
        &self.index
    }

    /// Slot of the tile at `(row, col)`, if present.
    pub fn slot(&self, row: u32, col: u32) -> Option<&PlateSlot> {
        self.lookup.get(&(row, col)).map(|i| &self.index.slots[*i])
    }

    /// Raw payload of the tile at `(row, col)`.
    pub fn read_tile(&self, row: u32, col: u32) -> Result<Vec<u8>, PlateReadError> {
        let slot = *self
            .slot(row, col)
            .ok_or(PlateReadError::TileNotFound { row, col })?;

        let mut payload = vec![0u8; slot.length as usize];
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(slot.offset))?;
        file.read_exact(&mut payload)?;
        Ok(payload)
    }

    /// Decoded pixels of the tile at `(row, col)`.
    pub fn decode_tile(&self, row: u32, col: u32) -> Result<RgbaImage, PlateReadError> {
        let payload = self.read_tile(row, col)?;
        self.header
            .encoding
            .encoder()
            .decode(&payload)
            .map_err(PlateReadError::Decode)
    }
}

/// Check index consistency and build the `(row, col)` lookup.
fn validate_index(
    header: &PlateHeader,
    footer: &PlateFooter,
    index: &PlateIndex,
) -> Result<HashMap<(u32, u32), usize>, PlateReadError> {
    if index.level != header.level
        || index.encoding != header.encoding
        || index.tile_size != header.tile_size
    {
        return Err(PlateReadError::CorruptIndex(
            "index does not match header".to_string(),
        ));
    }

    let axis = tiles_per_axis(header.level);
    let mut lookup = HashMap::with_capacity(index.slots.len());
    let mut previous_end = HEADER_LEN;

    for (i, slot) in index.slots.iter().enumerate() {
        if slot.row >= axis || slot.col >= axis {
            return Err(PlateReadError::CorruptIndex(format!(
                "slot ({}, {}) outside level {}",
                slot.row, slot.col, header.level
            )));
        }
        // Payloads are written back to back in slot order
        let end = slot
            .end()
            .filter(|end| slot.offset >= previous_end && *end <= footer.index_offset)
            .ok_or_else(|| {
                PlateReadError::CorruptIndex(format!(
                    "slot ({}, {}) at {}+{} overlaps or leaves the payload region",
                    slot.row, slot.col, slot.offset, slot.length
                ))
            })?;
        if lookup.insert((slot.row, slot.col), i).is_some() {
            return Err(PlateReadError::CorruptIndex(format!(
                "duplicate slot ({}, {})",
                slot.row, slot.col
            )));
        }
        previous_end = end;
    }

    Ok(lookup)
}
