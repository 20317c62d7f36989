//! Append-only plate file writer.
//!
//! Payloads stream into `level_N.plate.partial` as tiles are produced.
//! `finalize` appends the index and footer, syncs the file and renames it to
//! `level_N.plate`; until then no file carries the final name. A writer that
//! is aborted, or dropped before finalizing, deletes its partial file.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use super::format::{
    partial_file_name, plate_file_name, PlateFooter, PlateHeader, PlateIndex, PlateSlot,
    HEADER_LEN,
};
use crate::coord::TILE_SIZE;
use crate::texture::TileEncoding;
use crate::tile::TileId;

/// A finalized plate file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlateFileRef {
    pub level: u8,
    /// Absolute path of the finalized file
    pub path: PathBuf,
    /// File name relative to the output folder
    pub file_name: String,
    pub tile_count: usize,
    pub size_bytes: u64,
}

/// Writes the plate file of one pyramid level.
#[derive(Debug)]
pub struct PlateFileWriter {
    level: u8,
    encoding: TileEncoding,
    partial_path: PathBuf,
    final_path: PathBuf,
    writer: Option<BufWriter<File>>,
    offset: u64,
    slots: Vec<PlateSlot>,
    last_tile: Option<TileId>,
    done: bool,
}

impl PlateFileWriter {
    /// Create the in-progress file for `level` in `dir` and write its header.
    ///
    /// # Errors
    ///
    /// Fails if the partial file already exists or cannot be created.
    pub fn open(dir: &Path, level: u8, encoding: TileEncoding) -> io::Result<Self> {
        let partial_path = dir.join(partial_file_name(level));
        let final_path = dir.join(plate_file_name(level));

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&partial_path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(&PlateHeader::new(level, encoding, TILE_SIZE as u16).to_bytes())?;

        debug!(level = level, path = %partial_path.display(), "Opened plate file");

        Ok(Self {
            level,
            encoding,
            partial_path,
            final_path,
            writer: Some(writer),
            offset: HEADER_LEN,
            slots: Vec::new(),
            last_tile: None,
            done: false,
        })
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn encoding(&self) -> TileEncoding {
        self.encoding
    }

    /// Number of tiles appended so far.
    pub fn tile_count(&self) -> usize {
        self.slots.len()
    }

    /// Path of the in-progress file.
    pub fn partial_path(&self) -> &Path {
        &self.partial_path
    }

    /// Append an encoded tile payload.
    ///
    /// Tiles must belong to this writer's level and arrive in row-major
    /// order; the payload is buffered, not flushed.
    pub fn append(&mut self, tile: TileId, payload: &[u8]) -> io::Result<PlateSlot> {
        if tile.level() != self.level || !tile.is_valid() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("tile {} does not belong to level {}", tile, self.level),
            ));
        }
        if self.last_tile.is_some_and(|last| last >= tile) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("tile {} appended out of row-major order", tile),
            ));
        }
        let length = u32::try_from(payload.len()).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("payload of {} bytes is too large", payload.len()),
            )
        })?;

        let writer = self.writer.as_mut().ok_or_else(closed)?;
        writer.write_all(payload)?;

        let slot = PlateSlot {
            row: tile.row(),
            col: tile.col(),
            offset: self.offset,
            length,
        };
        self.offset += length as u64;
        self.slots.push(slot);
        self.last_tile = Some(tile);

        Ok(slot)
    }

    /// Write index and footer, sync, and rename to the final name.
    pub fn finalize(mut self) -> io::Result<PlateFileRef> {
        let mut writer = self.writer.take().ok_or_else(closed)?;

        let index = PlateIndex {
            level: self.level,
            tile_size: TILE_SIZE as u16,
            encoding: self.encoding,
            slots: std::mem::take(&mut self.slots),
        };
        let index_bytes = bincode::serialize(&index)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
        let index_length = u32::try_from(index_bytes.len())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "index too large"))?;

        writer.write_all(&index_bytes)?;
        writer.write_all(
            &PlateFooter {
                index_offset: self.offset,
                index_length,
            }
            .to_bytes(),
        )?;

        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        drop(file);

        fs::rename(&self.partial_path, &self.final_path)?;
        self.done = true;

        let size_bytes = fs::metadata(&self.final_path)?.len();
        debug!(
            level = self.level,
            tiles = index.slots.len(),
            bytes = size_bytes,
            "Finalized plate file"
        );

        Ok(PlateFileRef {
            level: self.level,
            path: self.final_path.clone(),
            file_name: plate_file_name(self.level),
            tile_count: index.slots.len(),
            size_bytes,
        })
    }

    /// Discard the in-progress file.
    pub fn abort(mut self) -> io::Result<()> {
        let result = self.discard();
        self.done = true;
        result
    }

    fn discard(&mut self) -> io::Result<()> {
        // Close the handle before unlinking
        self.writer.take();
        match fs::remove_file(&self.partial_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl Drop for PlateFileWriter {
    fn drop(&mut self) {
        if !self.done {
            debug!(level = self.level, "Plate writer dropped before finalize");
            if let Err(e) = self.discard() {
                warn!(
                    level = self.level,
                    path = %self.partial_path.display(),
                    error = %e,
                    "Failed to remove partial plate file"
                );
            }
        }
    }
}

fn closed() -> io::Error {
    io::Error::other("plate writer already closed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plate::PlateFileReader;
    use proptest::prelude::*;
    use rand::Rng;
    use tempfile::TempDir;

    fn random_payload(len: usize) -> Vec<u8> {
        let mut rng = rand::rng();
        (0..len).map(|_| rng.random()).collect()
    }

    #[test]
    fn test_no_final_file_before_finalize() {
        let temp = TempDir::new().unwrap();
        let mut writer = PlateFileWriter::open(temp.path(), 1, TileEncoding::Png).unwrap();
        writer.append(TileId::new(1, 0, 0), b"abc").unwrap();

        assert!(temp.path().join("level_1.plate.partial").exists());
        assert!(!temp.path().join("level_1.plate").exists());

        let plate = writer.finalize().unwrap();
        assert!(!temp.path().join("level_1.plate.partial").exists());
        assert!(plate.path.exists());
        assert_eq!(plate.file_name, "level_1.plate");
        assert_eq!(plate.tile_count, 1);
    }

    #[test]
    fn test_slots_are_contiguous() {
        let temp = TempDir::new().unwrap();
        let mut writer = PlateFileWriter::open(temp.path(), 1, TileEncoding::Png).unwrap();

        let a = writer.append(TileId::new(1, 0, 0), &[1; 10]).unwrap();
        let b = writer.append(TileId::new(1, 0, 1), &[2; 5]).unwrap();

        assert_eq!(a.offset, HEADER_LEN);
        assert_eq!(a.length, 10);
        assert_eq!(Some(b.offset), a.end());
        assert_eq!(writer.tile_count(), 2);
    }

    #[test]
    fn test_abort_deletes_partial_file() {
        let temp = TempDir::new().unwrap();
        let mut writer = PlateFileWriter::open(temp.path(), 0, TileEncoding::Png).unwrap();
        writer.append(TileId::new(0, 0, 0), b"payload").unwrap();

        writer.abort().unwrap();
        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_drop_without_finalize_deletes_partial_file() {
        let temp = TempDir::new().unwrap();
        {
            let _writer = PlateFileWriter::open(temp.path(), 2, TileEncoding::Png).unwrap();
            assert!(temp.path().join("level_2.plate.partial").exists());
        }
        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_rejects_foreign_level() {
        let temp = TempDir::new().unwrap();
        let mut writer = PlateFileWriter::open(temp.path(), 1, TileEncoding::Png).unwrap();
        let err = writer.append(TileId::new(2, 0, 0), b"x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_rejects_out_of_order_append() {
        let temp = TempDir::new().unwrap();
        let mut writer = PlateFileWriter::open(temp.path(), 1, TileEncoding::Png).unwrap();
        writer.append(TileId::new(1, 1, 0), b"x").unwrap();
        let err = writer.append(TileId::new(1, 0, 1), b"y").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_open_twice_fails() {
        let temp = TempDir::new().unwrap();
        let _first = PlateFileWriter::open(temp.path(), 0, TileEncoding::Png).unwrap();
        assert!(PlateFileWriter::open(temp.path(), 0, TileEncoding::Png).is_err());
    }

    #[test]
    fn test_full_level_random_payloads() {
        let temp = TempDir::new().unwrap();
        let mut writer = PlateFileWriter::open(temp.path(), 2, TileEncoding::Deflate).unwrap();

        let payloads: Vec<Vec<u8>> = (0..16).map(|i| random_payload(100 + i * 37)).collect();
        for (i, payload) in payloads.iter().enumerate() {
            writer
                .append(TileId::from_index(2, i as u64), payload)
                .unwrap();
        }
        let plate = writer.finalize().unwrap();

        let reader = PlateFileReader::open(&plate.path).unwrap();
        assert_eq!(reader.index().slots.len(), 16);
        for (i, payload) in payloads.iter().enumerate() {
            let tile = TileId::from_index(2, i as u64);
            assert_eq!(&reader.read_tile(tile.row(), tile.col()).unwrap(), payload);
        }
    }

    mod property_tests {
        use super::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(32))]

            #[test]
            fn index_matches_appended_tiles(
                lengths in proptest::collection::vec(0usize..2048, 1..=16)
            ) {
                let temp = TempDir::new().unwrap();
                let mut writer =
                    PlateFileWriter::open(temp.path(), 2, TileEncoding::Png).unwrap();

                let payloads: Vec<Vec<u8>> =
                    lengths.iter().map(|len| random_payload(*len)).collect();
                for (i, payload) in payloads.iter().enumerate() {
                    writer.append(TileId::from_index(2, i as u64), payload).unwrap();
                }
                let plate = writer.finalize().unwrap();
                prop_assert_eq!(plate.tile_count, payloads.len());

                let reader = PlateFileReader::open(&plate.path).unwrap();
                let slots = &reader.index().slots;
                prop_assert_eq!(slots.len(), payloads.len());

                let payload_end = reader.footer().index_offset;
                for pair in slots.windows(2) {
                    prop_assert!(pair[0].end().unwrap() <= pair[1].offset);
                }
                for (slot, payload) in slots.iter().zip(&payloads) {
                    prop_assert!(slot.offset >= HEADER_LEN);
                    prop_assert!(slot.end().unwrap() <= payload_end);
                    prop_assert_eq!(&reader.read_tile(slot.row, slot.col).unwrap(), payload);
                }
            }
        }
    }
}
