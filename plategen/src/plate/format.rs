//! On-disk plate file format.
//!
//! One plate file holds every tile of one pyramid level:
//!
//! ```text
//! offset 0        ┌──────────────────────────────────────────────┐
//!                 │ Header (16 bytes)                            │
//!                 │   magic "PLAT"        4 bytes                │
//!                 │   format version      u16 LE                 │
//!                 │   level               u8                     │
//!                 │   encoding            u8  (TileEncoding id)  │
//!                 │   tile size           u16 LE                 │
//!                 │   reserved            6 zero bytes           │
//! offset 16       ├──────────────────────────────────────────────┤
//!                 │ Tile payloads, concatenated in append order  │
//! index_offset    ├──────────────────────────────────────────────┤
//!                 │ Index: bincode PlateIndex                    │
//! len - 16        ├──────────────────────────────────────────────┤
//!                 │ Footer (16 bytes)                            │
//!                 │   index offset        u64 LE                 │
//!                 │   index length        u32 LE                 │
//!                 │   magic "ETAL"        4 bytes                │
//!                 └──────────────────────────────────────────────┘
//! ```
//!
//! The index is written after the payloads so tiles can be streamed to disk
//! as they are produced. Readers locate it through the fixed-size footer.

use serde::{Deserialize, Serialize};

use super::PlateReadError;
use crate::coord::MAX_LEVEL;
use crate::texture::TileEncoding;

/// Magic bytes opening every plate file.
pub const HEADER_MAGIC: [u8; 4] = *b"PLAT";

/// Magic bytes closing every finalized plate file.
pub const FOOTER_MAGIC: [u8; 4] = *b"ETAL";

/// Current format version.
pub const FORMAT_VERSION: u16 = 1;

/// Header length in bytes.
pub const HEADER_LEN: u64 = 16;

/// Footer length in bytes.
pub const FOOTER_LEN: u64 = 16;

/// Final file name of a level's plate file.
pub fn plate_file_name(level: u8) -> String {
    format!("level_{}.plate", level)
}

/// File name used while a level's plate file is still being written.
pub fn partial_file_name(level: u8) -> String {
    format!("level_{}.plate.partial", level)
}

/// Fixed-size file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlateHeader {
    pub version: u16,
    pub level: u8,
    pub encoding: TileEncoding,
    pub tile_size: u16,
}

impl PlateHeader {
    pub fn new(level: u8, encoding: TileEncoding, tile_size: u16) -> Self {
        Self {
            version: FORMAT_VERSION,
            level,
            encoding,
            tile_size,
        }
    }

    pub fn to_bytes(&self) -> [u8; HEADER_LEN as usize] {
        let mut bytes = [0u8; HEADER_LEN as usize];
        bytes[0..4].copy_from_slice(&HEADER_MAGIC);
        bytes[4..6].copy_from_slice(&self.version.to_le_bytes());
        bytes[6] = self.level;
        bytes[7] = self.encoding.id();
        bytes[8..10].copy_from_slice(&self.tile_size.to_le_bytes());
        bytes
    }

    pub fn from_bytes(bytes: &[u8; HEADER_LEN as usize]) -> Result<Self, PlateReadError> {
        let magic = [bytes[0], bytes[1], bytes[2], bytes[3]];
        if magic != HEADER_MAGIC {
            return Err(PlateReadError::BadMagic { found: magic });
        }

        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != FORMAT_VERSION {
            return Err(PlateReadError::UnsupportedVersion(version));
        }

        let level = bytes[6];
        if level > MAX_LEVEL {
            return Err(PlateReadError::UnsupportedLevel {
                level,
                max: MAX_LEVEL,
            });
        }

        let encoding = TileEncoding::from_id(bytes[7]).map_err(PlateReadError::Encoding)?;

        Ok(Self {
            version,
            level,
            encoding,
            tile_size: u16::from_le_bytes([bytes[8], bytes[9]]),
        })
    }
}

/// Fixed-size file footer locating the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlateFooter {
    pub index_offset: u64,
    pub index_length: u32,
}

impl PlateFooter {
    pub fn to_bytes(&self) -> [u8; FOOTER_LEN as usize] {
        let mut bytes = [0u8; FOOTER_LEN as usize];
        bytes[0..8].copy_from_slice(&self.index_offset.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.index_length.to_le_bytes());
        bytes[12..16].copy_from_slice(&FOOTER_MAGIC);
        bytes
    }

    pub fn from_bytes(bytes: &[u8; FOOTER_LEN as usize]) -> Result<Self, PlateReadError> {
        let magic = [bytes[12], bytes[13], bytes[14], bytes[15]];
        if magic != FOOTER_MAGIC {
            return Err(PlateReadError::BadMagic { found: magic });
        }

        let mut offset = [0u8; 8];
        offset.copy_from_slice(&bytes[0..8]);
        let mut length = [0u8; 4];
        length.copy_from_slice(&bytes[8..12]);

        Ok(Self {
            index_offset: u64::from_le_bytes(offset),
            index_length: u32::from_le_bytes(length),
        })
    }
}

/// Location of one tile payload inside a plate file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlateSlot {
    pub row: u32,
    pub col: u32,
    /// Absolute byte offset of the payload
    pub offset: u64,
    /// Payload length in bytes
    pub length: u32,
}

impl PlateSlot {
    /// Offset one past the last payload byte, `None` if it overflows.
    pub fn end(&self) -> Option<u64> {
        self.offset.checked_add(self.length as u64)
    }
}

/// The tile index stored near the end of a plate file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlateIndex {
    pub level: u8,
    pub tile_size: u16,
    pub encoding: TileEncoding,
    /// Slots in append order (row-major)
    pub slots: Vec<PlateSlot>,
}
