//! Error types for tile payload encoding.

use std::fmt;

/// Errors that can occur while encoding or decoding a tile payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextureError {
    /// Image dimensions are invalid for encoding.
    InvalidDimensions {
        width: u32,
        height: u32,
        reason: String,
    },
    /// Encoding operation failed.
    EncodingFailed(String),
    /// A payload could not be turned back into pixels.
    DecodingFailed(String),
    /// Unsupported encoding name or id.
    UnsupportedFormat(String),
}

impl fmt::Display for TextureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextureError::InvalidDimensions {
                width,
                height,
                reason,
            } => {
                write!(f, "Invalid dimensions {}×{}: {}", width, height, reason)
            }
            TextureError::EncodingFailed(msg) => write!(f, "Encoding failed: {}", msg),
            TextureError::DecodingFailed(msg) => write!(f, "Decoding failed: {}", msg),
            TextureError::UnsupportedFormat(msg) => write!(f, "Unsupported format: {}", msg),
        }
    }
}

impl std::error::Error for TextureError {}
