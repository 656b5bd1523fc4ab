//! Asset format error types

use crate::codec::CodecError;
use thiserror::Error;

/// Result type for format parsing
pub type FormatResult<T> = Result<T, FormatError>;

/// Errors raised while parsing asset formats
#[derive(Debug, Error)]
pub enum FormatError {
    /// Header fields are missing or out of range
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// A frame record or frame body is malformed
    #[error("invalid frame {index}: {reason}")]
    InvalidFrame {
        /// Frame index
        index: usize,
        /// What was wrong
        reason: String,
    },

    /// A delta frame references a frame it cannot depend on
    #[error("frame {frame} references frame {reference}")]
    InvalidReference {
        /// Frame holding the reference
        frame: usize,
        /// Referenced frame
        reference: usize,
    },

    /// Palette data is malformed
    #[error("invalid palette: {0}")]
    InvalidPalette(String),

    /// Pixel buffer does not match the declared dimensions
    #[error("pixel count mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// `width * height`
        expected: usize,
        /// Bytes supplied
        actual: usize,
    },

    /// Codec failure inside an asset body
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Binary parsing failure
    #[error("binary parse error: {0}")]
    BinRead(#[from] binrw::Error),
}
