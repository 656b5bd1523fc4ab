//! Codec error types

use thiserror::Error;

/// Result type for codec operations
pub type CodecResult<T> = Result<T, CodecError>;

/// Structural violations found while decoding a compressed stream
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Stream produced (or would produce) a different length than declared
    #[error("length mismatch: expected {expected} bytes, stream produced {actual}")]
    LengthMismatch {
        /// Declared output length
        expected: usize,
        /// Bytes produced when decoding stopped
        actual: usize,
    },

    /// Back-reference points before the start of the output
    #[error("invalid back-reference: distance {distance} with {available} bytes produced")]
    InvalidBackReference {
        /// Encoded distance
        distance: usize,
        /// Output produced so far
        available: usize,
    },

    /// A run extends past the end of a scanline
    #[error("row {row} overrun: run of {run} at column {column} exceeds width {width}")]
    RowOverrun {
        /// Scanline index
        row: usize,
        /// Column where the run starts
        column: usize,
        /// Run length
        run: usize,
        /// Scanline width
        width: usize,
    },

    /// A scanline ended before it was filled
    #[error("row {row} underrun: terminated after {filled} of {width} pixels")]
    RowUnderrun {
        /// Scanline index
        row: usize,
        /// Pixels covered before the terminator
        filled: usize,
        /// Scanline width
        width: usize,
    },

    /// Input ended in the middle of the encoded data
    #[error("truncated stream: needed {needed} more bytes at input offset {offset}")]
    Truncated {
        /// Input position where data ran out
        offset: usize,
        /// Bytes still required
        needed: usize,
    },

    /// Declared length exceeds the decoder's hard limit
    #[error("declared size {size} exceeds limit of {limit} bytes")]
    SizeLimitExceeded {
        /// Declared size
        size: usize,
        /// Configured limit
        limit: usize,
    },
}

impl CodecError {
    /// Whether this error concerns scanline structure rather than stream length
    pub fn is_row_error(&self) -> bool {
        matches!(self, Self::RowOverrun { .. } | Self::RowUnderrun { .. })
    }
}
