//! Byte-stream codecs
//!
//! Two codecs are used by archive content:
//!
//! - [`lcw`]: the general LZ-style stream codec. Compressed archive entries,
//!   terrain tile sets and some sprite frames use it.
//! - [`rle`]: the per-scanline run-length codec for transparent sprite frames.
//!
//! Both decoders work over in-memory slices, track output length explicitly
//! and stop on the first structural violation with a [`CodecError`].

mod error;
pub mod lcw;
pub mod rle;

pub use error::{CodecError, CodecResult};
