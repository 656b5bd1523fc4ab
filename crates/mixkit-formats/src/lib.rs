//! Codecs and asset format parsers for MIX-era game archives
//!
#![allow(clippy::cast_possible_wrap)] // Signed key ordering reinterprets u32
#![allow(clippy::cast_lossless)] // Sometimes clearer than From
#![allow(clippy::cast_precision_loss)] // Palette fades scale u8 channels
#![allow(clippy::uninlined_format_args)] // Log message style
#![allow(clippy::return_self_not_must_use)] // Builder patterns
//! Everything in this crate works on in-memory byte slices and performs no
//! I/O, so it can be used on archive payloads from any source.
//!
//! # Modules
//!
//! - [`hash`]: asset name canonicalization and the archive key hash
//! - [`codec`]: the LCW stream codec and the sprite scanline RLE codec
//! - [`image`]: palette-indexed images and frame sets
//! - [`shape`]: multi-frame sprite assets (SHP)
//! - [`palette`]: 256-colour palettes and ARGB conversion
//! - [`template`]: terrain tile sets
//! - [`pcx`]: 8-bit PCX images
//!
//! # Example
//!
//! ```
//! use mixkit_formats::codec::lcw;
//! use mixkit_formats::hash::hash_name;
//!
//! let key = hash_name("conquer.mix");
//! assert_eq!(key, hash_name("CONQUER.MIX"));
//!
//! let packed = lcw::compress(b"abcabcabcabc");
//! assert_eq!(lcw::decompress(&packed, 12).unwrap(), b"abcabcabcabc");
//! ```

#![warn(missing_docs)]

pub mod codec;
pub mod error;
pub mod hash;
pub mod image;
pub mod palette;
pub mod pcx;
pub mod shape;
pub mod template;

pub use codec::{CodecError, CodecResult};
pub use error::{FormatError, FormatResult};
pub use hash::{AssetKey, hash_name};
pub use image::{FrameSet, IndexedImage};
pub use palette::{Palette, Rgb};
pub use pcx::PcxImage;
pub use shape::Shape;
pub use template::Tileset;
