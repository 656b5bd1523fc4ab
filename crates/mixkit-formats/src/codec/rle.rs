//! Scanline run-length codec for transparent sprite frames
//!
//! Each row is a sequence of commands closed by an explicit end-of-row byte:
//!
//! ```text
//! 0x00          end of row (the row must be exactly full)
//! 0x01..=0x7F   skip N pixels, leaving them transparent
//! 0x80..=0xFF   copy (cmd - 0x7F) literal pixel bytes (1..=128)
//! ```
//!
//! The decoder pre-fills the frame with [`TRANSPARENT_INDEX`] and checks
//! every run against the row width before writing.

use super::error::{CodecError, CodecResult};
use super::lcw::MAX_DECOMPRESSED_SIZE;
use crate::image::IndexedImage;
use tracing::trace;

/// Palette index that renders as transparent
pub const TRANSPARENT_INDEX: u8 = 0;

/// Row terminator
pub const END_OF_ROW: u8 = 0x00;

/// Largest skip one command can encode
const MAX_SKIP: usize = 0x7F;

/// Subtracted from a literal command to get its length
const LITERAL_BIAS: u8 = 0x7F;

/// Largest literal one command can encode
const MAX_LITERAL: usize = 0x80;

/// Decode a run-length encoded frame of `width` x `height` pixels
///
/// Bytes after the last row terminator are ignored.
///
/// # Errors
///
/// - [`CodecError::RowOverrun`] if a run crosses the end of its row
/// - [`CodecError::RowUnderrun`] if a row ends before it is full
/// - [`CodecError::Truncated`] if input runs out before every row has ended
/// - [`CodecError::SizeLimitExceeded`] if the frame is larger than
///   [`MAX_DECOMPRESSED_SIZE`]
///
/// ```
/// use mixkit_formats::codec::rle;
///
/// // Row 0: skip 1, literal [7]. Row 1: literal [8, 9]
/// let data = [0x01, 0x80, 7, 0x00, 0x81, 8, 9, 0x00];
/// let frame = rle::decode_frame(&data, 2, 2).unwrap();
/// assert_eq!(frame.pixels(), &[0, 7, 8, 9]);
/// ```
pub fn decode_frame(input: &[u8], width: u16, height: u16) -> CodecResult<IndexedImage> {
    decode_frame_with_limit(input, width, height, MAX_DECOMPRESSED_SIZE)
}

/// [`decode_frame`] with a caller-supplied cap on `width * height`
pub fn decode_frame_with_limit(
    input: &[u8],
    width: u16,
    height: u16,
    limit: usize,
) -> CodecResult<IndexedImage> {
    let w = usize::from(width);
    let h = usize::from(height);
    if w * h > limit {
        return Err(CodecError::SizeLimitExceeded { size: w * h, limit });
    }

    let mut pixels = vec![TRANSPARENT_INDEX; w * h];
    let mut pos = 0;

    for (row, line) in pixels.chunks_exact_mut(w.max(1)).take(h).enumerate() {
        let mut column = 0;

        loop {
            let Some(&command) = input.get(pos) else {
                return Err(CodecError::Truncated {
                    offset: pos,
                    needed: 1,
                });
            };
            pos += 1;

            if command == END_OF_ROW {
                if column != w {
                    return Err(CodecError::RowUnderrun {
                        row,
                        filled: column,
                        width: w,
                    });
                }
                break;
            }

            let (run, literal) = if command < 0x80 {
                (usize::from(command), false)
            } else {
                (usize::from(command - LITERAL_BIAS), true)
            };

            if column + run > w {
                return Err(CodecError::RowOverrun {
                    row,
                    column,
                    run,
                    width: w,
                });
            }

            if literal {
                let Some(bytes) = input.get(pos..pos + run) else {
                    return Err(CodecError::Truncated {
                        offset: pos,
                        needed: pos + run - input.len(),
                    });
                };
                line[column..column + run].copy_from_slice(bytes);
                pos += run;
            }
            column += run;
        }
    }

    // A zero-width frame still carries one terminator per row
    if w == 0 {
        for row in 0..h {
            match input.get(pos) {
                Some(&END_OF_ROW) => pos += 1,
                Some(&command) => {
                    let run = if command < 0x80 {
                        usize::from(command)
                    } else {
                        usize::from(command - LITERAL_BIAS)
                    };
                    return Err(CodecError::RowOverrun {
                        row,
                        column: 0,
                        run,
                        width: 0,
                    });
                }
                None => {
                    return Err(CodecError::Truncated {
                        offset: pos,
                        needed: 1,
                    });
                }
            }
        }
    }

    trace!("RLE frame {}x{} consumed {} bytes", w, h, pos);
    Ok(IndexedImage::from_parts(width, height, pixels))
}

/// Encode a frame, treating [`TRANSPARENT_INDEX`] pixels as skips
pub fn encode_frame(image: &IndexedImage) -> Vec<u8> {
    let mut output = Vec::new();

    for row in 0..image.height() {
        let line = image.row(row);
        let mut column = 0;

        while column < line.len() {
            let transparent = line[column] == TRANSPARENT_INDEX;
            let limit = if transparent { MAX_SKIP } else { MAX_LITERAL };

            let run = line[column..]
                .iter()
                .take(limit)
                .take_while(|&&p| (p == TRANSPARENT_INDEX) == transparent)
                .count();

            if transparent {
                output.push(run as u8);
            } else {
                output.push(run as u8 + LITERAL_BIAS);
                output.extend_from_slice(&line[column..column + run]);
            }
            column += run;
        }

        output.push(END_OF_ROW);
    }

    output
}
