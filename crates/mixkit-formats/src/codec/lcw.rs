//! LCW stream codec
//!
//! LCW is an LZ-style byte stream: every command byte selects an operation
//! class by its high bits, and back-references read straight out of the
//! output produced so far. No separate window buffer exists.
//!
//! # Format
//!
//! ```text
//! 0x00                 end of stream
//! 0cccdddd dddddddd    back-reference: count = ccc + 3 (3..=10),
//!                      distance = dddd:dddddddd (1..=4095)
//! 10nnnnnn             short literal: n + 1 bytes follow (1..=64)
//! 11nnnnnn nnnnnnnn    long literal: n + 1 bytes follow (1..=16384)
//! ```
//!
//! A back-reference whose distance is shorter than its count overlaps its
//! own output and repeats the last `distance` bytes. The copy runs byte by
//! byte so that case decodes correctly.
//!
//! Archive entries prefix the stream with a little-endian `u32` holding the
//! uncompressed length; see [`decompress_prefixed`].

use super::error::{CodecError, CodecResult};
use tracing::trace;

/// Command byte ending the stream
pub const TERMINATOR: u8 = 0x00;

/// Hard cap on a declared output length (256 MiB)
///
/// Declared lengths come from untrusted headers; the cap bounds the
/// allocation made before the first byte is decoded.
pub const MAX_DECOMPRESSED_SIZE: usize = 256 * 1024 * 1024;

/// Shortest back-reference
const MIN_MATCH: usize = 3;

/// Longest back-reference (3 count bits + 3)
const MAX_MATCH: usize = 10;

/// Farthest back-reference distance (12 bits)
const MAX_DISTANCE: usize = 4095;

/// Longest short literal run
const MAX_SHORT_LITERAL: usize = 64;

/// Longest long literal run
const MAX_LONG_LITERAL: usize = 16384;

/// Decompress an LCW stream into exactly `expected_len` bytes
///
/// Decoding stops at the terminator or when the input runs out. Either way
/// the output must be exactly `expected_len` bytes long, and no operation may
/// push it past that length.
///
/// # Errors
///
/// - [`CodecError::LengthMismatch`] when the stream ends short, ends early,
///   or would produce more than `expected_len` bytes
/// - [`CodecError::InvalidBackReference`] when a back-reference reaches
///   before the start of the output
/// - [`CodecError::SizeLimitExceeded`] when `expected_len` is above
///   [`MAX_DECOMPRESSED_SIZE`]
///
/// ```
/// use mixkit_formats::codec::lcw;
///
/// // 'A' then "copy 10 bytes from 1 back"
/// let stream = [0x80, b'A', 0x70, 0x01, 0x00];
/// assert_eq!(lcw::decompress(&stream, 11).unwrap(), vec![b'A'; 11]);
/// ```
pub fn decompress(input: &[u8], expected_len: usize) -> CodecResult<Vec<u8>> {
    decompress_with_limit(input, expected_len, MAX_DECOMPRESSED_SIZE)
}

/// [`decompress`] with a caller-supplied size cap
pub fn decompress_with_limit(
    input: &[u8],
    expected_len: usize,
    limit: usize,
) -> CodecResult<Vec<u8>> {
    if expected_len > limit {
        return Err(CodecError::SizeLimitExceeded {
            size: expected_len,
            limit,
        });
    }

    let mut output = Vec::with_capacity(expected_len);
    let mut pos = 0;

    let mismatch = |actual: usize| CodecError::LengthMismatch {
        expected: expected_len,
        actual,
    };

    loop {
        let Some(&command) = input.get(pos) else {
            // Input exhausted without a terminator
            break;
        };
        pos += 1;

        match command {
            TERMINATOR => break,
            0x01..=0x7F => {
                let Some(&low) = input.get(pos) else {
                    return Err(mismatch(output.len()));
                };
                pos += 1;

                let count = usize::from(command >> 4) + MIN_MATCH;
                let distance = (usize::from(command & 0x0F) << 8) | usize::from(low);

                if distance == 0 || distance > output.len() {
                    return Err(CodecError::InvalidBackReference {
                        distance,
                        available: output.len(),
                    });
                }
                if output.len() + count > expected_len {
                    return Err(mismatch(output.len() + count));
                }

                let start = output.len() - distance;
                for i in 0..count {
                    let byte = output[start + i];
                    output.push(byte);
                }
            }
            0x80..=0xFF => {
                let count = if command & 0x40 == 0 {
                    usize::from(command & 0x3F) + 1
                } else {
                    let Some(&low) = input.get(pos) else {
                        return Err(mismatch(output.len()));
                    };
                    pos += 1;
                    ((usize::from(command & 0x3F) << 8) | usize::from(low)) + 1
                };

                if output.len() + count > expected_len {
                    return Err(mismatch(output.len() + count));
                }
                let Some(literal) = input.get(pos..pos + count) else {
                    return Err(mismatch(output.len()));
                };
                output.extend_from_slice(literal);
                pos += count;
            }
        }
    }

    if output.len() != expected_len {
        return Err(mismatch(output.len()));
    }

    trace!(
        "LCW decoded {} input bytes into {} output bytes",
        pos,
        output.len()
    );
    Ok(output)
}

/// Decompress a stream that starts with its `u32` little-endian length
///
/// # Errors
///
/// [`CodecError::Truncated`] if the 4-byte length header is missing, otherwise
/// the errors of [`decompress_with_limit`].
pub fn decompress_prefixed(input: &[u8], limit: usize) -> CodecResult<Vec<u8>> {
    let Some((header, stream)) = input.split_first_chunk::<4>() else {
        return Err(CodecError::Truncated {
            offset: input.len(),
            needed: 4 - input.len(),
        });
    };
    let declared = u32::from_le_bytes(*header) as usize;
    decompress_with_limit(stream, declared, limit)
}

/// Capacity hint for the compressed form of `len` input bytes
pub fn max_compressed_size(len: usize) -> usize {
    len + len / MAX_SHORT_LITERAL + 3
}

/// Compress `input` into an LCW stream ending with the terminator
///
/// Greedy encoder: at each position it takes the longest encodable
/// back-reference (nearest on ties) and falls back to literals.
///
/// ```
/// use mixkit_formats::codec::lcw;
///
/// let data = b"ABABABABABABABAB";
/// let packed = lcw::compress(data);
/// assert_eq!(lcw::decompress(&packed, data.len()).unwrap(), data);
/// ```
pub fn compress(input: &[u8]) -> Vec<u8> {
    let mut output = Vec::with_capacity(max_compressed_size(input.len()));
    let mut finder = MatchFinder::new(input);
    let mut literal_start = 0;
    let mut pos = 0;

    while pos < input.len() {
        if let Some((len, distance)) = finder.find(pos) {
            emit_literals(&mut output, &input[literal_start..pos]);

            output.push((((len - MIN_MATCH) << 4) | (distance >> 8)) as u8);
            output.push((distance & 0xFF) as u8);

            for p in pos..pos + len {
                finder.insert(p);
            }
            pos += len;
            literal_start = pos;
        } else {
            finder.insert(pos);
            pos += 1;
        }
    }

    emit_literals(&mut output, &input[literal_start..]);
    output.push(TERMINATOR);
    output
}

fn emit_literals(output: &mut Vec<u8>, literals: &[u8]) {
    for run in literals.chunks(MAX_LONG_LITERAL) {
        let n = run.len() - 1;
        if run.len() <= MAX_SHORT_LITERAL {
            output.push(0x80 | n as u8);
        } else {
            output.push(0xC0 | (n >> 8) as u8);
            output.push((n & 0xFF) as u8);
        }
        output.extend_from_slice(run);
    }
}

/// Hash-chain match finder over 3-byte prefixes
struct MatchFinder<'a> {
    data: &'a [u8],
    head: Vec<usize>,
    prev: Vec<usize>,
}

impl<'a> MatchFinder<'a> {
    const HASH_BITS: u32 = 12;
    const NONE: usize = usize::MAX;
    const MAX_CHAIN: usize = 64;

    fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            head: vec![Self::NONE; 1 << Self::HASH_BITS],
            prev: vec![Self::NONE; data.len()],
        }
    }

    fn hash(&self, pos: usize) -> usize {
        let d = self.data;
        let v = (u32::from(d[pos]) << 16) | (u32::from(d[pos + 1]) << 8) | u32::from(d[pos + 2]);
        (v.wrapping_mul(0x9E37_79B1) >> (32 - Self::HASH_BITS)) as usize
    }

    fn insert(&mut self, pos: usize) {
        if pos + MIN_MATCH > self.data.len() {
            return;
        }
        let h = self.hash(pos);
        self.prev[pos] = self.head[h];
        self.head[h] = pos;
    }

    /// Longest encodable match at `pos` as `(length, distance)`
    fn find(&self, pos: usize) -> Option<(usize, usize)> {
        if pos + MIN_MATCH > self.data.len() {
            return None;
        }
        let max_len = MAX_MATCH.min(self.data.len() - pos);
        let mut best: Option<(usize, usize)> = None;
        let mut candidate = self.head[self.hash(pos)];
        let mut tries = 0;

        while candidate != Self::NONE && tries < Self::MAX_CHAIN {
            let distance = pos - candidate;
            if distance > MAX_DISTANCE {
                break;
            }

            let len = (0..max_len)
                .take_while(|&k| self.data[candidate + k] == self.data[pos + k])
                .count();

            // count 3 with a distance below 256 would encode as the terminator
            let encodable = len > MIN_MATCH || (len == MIN_MATCH && distance >= 0x100);
            if encodable && best.is_none_or(|(best_len, _)| len > best_len) {
                best = Some((len, distance));
                if len == max_len {
                    break;
                }
            }

            candidate = self.prev[candidate];
            tries += 1;
        }

        best
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_decompress_short_literal() {
        let stream = [0x83, b'H', b'e', b'l', b'l', TERMINATOR];
        assert_eq!(decompress(&stream, 4).unwrap(), b"Hell");
    }

    #[test]
    fn test_decompress_long_literal() {
        let mut stream = vec![0xC0, 0x40]; // 0x040 + 1 = 65 bytes
        stream.extend(vec![0x55u8; 65]);
        stream.push(TERMINATOR);

        let output = decompress(&stream, 65).unwrap();
        assert!(output.iter().all(|&b| b == 0x55));
    }

    #[test]
    fn test_decompress_back_reference() {
        let stream = [
            0x83, b'A', b'B', b'C', b'D', // 4 literals
            0x10, 0x04, // count 4, distance 4
            TERMINATOR,
        ];
        assert_eq!(decompress(&stream, 8).unwrap(), b"ABCDABCD");
    }

    #[test]
    fn test_overlapping_back_reference_repeats_pattern() {
        // "XY" then count 10 from distance 2
        let stream = [0x81, b'X', b'Y', 0x70, 0x02, TERMINATOR];
        assert_eq!(decompress(&stream, 12).unwrap(), b"XYXYXYXYXYXY");
    }

    #[test]
    fn test_empty_stream() {
        assert_eq!(decompress(&[TERMINATOR], 0).unwrap(), Vec::<u8>::new());
        assert_eq!(decompress(&[], 0).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_missing_terminator_with_exact_length_is_accepted() {
        let stream = [0x81, b'O', b'K'];
        assert_eq!(decompress(&stream, 2).unwrap(), b"OK");
    }

    #[test]
    fn test_terminator_before_expected_length() {
        let stream = [0x81, b'O', b'K', TERMINATOR];
        assert_eq!(
            decompress(&stream, 5),
            Err(CodecError::LengthMismatch {
                expected: 5,
                actual: 2
            })
        );
    }

    #[test]
    fn test_unterminated_short_stream() {
        let stream = [0x81, b'O', b'K'];
        assert!(matches!(
            decompress(&stream, 3),
            Err(CodecError::LengthMismatch { actual: 2, .. })
        ));
    }

    #[test]
    fn test_literal_cut_short_is_length_mismatch() {
        let stream = [0x85, b'A', b'B'];
        assert!(matches!(
            decompress(&stream, 6),
            Err(CodecError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_missing_distance_byte_is_length_mismatch() {
        let stream = [0x80, b'A', 0x10];
        assert!(matches!(
            decompress(&stream, 5),
            Err(CodecError::LengthMismatch { actual: 1, .. })
        ));
    }

    #[test]
    fn test_over_production_is_rejected() {
        let stream = [0x83, b'A', b'B', b'C', b'D', TERMINATOR];
        assert_eq!(
            decompress(&stream, 3),
            Err(CodecError::LengthMismatch {
                expected: 3,
                actual: 4
            })
        );
    }

    #[test]
    fn test_trailing_operation_after_full_output_is_rejected() {
        let stream = [0x81, b'O', b'K', 0x80, b'!'];
        assert!(matches!(
            decompress(&stream, 2),
            Err(CodecError::LengthMismatch { actual: 3, .. })
        ));
    }

    #[test]
    fn test_bytes_after_terminator_are_ignored() {
        let stream = [0x81, b'O', b'K', TERMINATOR, 0xFF, 0xFF];
        assert_eq!(decompress(&stream, 2).unwrap(), b"OK");
    }

    #[test]
    fn test_back_reference_past_start() {
        let stream = [0x80, b'A', 0x10, 0x10, TERMINATOR];
        assert_eq!(
            decompress(&stream, 5),
            Err(CodecError::InvalidBackReference {
                distance: 16,
                available: 1
            })
        );
    }

    #[test]
    fn test_back_reference_with_zero_distance() {
        let stream = [0x80, b'A', 0x10, 0x00, TERMINATOR];
        assert!(matches!(
            decompress(&stream, 5),
            Err(CodecError::InvalidBackReference { distance: 0, .. })
        ));
    }

    #[test]
    fn test_declared_size_limit() {
        assert_eq!(
            decompress_with_limit(&[TERMINATOR], 100, 10),
            Err(CodecError::SizeLimitExceeded {
                size: 100,
                limit: 10
            })
        );
    }

    #[test]
    fn test_prefixed_stream() {
        let mut input = 4u32.to_le_bytes().to_vec();
        input.extend_from_slice(&[0x83, b'M', b'I', b'X', b'!', TERMINATOR]);
        assert_eq!(decompress_prefixed(&input, 1024).unwrap(), b"MIX!");
    }

    #[test]
    fn test_prefixed_stream_missing_header() {
        assert_eq!(
            decompress_prefixed(&[0x01, 0x00], 1024),
            Err(CodecError::Truncated {
                offset: 2,
                needed: 2
            })
        );
    }

    #[test]
    fn test_compress_empty() {
        assert_eq!(compress(&[]), vec![TERMINATOR]);
    }

    #[test]
    fn test_compress_uses_back_references_for_runs() {
        let data = [0x42u8; 500];
        let packed = compress(&data);
        assert!(packed.len() < 200, "packed {} bytes", packed.len());
        assert_eq!(decompress(&packed, data.len()).unwrap(), data);
    }

    #[test]
    fn test_compress_long_literal_runs() {
        let data: Vec<u8> = (0..20_000u32)
            .map(|i| (i.wrapping_mul(2_654_435_761) >> 13) as u8)
            .collect();
        let packed = compress(&data);
        assert_eq!(decompress(&packed, data.len()).unwrap(), data);
    }

    #[test]
    fn test_compress_never_emits_terminator_mid_stream() {
        // Three-byte repeats at short distance must not encode as 0x00
        let data = b"abcXabcYabcZ";
        let packed = compress(data);
        assert_eq!(decompress(&packed, data.len()).unwrap(), data);
    }

    proptest! {
        #[test]
        fn round_trip(data in prop::collection::vec(any::<u8>(), 0..4096)) {
            let packed = compress(&data);
            prop_assert_eq!(decompress(&packed, data.len()).unwrap(), data);
        }

        #[test]
        fn round_trip_low_entropy(data in prop::collection::vec(0u8..4, 0..4096)) {
            let packed = compress(&data);
            prop_assert_eq!(decompress(&packed, data.len()).unwrap(), data);
        }

        #[test]
        fn unterminated_prefix_never_succeeds_short(
            data in prop::collection::vec(any::<u8>(), 1..512),
            cut in 1usize..64,
        ) {
            let packed = compress(&data);
            // Drop the terminator and at least one more byte
            let keep = packed.len().saturating_sub(1 + cut);
            let result = decompress(&packed[..keep], data.len());
            let is_mismatch = matches!(result, Err(CodecError::LengthMismatch { .. }));
            prop_assert!(is_mismatch);
        }

        #[test]
        fn arbitrary_input_never_panics(
            data in prop::collection::vec(any::<u8>(), 0..256),
            expected in 0usize..2048,
        ) {
            if let Ok(output) = decompress(&data, expected) {
                prop_assert_eq!(output.len(), expected);
            }
        }
    }
}
