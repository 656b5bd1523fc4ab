//! Multi-frame sprite assets (SHP)
//!
//! ```text
//! header   frame_count u16, reserved u16, width u16, height u16
//! records  frame_count x { offset u32, format u8, ref_frame u8, reserved u16 }
//! bodies   frame data, addressed by record offsets from the asset start
//! ```
//!
//! A record offset of 0 marks an empty (fully transparent) frame. A frame's
//! body runs up to the next greater offset in the table, or to the end of the
//! asset. Format bits select how the body is stored:
//!
//! | Bit    | Meaning |
//! |--------|---------|
//! | `0x01` | XOR delta against `ref_frame`, which must precede this frame |
//! | `0x02` | LCW stream of `width * height` bytes |
//! | `0x04` | scanline RLE |
//!
//! With neither codec bit the body holds `width * height` raw bytes.

use crate::codec::{CodecError, lcw, rle};
use crate::error::{FormatError, FormatResult};
use crate::image::{FrameSet, IndexedImage};
use binrw::{BinRead, BinWrite};
use std::io::Cursor;
use tracing::debug;

/// Frame format bits
pub mod frame_format {
    /// XOR the decoded body onto the reference frame
    pub const XOR_DELTA: u8 = 0x01;
    /// Body is an LCW stream
    pub const LCW: u8 = 0x02;
    /// Body is scanline RLE
    pub const RLE: u8 = 0x04;
    /// Every defined bit
    pub const ALL: u8 = XOR_DELTA | LCW | RLE;
}

/// Fixed asset header
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little)]
pub struct ShapeHeader {
    /// Number of frame records
    pub frame_count: u16,
    /// Unused, zero in known assets
    pub reserved: u16,
    /// Frame width in pixels
    pub width: u16,
    /// Frame height in pixels
    pub height: u16,
}

impl ShapeHeader {
    /// Encoded size
    pub const SIZE: usize = 8;
}

/// Per-frame record
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little)]
pub struct FrameRecord {
    /// Body offset from the asset start, 0 for an empty frame
    pub offset: u32,
    /// Format bits, see [`frame_format`]
    pub format: u8,
    /// Base frame for XOR deltas
    pub ref_frame: u8,
    /// Unused
    pub reserved: u16,
}

impl FrameRecord {
    /// Encoded size
    pub const SIZE: usize = 8;

    /// Whether the frame is an XOR delta
    pub fn is_delta(&self) -> bool {
        self.format & frame_format::XOR_DELTA != 0
    }
}

/// Parsed sprite asset borrowing its source bytes
///
/// Frames are decoded on demand. `limit` caps the pixel bytes of one frame
/// and of [`Shape::decode_all`] as a whole.
#[derive(Debug, Clone)]
pub struct Shape<'a> {
    header: ShapeHeader,
    records: Vec<FrameRecord>,
    data: &'a [u8],
    limit: usize,
}

impl<'a> Shape<'a> {
    /// Parse the header and frame table
    ///
    /// # Errors
    ///
    /// [`FormatError::InvalidHeader`] if the frame count or a dimension is zero
    /// or the frame table does not fit in `data`;
    /// [`CodecError::SizeLimitExceeded`] if one frame is larger than
    /// [`lcw::MAX_DECOMPRESSED_SIZE`].
    pub fn parse(data: &'a [u8]) -> FormatResult<Self> {
        Self::parse_with_limit(data, lcw::MAX_DECOMPRESSED_SIZE)
    }

    /// [`Shape::parse`] with a caller-supplied cap on decoded pixel bytes
    pub fn parse_with_limit(data: &'a [u8], limit: usize) -> FormatResult<Self> {
        if data.len() < ShapeHeader::SIZE {
            return Err(FormatError::InvalidHeader(format!(
                "shape needs {} header bytes, got {}",
                ShapeHeader::SIZE,
                data.len()
            )));
        }

        let mut cursor = Cursor::new(data);
        let header = ShapeHeader::read(&mut cursor)?;

        if header.frame_count == 0 {
            return Err(FormatError::InvalidHeader("zero frames".to_string()));
        }
        if header.width == 0 || header.height == 0 {
            return Err(FormatError::InvalidHeader(format!(
                "zero dimension {}x{}",
                header.width, header.height
            )));
        }

        let pixel_count = usize::from(header.width) * usize::from(header.height);
        if pixel_count > limit {
            return Err(CodecError::SizeLimitExceeded {
                size: pixel_count,
                limit,
            }
            .into());
        }

        let table_end = ShapeHeader::SIZE + usize::from(header.frame_count) * FrameRecord::SIZE;
        if data.len() < table_end {
            return Err(FormatError::InvalidHeader(format!(
                "frame table for {} frames ends at {table_end}, asset is {} bytes",
                header.frame_count,
                data.len()
            )));
        }

        let records = (0..header.frame_count)
            .map(|_| FrameRecord::read(&mut cursor))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            "Parsed shape: {} frames of {}x{}",
            header.frame_count, header.width, header.height
        );

        Ok(Self {
            header,
            records,
            data,
            limit,
        })
    }

    /// Asset header
    pub fn header(&self) -> &ShapeHeader {
        &self.header
    }

    /// Frame records in table order
    pub fn records(&self) -> &[FrameRecord] {
        &self.records
    }

    /// Number of frames
    pub fn frame_count(&self) -> usize {
        self.records.len()
    }

    /// Decode one frame, resolving any XOR reference chain
    ///
    /// # Errors
    ///
    /// [`FormatError::InvalidFrame`] for out-of-range indices or bodies,
    /// [`FormatError::InvalidReference`] for forward references, and codec
    /// errors from the frame body.
    pub fn frame(&self, index: usize) -> FormatResult<IndexedImage> {
        let Some(record) = self.records.get(index) else {
            return Err(FormatError::InvalidFrame {
                index,
                reason: format!("only {} frames", self.records.len()),
            });
        };

        let base = if record.is_delta() {
            let reference = self.delta_reference(index, record)?;
            Some(self.frame(reference)?)
        } else {
            None
        };
        self.decode_with_base(index, base.as_ref())
    }

    /// Decode every frame in order
    ///
    /// # Errors
    ///
    /// Fails on the first frame that does not decode; see [`Shape::frame`].
    pub fn decode_all(&self) -> FormatResult<FrameSet> {
        let total = self.pixel_count() * self.records.len();
        if total > self.limit {
            return Err(CodecError::SizeLimitExceeded {
                size: total,
                limit: self.limit,
            }
            .into());
        }

        let mut frames: Vec<IndexedImage> = Vec::with_capacity(self.records.len());
        for (index, record) in self.records.iter().enumerate() {
            let base = if record.is_delta() {
                Some(&frames[self.delta_reference(index, record)?])
            } else {
                None
            };
            let frame = self.decode_with_base(index, base)?;
            frames.push(frame);
        }
        FrameSet::new(self.header.width, self.header.height, frames)
    }

    fn pixel_count(&self) -> usize {
        usize::from(self.header.width) * usize::from(self.header.height)
    }

    fn delta_reference(&self, index: usize, record: &FrameRecord) -> FormatResult<usize> {
        let reference = usize::from(record.ref_frame);
        if reference >= index {
            return Err(FormatError::InvalidReference {
                frame: index,
                reference,
            });
        }
        Ok(reference)
    }

    fn decode_with_base(
        &self,
        index: usize,
        base: Option<&IndexedImage>,
    ) -> FormatResult<IndexedImage> {
        let record = self.records[index];
        let (width, height) = (self.header.width, self.header.height);

        if record.format & !frame_format::ALL != 0 {
            return Err(FormatError::InvalidFrame {
                index,
                reason: format!("unknown format bits 0x{:02X}", record.format),
            });
        }
        if record.format & frame_format::LCW != 0 && record.format & frame_format::RLE != 0 {
            return Err(FormatError::InvalidFrame {
                index,
                reason: "LCW and RLE bits are exclusive".to_string(),
            });
        }

        let mut image = if record.offset == 0 {
            IndexedImage::new(width, height)
        } else {
            let body = self.body(index, &record)?;
            let pixel_count = self.pixel_count();

            if record.format & frame_format::LCW != 0 {
                let pixels = lcw::decompress_with_limit(body, pixel_count, self.limit)?;
                IndexedImage::from_parts(width, height, pixels)
            } else if record.format & frame_format::RLE != 0 {
                rle::decode_frame_with_limit(body, width, height, self.limit)?
            } else {
                let Some(raw) = body.get(..pixel_count) else {
                    return Err(FormatError::InvalidFrame {
                        index,
                        reason: format!(
                            "raw body holds {} of {pixel_count} bytes",
                            body.len()
                        ),
                    });
                };
                IndexedImage::from_parts(width, height, raw.to_vec())
            }
        };

        if let Some(base) = base {
            for (pixel, &b) in image.pixels_mut().iter_mut().zip(base.pixels()) {
                *pixel ^= b;
            }
        }
        Ok(image)
    }

    fn body(&self, index: usize, record: &FrameRecord) -> FormatResult<&'a [u8]> {
        let start = record.offset as usize;
        if start > self.data.len() {
            return Err(FormatError::InvalidFrame {
                index,
                reason: format!("offset {start} past end of {}-byte asset", self.data.len()),
            });
        }

        let end = self
            .records
            .iter()
            .map(|r| r.offset as usize)
            .filter(|&o| o > start)
            .min()
            .unwrap_or(self.data.len())
            .min(self.data.len());

        Ok(&self.data[start..end])
    }
}

/// How [`ShapeBuilder`] stores a frame body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameEncoding {
    /// Uncompressed pixels
    Raw,
    /// LCW stream
    Lcw,
    /// Scanline RLE
    Rle,
}

impl FrameEncoding {
    fn format_bits(self) -> u8 {
        match self {
            Self::Raw => 0,
            Self::Lcw => frame_format::LCW,
            Self::Rle => frame_format::RLE,
        }
    }

    fn encode(self, image: &IndexedImage) -> Vec<u8> {
        match self {
            Self::Raw => image.pixels().to_vec(),
            Self::Lcw => lcw::compress(image.pixels()),
            Self::Rle => rle::encode_frame(image),
        }
    }
}

/// Writes sprite assets
#[derive(Debug, Clone)]
pub struct ShapeBuilder {
    width: u16,
    height: u16,
    frames: Vec<PendingFrame>,
}

#[derive(Debug, Clone)]
struct PendingFrame {
    image: IndexedImage,
    record: FrameRecord,
    body: Vec<u8>,
}

impl ShapeBuilder {
    /// Start an asset whose frames are `width` x `height`
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            frames: Vec::new(),
        }
    }

    /// Append a frame
    ///
    /// # Errors
    ///
    /// [`FormatError::DimensionMismatch`] if the image size differs from the
    /// asset's frame size.
    pub fn push(mut self, encoding: FrameEncoding, image: &IndexedImage) -> FormatResult<Self> {
        self.check_size(image)?;
        self.frames.push(PendingFrame {
            image: image.clone(),
            record: FrameRecord {
                offset: 0,
                format: encoding.format_bits(),
                ref_frame: 0,
                reserved: 0,
            },
            body: encoding.encode(image),
        });
        Ok(self)
    }

    /// Append a frame stored as an XOR delta against an earlier frame
    ///
    /// # Errors
    ///
    /// [`FormatError::InvalidReference`] if `reference` is not an earlier
    /// frame, or a size mismatch as for [`ShapeBuilder::push`].
    pub fn push_delta(
        mut self,
        reference: u8,
        encoding: FrameEncoding,
        image: &IndexedImage,
    ) -> FormatResult<Self> {
        self.check_size(image)?;
        let index = self.frames.len();
        let Some(base) = self.frames.get(usize::from(reference)) else {
            return Err(FormatError::InvalidReference {
                frame: index,
                reference: usize::from(reference),
            });
        };

        let delta: Vec<u8> = image
            .pixels()
            .iter()
            .zip(base.image.pixels())
            .map(|(a, b)| a ^ b)
            .collect();
        let delta = IndexedImage::from_parts(self.width, self.height, delta);

        self.frames.push(PendingFrame {
            image: image.clone(),
            record: FrameRecord {
                offset: 0,
                format: encoding.format_bits() | frame_format::XOR_DELTA,
                ref_frame: reference,
                reserved: 0,
            },
            body: encoding.encode(&delta),
        });
        Ok(self)
    }

    fn check_size(&self, image: &IndexedImage) -> FormatResult<()> {
        if image.width() != self.width || image.height() != self.height {
            return Err(FormatError::DimensionMismatch {
                expected: usize::from(self.width) * usize::from(self.height),
                actual: image.pixels().len(),
            });
        }
        Ok(())
    }

    /// Serialize the asset
    ///
    /// # Errors
    ///
    /// [`FormatError::InvalidHeader`] if there are no frames or more than
    /// `u16::MAX`, or a serialization error.
    pub fn build(self) -> FormatResult<Vec<u8>> {
        let frame_count = u16::try_from(self.frames.len())
            .map_err(|_| FormatError::InvalidHeader("too many frames".to_string()))?;
        if frame_count == 0 {
            return Err(FormatError::InvalidHeader("zero frames".to_string()));
        }

        let header = ShapeHeader {
            frame_count,
            reserved: 0,
            width: self.width,
            height: self.height,
        };

        let mut cursor = Cursor::new(Vec::new());
        header.write(&mut cursor)?;

        let mut offset = ShapeHeader::SIZE + self.frames.len() * FrameRecord::SIZE;
        for frame in &self.frames {
            let record = FrameRecord {
                offset: u32::try_from(offset)
                    .map_err(|_| FormatError::InvalidHeader("asset exceeds 4 GiB".to_string()))?,
                ..frame.record
            };
            record.write(&mut cursor)?;
            offset += frame.body.len();
        }

        let mut data = cursor.into_inner();
        for frame in &self.frames {
            data.extend_from_slice(&frame.body);
        }
        Ok(data)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::codec::CodecError;
    use pretty_assertions::assert_eq;

    fn gradient(width: u16, height: u16, seed: u8) -> IndexedImage {
        let pixels = (0..usize::from(width) * usize::from(height))
            .map(|i| (i as u8).wrapping_mul(seed))
            .collect();
        IndexedImage::from_pixels(width, height, pixels).unwrap()
    }

    #[test]
    fn test_header_validation() {
        assert!(matches!(
            Shape::parse(&[1, 0, 0]),
            Err(FormatError::InvalidHeader(_))
        ));
        // zero frames
        assert!(matches!(
            Shape::parse(&[0, 0, 0, 0, 4, 0, 4, 0]),
            Err(FormatError::InvalidHeader(_))
        ));
        // zero width
        assert!(matches!(
            Shape::parse(&[1, 0, 0, 0, 0, 0, 4, 0, 0, 0, 0, 0, 0, 0, 0, 0]),
            Err(FormatError::InvalidHeader(_))
        ));
        // frame table cut short
        assert!(matches!(
            Shape::parse(&[2, 0, 0, 0, 4, 0, 4, 0, 0, 0, 0, 0]),
            Err(FormatError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_oversized_frames_rejected() {
        // Two empty 65535x65535 frames in 24 bytes
        let mut data = vec![2, 0, 0, 0, 0xFF, 0xFF, 0xFF, 0xFF];
        data.extend_from_slice(&[0; 16]);
        assert!(matches!(
            Shape::parse(&data),
            Err(FormatError::Codec(CodecError::SizeLimitExceeded {
                size: 4_294_836_225,
                ..
            }))
        ));
    }

    #[test]
    fn test_decode_all_respects_total_limit() {
        let frame = gradient(4, 4, 1);
        let data = ShapeBuilder::new(4, 4)
            .push(FrameEncoding::Raw, &frame)
            .unwrap()
            .push(FrameEncoding::Rle, &frame)
            .unwrap()
            .build()
            .unwrap();

        let shape = Shape::parse_with_limit(&data, 16).unwrap();
        assert_eq!(shape.frame(1).unwrap(), frame);
        assert!(matches!(
            shape.decode_all(),
            Err(FormatError::Codec(CodecError::SizeLimitExceeded { size: 32, limit: 16 }))
        ));
        assert!(matches!(
            Shape::parse_with_limit(&data, 15),
            Err(FormatError::Codec(CodecError::SizeLimitExceeded { size: 16, limit: 15 }))
        ));
        let shape = Shape::parse_with_limit(&data, 32).unwrap();
        assert_eq!(shape.decode_all().unwrap().len(), 2);
    }

    #[test]
    fn test_all_encodings_decode() {
        let frames = [gradient(6, 4, 3), gradient(6, 4, 7), gradient(6, 4, 0)];
        let data = ShapeBuilder::new(6, 4)
            .push(FrameEncoding::Raw, &frames[0])
            .unwrap()
            .push(FrameEncoding::Lcw, &frames[1])
            .unwrap()
            .push(FrameEncoding::Rle, &frames[2])
            .unwrap()
            .build()
            .unwrap();

        let shape = Shape::parse(&data).unwrap();
        assert_eq!(shape.frame_count(), 3);
        let set = shape.decode_all().unwrap();
        assert_eq!(set.frames(), &frames);
        assert_eq!(shape.frame(1).unwrap(), frames[1]);
    }

    #[test]
    fn test_xor_delta_frames() {
        let base = gradient(5, 5, 11);
        let mut next = base.clone();
        next.pixels_mut()[12] = 0xEE;

        let data = ShapeBuilder::new(5, 5)
            .push(FrameEncoding::Lcw, &base)
            .unwrap()
            .push_delta(0, FrameEncoding::Lcw, &next)
            .unwrap()
            .push_delta(1, FrameEncoding::Raw, &base)
            .unwrap()
            .build()
            .unwrap();

        let shape = Shape::parse(&data).unwrap();
        assert!(shape.records()[1].is_delta());
        assert_eq!(shape.frame(2).unwrap(), base);
        let set = shape.decode_all().unwrap();
        assert_eq!(set.frame(1), Some(&next));
    }

    #[test]
    fn test_forward_reference_rejected() {
        let image = gradient(2, 2, 1);
        let mut data = ShapeBuilder::new(2, 2)
            .push(FrameEncoding::Raw, &image)
            .unwrap()
            .build()
            .unwrap();
        // Mark frame 0 as a delta against itself
        data[ShapeHeader::SIZE + 4] |= frame_format::XOR_DELTA;

        let shape = Shape::parse(&data).unwrap();
        assert!(matches!(
            shape.frame(0),
            Err(FormatError::InvalidReference {
                frame: 0,
                reference: 0
            })
        ));
    }

    #[test]
    fn test_empty_frame_offset() {
        // One frame with offset 0
        let data = [1, 0, 0, 0, 3, 0, 2, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        let frame = Shape::parse(&data).unwrap().frame(0).unwrap();
        assert_eq!(frame, IndexedImage::new(3, 2));
    }

    #[test]
    fn test_exclusive_codec_bits() {
        let image = gradient(2, 2, 1);
        let mut data = ShapeBuilder::new(2, 2)
            .push(FrameEncoding::Lcw, &image)
            .unwrap()
            .build()
            .unwrap();
        data[ShapeHeader::SIZE + 4] |= frame_format::RLE;

        let shape = Shape::parse(&data).unwrap();
        assert!(matches!(
            shape.frame(0),
            Err(FormatError::InvalidFrame { index: 0, .. })
        ));
    }

    #[test]
    fn test_truncated_lcw_body_is_codec_error() {
        let image = gradient(8, 8, 5);
        let mut data = ShapeBuilder::new(8, 8)
            .push(FrameEncoding::Lcw, &image)
            .unwrap()
            .build()
            .unwrap();
        data.truncate(data.len() - 10);

        let shape = Shape::parse(&data).unwrap();
        assert!(matches!(
            shape.frame(0),
            Err(FormatError::Codec(CodecError::LengthMismatch { .. }))
        ));
    }

    #[test]
    fn test_short_raw_body() {
        let image = gradient(4, 4, 1);
        let mut data = ShapeBuilder::new(4, 4)
            .push(FrameEncoding::Raw, &image)
            .unwrap()
            .build()
            .unwrap();
        data.pop();

        assert!(matches!(
            Shape::parse(&data).unwrap().frame(0),
            Err(FormatError::InvalidFrame { index: 0, .. })
        ));
    }

    #[test]
    fn test_builder_rejects_wrong_size() {
        assert!(
            ShapeBuilder::new(4, 4)
                .push(FrameEncoding::Raw, &IndexedImage::new(3, 4))
                .is_err()
        );
        assert!(
            ShapeBuilder::new(4, 4)
                .push_delta(0, FrameEncoding::Raw, &IndexedImage::new(4, 4))
                .is_err()
        );
    }
}
