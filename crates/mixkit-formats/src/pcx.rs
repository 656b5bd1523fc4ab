//! 8-bit PCX images with a trailing 256-colour palette

use crate::codec::CodecError;
use crate::codec::lcw::MAX_DECOMPRESSED_SIZE;
use crate::error::{FormatError, FormatResult};
use crate::image::IndexedImage;
use crate::palette::{PALETTE_BYTES, Palette};
use binrw::{BinRead, BinWrite};
use std::io::Cursor;
use tracing::debug;

/// Manufacturer byte of every PCX file
pub const PCX_ID: u8 = 10;

/// Run-length encoding marker
const RLE_ENCODING: u8 = 1;

/// Bytes at or above this value start a run
const RUN_MARKER: u8 = 0xC0;

/// 128-byte PCX header
#[derive(Debug, Clone, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little)]
pub struct PcxHeader {
    /// Always [`PCX_ID`]
    pub id: u8,
    /// Format revision
    pub version: u8,
    /// 1 for run-length encoding
    pub encoding: u8,
    /// Bits per pixel per plane
    pub bits_per_pixel: u8,
    /// Left edge
    pub x_min: u16,
    /// Top edge
    pub y_min: u16,
    /// Right edge (inclusive)
    pub x_max: u16,
    /// Bottom edge (inclusive)
    pub y_max: u16,
    /// Horizontal resolution
    pub h_dpi: u16,
    /// Vertical resolution
    pub v_dpi: u16,
    /// 16-colour EGA palette, unused at 8 bpp
    pub ega_palette: [u8; 48],
    /// Reserved
    pub reserved: u8,
    /// Colour planes
    pub planes: u8,
    /// Decoded bytes per scanline, including padding
    pub bytes_per_line: u16,
    /// Palette interpretation
    pub palette_info: u16,
    /// Source screen width
    pub h_screen: u16,
    /// Source screen height
    pub v_screen: u16,
    /// Padding to 128 bytes
    pub filler: [u8; 54],
}

impl PcxHeader {
    /// Encoded size
    pub const SIZE: usize = 128;

    /// Image width from the inclusive bounds
    pub fn width(&self) -> Option<u16> {
        self.x_max.checked_sub(self.x_min)?.checked_add(1)
    }

    /// Image height from the inclusive bounds
    pub fn height(&self) -> Option<u16> {
        self.y_max.checked_sub(self.y_min)?.checked_add(1)
    }
}

/// Decoded PCX image and its palette
#[derive(Debug, Clone)]
pub struct PcxImage {
    /// Pixel indices with scanline padding removed
    pub image: IndexedImage,
    /// Embedded 8-bit palette
    pub palette: Palette,
}

impl PcxImage {
    /// Decode a PCX file
    ///
    /// # Errors
    ///
    /// [`FormatError::InvalidHeader`] for anything other than single-plane
    /// 8-bit run-length images, or when the pixel runs overflow or fall short
    /// of the image; [`CodecError::SizeLimitExceeded`] if the padded image is
    /// larger than [`MAX_DECOMPRESSED_SIZE`].
    pub fn parse(data: &[u8]) -> FormatResult<Self> {
        Self::parse_with_limit(data, MAX_DECOMPRESSED_SIZE)
    }

    /// [`PcxImage::parse`] with a caller-supplied cap on decoded bytes
    pub fn parse_with_limit(data: &[u8], limit: usize) -> FormatResult<Self> {
        if data.len() < PcxHeader::SIZE + PALETTE_BYTES {
            return Err(FormatError::InvalidHeader(format!(
                "PCX needs at least {} bytes, got {}",
                PcxHeader::SIZE + PALETTE_BYTES,
                data.len()
            )));
        }

        let header = PcxHeader::read(&mut Cursor::new(data))?;
        if header.id != PCX_ID {
            return Err(FormatError::InvalidHeader(format!(
                "bad PCX id {}",
                header.id
            )));
        }
        if header.encoding != RLE_ENCODING || header.bits_per_pixel != 8 || header.planes != 1 {
            return Err(FormatError::InvalidHeader(format!(
                "unsupported PCX layout: encoding {}, {} bpp, {} planes",
                header.encoding, header.bits_per_pixel, header.planes
            )));
        }

        let (Some(width), Some(height)) = (header.width(), header.height()) else {
            return Err(FormatError::InvalidHeader(format!(
                "bad PCX bounds ({}, {})-({}, {})",
                header.x_min, header.y_min, header.x_max, header.y_max
            )));
        };
        let pitch = usize::from(header.bytes_per_line);
        if pitch < usize::from(width) {
            return Err(FormatError::InvalidHeader(format!(
                "bytes per line {pitch} below width {width}"
            )));
        }

        let padded_size = pitch * usize::from(height);
        if padded_size > limit {
            return Err(CodecError::SizeLimitExceeded {
                size: padded_size,
                limit,
            }
            .into());
        }

        let palette_start = data.len() - PALETTE_BYTES;
        let body = &data[PcxHeader::SIZE..palette_start];
        let padded = decode_runs(body, padded_size)?;

        let w = usize::from(width);
        let mut pixels = Vec::with_capacity(w * usize::from(height));
        for line in padded.chunks_exact(pitch) {
            pixels.extend_from_slice(&line[..w]);
        }

        debug!("Parsed PCX image {}x{}", width, height);

        Ok(Self {
            image: IndexedImage::from_parts(width, height, pixels),
            palette: Palette::from_rgb_bytes(&data[palette_start..])?,
        })
    }
}

fn decode_runs(body: &[u8], total: usize) -> FormatResult<Vec<u8>> {
    let mut output = Vec::with_capacity(total);
    let mut bytes = body.iter().copied();

    while output.len() < total {
        let Some(byte) = bytes.next() else {
            return Err(FormatError::InvalidHeader(format!(
                "PCX body ends after {} of {total} bytes",
                output.len()
            )));
        };

        if byte >= RUN_MARKER {
            let count = usize::from(byte & 0x3F);
            let Some(value) = bytes.next() else {
                return Err(FormatError::InvalidHeader(
                    "PCX run missing its value byte".to_string(),
                ));
            };
            if output.len() + count > total {
                return Err(FormatError::InvalidHeader(format!(
                    "PCX run of {count} overflows {total}-byte image"
                )));
            }
            output.resize(output.len() + count, value);
        } else {
            output.push(byte);
        }
    }

    Ok(output)
}
