//! Terrain tile sets (templates)
//!
//! ```text
//! tile_width u16, tile_height u16, tile_count u16, flags u16
//! body: tile_count tiles of tile_width * tile_height bytes
//! ```
//!
//! With flag bit 0 set the body is a single LCW stream that expands to the
//! full tile data.

use crate::codec::lcw;
use crate::error::{FormatError, FormatResult};
use crate::image::IndexedImage;
use binrw::{BinRead, BinWrite};
use std::io::Cursor;
use tracing::debug;

/// Body is LCW compressed
pub const FLAG_LCW: u16 = 0x0001;

/// Tile set header
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little)]
pub struct TilesetHeader {
    /// Tile width in pixels
    pub tile_width: u16,
    /// Tile height in pixels
    pub tile_height: u16,
    /// Number of tiles
    pub tile_count: u16,
    /// Body flags
    pub flags: u16,
}

impl TilesetHeader {
    /// Encoded size
    pub const SIZE: usize = 8;
}

/// Decoded tile set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tileset {
    tile_width: u16,
    tile_height: u16,
    tiles: Vec<IndexedImage>,
}

impl Tileset {
    /// Parse a tile set asset
    ///
    /// # Errors
    ///
    /// [`FormatError::InvalidHeader`] for zero dimensions or a short raw body;
    /// codec errors for a bad LCW body or one that expands past
    /// [`lcw::MAX_DECOMPRESSED_SIZE`].
    pub fn parse(data: &[u8]) -> FormatResult<Self> {
        Self::parse_with_limit(data, lcw::MAX_DECOMPRESSED_SIZE)
    }

    /// [`Tileset::parse`] with a caller-supplied cap on the expanded body
    pub fn parse_with_limit(data: &[u8], limit: usize) -> FormatResult<Self> {
        if data.len() < TilesetHeader::SIZE {
            return Err(FormatError::InvalidHeader(format!(
                "tile set needs {} header bytes, got {}",
                TilesetHeader::SIZE,
                data.len()
            )));
        }
        let header = TilesetHeader::read(&mut Cursor::new(data))?;
        if header.tile_width == 0 || header.tile_height == 0 {
            return Err(FormatError::InvalidHeader(format!(
                "zero tile dimension {}x{}",
                header.tile_width, header.tile_height
            )));
        }

        let tile_size = usize::from(header.tile_width) * usize::from(header.tile_height);
        let total = tile_size * usize::from(header.tile_count);
        let body = &data[TilesetHeader::SIZE..];

        let pixels = if header.flags & FLAG_LCW != 0 {
            lcw::decompress_with_limit(body, total, limit)?
        } else {
            let Some(raw) = body.get(..total) else {
                return Err(FormatError::InvalidHeader(format!(
                    "{} tiles need {total} bytes, body has {}",
                    header.tile_count,
                    body.len()
                )));
            };
            raw.to_vec()
        };

        let tiles = pixels
            .chunks_exact(tile_size)
            .map(|tile| {
                IndexedImage::from_parts(header.tile_width, header.tile_height, tile.to_vec())
            })
            .collect();

        debug!(
            "Parsed tile set: {} tiles of {}x{}",
            header.tile_count, header.tile_width, header.tile_height
        );

        Ok(Self {
            tile_width: header.tile_width,
            tile_height: header.tile_height,
            tiles,
        })
    }

    /// Serialize tiles, LCW-compressing the body when `compress` is set
    ///
    /// # Errors
    ///
    /// [`FormatError::DimensionMismatch`] if tiles differ in size,
    /// [`FormatError::InvalidHeader`] for an empty or oversized set.
    pub fn build(tiles: &[IndexedImage], compress: bool) -> FormatResult<Vec<u8>> {
        let Some(first) = tiles.first() else {
            return Err(FormatError::InvalidHeader("no tiles".to_string()));
        };
        let tile_count = u16::try_from(tiles.len())
            .map_err(|_| FormatError::InvalidHeader("too many tiles".to_string()))?;

        let mut body = Vec::with_capacity(first.pixels().len() * tiles.len());
        for tile in tiles {
            if tile.width() != first.width() || tile.height() != first.height() {
                return Err(FormatError::DimensionMismatch {
                    expected: first.pixels().len(),
                    actual: tile.pixels().len(),
                });
            }
            body.extend_from_slice(tile.pixels());
        }

        let header = TilesetHeader {
            tile_width: first.width(),
            tile_height: first.height(),
            tile_count,
            flags: if compress { FLAG_LCW } else { 0 },
        };
        let mut cursor = Cursor::new(Vec::new());
        header.write(&mut cursor)?;

        let mut data = cursor.into_inner();
        if compress {
            data.extend_from_slice(&lcw::compress(&body));
        } else {
            data.extend_from_slice(&body);
        }
        Ok(data)
    }

    /// Tile width
    pub fn tile_width(&self) -> u16 {
        self.tile_width
    }

    /// Tile height
    pub fn tile_height(&self) -> u16 {
        self.tile_height
    }

    /// Number of tiles
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Whether there are no tiles
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Tile by index
    pub fn tile(&self, index: usize) -> Option<&IndexedImage> {
        self.tiles.get(index)
    }

    /// All tiles
    pub fn tiles(&self) -> &[IndexedImage] {
        &self.tiles
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::codec::CodecError;

    fn tiles() -> Vec<IndexedImage> {
        (0..4u8)
            .map(|t| IndexedImage::from_pixels(3, 2, vec![t; 6]).unwrap())
            .collect()
    }

    #[test]
    fn test_raw_tileset() {
        let data = Tileset::build(&tiles(), false).unwrap();
        assert_eq!(data.len(), TilesetHeader::SIZE + 24);

        let set = Tileset::parse(&data).unwrap();
        assert_eq!(set.len(), 4);
        assert_eq!((set.tile_width(), set.tile_height()), (3, 2));
        assert_eq!(set.tiles(), tiles().as_slice());
    }

    #[test]
    fn test_compressed_tileset() {
        let data = Tileset::build(&tiles(), true).unwrap();
        let set = Tileset::parse(&data).unwrap();
        assert_eq!(set.tile(3).unwrap().pixels(), &[3; 6]);
    }

    #[test]
    fn test_empty_tileset_parses() {
        let data = [4, 0, 4, 0, 0, 0, 0, 0];
        assert!(Tileset::parse(&data).unwrap().is_empty());
    }

    #[test]
    fn test_short_raw_body() {
        let mut data = Tileset::build(&tiles(), false).unwrap();
        data.pop();
        assert!(matches!(
            Tileset::parse(&data),
            Err(FormatError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_bad_compressed_body() {
        let mut data = Tileset::build(&tiles(), true).unwrap();
        data.truncate(TilesetHeader::SIZE + 1);
        assert!(matches!(
            Tileset::parse(&data),
            Err(FormatError::Codec(CodecError::LengthMismatch { .. }))
        ));
    }

    #[test]
    fn test_compressed_body_limit() {
        let data = Tileset::build(&tiles(), true).unwrap();
        assert!(matches!(
            Tileset::parse_with_limit(&data, 23),
            Err(FormatError::Codec(CodecError::SizeLimitExceeded { size: 24, limit: 23 }))
        ));
        assert_eq!(Tileset::parse_with_limit(&data, 24).unwrap().len(), 4);
    }

    #[test]
    fn test_zero_dimension() {
        let data = [0, 0, 4, 0, 1, 0, 0, 0];
        assert!(Tileset::parse(&data).is_err());
    }
}
