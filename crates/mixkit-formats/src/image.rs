//! Palette-indexed images and frame sets

use crate::error::{FormatError, FormatResult};

/// A width x height grid of palette indices, stored row-major
///
/// The pixel buffer always holds exactly `width * height` bytes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IndexedImage {
    width: u16,
    height: u16,
    pixels: Vec<u8>,
}

impl IndexedImage {
    /// Create an image filled with index 0
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; usize::from(width) * usize::from(height)],
        }
    }

    /// Wrap an existing pixel buffer
    ///
    /// # Errors
    ///
    /// [`FormatError::DimensionMismatch`] if `pixels` is not `width * height`
    /// bytes long.
    pub fn from_pixels(width: u16, height: u16, pixels: Vec<u8>) -> FormatResult<Self> {
        let expected = usize::from(width) * usize::from(height);
        if pixels.len() != expected {
            return Err(FormatError::DimensionMismatch {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self::from_parts(width, height, pixels))
    }

    /// Decoders size their buffers from the same dimensions
    pub(crate) fn from_parts(width: u16, height: u16, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(pixels.len(), usize::from(width) * usize::from(height));
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Width in pixels
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> u16 {
        self.height
    }

    /// Row-major pixel indices
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Mutable pixel indices; the length cannot change through this
    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// Take the pixel buffer
    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// Pixel at (x, y), `None` outside the image
    pub fn pixel(&self, x: u16, y: u16) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get(usize::from(y) * usize::from(self.width) + usize::from(x))
            .copied()
    }

    /// One scanline
    ///
    /// # Panics
    ///
    /// Panics if `y >= height`.
    pub fn row(&self, y: u16) -> &[u8] {
        assert!(y < self.height, "row {y} out of range");
        let w = usize::from(self.width);
        let start = usize::from(y) * w;
        &self.pixels[start..start + w]
    }
}

/// Frames of one sprite asset, all sharing the asset's dimensions
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FrameSet {
    width: u16,
    height: u16,
    frames: Vec<IndexedImage>,
}

impl FrameSet {
    /// Collect frames of the given dimensions
    ///
    /// # Errors
    ///
    /// [`FormatError::DimensionMismatch`] if a frame's pixel count differs from
    /// `width * height`.
    pub fn new(width: u16, height: u16, frames: Vec<IndexedImage>) -> FormatResult<Self> {
        let expected = usize::from(width) * usize::from(height);
        if let Some(bad) = frames
            .iter()
            .find(|f| f.width != width || f.height != height)
        {
            return Err(FormatError::DimensionMismatch {
                expected,
                actual: bad.pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            frames,
        })
    }

    /// Frame width
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Frame height
    pub fn height(&self) -> u16 {
        self.height
    }

    /// Number of frames
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether the set holds no frames
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frame by index
    pub fn frame(&self, index: usize) -> Option<&IndexedImage> {
        self.frames.get(index)
    }

    /// All frames in order
    pub fn frames(&self) -> &[IndexedImage] {
        &self.frames
    }

    /// Take the frames
    pub fn into_frames(self) -> Vec<IndexedImage> {
        self.frames
    }
}
