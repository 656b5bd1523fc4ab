//! 256-entry colour palettes and index-to-ARGB conversion
//!
//! A [`Palette`] keeps the authoritative RGB entries plus a derived lookup
//! table of packed ARGB8888 values. Entry mutations mark the table dirty and
//! it is rebuilt before the next read. Fades only rewrite the lookup table,
//! so [`Palette::restore`] always returns to the exact unfaded colours.
//!
//! Palette assets store 256 RGB triples with 6-bit channels (VGA DAC
//! values); [`Palette::from_vga_bytes`] expands them to 8 bits.

use crate::error::{FormatError, FormatResult};

/// Number of palette entries
pub const PALETTE_SIZE: usize = 256;

/// Size of a palette asset (256 RGB triples)
pub const PALETTE_BYTES: usize = PALETTE_SIZE * 3;

/// Largest 6-bit channel value
const VGA_CHANNEL_MAX: u8 = 63;

/// 8-bit RGB colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgb {
    /// Red
    pub r: u8,
    /// Green
    pub g: u8,
    /// Blue
    pub b: u8,
}

impl Rgb {
    /// Create a colour
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Packed ARGB8888 with alpha 0xFF
    pub const fn to_argb(self) -> u32 {
        0xFF00_0000 | ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }

    fn scaled(self, factor: f32) -> Self {
        // `as` truncates toward zero
        let scale = |c: u8| (f32::from(c) * factor) as u8;
        Self::new(scale(self.r), scale(self.g), scale(self.b))
    }
}

/// Palette entries plus the derived ARGB lookup table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    entries: [Rgb; PALETTE_SIZE],
    lut: [u32; PALETTE_SIZE],
    dirty: bool,
}

impl Default for Palette {
    fn default() -> Self {
        Self::new()
    }
}

impl Palette {
    /// Grayscale ramp: entry `i` is `(i, i, i)`
    pub fn new() -> Self {
        let mut entries = [Rgb::default(); PALETTE_SIZE];
        for (i, entry) in entries.iter_mut().enumerate() {
            let v = i as u8;
            *entry = Rgb::new(v, v, v);
        }
        Self::from_entries(entries)
    }

    /// Palette from explicit entries
    pub fn from_entries(entries: [Rgb; PALETTE_SIZE]) -> Self {
        let mut palette = Self {
            entries,
            lut: [0; PALETTE_SIZE],
            dirty: true,
        };
        palette.rebuild_lut();
        palette
    }

    /// Parse a palette asset with 6-bit channels
    ///
    /// Each channel is expanded with `v * 255 / 63`.
    ///
    /// # Errors
    ///
    /// [`FormatError::InvalidPalette`] if `data` is not 768 bytes or a channel
    /// exceeds 63.
    pub fn from_vga_bytes(data: &[u8]) -> FormatResult<Self> {
        Self::check_len(data)?;
        if let Some(pos) = data.iter().position(|&v| v > VGA_CHANNEL_MAX) {
            return Err(FormatError::InvalidPalette(format!(
                "channel value {} at byte {pos} exceeds {VGA_CHANNEL_MAX}",
                data[pos]
            )));
        }

        let expand = |v: u8| (u16::from(v) * 255 / u16::from(VGA_CHANNEL_MAX)) as u8;
        Ok(Self::from_triples(data, expand))
    }

    /// Parse 256 RGB triples with full 8-bit channels
    ///
    /// # Errors
    ///
    /// [`FormatError::InvalidPalette`] if `data` is not 768 bytes.
    pub fn from_rgb_bytes(data: &[u8]) -> FormatResult<Self> {
        Self::check_len(data)?;
        Ok(Self::from_triples(data, |v| v))
    }

    fn check_len(data: &[u8]) -> FormatResult<()> {
        if data.len() != PALETTE_BYTES {
            return Err(FormatError::InvalidPalette(format!(
                "expected {PALETTE_BYTES} bytes, got {}",
                data.len()
            )));
        }
        Ok(())
    }

    fn from_triples(data: &[u8], channel: impl Fn(u8) -> u8) -> Self {
        let mut entries = [Rgb::default(); PALETTE_SIZE];
        for (entry, rgb) in entries.iter_mut().zip(data.chunks_exact(3)) {
            *entry = Rgb::new(channel(rgb[0]), channel(rgb[1]), channel(rgb[2]));
        }
        Self::from_entries(entries)
    }

    /// Entry at `index`
    pub fn get(&self, index: u8) -> Rgb {
        self.entries[usize::from(index)]
    }

    /// All entries
    pub fn entries(&self) -> &[Rgb; PALETTE_SIZE] {
        &self.entries
    }

    /// Replace one entry
    pub fn set(&mut self, index: u8, color: Rgb) {
        self.entries[usize::from(index)] = color;
        self.dirty = true;
    }

    /// Copy `colors` into consecutive entries starting at `start`
    ///
    /// Colours that would land past entry 255 are dropped. Returns how many
    /// entries were written.
    pub fn set_range(&mut self, start: u8, colors: &[Rgb]) -> usize {
        let start = usize::from(start);
        let count = colors.len().min(PALETTE_SIZE - start);
        self.entries[start..start + count].copy_from_slice(&colors[..count]);
        if count > 0 {
            self.dirty = true;
        }
        count
    }

    /// Recompute the lookup table from the entries
    pub fn rebuild_lut(&mut self) {
        for (slot, entry) in self.lut.iter_mut().zip(&self.entries) {
            *slot = entry.to_argb();
        }
        self.dirty = false;
    }

    /// Current lookup table, rebuilt first if entries changed
    pub fn lut(&mut self) -> &[u32; PALETTE_SIZE] {
        if self.dirty {
            self.rebuild_lut();
        }
        &self.lut
    }

    /// Map palette indices to ARGB pixels
    ///
    /// Converts `min(src.len(), dst.len())` pixels and returns that count.
    ///
    /// ```
    /// use mixkit_formats::palette::{Palette, Rgb};
    ///
    /// let mut palette = Palette::new();
    /// palette.set(10, Rgb::new(255, 0, 0));
    ///
    /// let mut out = [0u32; 3];
    /// palette.convert(&[0, 10, 255], &mut out);
    /// assert_eq!(out, [0xFF00_0000, 0xFFFF_0000, 0xFFFF_FFFF]);
    /// ```
    pub fn convert(&mut self, src: &[u8], dst: &mut [u32]) -> usize {
        let lut = self.lut();
        let count = src.len().min(dst.len());
        for (out, &index) in dst.iter_mut().zip(src) {
            *out = lut[usize::from(index)];
        }
        count
    }

    /// [`Palette::convert`] into a new buffer
    pub fn convert_to_vec(&mut self, src: &[u8]) -> Vec<u32> {
        let lut = self.lut();
        src.iter().map(|&index| lut[usize::from(index)]).collect()
    }

    /// Scale the lookup table towards black
    ///
    /// `factor` is clamped to `0.0..=1.0` (NaN counts as 0); channels are
    /// multiplied and truncated. Entries are untouched.
    pub fn fade(&mut self, factor: f32) {
        let factor = if factor.is_nan() {
            0.0
        } else {
            factor.clamp(0.0, 1.0)
        };
        for (slot, entry) in self.lut.iter_mut().zip(&self.entries) {
            *slot = entry.scaled(factor).to_argb();
        }
        self.dirty = false;
    }

    /// Undo any fade by rebuilding the lookup table from the entries
    pub fn restore(&mut self) {
        self.rebuild_lut();
    }
}
