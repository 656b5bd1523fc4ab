//! Asset name hashing for archive lookups
//!
//! Archive entry tables are keyed by a 32-bit rotate-and-add checksum of the
//! asset's canonical name. The tables were built offline, so the function
//! must match bit for bit: a different hash does not return wrong data, it
//! simply finds nothing.
//!
//! # Algorithm
//!
//! ```text
//! key = 0
//! for each 4-byte little-endian chunk of NAME (last chunk zero-padded):
//!     key = rotate_left(key, 1) + chunk      (wrapping)
//! ```
//!
//! Names are canonicalized first: any directory prefix is dropped (either
//! separator), a drive letter is removed, ASCII letters are uppercased and
//! the result is cut to [`MAX_NAME_LEN`] bytes.

use binrw::{BinRead, BinWrite};
use std::cmp::Ordering;
use std::fmt;

/// Longest canonical name the engine hashes. Longer names are truncated.
pub const MAX_NAME_LEN: usize = 255;

/// 32-bit fingerprint of a canonical asset name
///
/// Keys order as signed integers. Historical tables were sorted with a
/// signed comparison, so the binary search has to agree with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, BinRead, BinWrite)]
#[brw(little)]
pub struct AssetKey(u32);

impl AssetKey {
    /// Wrap a raw key value
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw unsigned key value
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Key as the signed value used for table ordering
    pub const fn as_signed(self) -> i32 {
        self.0 as i32
    }
}

impl Ord for AssetKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_signed().cmp(&other.as_signed())
    }
}

impl PartialOrd for AssetKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08X}", self.0)
    }
}

impl From<u32> for AssetKey {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

/// Canonicalize an asset name for hashing
///
/// Strips directories and drive prefixes, uppercases ASCII letters and
/// truncates to [`MAX_NAME_LEN`] bytes. Applying it twice changes nothing.
///
/// ```
/// use mixkit_formats::hash::canonicalize;
///
/// assert_eq!(canonicalize("c:\\westwood\\conquer.mix"), "CONQUER.MIX");
/// assert_eq!(canonicalize("art/units/tank.shp"), "TANK.SHP");
/// ```
pub fn canonicalize(name: &str) -> String {
    let mut file_name = name.rsplit(['/', '\\']).next().unwrap_or(name);

    // "C:NAME" has no separator after the drive
    while let [drive, b':', ..] = file_name.as_bytes()
        && drive.is_ascii_alphabetic()
    {
        file_name = &file_name[2..];
    }

    let mut canonical = file_name.to_ascii_uppercase();
    if canonical.len() > MAX_NAME_LEN {
        let mut cut = MAX_NAME_LEN;
        while !canonical.is_char_boundary(cut) {
            cut -= 1;
        }
        canonical.truncate(cut);
    }
    canonical
}

/// Hash raw bytes with the archive checksum
pub fn hash_bytes(data: &[u8]) -> AssetKey {
    let mut hasher = StreamingHash::new();
    hasher.update(data);
    hasher.finalize()
}

/// Hash an asset name (canonicalized first)
///
/// ```
/// use mixkit_formats::hash::hash_name;
///
/// assert_eq!(hash_name("rules.ini"), hash_name("RULES.INI"));
/// assert_eq!(hash_name("data/rules.ini"), hash_name("RULES.INI"));
/// ```
pub fn hash_name(name: &str) -> AssetKey {
    hash_bytes(canonicalize(name).as_bytes())
}

/// Incremental form of [`hash_bytes`]
///
/// Feeding the same bytes in any split produces the same key.
#[derive(Debug, Clone, Default)]
pub struct StreamingHash {
    key: u32,
    staging: u32,
    index: usize,
}

impl StreamingHash {
    /// Start a new hash
    pub const fn new() -> Self {
        Self {
            key: 0,
            staging: 0,
            index: 0,
        }
    }

    /// Feed more bytes
    pub fn update(&mut self, data: &[u8]) {
        let mut rest = data;

        // Top up a partially filled chunk first
        while self.index != 0 {
            let Some((&byte, tail)) = rest.split_first() else {
                return;
            };
            self.push_byte(byte);
            rest = tail;
        }

        let mut chunks = rest.chunks_exact(4);
        for chunk in &mut chunks {
            let word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            self.key = self.key.rotate_left(1).wrapping_add(word);
        }

        for &byte in chunks.remainder() {
            self.push_byte(byte);
        }
    }

    fn push_byte(&mut self, byte: u8) {
        self.staging |= u32::from(byte) << (self.index * 8);
        self.index += 1;
        if self.index == 4 {
            self.key = self.key.rotate_left(1).wrapping_add(self.staging);
            self.staging = 0;
            self.index = 0;
        }
    }

    /// Key for everything fed so far; a pending partial chunk is zero-padded
    pub fn finalize(&self) -> AssetKey {
        if self.index > 0 {
            AssetKey(self.key.rotate_left(1).wrapping_add(self.staging))
        } else {
            AssetKey(self.key)
        }
    }

    /// Forget all input
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_input_hashes_to_zero() {
        assert_eq!(hash_bytes(&[]), AssetKey::new(0));
        assert_eq!(hash_name(""), AssetKey::new(0));
    }

    #[test]
    fn test_single_chunk_is_little_endian_word() {
        let expected = u32::from_le_bytes(*b"TEST");
        assert_eq!(hash_bytes(b"TEST").get(), expected);
    }

    #[test]
    fn test_partial_chunk_is_zero_padded() {
        assert_eq!(hash_bytes(b"A").get(), 0x41);
        assert_eq!(hash_bytes(b"AB").get(), 0x4241);
    }

    #[test]
    fn test_two_chunks_rotate_then_add() {
        let first = u32::from_le_bytes(*b"TEST");
        let second = u32::from_le_bytes(*b"DATA");
        let expected = first.rotate_left(1).wrapping_add(second);
        assert_eq!(hash_bytes(b"TESTDATA").get(), expected);
    }

    #[test]
    fn test_tail_after_full_chunks() {
        let first = u32::from_le_bytes(*b"TANK");
        let tail = u32::from_le_bytes([b'.', b'S', b'H', 0]);
        let expected = first.rotate_left(1).wrapping_add(tail);
        assert_eq!(hash_bytes(b"TANK.SH").get(), expected);
    }

    #[test]
    fn test_name_hash_ignores_case_and_directories() {
        let key = hash_name("TEMPERAT.MIX");
        assert_eq!(hash_name("temperat.mix"), key);
        assert_eq!(hash_name("TeMpErAt.MiX"), key);
        assert_eq!(hash_name("maps\\temperat.mix"), key);
        assert_eq!(hash_name("d:/game/maps/temperat.mix"), key);
    }

    #[test]
    fn test_canonicalize_strips_drive_without_separator() {
        assert_eq!(canonicalize("C:LOCAL.MIX"), "LOCAL.MIX");
    }

    #[test]
    fn test_canonicalize_truncates_long_names() {
        let long = "x".repeat(MAX_NAME_LEN + 40);
        let canonical = canonicalize(&long);
        assert_eq!(canonical.len(), MAX_NAME_LEN);
        assert!(canonical.bytes().all(|b| b == b'X'));
    }

    #[test]
    fn test_canonicalize_truncates_on_char_boundary() {
        let mut long = "A".repeat(MAX_NAME_LEN - 1);
        long.push('é');
        let canonical = canonicalize(&long);
        assert_eq!(canonical.len(), MAX_NAME_LEN - 1);
    }

    #[test]
    fn test_keys_order_as_signed() {
        let negative = AssetKey::new(0x8000_0000);
        let positive = AssetKey::new(0x7FFF_FFFF);
        assert!(negative < positive);
        assert!(AssetKey::new(0) < AssetKey::new(1));
        assert!(AssetKey::new(0xFFFF_FFFF) < AssetKey::new(0));
    }

    #[test]
    fn test_key_display_is_hex() {
        assert_eq!(AssetKey::new(0x00AB_CDEF).to_string(), "00ABCDEF");
    }

    #[test]
    fn test_streaming_reset() {
        let mut hasher = StreamingHash::new();
        hasher.update(b"garbage");
        hasher.reset();
        hasher.update(b"CONQUER.MIX");
        assert_eq!(hasher.finalize(), hash_bytes(b"CONQUER.MIX"));
    }

    proptest! {
        #[test]
        fn canonicalize_is_idempotent(name in ".{0,300}") {
            let once = canonicalize(&name);
            prop_assert_eq!(canonicalize(&once), once);
        }

        #[test]
        fn streaming_matches_one_shot(
            data in prop::collection::vec(any::<u8>(), 0..64),
            split in 0usize..64,
        ) {
            let split = split.min(data.len());
            let mut hasher = StreamingHash::new();
            hasher.update(&data[..split]);
            hasher.update(&data[split..]);
            prop_assert_eq!(hasher.finalize(), hash_bytes(&data));
        }
    }
}
