//! Archive index entries

use binrw::{BinRead, BinWrite};
use mixkit_formats::AssetKey;

/// Bit 31 of the stored size word marks an LCW-compressed payload
pub const COMPRESSED_FLAG: u32 = 0x8000_0000;

/// One 12-byte index record
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little)]
pub struct ArchiveIndexEntry {
    /// Hash of the asset's canonical name
    pub key: AssetKey,
    /// Offset within the data section
    pub offset: u32,
    /// Stored byte length, with [`COMPRESSED_FLAG`] in bit 31
    pub size_word: u32,
}

impl ArchiveIndexEntry {
    /// Encoded size
    pub const SIZE: u64 = 12;

    /// Stored byte length
    pub fn size(&self) -> u32 {
        self.size_word & !COMPRESSED_FLAG
    }

    /// Whether the payload must be LCW-expanded
    pub fn is_compressed(&self) -> bool {
        self.size_word & COMPRESSED_FLAG != 0
    }

    /// One past the last data-section byte of this entry
    pub fn end(&self) -> u64 {
        u64::from(self.offset) + u64::from(self.size())
    }

    /// Location handed out by lookups
    pub fn location(&self) -> EntryLocation {
        EntryLocation {
            offset: self.offset,
            size: self.size(),
            compressed: self.is_compressed(),
        }
    }
}

/// Where an entry's stored bytes live in the data section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryLocation {
    /// Offset within the data section
    pub offset: u32,
    /// Stored byte length
    pub size: u32,
    /// Payload is a length-prefixed LCW stream
    pub compressed: bool,
}
