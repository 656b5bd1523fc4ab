//! Archive header and the optional extended prefix
//!
//! ```text
//! [0u16, flags u16]          extended prefix, present when the first u16 is 0
//! entry_count u16
//! data_size   u32
//! ```
//!
//! A plain archive with zero entries would also begin with 0; such files are
//! read as extended archives, matching how the archives were produced.

use crate::error::{ArchiveError, ArchiveResult};
use binrw::{BinRead, BinReaderExt, BinWrite};
use std::io::{Read, Seek, SeekFrom};

use super::entry::ArchiveIndexEntry;

/// Size of a SHA-1 digest trailer
pub const DIGEST_LEN: u64 = 20;

/// Extended header flag bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArchiveFlags(u16);

impl ArchiveFlags {
    /// A SHA-1 digest follows the data section
    pub const DIGEST: u16 = 0x0001;
    /// The header and entry table are encrypted
    pub const ENCRYPTED: u16 = 0x0002;

    /// Wrap raw flag bits
    pub const fn new(bits: u16) -> Self {
        Self(bits)
    }

    /// Raw bits
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Digest trailer present
    pub const fn has_digest(self) -> bool {
        self.0 & Self::DIGEST != 0
    }

    /// Encrypted header
    pub const fn is_encrypted(self) -> bool {
        self.0 & Self::ENCRYPTED != 0
    }

    /// Bits other than the known flags
    pub const fn unknown_bits(self) -> u16 {
        self.0 & !(Self::DIGEST | Self::ENCRYPTED)
    }
}

/// Plain archive header
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little)]
pub struct ArchiveHeader {
    /// Number of index entries
    pub entry_count: u16,
    /// Size of the data section in bytes
    pub data_size: u32,
}

impl ArchiveHeader {
    /// Encoded size
    pub const SIZE: u64 = 6;
}

/// Where each region of an archive lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveLayout {
    /// Extended header flags (empty for plain archives)
    pub flags: ArchiveFlags,
    /// Whether the extended prefix is present
    pub extended: bool,
    /// Plain header
    pub header: ArchiveHeader,
}

impl ArchiveLayout {
    /// Size of the extended prefix
    pub const PREFIX_SIZE: u64 = 4;

    /// Read the prefix (if any) and header from the start of `reader`
    pub fn read<R: Read + Seek>(reader: &mut R) -> ArchiveResult<Self> {
        reader.seek(SeekFrom::Start(0))?;
        let first: u16 = reader.read_le()?;

        if first == 0 {
            let flags = ArchiveFlags::new(reader.read_le()?);
            if flags.is_encrypted() {
                return Err(ArchiveError::Encrypted);
            }
            if flags.unknown_bits() != 0 {
                return Err(ArchiveError::UnknownFlags(flags.bits()));
            }
            let header = ArchiveHeader::read(reader)?;
            return Ok(Self {
                flags,
                extended: true,
                header,
            });
        }

        reader.seek(SeekFrom::Start(0))?;
        let header = ArchiveHeader::read(reader)?;
        Ok(Self {
            flags: ArchiveFlags::default(),
            extended: false,
            header,
        })
    }

    /// Offset of the plain header (where digest coverage starts)
    pub fn header_offset(&self) -> u64 {
        if self.extended { Self::PREFIX_SIZE } else { 0 }
    }

    /// Offset of the entry table
    pub fn index_offset(&self) -> u64 {
        self.header_offset() + ArchiveHeader::SIZE
    }

    /// Offset of the data section
    pub fn data_offset(&self) -> u64 {
        self.index_offset() + u64::from(self.header.entry_count) * ArchiveIndexEntry::SIZE
    }

    /// End of the data section
    pub fn data_end(&self) -> u64 {
        self.data_offset() + u64::from(self.header.data_size)
    }

    /// Minimum file length for this layout, digest included
    pub fn required_len(&self) -> u64 {
        if self.flags.has_digest() {
            self.data_end() + DIGEST_LEN
        } else {
            self.data_end()
        }
    }
}
