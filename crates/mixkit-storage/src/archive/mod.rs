//! MIX archive container
//!
//! An archive is a sorted index of hashed asset keys followed by one data
//! section:
//!
//! ```text
//! [0u16, flags u16]                    optional extended prefix
//! entry_count u16, data_size u32       header
//! entry_count x { key u32, offset u32, size u32 }
//! data[data_size]
//! [sha1 20]                            when flags has DIGEST
//! ```
//!
//! Keys are strictly ascending in signed order so lookups binary search.
//! Offsets are relative to the data section. Bit 31 of the size word marks
//! a compressed payload: a `u32` little-endian decompressed length followed by
//! an LCW stream.

mod entry;
mod header;
mod reader;

pub use entry::{ArchiveIndexEntry, COMPRESSED_FLAG, EntryLocation};
pub use header::{ArchiveFlags, ArchiveHeader, ArchiveLayout, DIGEST_LEN};
pub use reader::ArchiveReader;

use serde::{Deserialize, Serialize};

/// How archive payload bytes are accessed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessMode {
    /// Seek and read the file for every entry
    #[default]
    Buffered,
    /// Memory-map the file; shared payloads are zero-copy
    Mapped,
    /// Read the whole file into memory on open
    InMemory,
}

/// Options applied when opening an archive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReaderOptions {
    /// Payload access strategy
    pub access_mode: AccessMode,
    /// Check the SHA-1 trailer when the archive has one
    pub verify_digest: bool,
}

impl ReaderOptions {
    /// Set the access mode
    #[must_use]
    pub const fn with_access_mode(mut self, mode: AccessMode) -> Self {
        self.access_mode = mode;
        self
    }

    /// Enable or disable digest verification
    #[must_use]
    pub const fn with_verify_digest(mut self, verify: bool) -> Self {
        self.verify_digest = verify;
        self
    }
}
