//! Archive fixtures shared by the integration tests

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use mixkit_formats::AssetKey;
use mixkit_formats::codec::lcw;
use mixkit_formats::hash::hash_name;
use mixkit_storage::archive::{ArchiveFlags, COMPRESSED_FLAG};
use sha1::{Digest, Sha1};
use std::path::{Path, PathBuf};

struct FixtureEntry {
    key: AssetKey,
    stored: Vec<u8>,
    compressed: bool,
}

/// Writes archives in the on-disk layout for tests
#[derive(Default)]
pub struct ArchiveBuilder {
    entries: Vec<FixtureEntry>,
    flags: Option<u16>,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an uncompressed entry
    pub fn add(self, name: &str, data: &[u8]) -> Self {
        self.add_key(hash_name(name), data.to_vec(), false)
    }

    /// Add an entry stored as a length-prefixed LCW stream
    pub fn add_compressed(self, name: &str, data: &[u8]) -> Self {
        let mut stored = u32::try_from(data.len()).unwrap().to_le_bytes().to_vec();
        stored.extend_from_slice(&lcw::compress(data));
        self.add_key(hash_name(name), stored, true)
    }

    /// Add an entry with exact stored bytes
    pub fn add_key(mut self, key: AssetKey, stored: Vec<u8>, compressed: bool) -> Self {
        self.entries.push(FixtureEntry {
            key,
            stored,
            compressed,
        });
        self
    }

    /// Write the extended prefix with these flags
    pub fn with_flags(mut self, flags: u16) -> Self {
        self.flags = Some(flags);
        self
    }

    /// Extended prefix with a digest trailer
    pub fn with_digest(self) -> Self {
        self.with_flags(ArchiveFlags::DIGEST)
    }

    pub fn build(mut self) -> Vec<u8> {
        self.entries.sort_by_key(|e| e.key);

        let data_size: usize = self.entries.iter().map(|e| e.stored.len()).sum();
        let mut out = Vec::new();
        if let Some(flags) = self.flags {
            out.extend_from_slice(&0u16.to_le_bytes());
            out.extend_from_slice(&flags.to_le_bytes());
        }
        let header_start = out.len();

        out.extend_from_slice(&u16::try_from(self.entries.len()).unwrap().to_le_bytes());
        out.extend_from_slice(&u32::try_from(data_size).unwrap().to_le_bytes());

        let mut offset = 0u32;
        for entry in &self.entries {
            let mut size = u32::try_from(entry.stored.len()).unwrap();
            if entry.compressed {
                size |= COMPRESSED_FLAG;
            }
            out.extend_from_slice(&entry.key.get().to_le_bytes());
            out.extend_from_slice(&offset.to_le_bytes());
            out.extend_from_slice(&size.to_le_bytes());
            offset += u32::try_from(entry.stored.len()).unwrap();
        }
        for entry in &self.entries {
            out.extend_from_slice(&entry.stored);
        }

        if self.flags.is_some_and(|f| f & ArchiveFlags::DIGEST != 0) {
            let digest = Sha1::digest(&out[header_start..]);
            out.extend_from_slice(&digest);
        }
        out
    }

    /// Build and write to `dir/file_name`
    pub fn write(self, dir: &Path, file_name: &str) -> PathBuf {
        let path = dir.join(file_name);
        std::fs::write(&path, self.build()).expect("write fixture archive");
        path
    }
}

/// Archive bytes with a hand-written entry table of (key, offset, size) rows
pub fn raw_archive(entries: &[(u32, u32, u32)], data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&u16::try_from(entries.len()).unwrap().to_le_bytes());
    out.extend_from_slice(&u32::try_from(data.len()).unwrap().to_le_bytes());
    for &(key, offset, size) in entries {
        out.extend_from_slice(&key.to_le_bytes());
        out.extend_from_slice(&offset.to_le_bytes());
        out.extend_from_slice(&size.to_le_bytes());
    }
    out.extend_from_slice(data);
    out
}
