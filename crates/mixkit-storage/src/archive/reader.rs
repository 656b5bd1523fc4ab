//! Read-only access to one mounted archive

use super::entry::{ArchiveIndexEntry, EntryLocation};
use super::header::{ArchiveFlags, ArchiveHeader, ArchiveLayout, DIGEST_LEN};
use super::{AccessMode, ReaderOptions};
use crate::error::{ArchiveError, ArchiveResult};
use binrw::BinRead;
use bytes::Bytes;
use memmap2::Mmap;
use mixkit_formats::AssetKey;
use parking_lot::Mutex;
use sha1::{Digest, Sha1};
use std::fs::File;
use std::io::{Cursor, ErrorKind, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

/// Chunk size for hashing buffered archives
const DIGEST_CHUNK: usize = 64 * 1024;

/// Backing bytes of an archive
enum DataSource {
    /// Seek-and-read on an open file
    File(Mutex<File>),
    /// Memory-mapped or fully loaded bytes
    Shared(Bytes),
}

impl DataSource {
    fn read_at(&self, offset: u64, len: usize) -> ArchiveResult<Vec<u8>> {
        match self {
            Self::File(file) => {
                let mut file = file.lock();
                file.seek(SeekFrom::Start(offset))?;
                let mut buffer = vec![0u8; len];
                if let Err(e) = file.read_exact(&mut buffer) {
                    // The file shrank after it was opened
                    if e.kind() == ErrorKind::UnexpectedEof {
                        return Err(ArchiveError::Truncated {
                            expected: offset + len as u64,
                            actual: file.metadata().map_or(0, |m| m.len()),
                        });
                    }
                    return Err(e.into());
                }
                Ok(buffer)
            }
            Self::Shared(bytes) => Ok(Self::slice(bytes, offset, len)?.to_vec()),
        }
    }

    fn read_shared(&self, offset: u64, len: usize) -> ArchiveResult<Bytes> {
        match self {
            Self::File(_) => self.read_at(offset, len).map(Bytes::from),
            Self::Shared(bytes) => {
                Self::slice(bytes, offset, len)?;
                let start = offset as usize;
                Ok(bytes.slice(start..start + len))
            }
        }
    }

    fn slice(bytes: &Bytes, offset: u64, len: usize) -> ArchiveResult<&[u8]> {
        let end = offset + len as u64;
        usize::try_from(offset)
            .ok()
            .and_then(|start| bytes.get(start..start + len))
            .ok_or(ArchiveError::Truncated {
                expected: end,
                actual: bytes.len() as u64,
            })
    }
}

/// A parsed, validated archive
///
/// The entry table is loaded and checked once on open; payload bytes are
/// read on demand and never cached.
pub struct ArchiveReader {
    path: PathBuf,
    layout: ArchiveLayout,
    entries: Vec<ArchiveIndexEntry>,
    source: DataSource,
    access_mode: AccessMode,
}

impl std::fmt::Debug for ArchiveReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveReader")
            .field("path", &self.path)
            .field("layout", &self.layout)
            .field("entries", &self.entries.len())
            .field("access_mode", &self.access_mode)
            .finish()
    }
}

impl ArchiveReader {
    /// Open an archive with buffered file reads
    pub fn open(path: impl AsRef<Path>) -> ArchiveResult<Self> {
        Self::open_with(path, &ReaderOptions::default())
    }

    /// Open an archive with explicit options
    pub fn open_with(path: impl AsRef<Path>, options: &ReaderOptions) -> ArchiveResult<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let len = file.metadata()?.len();

        debug!(
            "Opening archive {:?} ({} bytes, {:?})",
            path, len, options.access_mode
        );

        // Mapping an empty file fails on some platforms
        if len < ArchiveHeader::SIZE {
            return Err(ArchiveError::Truncated {
                expected: ArchiveHeader::SIZE,
                actual: len,
            });
        }

        let source = match options.access_mode {
            AccessMode::Buffered => DataSource::File(Mutex::new(file)),
            AccessMode::Mapped => {
                // The mapping is read-only; archives are not modified while mounted
                #[allow(unsafe_code)]
                let mmap = unsafe { Mmap::map(&file)? };
                DataSource::Shared(Bytes::from_owner(mmap))
            }
            AccessMode::InMemory => {
                let mut data = Vec::with_capacity(usize::try_from(len).unwrap_or(0));
                let mut file = file;
                file.read_to_end(&mut data)?;
                DataSource::Shared(Bytes::from(data))
            }
        };

        Self::from_source(path.to_path_buf(), source, len, options)
    }

    /// Parse an archive held in memory
    ///
    /// `label` stands in for the file path in logs and in the mount list.
    pub fn from_bytes(
        label: impl Into<PathBuf>,
        data: Bytes,
        options: &ReaderOptions,
    ) -> ArchiveResult<Self> {
        let len = data.len() as u64;
        let options = ReaderOptions {
            access_mode: AccessMode::InMemory,
            ..*options
        };
        Self::from_source(label.into(), DataSource::Shared(data), len, &options)
    }

    fn from_source(
        path: PathBuf,
        source: DataSource,
        len: u64,
        options: &ReaderOptions,
    ) -> ArchiveResult<Self> {
        if len < ArchiveHeader::SIZE {
            return Err(ArchiveError::Truncated {
                expected: ArchiveHeader::SIZE,
                actual: len,
            });
        }

        let prefix_len = len.min(ArchiveLayout::PREFIX_SIZE + ArchiveHeader::SIZE) as usize;
        let prefix = source.read_at(0, prefix_len)?;
        let layout = match ArchiveLayout::read(&mut Cursor::new(&prefix)) {
            Ok(layout) => layout,
            // Extended prefix with the header cut off
            Err(ArchiveError::BinRead(e)) if e.is_eof() => {
                return Err(ArchiveError::Truncated {
                    expected: ArchiveLayout::PREFIX_SIZE + ArchiveHeader::SIZE,
                    actual: len,
                });
            }
            Err(e) => return Err(e),
        };

        let required = layout.required_len();
        if len < required {
            warn!(
                "Rejecting archive {:?}: header requires {} bytes, file has {}",
                path, required, len
            );
            return Err(ArchiveError::Truncated {
                expected: required,
                actual: len,
            });
        }

        let count = usize::from(layout.header.entry_count);
        let table_len = count * ArchiveIndexEntry::SIZE as usize;
        let table = source.read_at(layout.index_offset(), table_len)?;
        let mut cursor = Cursor::new(&table);
        let entries = (0..count)
            .map(|_| ArchiveIndexEntry::read(&mut cursor))
            .collect::<Result<Vec<_>, _>>()?;

        validate_entries(&entries, layout.header.data_size)?;

        let reader = Self {
            path,
            layout,
            entries,
            source,
            access_mode: options.access_mode,
        };

        if options.verify_digest && layout.flags.has_digest() {
            reader.verify_digest()?;
        }

        debug!(
            "Parsed archive {:?}: {} entries, {} data bytes{}",
            reader.path,
            count,
            layout.header.data_size,
            if layout.extended { " (extended)" } else { "" }
        );
        Ok(reader)
    }

    fn verify_digest(&self) -> ArchiveResult<()> {
        let start = self.layout.header_offset();
        let end = self.layout.data_end();

        let mut hasher = Sha1::new();
        match &self.source {
            DataSource::Shared(bytes) => {
                hasher.update(DataSource::slice(bytes, start, (end - start) as usize)?);
            }
            DataSource::File(_) => {
                let mut offset = start;
                while offset < end {
                    let len = (end - offset).min(DIGEST_CHUNK as u64) as usize;
                    hasher.update(self.source.read_at(offset, len)?);
                    offset += len as u64;
                }
            }
        }
        let mut actual = [0u8; 20];
        actual.copy_from_slice(&hasher.finalize());

        let stored = self.source.read_at(end, DIGEST_LEN as usize)?;
        let mut expected = [0u8; 20];
        expected.copy_from_slice(&stored);

        if actual != expected {
            warn!("Digest mismatch in archive {:?}", self.path);
            return Err(ArchiveError::DigestMismatch { expected, actual });
        }
        trace!("Digest verified for {:?}", self.path);
        Ok(())
    }

    /// Path (or label) the archive was opened from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parsed header
    pub fn header(&self) -> &ArchiveHeader {
        &self.layout.header
    }

    /// Extended header flags
    pub fn flags(&self) -> ArchiveFlags {
        self.layout.flags
    }

    /// Region offsets
    pub fn layout(&self) -> &ArchiveLayout {
        &self.layout
    }

    /// How payload bytes are accessed
    pub fn access_mode(&self) -> AccessMode {
        self.access_mode
    }

    /// Entry table in key order
    pub fn entries(&self) -> &[ArchiveIndexEntry] {
        &self.entries
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the archive has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Binary search the entry table
    pub fn lookup(&self, key: AssetKey) -> Option<EntryLocation> {
        self.entries
            .binary_search_by(|entry| entry.key.cmp(&key))
            .ok()
            .map(|index| self.entries[index].location())
    }

    /// Whether the archive holds `key`
    pub fn contains(&self, key: AssetKey) -> bool {
        self.lookup(key).is_some()
    }

    fn check_range(&self, offset: u32, size: u32) -> ArchiveResult<u64> {
        let end = u64::from(offset) + u64::from(size);
        let data_size = u64::from(self.layout.header.data_size);
        if end > data_size {
            return Err(ArchiveError::Truncated {
                expected: end,
                actual: data_size,
            });
        }
        Ok(self.layout.data_offset() + u64::from(offset))
    }

    /// Copy `size` bytes at `offset` within the data section
    pub fn read_entry(&self, offset: u32, size: u32) -> ArchiveResult<Vec<u8>> {
        let start = self.check_range(offset, size)?;
        trace!("Reading {} bytes at data offset {} from {:?}", size, offset, self.path);
        self.source.read_at(start, size as usize)
    }

    /// Like [`ArchiveReader::read_entry`], sharing the backing bytes when possible
    ///
    /// Mapped and in-memory archives return a slice that keeps the backing
    /// storage alive even after the archive is unmounted.
    pub fn read_entry_shared(&self, offset: u32, size: u32) -> ArchiveResult<Bytes> {
        let start = self.check_range(offset, size)?;
        self.source.read_shared(start, size as usize)
    }

    /// Stored bytes of the entry at `location`
    pub fn read_location(&self, location: &EntryLocation) -> ArchiveResult<Vec<u8>> {
        self.read_entry(location.offset, location.size)
    }
}

fn validate_entries(entries: &[ArchiveIndexEntry], data_size: u32) -> ArchiveResult<()> {
    for (index, pair) in entries.windows(2).enumerate() {
        let (previous, entry) = (pair[0], pair[1]);
        if entry.key == previous.key {
            return Err(ArchiveError::DuplicateKey {
                index: index + 1,
                key: entry.key,
            });
        }
        if entry.key < previous.key {
            return Err(ArchiveError::UnsortedEntries {
                index: index + 1,
                previous: previous.key,
                key: entry.key,
            });
        }
    }

    if let Some(entry) = entries.iter().find(|e| e.end() > u64::from(data_size)) {
        return Err(ArchiveError::EntryOutOfBounds {
            key: entry.key,
            offset: entry.offset,
            size: entry.size(),
            data_size,
        });
    }
    Ok(())
}
