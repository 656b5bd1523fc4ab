//! Error types for archive storage and asset loading

use mixkit_formats::{AssetKey, CodecError, FormatError};
use std::path::PathBuf;
use thiserror::Error;

/// Result type for archive operations
pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// Result type for asset loading
pub type AssetResult<T> = Result<T, AssetError>;

/// Errors raised while opening, mounting or reading archives
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Archive or requested range is shorter than its header declares
    #[error("truncated archive: need {expected} bytes, have {actual}")]
    Truncated {
        /// Bytes the header requires
        expected: u64,
        /// Bytes available
        actual: u64,
    },

    /// Entry keys are not in ascending signed order
    #[error("entry {index} key {key} sorts before previous key {previous}")]
    UnsortedEntries {
        /// Offending entry position
        index: usize,
        /// Key of the previous entry
        previous: AssetKey,
        /// Key of the offending entry
        key: AssetKey,
    },

    /// Two entries share a key
    #[error("duplicate key {key} at entry {index}")]
    DuplicateKey {
        /// Offending entry position
        index: usize,
        /// Repeated key
        key: AssetKey,
    },

    /// An entry's byte range leaves the data section
    #[error("entry {key} range {offset}+{size} exceeds data section of {data_size} bytes")]
    EntryOutOfBounds {
        /// Entry key
        key: AssetKey,
        /// Offset within the data section
        offset: u32,
        /// Stored size
        size: u32,
        /// Data section size
        data_size: u32,
    },

    /// Archive header is encrypted; keys are not available
    #[error("encrypted archive headers are not supported")]
    Encrypted,

    /// Header flags carry bits this reader does not know
    #[error("unknown archive flags 0x{0:04X}")]
    UnknownFlags(u16),

    /// Stored SHA-1 digest does not match the archive contents
    #[error("digest mismatch: expected {expected:02x?}, got {actual:02x?}")]
    DigestMismatch {
        /// Digest stored in the archive
        expected: [u8; 20],
        /// Digest computed over the archive
        actual: [u8; 20],
    },

    /// Entry is larger than the configured limit
    #[error("entry of {size} bytes exceeds limit of {limit} bytes")]
    EntryTooLarge {
        /// Entry size
        size: usize,
        /// Configured limit
        limit: usize,
    },

    /// Mounting an archive failed
    #[error("failed to mount {}: {source}", path.display())]
    MountFailed {
        /// Requested path
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: Box<ArchiveError>,
    },

    /// Archive is already in the mount list
    #[error("archive already mounted: {}", .0.display())]
    AlreadyMounted(PathBuf),

    /// Binary parsing error
    #[error("binary parse error: {0}")]
    BinRead(#[from] binrw::Error),
}

impl ArchiveError {
    /// Whether the error means the archive contents are damaged
    pub fn is_corruption(&self) -> bool {
        match self {
            Self::Truncated { .. }
            | Self::UnsortedEntries { .. }
            | Self::DuplicateKey { .. }
            | Self::EntryOutOfBounds { .. }
            | Self::DigestMismatch { .. }
            | Self::BinRead(_) => true,
            Self::MountFailed { source, .. } => source.is_corruption(),
            _ => false,
        }
    }

    pub(crate) fn mount_failed(path: impl Into<PathBuf>, source: Self) -> Self {
        Self::MountFailed {
            path: path.into(),
            source: Box::new(source),
        }
    }
}

/// Errors raised while loading assets through the manager
#[derive(Debug, Error)]
pub enum AssetError {
    /// No mounted archive holds the asset
    #[error("asset not found: {0}")]
    NotFound(String),

    /// Archive read failure
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// Compressed payload failed to decode
    #[error("decompression failed: {0}")]
    Codec(#[from] CodecError),

    /// Payload is not a valid asset of the requested kind
    #[error("format error: {0}")]
    Format(#[from] FormatError),
}

/// Errors raised while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Config is not valid JSON for [`ManagerConfig`](crate::ManagerConfig)
    #[error("invalid configuration: {0}")]
    Json(#[from] serde_json::Error),
}
