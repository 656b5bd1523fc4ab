//! Archive manager configuration

use crate::archive::{AccessMode, ReaderOptions};
use crate::error::ConfigError;
use mixkit_formats::codec::lcw::MAX_DECOMPRESSED_SIZE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for an [`ArchiveManager`](crate::ArchiveManager)
///
/// Every field has a default, so a JSON file only needs the keys it changes:
///
/// ```
/// use mixkit_storage::{AccessMode, ManagerConfig};
///
/// let config = ManagerConfig::from_json_str(
///     r#"{ "archives": ["LOCAL.MIX", "MAIN.MIX"], "access_mode": "mapped" }"#,
/// ).unwrap();
/// assert_eq!(config.archives.len(), 2);
/// assert_eq!(config.access_mode, AccessMode::Mapped);
/// assert!(config.case_insensitive_paths);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Directories searched for relative archive paths
    pub search_paths: Vec<PathBuf>,

    /// Archives mounted by `mount_configured`, highest priority first
    pub archives: Vec<PathBuf>,

    /// Payload access strategy for mounted archives
    pub access_mode: AccessMode,

    /// Verify SHA-1 trailers on mount
    pub verify_digest: bool,

    /// Largest stored or decompressed entry handed out (in bytes)
    pub max_entry_size: usize,

    /// Match archive paths ignoring ASCII case
    pub case_insensitive_paths: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            search_paths: vec![PathBuf::from(".")],
            archives: Vec::new(),
            access_mode: AccessMode::Buffered,
            verify_digest: false,
            max_entry_size: MAX_DECOMPRESSED_SIZE,
            case_insensitive_paths: true,
        }
    }
}

impl ManagerConfig {
    /// Configuration searching only `base_path`
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            search_paths: vec![base_path.as_ref().to_path_buf()],
            ..Default::default()
        }
    }

    /// Parse JSON configuration
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON configuration file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Append a search path
    #[must_use]
    pub fn with_search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Append an archive to the configured mount list
    #[must_use]
    pub fn with_archive<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.archives.push(path.as_ref().to_path_buf());
        self
    }

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

    /// Set the entry size limit
    #[must_use]
    pub const fn with_max_entry_size(mut self, size: usize) -> Self {
        self.max_entry_size = size;
        self
    }

    /// Enable or disable case-insensitive path matching
    #[must_use]
    pub const fn with_case_insensitive_paths(mut self, enable: bool) -> Self {
        self.case_insensitive_paths = enable;
        self
    }

    /// Options for opening archives under this configuration
    pub fn reader_options(&self) -> ReaderOptions {
        ReaderOptions::default()
            .with_access_mode(self.access_mode)
            .with_verify_digest(self.verify_digest)
    }
}
