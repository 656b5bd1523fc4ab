//! Mount list and asset loading
//!
//! The manager owns an ordered list of mounted archives. Lookups walk the
//! list in mount order and the first archive holding a key wins, so archives
//! mounted earlier override later ones.

use crate::archive::{ArchiveReader, EntryLocation};
use crate::config::ManagerConfig;
use crate::error::{ArchiveError, ArchiveResult, AssetError, AssetResult};
use crate::path;
use bytes::Bytes;
use dashmap::DashMap;
use mixkit_formats::codec::lcw;
use mixkit_formats::hash::{canonicalize, hash_name};
use mixkit_formats::{AssetKey, FrameSet, IndexedImage, Palette, PcxImage, Shape, Tileset};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, trace};

/// Extension routed to the PCX decoder by [`ArchiveManager::load_image`]
const PCX_EXTENSION: &str = ".PCX";

/// Ordered set of mounted archives
///
/// Mount and unmount take the write lock; lookups take the read lock only
/// long enough to pick an archive, so payload reads run concurrently.
#[derive(Debug, Default)]
pub struct ArchiveManager {
    config: ManagerConfig,
    archives: RwLock<Vec<Arc<ArchiveReader>>>,
    names: DashMap<AssetKey, String>,
}

impl ArchiveManager {
    /// Create an empty manager
    pub fn new(config: ManagerConfig) -> Self {
        Self {
            config,
            archives: RwLock::new(Vec::new()),
            names: DashMap::new(),
        }
    }

    /// Active configuration
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Resolve, open and append an archive
    ///
    /// # Errors
    ///
    /// [`ArchiveError::MountFailed`] if the file cannot be found, opened or
    /// validated; [`ArchiveError::AlreadyMounted`] if it is already in the list.
    pub fn mount(&self, path: impl AsRef<Path>) -> ArchiveResult<()> {
        let requested = path.as_ref();
        let Some(resolved) = path::resolve(
            requested,
            &self.config.search_paths,
            self.config.case_insensitive_paths,
        ) else {
            return Err(ArchiveError::mount_failed(
                requested,
                std::io::Error::new(std::io::ErrorKind::NotFound, "archive not found").into(),
            ));
        };

        if self.is_mounted(&resolved) {
            return Err(ArchiveError::AlreadyMounted(resolved));
        }

        let reader = ArchiveReader::open_with(&resolved, &self.config.reader_options())
            .map_err(|e| ArchiveError::mount_failed(requested, e))?;
        self.mount_reader(reader)
    }

    /// Append an already opened archive
    ///
    /// # Errors
    ///
    /// [`ArchiveError::AlreadyMounted`] if an archive with the same path is
    /// mounted.
    pub fn mount_reader(&self, reader: ArchiveReader) -> ArchiveResult<()> {
        let mut archives = self.archives.write();
        if archives.iter().any(|a| a.path() == reader.path()) {
            return Err(ArchiveError::AlreadyMounted(reader.path().to_path_buf()));
        }

        info!(
            "Mounted archive {:?} ({} entries, priority {})",
            reader.path(),
            reader.len(),
            archives.len()
        );
        archives.push(Arc::new(reader));
        Ok(())
    }

    /// Mount every archive listed in the configuration, in order
    ///
    /// Stops at the first failure. Returns the number mounted.
    pub fn mount_configured(&self) -> ArchiveResult<usize> {
        for archive in &self.config.archives {
            self.mount(archive)?;
        }
        info!("Mounted {} configured archives", self.config.archives.len());
        Ok(self.config.archives.len())
    }

    /// Remove an archive from the mount list
    ///
    /// `path` may be the path as mounted or any path resolving to it.
    /// Payloads already returned stay valid. Returns whether an archive was
    /// removed.
    pub fn unmount(&self, path: impl AsRef<Path>) -> bool {
        let requested = path.as_ref();
        let resolved = path::resolve(
            requested,
            &self.config.search_paths,
            self.config.case_insensitive_paths,
        );

        let mut archives = self.archives.write();
        let position = archives
            .iter()
            .position(|a| a.path() == requested || Some(a.path()) == resolved.as_deref());

        match position {
            Some(index) => {
                let removed = archives.remove(index);
                info!("Unmounted archive {:?}", removed.path());
                true
            }
            None => {
                debug!("Unmount of {:?} ignored: not mounted", requested);
                false
            }
        }
    }

    /// Drop every mounted archive
    pub fn unmount_all(&self) {
        let mut archives = self.archives.write();
        info!("Unmounting {} archives", archives.len());
        archives.clear();
    }

    /// Paths of mounted archives in search order
    pub fn mounted(&self) -> Vec<PathBuf> {
        self.archives
            .read()
            .iter()
            .map(|a| a.path().to_path_buf())
            .collect()
    }

    /// Mounted archives in search order
    pub fn archives(&self) -> Vec<Arc<ArchiveReader>> {
        self.archives.read().clone()
    }

    fn is_mounted(&self, path: &Path) -> bool {
        self.archives.read().iter().any(|a| a.path() == path)
    }

    /// First archive (in mount order) holding `key`
    pub fn locate_key(&self, key: AssetKey) -> Option<(Arc<ArchiveReader>, EntryLocation)> {
        self.archives
            .read()
            .iter()
            .find_map(|archive| archive.lookup(key).map(|loc| (Arc::clone(archive), loc)))
    }

    /// First archive (in mount order) holding `name`
    pub fn locate(&self, name: &str) -> Option<(Arc<ArchiveReader>, EntryLocation)> {
        self.locate_key(hash_name(name))
    }

    /// Whether any mounted archive holds `name`
    pub fn exists(&self, name: &str) -> bool {
        self.locate(name).is_some()
    }

    /// Load an asset's bytes, expanding compressed entries
    ///
    /// # Errors
    ///
    /// [`AssetError::NotFound`] if no mounted archive holds the name, otherwise
    /// read or decompression failures.
    pub fn load(&self, name: &str) -> AssetResult<Vec<u8>> {
        let key = hash_name(name);
        let (archive, location) = self
            .locate_key(key)
            .ok_or_else(|| AssetError::NotFound(canonicalize(name)))?;
        self.fetch(&archive, &location)
    }

    /// Load by precomputed key
    pub fn load_by_key(&self, key: AssetKey) -> AssetResult<Vec<u8>> {
        let (archive, location) = self
            .locate_key(key)
            .ok_or_else(|| AssetError::NotFound(self.describe_key(key)))?;
        self.fetch(&archive, &location)
    }

    /// Load an asset as shared bytes
    ///
    /// Uncompressed entries in mapped or in-memory archives are returned
    /// without copying.
    pub fn load_shared(&self, name: &str) -> AssetResult<Bytes> {
        let (archive, location) = self
            .locate(name)
            .ok_or_else(|| AssetError::NotFound(canonicalize(name)))?;

        if location.compressed {
            return self.fetch(&archive, &location).map(Bytes::from);
        }
        self.check_size(location.size as usize)?;
        Ok(archive.read_entry_shared(location.offset, location.size)?)
    }

    fn check_size(&self, size: usize) -> ArchiveResult<()> {
        if size > self.config.max_entry_size {
            return Err(ArchiveError::EntryTooLarge {
                size,
                limit: self.config.max_entry_size,
            });
        }
        Ok(())
    }

    fn fetch(&self, archive: &ArchiveReader, location: &EntryLocation) -> AssetResult<Vec<u8>> {
        self.check_size(location.size as usize)?;
        let stored = archive.read_location(location)?;

        if !location.compressed {
            return Ok(stored);
        }

        let expanded = lcw::decompress_prefixed(&stored, self.config.max_entry_size)?;
        trace!(
            "Expanded entry from {:?}: {} -> {} bytes",
            archive.path(),
            stored.len(),
            expanded.len()
        );
        Ok(expanded)
    }

    /// Load a single image
    ///
    /// Names ending in `.PCX` (any case) are decoded as PCX; anything else is
    /// read as a sprite and its first frame returned. Decoded pixels are
    /// capped by `max_entry_size` like any other payload.
    pub fn load_image(&self, name: &str) -> AssetResult<IndexedImage> {
        let data = self.load(name)?;
        let limit = self.config.max_entry_size;
        if canonicalize(name).ends_with(PCX_EXTENSION) {
            return Ok(PcxImage::parse_with_limit(&data, limit)?.image);
        }
        Ok(Shape::parse_with_limit(&data, limit)?.frame(0)?)
    }

    /// Load every frame of a sprite
    pub fn load_frameset(&self, name: &str) -> AssetResult<FrameSet> {
        let data = self.load(name)?;
        let shape = Shape::parse_with_limit(&data, self.config.max_entry_size)?;
        Ok(shape.decode_all()?)
    }

    /// Load a 6-bit palette asset
    pub fn load_palette(&self, name: &str) -> AssetResult<Palette> {
        let data = self.load(name)?;
        Ok(Palette::from_vga_bytes(&data)?)
    }

    /// Load a terrain tile set
    pub fn load_tileset(&self, name: &str) -> AssetResult<Tileset> {
        let data = self.load(name)?;
        Ok(Tileset::parse_with_limit(&data, self.config.max_entry_size)?)
    }

    /// Load a PCX image with its palette
    pub fn load_pcx(&self, name: &str) -> AssetResult<PcxImage> {
        let data = self.load(name)?;
        Ok(PcxImage::parse_with_limit(&data, self.config.max_entry_size)?)
    }

    /// Remember `name` for diagnostics and return its key
    pub fn register_name(&self, name: &str) -> AssetKey {
        let canonical = canonicalize(name);
        let key = hash_name(&canonical);
        self.names.insert(key, canonical);
        key
    }

    /// Registered name for `key`
    pub fn name_for(&self, key: AssetKey) -> Option<String> {
        self.names.get(&key).map(|name| name.value().clone())
    }

    fn describe_key(&self, key: AssetKey) -> String {
        self.name_for(key).unwrap_or_else(|| format!("key {key}"))
    }
}
