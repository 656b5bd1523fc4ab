//! Archive mounting, lookup and asset loading for MIX-era game archives
//!
//! Game data ships in MIX archives: a sorted table of hashed asset names
//! followed by a data section. This crate opens and validates archives,
//! keeps an ordered mount list with first-match-wins lookup, and hands back
//! decompressed payloads or decoded assets.
//!
//! # Example
//!
//! ```rust,no_run
//! use mixkit_storage::{ArchiveManager, ManagerConfig};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ManagerConfig::new("/games/redalert")
//!     .with_archive("LOCAL.MIX")
//!     .with_archive("MAIN.MIX");
//! let manager = ArchiveManager::new(config);
//! manager.mount_configured()?;
//!
//! let rules = manager.load("RULES.INI")?;
//! let mut palette = manager.load_palette("TEMPERAT.PAL")?;
//! let tank = manager.load_image("1TNK.SHP")?;
//! let argb = palette.convert_to_vec(tank.pixels());
//! # let _ = (rules, argb);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::uninlined_format_args)] // Log message style
#![allow(clippy::return_self_not_must_use)] // Builder patterns

pub mod archive;
pub mod config;
pub mod error;
pub mod manager;
pub mod path;

pub use archive::{AccessMode, ArchiveReader, EntryLocation, ReaderOptions};
pub use config::ManagerConfig;
pub use error::{ArchiveError, ArchiveResult, AssetError, AssetResult, ConfigError};
pub use manager::ArchiveManager;

/// Version information for the storage crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
