//! List the entries of one or more MIX archives
//!
//! ```bash
//! RUST_LOG=debug cargo run --example list_entries -- MAIN.MIX LOCAL.MIX [NAMES...]
//! ```
//!
//! Arguments ending in `.mix` are mounted in order; anything else is treated
//! as an asset name to register, so matching keys print with their names.

use anyhow::{Context, Result};
use mixkit_storage::{ArchiveManager, ManagerConfig};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let (archives, names): (Vec<String>, Vec<String>) = std::env::args()
        .skip(1)
        .partition(|arg| arg.to_ascii_lowercase().ends_with(".mix"));

    if archives.is_empty() {
        println!("usage: list_entries ARCHIVE.MIX... [NAME...]");
        return Ok(());
    }

    let manager = ArchiveManager::new(ManagerConfig::default());
    for archive in &archives {
        manager
            .mount(archive)
            .with_context(|| format!("mounting {archive}"))?;
    }
    for name in &names {
        manager.register_name(name);
    }

    for archive in manager.archives() {
        println!(
            "{} ({} entries, {} data bytes)",
            archive.path().display(),
            archive.len(),
            archive.header().data_size
        );
        for entry in archive.entries() {
            println!(
                "  {}  offset {:>10}  size {:>10}{}  {}",
                entry.key,
                entry.offset,
                entry.size(),
                if entry.is_compressed() { " lcw" } else { "    " },
                manager.name_for(entry.key).unwrap_or_default()
            );
        }
    }

    Ok(())
}
