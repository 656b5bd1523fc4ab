//! Archive path resolution
//!
//! Archive names in configuration and game data use DOS conventions
//! (`C:\WESTWOOD\MAIN.MIX`), while the files on disk may live anywhere
//! and in any letter case. Resolution normalizes the name, then tries it
//! as given, under each search path, and finally component by component
//! ignoring ASCII case.

use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::trace;

/// Convert backslashes to `/` and drop a leading drive prefix
///
/// ```
/// use mixkit_storage::path::normalize;
///
/// assert_eq!(normalize("C:\\WESTWOOD\\MAIN.MIX"), "WESTWOOD/MAIN.MIX");
/// assert_eq!(normalize("/opt/game/main.mix"), "/opt/game/main.mix");
/// ```
pub fn normalize(path: &str) -> String {
    let slashed = path.replace('\\', "/");
    match slashed.as_bytes() {
        [drive, b':', ..] if drive.is_ascii_alphabetic() => {
            slashed[2..].trim_start_matches('/').to_string()
        }
        _ => slashed,
    }
}

/// Find `name` inside `dir`, ignoring ASCII case
pub fn find_case_insensitive(dir: &Path, name: &str) -> Option<PathBuf> {
    let exact = dir.join(name);
    if exact.exists() {
        return Some(exact);
    }

    fs::read_dir(dir)
        .ok()?
        .flatten()
        .find(|entry| entry.file_name().to_string_lossy().eq_ignore_ascii_case(name))
        .map(|entry| entry.path())
}

/// Walk `relative` from `base`, matching each component case-insensitively
fn walk_case_insensitive(base: &Path, relative: &Path) -> Option<PathBuf> {
    let mut current = base.to_path_buf();
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                current = find_case_insensitive(&current, &part.to_string_lossy())?;
            }
            Component::CurDir => {}
            Component::ParentDir => current.push(".."),
            Component::RootDir | Component::Prefix(_) => current.push(component),
        }
    }
    Some(current)
}

/// Locate an archive file on disk
///
/// Tries, in order: the normalized path as given; the path under each of
/// `search_paths` (relative paths only); and, when `case_insensitive` is
/// set, the same candidates matched component by component ignoring case.
pub fn resolve(
    path: impl AsRef<Path>,
    search_paths: &[PathBuf],
    case_insensitive: bool,
) -> Option<PathBuf> {
    let normalized = PathBuf::from(normalize(&path.as_ref().to_string_lossy()));

    if normalized.is_file() {
        return Some(normalized);
    }

    let bases: Vec<&Path> = if normalized.is_absolute() {
        Vec::new()
    } else {
        search_paths.iter().map(PathBuf::as_path).collect()
    };

    for base in &bases {
        let candidate = base.join(&normalized);
        if candidate.is_file() {
            trace!("Resolved {:?} under search path {:?}", normalized, base);
            return Some(candidate);
        }
    }

    if !case_insensitive {
        return None;
    }

    let (root, relative) = if normalized.is_absolute() {
        let relative = normalized.components().skip_while(|c| {
            matches!(c, Component::RootDir | Component::Prefix(_))
        });
        let root: PathBuf = normalized
            .components()
            .take_while(|c| matches!(c, Component::RootDir | Component::Prefix(_)))
            .collect();
        (vec![root], relative.collect::<PathBuf>())
    } else {
        let mut roots = vec![PathBuf::from(".")];
        roots.extend(bases.iter().map(|b| b.to_path_buf()));
        (roots, normalized.clone())
    };

    root.iter()
        .filter_map(|base| walk_case_insensitive(base, &relative))
        .find(|candidate| candidate.is_file())
        .inspect(|found| trace!("Resolved {:?} case-insensitively to {:?}", normalized, found))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("MAIN.MIX"), "MAIN.MIX");
        assert_eq!(normalize("data\\art\\units.mix"), "data/art/units.mix");
        assert_eq!(normalize("d:local.mix"), "local.mix");
    }

    #[test]
    fn test_resolve_search_paths_and_case() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("Data");
        fs::create_dir(&sub).unwrap();
        fs::write(sub.join("Conquer.Mix"), b"x").unwrap();

        let search = vec![dir.path().to_path_buf()];

        assert_eq!(resolve("Data/Conquer.Mix", &search, false), Some(sub.join("Conquer.Mix")));
        assert_eq!(resolve("DATA\\CONQUER.MIX", &search, false), None);
        assert_eq!(
            resolve("DATA\\CONQUER.MIX", &search, true),
            Some(sub.join("Conquer.Mix"))
        );
    }

    #[test]
    fn test_resolve_absolute_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("main.mix"), b"x").unwrap();

        let upper = dir.path().join("MAIN.MIX");
        let found = resolve(&upper, &[], true).unwrap();
        assert!(found.is_file());
        assert!(resolve(dir.path().join("missing.mix"), &[], true).is_none());
    }
}
