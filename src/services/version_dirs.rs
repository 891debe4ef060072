//! Discovery of Vivaldi version directories and the installation roots that own them.
//!
//! A version directory is any directory containing `resources/vivaldi` as a
//! directory. Installations usually keep one version directory per installed release
//! next to the launcher (`Application/6.5.3206.48/`, `Application/6.6.3271.45/`, ...).
//!
//! Nothing in this module fails: directories that do not exist, cannot be read or are
//! actually files simply have no children and produce no results.

use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use std::sync::OnceLock;

/// First marker directory inside a version directory.
pub const RESOURCES_DIR: &str = "resources";

/// Second marker directory, inside [`RESOURCES_DIR`]. Also holds the entry point.
pub const VIVALDI_DIR: &str = "vivaldi";

/// Sub-directory that some installers put between the configured root and the
/// version directories.
pub const APPLICATION_DIR: &str = "Application";

/// How many levels above a path [`owning_installation_root`] will look.
const MAX_OWNER_LEVELS: usize = 3;

/// Check whether `dir` has the `resources/vivaldi` marker structure.
pub fn is_version_dir(dir: &Utf8Path) -> bool {
    dir.join(RESOURCES_DIR).join(VIVALDI_DIR).is_dir()
}

/// Check whether a directory name looks like a release number (`6.5.3206.48`).
pub fn is_version_name(name: &str) -> bool {
    static VERSION_PATTERN: OnceLock<Regex> = OnceLock::new();
    VERSION_PATTERN
        .get_or_init(|| Regex::new(r"^(\d+\.)+\d+$").expect("Invalid version regex"))
        .is_match(name)
}

/// Find version directories below `root`.
///
/// Direct children of `root` are checked first. Qualifying directories are returned
/// and not descended into; other directories are searched again on the next level,
/// down to `max_depth` additional levels. With `max_depth == 0` only direct children
/// can qualify.
///
/// Results are ordered by depth, then by name within a directory.
pub fn find_version_dirs(root: &Utf8Path, max_depth: usize) -> Vec<Utf8PathBuf> {
    let mut found = Vec::new();
    let mut level = vec![root.to_path_buf()];

    for depth in 0..=max_depth {
        let mut next_level = Vec::new();

        for dir in &level {
            for child in child_dirs(dir) {
                if is_version_dir(&child) {
                    found.push(child);
                } else if depth < max_depth {
                    next_level.push(child);
                }
            }
        }

        if next_level.is_empty() {
            break;
        }
        level = next_level;
    }

    tracing::debug!(
        "Found {} version directories below {} (depth {})",
        found.len(),
        root,
        max_depth
    );
    found
}

/// Find installation roots below `dir`: directories that directly contain at least
/// one version directory.
///
/// Searches one level deeper than [`find_version_dirs`] would, since the roots sit
/// one level above the version directories. Duplicates are removed, keeping the first
/// occurrence.
pub fn find_installation_roots(dir: &Utf8Path, max_depth: usize) -> Vec<Utf8PathBuf> {
    let mut roots: Vec<Utf8PathBuf> = Vec::new();

    for version_dir in find_version_dirs(dir, max_depth + 1) {
        if let Some(parent) = version_dir.parent() {
            if !roots.iter().any(|r| r == parent) {
                roots.push(parent.to_path_buf());
            }
        }
    }

    roots
}

/// Find the installation root owning `path`.
///
/// `path` may be a version directory, a directory up to two levels inside one, or a
/// file in such a directory. Returns `None` when no version directory is found within
/// three levels.
pub fn owning_installation_root(path: &Utf8Path) -> Option<Utf8PathBuf> {
    let mut current = if path.is_file() { path.parent()? } else { path };

    for _ in 0..MAX_OWNER_LEVELS {
        let parent = current.parent()?;

        if is_version_dir(current) {
            return Some(parent.to_path_buf());
        }

        current = parent;
    }

    None
}

/// Replace `root` with its `Application` sub-directory when it has one.
///
/// Users often point at the install folder rather than the folder that actually holds
/// the version directories.
pub fn resolve_application_dir(root: &Utf8Path) -> Utf8PathBuf {
    let application = root.join(APPLICATION_DIR);

    if root.exists() && application.is_dir() {
        tracing::debug!("Using application folder {} for {}", application, root);
        application
    } else {
        root.to_path_buf()
    }
}

/// Sub-directories of `dir`, sorted by name. Unreadable entries are skipped.
fn child_dirs(dir: &Utf8Path) -> Vec<Utf8PathBuf> {
    let entries = match dir.read_dir_utf8() {
        Ok(entries) => entries,
        Err(_) => return Vec::new(),
    };

    let mut dirs: Vec<Utf8PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path().to_path_buf())
        .filter(|path| path.is_dir())
        .collect();

    dirs.sort();
    dirs
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn utf8_root(temp_dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap()
    }

    fn make_version_dir(path: &Utf8Path) {
        fs::create_dir_all(path.join(RESOURCES_DIR).join(VIVALDI_DIR)).unwrap();
    }

    #[test]
    fn test_is_version_dir_valid() {
        let temp_dir = TempDir::new().unwrap();
        let root = utf8_root(&temp_dir);
        make_version_dir(&root.join("6.5.3206.48"));

        assert!(is_version_dir(&root.join("6.5.3206.48")));
        assert!(!is_version_dir(&root));
    }

    #[test]
    fn test_is_version_dir_files_instead_of_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let root = utf8_root(&temp_dir);

        // resources is a file
        let resources_file = root.join("WithResourceFile");
        fs::create_dir_all(&resources_file).unwrap();
        fs::write(resources_file.join(RESOURCES_DIR), "").unwrap();

        // vivaldi is a file
        let vivaldi_file = root.join("WithVivaldiFile");
        fs::create_dir_all(vivaldi_file.join(RESOURCES_DIR)).unwrap();
        fs::write(vivaldi_file.join(RESOURCES_DIR).join(VIVALDI_DIR), "").unwrap();

        // the directory itself is a file
        let dir_is_file = root.join("DirIsFile");
        fs::write(&dir_is_file, "").unwrap();

        assert!(!is_version_dir(&resources_file));
        assert!(!is_version_dir(&vivaldi_file));
        assert!(!is_version_dir(&dir_is_file));
    }

    #[test]
    fn test_is_version_name() {
        assert!(is_version_name("6.5.3206.48"));
        assert!(is_version_name("2.10"));
        assert!(!is_version_name("6"));
        assert!(!is_version_name("6.5.x"));
        assert!(!is_version_name("Application"));
    }

    #[test]
    fn test_find_version_dirs_depth_zero() {
        let temp_dir = TempDir::new().unwrap();
        let root = utf8_root(&temp_dir);
        make_version_dir(&root.join("Version2"));
        make_version_dir(&root.join("Version1"));
        make_version_dir(&root.join("Nested").join("Version3"));
        fs::create_dir_all(root.join("Empty")).unwrap();

        let found = find_version_dirs(&root, 0);
        let names: Vec<&str> = found.iter().map(|p| p.file_name().unwrap()).collect();
        assert_eq!(names, vec!["Version1", "Version2"]);
    }

    #[test]
    fn test_find_version_dirs_depth_one_not_two() {
        let temp_dir = TempDir::new().unwrap();
        let root = utf8_root(&temp_dir);
        make_version_dir(&root.join("Version1"));
        make_version_dir(&root.join("A").join("Version2"));
        make_version_dir(&root.join("A").join("B").join("Version3"));

        let found = find_version_dirs(&root, 1);
        let names: Vec<&str> = found.iter().map(|p| p.file_name().unwrap()).collect();
        assert_eq!(names, vec!["Version1", "Version2"]);

        let deeper = find_version_dirs(&root, 2);
        assert_eq!(deeper.len(), 3);
    }

    #[test]
    fn test_find_version_dirs_does_not_descend_into_version_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let root = utf8_root(&temp_dir);
        make_version_dir(&root.join("Version1"));
        make_version_dir(&root.join("Version1").join("Inner"));

        let found = find_version_dirs(&root, 3);
        assert_eq!(found, vec![root.join("Version1")]);
    }

    #[test]
    fn test_find_version_dirs_root_is_file() {
        let temp_dir = TempDir::new().unwrap();
        let root = utf8_root(&temp_dir);
        let file = root.join("not-a-dir");
        fs::write(&file, "").unwrap();

        assert!(find_version_dirs(&file, 1).is_empty());
        assert!(find_version_dirs(&root.join("missing"), 1).is_empty());
    }

    #[test]
    fn test_find_installation_roots_deduplicates() {
        let temp_dir = TempDir::new().unwrap();
        let root = utf8_root(&temp_dir);
        make_version_dir(&root.join("Vivaldi").join("Application").join("6.5.1"));
        make_version_dir(&root.join("Vivaldi").join("Application").join("6.6.1"));
        make_version_dir(&root.join("Snapshot").join("6.7.1"));

        let roots = find_installation_roots(&root, 1);
        assert_eq!(
            roots,
            vec![root.join("Snapshot"), root.join("Vivaldi").join("Application")]
        );
    }

    #[test]
    fn test_owning_installation_root() {
        let temp_dir = TempDir::new().unwrap();
        let root = utf8_root(&temp_dir);
        let version = root.join("6.5.1");
        make_version_dir(&version);
        let entry = version.join(RESOURCES_DIR).join(VIVALDI_DIR).join("browser.html");
        fs::write(&entry, "<html></html>").unwrap();

        assert_eq!(owning_installation_root(&version), Some(root.clone()));
        assert_eq!(
            owning_installation_root(&version.join(RESOURCES_DIR)),
            Some(root.clone())
        );
        assert_eq!(owning_installation_root(&entry), Some(root.clone()));
        assert_eq!(owning_installation_root(&root), None);
    }

    #[test]
    fn test_resolve_application_dir() {
        let temp_dir = TempDir::new().unwrap();
        let root = utf8_root(&temp_dir);
        let plain = root.join("Plain");
        fs::create_dir_all(&plain).unwrap();
        let installed = root.join("Installed");
        fs::create_dir_all(installed.join(APPLICATION_DIR)).unwrap();

        assert_eq!(resolve_application_dir(&plain), plain);
        assert_eq!(
            resolve_application_dir(&installed),
            installed.join(APPLICATION_DIR)
        );
    }
}
