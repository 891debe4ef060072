//! Tests for finding Vivaldi version directories and installation roots

use camino::{Utf8Path, Utf8PathBuf};
use proptest::prelude::*;
use std::fs;
use tempfile::TempDir;
use vivaldi_modder::services::version_dirs::{
    find_installation_roots, find_version_dirs, is_version_dir, is_version_name,
    owning_installation_root, resolve_application_dir,
};

fn utf8_root(temp_dir: &TempDir) -> Utf8PathBuf {
    Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap()
}

fn make_version(dir: &Utf8Path) {
    fs::create_dir_all(dir.join("resources").join("vivaldi")).unwrap();
}

/// Layout used by most tests:
///
/// ```text
/// root/
///   6.5.1/resources/vivaldi/
///   Application/6.6.1/resources/vivaldi/
///   Application/nested/6.7.1/resources/vivaldi/
///   half/resources/
///   notes.txt
/// ```
fn build_tree(root: &Utf8Path) {
    make_version(&root.join("6.5.1"));
    make_version(&root.join("Application").join("6.6.1"));
    make_version(&root.join("Application").join("nested").join("6.7.1"));
    fs::create_dir_all(root.join("half").join("resources")).unwrap();
    fs::write(root.join("notes.txt"), "not a directory").unwrap();
}

#[test]
fn test_depth_zero_only_direct_children() {
    let temp_dir = TempDir::new().unwrap();
    let root = utf8_root(&temp_dir);
    build_tree(&root);

    let found = find_version_dirs(&root, 0);
    assert_eq!(found, vec![root.join("6.5.1")]);
}

#[test]
fn test_each_depth_adds_one_level() {
    let temp_dir = TempDir::new().unwrap();
    let root = utf8_root(&temp_dir);
    build_tree(&root);

    let depth1 = find_version_dirs(&root, 1);
    assert_eq!(
        depth1,
        vec![root.join("6.5.1"), root.join("Application").join("6.6.1")]
    );

    let depth2 = find_version_dirs(&root, 2);
    assert_eq!(depth2.len(), 3);
    assert!(depth1.iter().all(|dir| depth2.contains(dir)));
    assert_eq!(depth2[2], root.join("Application/nested/6.7.1"));
}

#[test]
fn test_incomplete_marker_is_not_a_version() {
    let temp_dir = TempDir::new().unwrap();
    let root = utf8_root(&temp_dir);
    build_tree(&root);

    assert!(!is_version_dir(&root.join("half")));
    assert!(!find_version_dirs(&root, 3).contains(&root.join("half")));
}

#[test]
fn test_version_dirs_are_not_descended_into() {
    let temp_dir = TempDir::new().unwrap();
    let root = utf8_root(&temp_dir);
    make_version(&root.join("6.5.1"));
    make_version(&root.join("6.5.1").join("6.5.2"));

    assert_eq!(find_version_dirs(&root, 5), vec![root.join("6.5.1")]);
}

#[test]
fn test_missing_root_finds_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let root = utf8_root(&temp_dir);

    assert!(find_version_dirs(&root.join("missing"), 2).is_empty());
}

#[test]
fn test_find_installation_roots() {
    let temp_dir = TempDir::new().unwrap();
    let root = utf8_root(&temp_dir);
    let vivaldi = root.join("Vivaldi");
    make_version(&vivaldi.join("Application").join("6.5.1"));
    make_version(&vivaldi.join("Application").join("6.6.1"));
    make_version(&root.join("Portable").join("6.5.1"));

    let roots = find_installation_roots(&root, 1);
    assert_eq!(roots.len(), 2);
    assert!(roots.contains(&vivaldi.join("Application")));
    assert!(roots.contains(&root.join("Portable")));
}

#[test]
fn test_owning_installation_root() {
    let temp_dir = TempDir::new().unwrap();
    let root = utf8_root(&temp_dir);
    let version = root.join("Application").join("6.5.1");
    make_version(&version);
    let entry_point = version.join("resources/vivaldi/browser.html");
    fs::write(&entry_point, "<html/>").unwrap();

    let application = root.join("Application");
    assert_eq!(owning_installation_root(&version), Some(application.clone()));
    assert_eq!(
        owning_installation_root(&version.join("resources")),
        Some(application.clone())
    );
    assert_eq!(owning_installation_root(&entry_point), Some(application));
    assert_eq!(owning_installation_root(&root), None);
}

#[test]
fn test_resolve_application_dir() {
    let temp_dir = TempDir::new().unwrap();
    let root = utf8_root(&temp_dir);

    assert_eq!(resolve_application_dir(&root), root);

    fs::create_dir_all(root.join("Application")).unwrap();
    assert_eq!(resolve_application_dir(&root), root.join("Application"));
}

#[test]
fn test_version_names() {
    assert!(is_version_name("6.5.3206.48"));
    assert!(is_version_name("1.0"));
    assert!(!is_version_name("6"));
    assert!(!is_version_name("6.5."));
    assert!(!is_version_name("v6.5"));
    assert!(!is_version_name("Application"));
}

proptest! {
    #[test]
    fn prop_dotted_numbers_are_version_names(parts in prop::collection::vec(0u32..100000, 2..6)) {
        let name = parts.iter().map(u32::to_string).collect::<Vec<_>>().join(".");
        prop_assert!(is_version_name(&name));
    }

    #[test]
    fn prop_letters_are_never_version_names(name in "[0-9.]*[a-zA-Z][0-9.a-zA-Z]*") {
        prop_assert!(!is_version_name(&name));
    }
}
