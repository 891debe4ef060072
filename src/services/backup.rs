//! Backup and copy of individual mod files.
//!
//! A backup is a sibling `<name>.bak` of the vendor file. Once it exists it is never
//! touched again, so it keeps the original file across any number of mod updates.

use crate::services::report::PatchError;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// Suffix appended to a file name to form its backup.
pub const BACKUP_SUFFIX: &str = ".bak";

/// What [`backup_file`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupOutcome {
    /// The target did not exist, so there is nothing to protect.
    NotNeeded,
    /// A backup from an earlier run is already in place.
    AlreadyExists,
    Created,
}

/// Backup path for `file`: `custom.css` becomes `custom.css.bak`.
pub fn backup_path(file: &Utf8Path) -> Utf8PathBuf {
    let mut path = file.as_str().to_string();
    path.push_str(BACKUP_SUFFIX);
    Utf8PathBuf::from(path)
}

/// Make sure the pre-mod version of `target` is backed up.
pub fn backup_file(target: &Utf8Path) -> Result<BackupOutcome, PatchError> {
    if !target.exists() {
        return Ok(BackupOutcome::NotNeeded);
    }

    let backup = backup_path(target);
    if backup.exists() {
        return Ok(BackupOutcome::AlreadyExists);
    }

    fs::copy(target, &backup).map_err(|e| PatchError::io("back up", target, e))?;
    tracing::debug!("Backed up {} to {}", target, backup);

    Ok(BackupOutcome::Created)
}

/// Copy a mod file over `target`, creating the target directory as needed.
///
/// Existing targets are overwritten; [`backup_file`] is what keeps the original.
pub fn copy_mod_file(source: &Utf8Path, target: &Utf8Path) -> Result<u64, PatchError> {
    if !source.exists() {
        return Err(PatchError::MissingSource(source.to_path_buf()));
    }
    if !source.is_file() {
        return Err(PatchError::NotAFile(source.to_path_buf()));
    }

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| PatchError::io("create directory", parent, e))?;
    }

    let bytes = fs::copy(source, target).map_err(|e| PatchError::io("copy to", target, e))?;
    tracing::debug!("Copied {} to {} ({} bytes)", source, target, bytes);

    Ok(bytes)
}
