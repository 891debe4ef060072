//! The patched-version ledger (`PATCHED`).
//!
//! Remembers, per installation root, which version directories were patched
//! successfully so later runs can skip them. Stored as flat text with one line per
//! root:
//!
//! ```text
//! /opt/vivaldi/Application=6.5.3206.48;6.6.3271.45;
//! ```

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::{IndexMap, IndexSet};
use std::fs;
use std::io;

/// Persistent record of patched version directories.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatchedVersions {
    path: Utf8PathBuf,
    entries: IndexMap<String, IndexSet<String>>,
}

impl PatchedVersions {
    /// An empty ledger that will be saved to `path`.
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: IndexMap::new(),
        }
    }

    /// Load the ledger from `path`.
    ///
    /// A missing file means nothing has been patched yet. Any other read problem is
    /// logged and also yields an empty ledger; patching then simply redoes work.
    pub fn load(path: impl Into<Utf8PathBuf>) -> Self {
        let mut ledger = Self::new(path);

        match fs::read_to_string(&ledger.path) {
            Ok(content) => {
                ledger.entries = parse(&content);
                tracing::debug!(
                    "Loaded patched versions for {} installations from {}",
                    ledger.entries.len(),
                    ledger.path
                );
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("No patched versions file at {}, starting fresh", ledger.path);
            }
            Err(e) => {
                tracing::warn!("Could not read patched versions file {}: {}", ledger.path, e);
            }
        }

        ledger
    }

    /// Write the ledger back to the file it was loaded from.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {}", parent))?;
            }
        }

        fs::write(&self.path, self.to_file_string())
            .with_context(|| format!("Failed to write patched versions file: {}", self.path))?;

        tracing::debug!("Saved patched versions to {}", self.path);
        Ok(())
    }

    pub fn is_patched(&self, root: &Utf8Path, version: &str) -> bool {
        self.entries
            .get(&root_key(root))
            .is_some_and(|versions| versions.contains(version))
    }

    /// Record `version` as patched under `root`.
    ///
    /// # Returns
    /// `false` if it was already recorded
    pub fn mark_patched(&mut self, root: &Utf8Path, version: &str) -> bool {
        self.entries
            .entry(root_key(root))
            .or_default()
            .insert(version.to_string())
    }

    /// Versions recorded for `root`, in the order they were patched.
    pub fn versions(&self, root: &Utf8Path) -> Option<&IndexSet<String>> {
        self.entries.get(&root_key(root))
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialized form: `root=version1;version2;` per line.
    pub fn to_file_string(&self) -> String {
        let mut output = String::new();

        for (root, versions) in &self.entries {
            output.push_str(root);
            output.push('=');
            for version in versions {
                output.push_str(version);
                output.push(';');
            }
            output.push('\n');
        }

        output
    }
}

/// Identity of an installation root in the ledger.
///
/// The canonical path where it can be resolved, otherwise the absolute path, otherwise
/// the path as given.
pub fn root_key(root: &Utf8Path) -> String {
    if let Ok(canonical) = root.canonicalize_utf8() {
        return canonical.into_string();
    }

    std::path::absolute(root)
        .ok()
        .and_then(|p| Utf8PathBuf::from_path_buf(p).ok())
        .map(Utf8PathBuf::into_string)
        .unwrap_or_else(|| root.to_string())
}

fn parse(content: &str) -> IndexMap<String, IndexSet<String>> {
    let mut entries: IndexMap<String, IndexSet<String>> = IndexMap::new();

    for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
        // Version names never contain '=', paths might
        let Some((root, versions)) = line.rsplit_once('=') else {
            tracing::debug!("Ignoring malformed patched versions line: {}", line);
            continue;
        };

        let set = entries.entry(root.trim().to_string()).or_default();
        set.extend(
            versions
                .split(';')
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string),
        );
    }

    entries
}
