//! Installation directory watcher.
//!
//! Vivaldi installs every update into a new version directory next to the old ones.
//! [`DirectoryWatcher`] watches the installation roots and queues a patch of the root
//! whenever a directory with a version name appears in one of them.

use crate::services::version_dirs;
use crate::worker::{PatchQueue, PatchTask};
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

/// Watches installation roots for new version directories
///
/// Watching stops when this is dropped.
pub struct DirectoryWatcher {
    _watcher: RecommendedWatcher,
    watched: Vec<Utf8PathBuf>,
}

impl DirectoryWatcher {
    /// Watch `roots` (non-recursively), sending work to `queue`.
    ///
    /// Roots that cannot be watched are logged and left out.
    ///
    /// # Errors
    /// Fails only when the platform watcher cannot be created at all
    pub fn start(roots: &[Utf8PathBuf], queue: PatchQueue) -> Result<Self> {
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    for root in roots_to_patch(&event) {
                        tracing::info!("New Vivaldi version detected in {}", root);
                        let task = PatchTask::ApplyModsTo {
                            root,
                            patch_all: false,
                        };
                        if let Err(e) = queue.submit(task) {
                            tracing::warn!("Dropping directory event: {}", e);
                        }
                    }
                }
                Err(e) => tracing::warn!("Directory watch error: {:?}", e),
            },
            Config::default(),
        )
        .context("Failed to initialise the directory watcher")?;

        let mut watched = Vec::new();
        for root in roots {
            match watcher.watch(root.as_std_path(), RecursiveMode::NonRecursive) {
                Ok(()) => {
                    tracing::debug!("Watching {}", root);
                    watched.push(root.clone());
                }
                Err(e) => tracing::warn!("Cannot watch {}: {}", root, e),
            }
        }

        tracing::info!("Watching {} of {} installation directories", watched.len(), roots.len());

        Ok(Self {
            _watcher: watcher,
            watched,
        })
    }

    /// Roots that are actually being watched.
    pub fn watched(&self) -> &[Utf8PathBuf] {
        &self.watched
    }
}

/// Installation roots that need patching because of `event`.
///
/// Directories created in a root count, and so do directories moved into one.
fn roots_to_patch(event: &Event) -> Vec<Utf8PathBuf> {
    let relevant = matches!(
        event.kind,
        EventKind::Create(_)
            | EventKind::Modify(ModifyKind::Name(RenameMode::To | RenameMode::Both))
    );
    if !relevant {
        return Vec::new();
    }

    let mut roots: Vec<Utf8PathBuf> = Vec::new();
    for path in &event.paths {
        let Some(path) = Utf8Path::from_path(path) else {
            continue;
        };

        let is_version = path.file_name().is_some_and(version_dirs::is_version_name);
        if let (true, Some(root)) = (is_version, path.parent()) {
            if !roots.iter().any(|r| r == root) {
                roots.push(root.to_path_buf());
            }
        }
    }

    roots
}
