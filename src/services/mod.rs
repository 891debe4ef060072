//! Services module - the patch engine.
//!
//! Everything here works on plain paths and values, with no knowledge of how a run is
//! triggered. The [`worker`](crate::worker) and [`watch`](crate::watch) modules put it
//! behind a queue.
//!
//! # Components
//!
//! - [`version_dirs`]: finds Vivaldi version directories below an installation root
//! - [`ledger`]: the [`PatchedVersions`] file of already patched versions
//! - [`backup`]: `.bak` creation and mod file copying
//! - [`entry_point`]: adds `<link>`/`<script>` references to `browser.html`
//! - [`report`]: [`PatchError`] and the per-version [`PatchReport`]
//! - [`patcher`]: the [`Patcher`] orchestrating all of the above
//! - [`paths`]: `/`-separated relative path helpers
//!
//! # Usage Example
//!
//! ```no_run
//! use vivaldi_modder::models::ModConfig;
//! use vivaldi_modder::services::{PatchedVersions, Patcher};
//!
//! let config = ModConfig::empty("mod-config.yaml");
//! let mut patcher = Patcher::new(config, PatchedVersions::load("PATCHED"));
//!
//! let summary = patcher.apply_mods(false);
//! println!("{}/{} versions patched", summary.succeeded, summary.total);
//! ```

pub mod backup;
pub mod entry_point;
pub mod ledger;
pub mod patcher;
pub mod paths;
pub mod report;
pub mod version_dirs;

pub use backup::{BackupOutcome, backup_file, copy_mod_file};
pub use entry_point::{EntryPointAssets, augment_markup};
pub use ledger::PatchedVersions;
pub use patcher::{PatchSummary, Patcher};
pub use report::{ErrorRecord, PATCH_LOG_TARGET, PatchError, PatchReport, Severity};
pub use version_dirs::{find_installation_roots, find_version_dirs, is_version_dir};
