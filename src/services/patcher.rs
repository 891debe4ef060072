//! The patch orchestrator.
//!
//! [`Patcher`] drives a run over every version directory of the configured
//! installations: back up the vendor files an instruction would overwrite, copy the
//! mod files in, regenerate the entry point, and record the version in the ledger
//! once all of that worked.

use crate::metrics::Metrics;
use crate::models::{Instruction, ModConfig};
use crate::services::backup::{self, BackupOutcome};
use crate::services::entry_point;
use crate::services::ledger::PatchedVersions;
use crate::services::paths;
use crate::services::report::{PATCH_LOG_TARGET, PatchReport};
use crate::services::version_dirs;
use crate::state::{PatchProgressListener, ProgressNotifier};
use camino::{Utf8Path, Utf8PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Outcome of one patch run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchSummary {
    /// Version directories processed, including skipped ones
    pub total: usize,
    pub succeeded: usize,
}

impl PatchSummary {
    pub fn failed(&self) -> usize {
        self.total - self.succeeded
    }

    /// `true` when every version directory was patched (or already was).
    pub fn is_success(&self) -> bool {
        self.succeeded == self.total
    }
}

/// Installation root with the version directories found below it
struct Installation {
    root: Utf8PathBuf,
    versions: Vec<Utf8PathBuf>,
}

/// Applies a [`ModConfig`] to Vivaldi installations
///
/// Owns the config and the ledger exclusively. Runs are synchronous; put the patcher
/// behind a [`PatchWorker`](crate::worker::PatchWorker) to serialize runs with
/// config changes.
pub struct Patcher {
    config: ModConfig,
    ledger: PatchedVersions,
    notifier: ProgressNotifier,
    metrics: Arc<Metrics>,
    search_depth: usize,
}

impl Patcher {
    pub fn new(config: ModConfig, ledger: PatchedVersions) -> Self {
        Self {
            config,
            ledger,
            notifier: ProgressNotifier::new(),
            metrics: Arc::new(Metrics::new()),
            search_depth: 0,
        }
    }

    /// Search `depth` extra directory levels below each root for version directories.
    pub fn with_search_depth(mut self, depth: usize) -> Self {
        self.search_depth = depth;
        self
    }

    pub fn add_listener(&mut self, listener: Box<dyn PatchProgressListener>) {
        self.notifier.register(listener);
    }

    pub fn config(&self) -> &ModConfig {
        &self.config
    }

    /// Replace the config used by later runs.
    pub fn set_mod_config(&mut self, mut config: ModConfig) {
        config.instructions.sort();
        tracing::info!(
            "Mod config updated: {} instructions for {} installations",
            config.instructions.len(),
            config.installation_roots.len()
        );
        self.config = config;
    }

    pub fn ledger(&self) -> &PatchedVersions {
        &self.ledger
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }

    /// Patch every version directory of every configured installation root.
    ///
    /// Roots that do not exist are skipped with a warning. With `patch_all` unset,
    /// versions the ledger already has are left alone.
    pub fn apply_mods(&mut self, patch_all: bool) -> PatchSummary {
        self.notifier.patch_started();

        let roots = self.config.installation_roots.clone();
        let installations = roots
            .into_iter()
            .filter(|root| {
                let exists = root.is_dir();
                if !exists {
                    tracing::warn!(
                        target: PATCH_LOG_TARGET,
                        "Directory {} does not exist, skipping!",
                        root
                    );
                }
                exists
            })
            .map(|root| self.installation(root))
            .collect::<Vec<_>>();

        self.run(installations, patch_all)
    }

    /// Patch the version directories of a single installation root.
    ///
    /// `root` does not have to be one of the configured roots.
    pub fn apply_mods_to(&mut self, root: &Utf8Path, patch_all: bool) -> PatchSummary {
        self.notifier.patch_started();

        let root = version_dirs::resolve_application_dir(root);
        let installations = if root.is_dir() {
            vec![self.installation(root)]
        } else {
            tracing::warn!(
                target: PATCH_LOG_TARGET,
                "Directory {} does not exist, skipping!",
                root
            );
            Vec::new()
        };

        self.run(installations, patch_all)
    }

    fn installation(&self, root: Utf8PathBuf) -> Installation {
        let versions = version_dirs::find_version_dirs(&root, self.search_depth);
        tracing::debug!("Found {} version directories in {}", versions.len(), root);
        Installation { root, versions }
    }

    fn run(&mut self, installations: Vec<Installation>, patch_all: bool) -> PatchSummary {
        let started = Instant::now();
        let version_count = installations.iter().map(|i| i.versions.len()).sum();
        self.notifier
            .work_size(version_count, self.config.instructions.len());

        let mut summary = PatchSummary::default();

        for installation in &installations {
            self.notifier.next_installation(&installation.root);

            for version_dir in &installation.versions {
                self.notifier.next_version(version_dir);
                summary.total += 1;
                if self.patch_version(&installation.root, version_dir, patch_all) {
                    summary.succeeded += 1;
                }
            }
        }

        if let Err(e) = self.ledger.save() {
            tracing::warn!(target: PATCH_LOG_TARGET, "Could not save patched versions: {:#}", e);
        }

        if summary.is_success() {
            tracing::info!(target: PATCH_LOG_TARGET, "Patched all Vivaldi installations successfully!");
        } else {
            tracing::error!(
                target: PATCH_LOG_TARGET,
                "{}/{} versions were not patched successfully! Please review the log above!",
                summary.failed(),
                summary.total
            );
        }

        self.metrics.record_patch_time(started.elapsed());
        self.metrics.log_summary();
        self.notifier.patch_finished(summary.is_success());

        summary
    }

    /// Patch one version directory, returning whether every step succeeded.
    fn patch_version(&mut self, root: &Utf8Path, version_dir: &Utf8Path, patch_all: bool) -> bool {
        let version = version_dir.file_name().unwrap_or(version_dir.as_str());

        if !patch_all && self.ledger.is_patched(root, version) {
            tracing::info!(
                target: PATCH_LOG_TARGET,
                "Version {} already patched, skipping it.",
                version
            );
            self.metrics.record_version_skipped();
            return true;
        }

        tracing::info!(target: PATCH_LOG_TARGET, "Patching {}", version_dir);

        let mut report = PatchReport::new();
        let instructions = &self.config.instructions;

        let (eligible, backups_ok) = self.backup_phase(version_dir, instructions, &mut report);
        let copies_ok = self.copy_phase(version_dir, version, instructions, &eligible, &mut report);
        let entry_point_ok = entry_point::regenerate(version_dir, instructions, &mut report);

        report.flush();

        let success = backups_ok && copies_ok && entry_point_ok;
        if success {
            self.ledger.mark_patched(root, version);
            self.metrics.record_version_patched();
        } else {
            self.metrics.record_version_failed();
        }
        success
    }

    /// Back up every target an instruction would overwrite.
    ///
    /// Listeners hear about every instruction here, eligible for copying or not.
    ///
    /// # Returns
    /// Per instruction whether it may be copied, and whether all backups worked
    fn backup_phase(
        &self,
        version_dir: &Utf8Path,
        instructions: &[Instruction],
        report: &mut PatchReport,
    ) -> (Vec<bool>, bool) {
        let mut all_ok = true;

        let eligible = instructions
            .iter()
            .map(|instruction| {
                self.notifier.next_mod_file(&instruction.source_file);

                let target = version_dir.join(instruction.target_file());
                match backup::backup_file(&target) {
                    Ok(outcome) => {
                        if outcome == BackupOutcome::Created {
                            self.metrics.record_backup();
                        }
                        true
                    }
                    Err(e) => {
                        report.warning(
                            format!(
                                "Could not back up {}, so it will not be replaced",
                                instruction.target_file()
                            ),
                            Some(e),
                        );
                        self.metrics.record_file_failure();
                        all_ok = false;
                        false
                    }
                }
            })
            .collect();

        (eligible, all_ok)
    }

    fn copy_phase(
        &self,
        version_dir: &Utf8Path,
        version: &str,
        instructions: &[Instruction],
        eligible: &[bool],
        report: &mut PatchReport,
    ) -> bool {
        let mut all_ok = true;

        for (instruction, _) in instructions
            .iter()
            .zip(eligible)
            .filter(|(_, eligible)| **eligible)
        {
            let source = self.config.source_path(instruction);
            let target = version_dir.join(instruction.target_file());
            let shown = paths::join(version, &instruction.target_file());

            match backup::copy_mod_file(&source, &target) {
                Ok(bytes) => {
                    self.metrics.record_copy(bytes);
                    tracing::info!(target: PATCH_LOG_TARGET, "[+] {}", shown);
                }
                Err(e) => {
                    tracing::error!(target: PATCH_LOG_TARGET, "[!] {}", shown);
                    report.error(format!("Could not copy {}", instruction.source_file), Some(e));
                    self.metrics.record_file_failure();
                    all_ok = false;
                }
            }
        }

        all_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::Ordering;
    use tempfile::TempDir;

    fn utf8_root(temp_dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap()
    }

    fn make_version(root: &Utf8Path, version: &str) -> Utf8PathBuf {
        let dir = root.join(version);
        let entry_dir = dir.join("resources").join("vivaldi");
        fs::create_dir_all(&entry_dir).unwrap();
        fs::write(
            entry_dir.join("browser.html"),
            "<html><head></head><body></body></html>",
        )
        .unwrap();
        dir
    }

    #[test]
    fn test_summary() {
        let summary = PatchSummary {
            total: 3,
            succeeded: 2,
        };
        assert_eq!(summary.failed(), 1);
        assert!(!summary.is_success());
        assert!(PatchSummary::default().is_success());
    }

    #[test]
    fn test_patch_single_version() {
        let temp_dir = TempDir::new().unwrap();
        let base = utf8_root(&temp_dir);
        let mods = base.join("mods");
        let install = base.join("install");
        fs::create_dir_all(&mods).unwrap();
        fs::write(mods.join("custom.css"), "body {}").unwrap();
        let version_dir = make_version(&install, "6.5.1");

        let config = ModConfig::new(
            base.join("mod-config.yaml"),
            &mods,
            vec![install.clone()],
            vec![Instruction::new("custom.css", "resources/vivaldi/style", false)],
        );
        let mut patcher = Patcher::new(config, PatchedVersions::new(base.join("PATCHED")));

        let summary = patcher.apply_mods(false);

        assert_eq!(summary, PatchSummary { total: 1, succeeded: 1 });
        assert!(version_dir
            .join("resources/vivaldi/style/custom.css")
            .exists());
        assert!(patcher.ledger().is_patched(&install, "6.5.1"));
        assert_eq!(patcher.metrics().files_copied.load(Ordering::Relaxed), 1);

        let html = fs::read_to_string(version_dir.join("resources/vivaldi/browser.html")).unwrap();
        assert!(html.contains(r#"href="style/custom.css""#));
    }

    #[test]
    fn test_apply_mods_to_missing_root() {
        let temp_dir = TempDir::new().unwrap();
        let base = utf8_root(&temp_dir);
        let mut patcher = Patcher::new(
            ModConfig::empty(base.join("mod-config.yaml")),
            PatchedVersions::new(base.join("PATCHED")),
        );

        let summary = patcher.apply_mods_to(&base.join("nowhere"), false);
        assert_eq!(summary.total, 0);
        assert!(summary.is_success());
    }

    #[test]
    fn test_set_mod_config_sorts_instructions() {
        let temp_dir = TempDir::new().unwrap();
        let base = utf8_root(&temp_dir);
        let mut patcher = Patcher::new(
            ModConfig::empty(base.join("mod-config.yaml")),
            PatchedVersions::new(base.join("PATCHED")),
        );

        let mut config = ModConfig::empty(base.join("mod-config.yaml"));
        config.instructions = vec![
            Instruction::new("b.js", "z", false),
            Instruction::new("a.js", "a", false),
        ];
        patcher.set_mod_config(config);

        assert_eq!(patcher.config().instructions[0].target_directory, "a");
    }
}
