// Patch worker module
//
// Runs the patch engine on one dedicated blocking thread fed by a queue. Every request
// (apply, change config, save config, watch) goes through the same queue, so patch runs
// never overlap and config changes never race a running patch. The worker also owns the
// directory watcher, so a config change re-targets it before the next task runs.

use crate::config::ConfigManager;
use crate::logging;
use crate::models::ModConfig;
use crate::services::Patcher;
use crate::watch::DirectoryWatcher;
use anyhow::{Context, Result, anyhow};
use camino::Utf8PathBuf;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Work item for the patch worker
#[derive(Debug, Clone, PartialEq)]
pub enum PatchTask {
    /// Patch all configured installation roots.
    ApplyMods { patch_all: bool, clear_log: bool },

    /// Patch a single installation root.
    ApplyModsTo { root: Utf8PathBuf, patch_all: bool },

    /// Replace the mod config used by later runs.
    SetModConfig(ModConfig),

    /// Write the current mod config to disk.
    SaveModConfig,

    /// Start or stop watching the configured installation roots for new versions.
    WatchDirectories(bool),
}

enum Message {
    Task(PatchTask),
    Shutdown,
}

/// Producer side of the worker queue
///
/// Cheap to clone; hand one to every task that needs to request work.
#[derive(Clone)]
pub struct PatchQueue {
    tx: mpsc::UnboundedSender<Message>,
}

impl PatchQueue {
    /// Enqueue a task.
    ///
    /// # Errors
    /// Fails once the worker has shut down
    pub fn submit(&self, task: PatchTask) -> Result<()> {
        self.tx
            .send(Message::Task(task))
            .map_err(|_| anyhow!("Patch worker is no longer running"))
    }

    pub fn apply_mods(&self, patch_all: bool, clear_log: bool) -> Result<()> {
        self.submit(PatchTask::ApplyMods {
            patch_all,
            clear_log,
        })
    }

    pub fn apply_mods_to(&self, root: impl Into<Utf8PathBuf>, patch_all: bool) -> Result<()> {
        self.submit(PatchTask::ApplyModsTo {
            root: root.into(),
            patch_all,
        })
    }

    pub fn set_mod_config(&self, config: ModConfig) -> Result<()> {
        self.submit(PatchTask::SetModConfig(config))
    }

    pub fn save_mod_config(&self) -> Result<()> {
        self.submit(PatchTask::SaveModConfig)
    }

    pub fn watch_directories(&self, enabled: bool) -> Result<()> {
        self.submit(PatchTask::WatchDirectories(enabled))
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Handle to the running patch worker
///
/// Tasks are executed strictly in submission order, one at a time. A running task
/// cannot be cancelled.
pub struct PatchWorker {
    queue: PatchQueue,
    handle: JoinHandle<Patcher>,
}

impl PatchWorker {
    /// Start the worker on the blocking thread pool of the current tokio runtime.
    ///
    /// # Panics
    /// When called outside a tokio runtime
    pub fn spawn(patcher: Patcher, config_manager: ConfigManager) -> Self {
        Self::spawn_with_patch_log(patcher, config_manager, None)
    }

    /// Like [`spawn`](Self::spawn), clearing `patch_log` for apply tasks that ask for it.
    pub fn spawn_with_patch_log(
        patcher: Patcher,
        config_manager: ConfigManager,
        patch_log: Option<Utf8PathBuf>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let queue = PatchQueue { tx };

        let state = WorkerState {
            patcher,
            config_manager,
            patch_log,
            queue: queue.clone(),
            watcher: None,
        };
        let handle = tokio::task::spawn_blocking(move || run_worker(state, rx));

        Self { queue, handle }
    }

    /// A producer for the worker queue.
    pub fn sender(&self) -> PatchQueue {
        self.queue.clone()
    }

    pub fn apply_mods(&self, patch_all: bool, clear_log: bool) -> Result<()> {
        self.queue.apply_mods(patch_all, clear_log)
    }

    pub fn apply_mods_to(&self, root: impl Into<Utf8PathBuf>, patch_all: bool) -> Result<()> {
        self.queue.apply_mods_to(root, patch_all)
    }

    pub fn set_mod_config(&self, config: ModConfig) -> Result<()> {
        self.queue.set_mod_config(config)
    }

    pub fn save_mod_config(&self) -> Result<()> {
        self.queue.save_mod_config()
    }

    /// Watch the installation roots of the current config, following later config
    /// changes, until disabled or shut down.
    pub fn watch_directories(&self, enabled: bool) -> Result<()> {
        self.queue.watch_directories(enabled)
    }

    /// Stop accepting work, finish everything queued so far and wait for the worker.
    ///
    /// # Returns
    /// The patcher, with the config and ledger as the last task left them
    pub async fn shutdown(self) -> Result<Patcher> {
        // Already stopped if this fails; joining still reports why
        let _ = self.queue.tx.send(Message::Shutdown);

        self.handle.await.context("Patch worker terminated abnormally")
    }
}

/// Everything the worker thread owns
struct WorkerState {
    patcher: Patcher,
    config_manager: ConfigManager,
    patch_log: Option<Utf8PathBuf>,
    queue: PatchQueue,
    watcher: Option<DirectoryWatcher>,
}

impl WorkerState {
    fn execute(&mut self, task: PatchTask) {
        match task {
            PatchTask::ApplyMods {
                patch_all,
                clear_log,
            } => {
                if clear_log {
                    if let Some(path) = &self.patch_log {
                        if let Err(e) = logging::clear_patch_log(path) {
                            tracing::warn!("{:#}", e);
                        }
                    }
                }
                self.patcher.apply_mods(patch_all);
            }
            PatchTask::ApplyModsTo { root, patch_all } => {
                self.patcher.apply_mods_to(&root, patch_all);
            }
            PatchTask::SetModConfig(config) => {
                self.patcher.set_mod_config(config);
                if self.watcher.is_some() {
                    self.start_watching();
                }
            }
            PatchTask::SaveModConfig => {
                if let Err(e) = self.config_manager.save_mod_config(self.patcher.config()) {
                    tracing::error!("Could not save the mod config: {:#}", e);
                }
            }
            PatchTask::WatchDirectories(true) => self.start_watching(),
            PatchTask::WatchDirectories(false) => {
                if self.watcher.take().is_some() {
                    tracing::info!("Stopped watching installation directories");
                }
            }
        }
    }

    /// (Re)build the watcher for the current installation roots.
    fn start_watching(&mut self) {
        // Old watches go first, the roots may have been removed from the config
        self.watcher = None;

        let roots = &self.patcher.config().installation_roots;
        match DirectoryWatcher::start(roots, self.queue.clone()) {
            Ok(watcher) => self.watcher = Some(watcher),
            Err(e) => tracing::warn!("Directory watching disabled: {:#}", e),
        }
    }
}

fn run_worker(mut state: WorkerState, mut rx: mpsc::UnboundedReceiver<Message>) -> Patcher {
    tracing::info!("Patch worker started");

    while let Some(message) = rx.blocking_recv() {
        let task = match message {
            Message::Task(task) => task,
            Message::Shutdown => break,
        };

        tracing::debug!("Patch worker running {:?}", task);
        state.execute(task);
    }

    // Nothing may queue work once the loop is gone
    state.watcher = None;
    rx.close();
    tracing::info!("Patch worker stopped");
    state.patcher
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::PatchedVersions;
    use tempfile::TempDir;

    fn create_worker(temp_dir: &TempDir) -> (PatchWorker, ConfigManager) {
        let root = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let config_manager = ConfigManager::new(&root).unwrap();
        let patcher = Patcher::new(
            ModConfig::empty(config_manager.mod_config_path()),
            PatchedVersions::new(config_manager.ledger_path()),
        );
        let worker = PatchWorker::spawn(patcher, config_manager.clone());
        (worker, config_manager)
    }

    #[tokio::test]
    async fn test_tasks_run_in_submission_order() {
        let temp_dir = TempDir::new().unwrap();
        let (worker, config_manager) = create_worker(&temp_dir);

        let mut config = ModConfig::empty(config_manager.mod_config_path());
        config.mod_root = Utf8PathBuf::from("first");
        worker.set_mod_config(config.clone()).unwrap();
        worker.save_mod_config().unwrap();
        config.mod_root = Utf8PathBuf::from("second");
        worker.set_mod_config(config).unwrap();

        let patcher = worker.shutdown().await.unwrap();

        // The save happened between the two config changes
        assert_eq!(patcher.config().mod_root, Utf8PathBuf::from("second"));
        let saved = config_manager.load_mod_config().unwrap();
        assert_eq!(saved.mod_root, Utf8PathBuf::from("first"));
    }

    #[tokio::test]
    async fn test_queue_rejects_work_after_shutdown() {
        let temp_dir = TempDir::new().unwrap();
        let (worker, _config_manager) = create_worker(&temp_dir);
        let queue = worker.sender();

        worker.shutdown().await.unwrap();

        assert!(queue.is_closed());
        tokio_test::assert_err!(queue.apply_mods(false, false));
    }

    #[tokio::test]
    async fn test_watching_can_be_toggled() {
        let temp_dir = TempDir::new().unwrap();
        let (worker, config_manager) = create_worker(&temp_dir);

        let mut config = ModConfig::empty(config_manager.mod_config_path());
        config.installation_roots = vec![config_manager.config_dir().to_path_buf()];

        tokio_test::assert_ok!(worker.watch_directories(true));
        tokio_test::assert_ok!(worker.set_mod_config(config));
        tokio_test::assert_ok!(worker.watch_directories(false));

        let patcher = worker.shutdown().await.unwrap();
        assert_eq!(patcher.config().installation_roots.len(), 1);
    }

    #[tokio::test]
    async fn test_apply_with_clear_log() {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let config_manager = ConfigManager::new(&root).unwrap();
        let patch_log = root.join(logging::PATCH_LOG_FILE);
        std::fs::write(&patch_log, "old run\n").unwrap();

        let patcher = Patcher::new(
            ModConfig::empty(config_manager.mod_config_path()),
            config_manager.load_ledger(),
        );
        let worker =
            PatchWorker::spawn_with_patch_log(patcher, config_manager, Some(patch_log.clone()));

        tokio_test::assert_ok!(worker.apply_mods(false, true));
        worker.shutdown().await.unwrap();

        assert_eq!(std::fs::read_to_string(&patch_log).unwrap(), "");
    }
}
