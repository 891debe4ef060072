// Progress notification module
//
// This module provides the listener abstraction the patch engine reports progress
// through, plus a broadcast adapter so UI layers can consume the same notifications
// from other threads without ever slowing the engine down.

use camino::{Utf8Path, Utf8PathBuf};
use tokio::sync::broadcast;

/// Progress callbacks emitted by the patch engine
///
/// All methods have empty default implementations so listeners only implement what
/// they care about. Calls are made synchronously on the worker thread in this order:
///
/// 1. [`on_patch_started`](Self::on_patch_started)
/// 2. [`on_work_size`](Self::on_work_size)
/// 3. for each installation root: [`on_next_installation`](Self::on_next_installation),
///    then for each version directory [`on_next_version`](Self::on_next_version) and
///    [`on_next_mod_file`](Self::on_next_mod_file) per instruction
/// 4. [`on_patch_finished`](Self::on_patch_finished)
///
/// Implementations must return quickly; hand work off to another thread instead of
/// blocking here.
pub trait PatchProgressListener: Send {
    fn on_patch_started(&self) {}

    /// `version_dirs * mod_files` is a rough estimate of the amount of work.
    fn on_work_size(&self, _version_dirs: usize, _mod_files: usize) {}

    fn on_next_installation(&self, _root: &Utf8Path) {}

    fn on_next_version(&self, _version_dir: &Utf8Path) {}

    fn on_next_mod_file(&self, _source_file: &str) {}

    fn on_patch_finished(&self, _success: bool) {}
}

/// Ordered registry of progress listeners
///
/// Every notification is forwarded to all listeners in registration order.
#[derive(Default)]
pub struct ProgressNotifier {
    listeners: Vec<Box<dyn PatchProgressListener>>,
}

impl ProgressNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, listener: Box<dyn PatchProgressListener>) {
        self.listeners.push(listener);
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn patch_started(&self) {
        self.listeners.iter().for_each(|l| l.on_patch_started());
    }

    pub fn work_size(&self, version_dirs: usize, mod_files: usize) {
        self.listeners
            .iter()
            .for_each(|l| l.on_work_size(version_dirs, mod_files));
    }

    pub fn next_installation(&self, root: &Utf8Path) {
        self.listeners.iter().for_each(|l| l.on_next_installation(root));
    }

    pub fn next_version(&self, version_dir: &Utf8Path) {
        self.listeners.iter().for_each(|l| l.on_next_version(version_dir));
    }

    pub fn next_mod_file(&self, source_file: &str) {
        self.listeners.iter().for_each(|l| l.on_next_mod_file(source_file));
    }

    pub fn patch_finished(&self, success: bool) {
        self.listeners.iter().for_each(|l| l.on_patch_finished(success));
    }
}

/// Progress notification as a value, for consumers on other threads
#[derive(Clone, Debug, PartialEq)]
pub enum PatchEvent {
    Started,

    WorkSize {
        version_dirs: usize,
        mod_files: usize,
    },

    NextInstallation {
        root: Utf8PathBuf,
    },

    NextVersion {
        version_dir: Utf8PathBuf,
    },

    NextModFile {
        source_file: String,
    },

    Finished {
        success: bool,
    },
}

/// Listener that republishes every callback as a [`PatchEvent`] on a broadcast
/// channel
///
/// Sending never blocks. Slow subscribers lag and miss old events instead of holding
/// up the engine; events sent without any subscriber are dropped.
#[derive(Clone)]
pub struct ChannelListener {
    tx: broadcast::Sender<PatchEvent>,
}

impl ChannelListener {
    /// Create a listener with a buffer of `capacity` events.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Receive all events sent after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<PatchEvent> {
        self.tx.subscribe()
    }

    fn send(&self, event: PatchEvent) {
        // Ignore send errors - it's OK if no one is listening
        let _ = self.tx.send(event);
    }
}

impl Default for ChannelListener {
    fn default() -> Self {
        Self::new(256)
    }
}

impl PatchProgressListener for ChannelListener {
    fn on_patch_started(&self) {
        self.send(PatchEvent::Started);
    }

    fn on_work_size(&self, version_dirs: usize, mod_files: usize) {
        self.send(PatchEvent::WorkSize {
            version_dirs,
            mod_files,
        });
    }

    fn on_next_installation(&self, root: &Utf8Path) {
        self.send(PatchEvent::NextInstallation {
            root: root.to_path_buf(),
        });
    }

    fn on_next_version(&self, version_dir: &Utf8Path) {
        self.send(PatchEvent::NextVersion {
            version_dir: version_dir.to_path_buf(),
        });
    }

    fn on_next_mod_file(&self, source_file: &str) {
        self.send(PatchEvent::NextModFile {
            source_file: source_file.to_string(),
        });
    }

    fn on_patch_finished(&self, success: bool) {
        self.send(PatchEvent::Finished { success });
    }
}
