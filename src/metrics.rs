// Patch run metrics module
//
// Provides lightweight counters for what a patch run actually did to the disk

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Counters for patch runs
///
/// Uses atomic operations so the worker can record while other threads read. The
/// counters accumulate over the lifetime of a [`Patcher`](crate::services::Patcher)
/// and are logged at the end of every run.
#[derive(Debug)]
pub struct Metrics {
    /// Version directories patched successfully
    pub versions_patched: AtomicUsize,

    /// Version directories with at least one failed step
    pub versions_failed: AtomicUsize,

    /// Version directories skipped because the ledger had them
    pub versions_skipped: AtomicUsize,

    /// Backups created (existing backups are not counted)
    pub files_backed_up: AtomicUsize,

    /// Mod files copied into version directories
    pub files_copied: AtomicUsize,

    /// Failed backup or copy operations
    pub file_failures: AtomicUsize,

    /// Bytes copied from the mod root
    pub bytes_copied: AtomicU64,

    /// Total time spent in patch runs in milliseconds
    pub total_patch_time_ms: AtomicU64,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            versions_patched: AtomicUsize::new(0),
            versions_failed: AtomicUsize::new(0),
            versions_skipped: AtomicUsize::new(0),
            files_backed_up: AtomicUsize::new(0),
            files_copied: AtomicUsize::new(0),
            file_failures: AtomicUsize::new(0),
            bytes_copied: AtomicU64::new(0),
            total_patch_time_ms: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_version_patched(&self) {
        self.versions_patched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_version_failed(&self) {
        self.versions_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_version_skipped(&self) {
        self.versions_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_backup(&self) {
        self.files_backed_up.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_copy(&self, bytes: u64) {
        self.files_copied.fetch_add(1, Ordering::Relaxed);
        self.bytes_copied.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_file_failure(&self) {
        self.file_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_patch_time(&self, duration: Duration) {
        self.total_patch_time_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Average time per processed version directory in milliseconds
    pub fn avg_version_time_ms(&self) -> f64 {
        let total = self.total_patch_time_ms.load(Ordering::Relaxed);
        let count = self.versions_patched.load(Ordering::Relaxed)
            + self.versions_failed.load(Ordering::Relaxed)
            + self.versions_skipped.load(Ordering::Relaxed);
        if count > 0 {
            total as f64 / count as f64
        } else {
            0.0
        }
    }

    /// Log metrics summary
    pub fn log_summary(&self) {
        tracing::info!("=== Patch Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Versions: {} patched, {} failed, {} skipped",
            self.versions_patched.load(Ordering::Relaxed),
            self.versions_failed.load(Ordering::Relaxed),
            self.versions_skipped.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Files: {} backed up, {} copied ({} bytes), {} failed",
            self.files_backed_up.load(Ordering::Relaxed),
            self.files_copied.load(Ordering::Relaxed),
            self.bytes_copied.load(Ordering::Relaxed),
            self.file_failures.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Total patch time: {:.2}s (avg: {:.2}ms per version)",
            self.total_patch_time_ms.load(Ordering::Relaxed) as f64 / 1000.0,
            self.avg_version_time_ms()
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
