use crate::services::PATCH_LOG_TARGET;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs::{self, OpenOptions};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::filter::{LevelFilter, filter_fn};
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// File name of the patch log inside the log directory.
pub const PATCH_LOG_FILE: &str = "patchlog.txt";

/// Keeps both log writers alive; drop it only when the program exits.
pub struct LogGuard {
    _app: WorkerGuard,
    _patch: WorkerGuard,
    patch_log: Utf8PathBuf,
}

impl LogGuard {
    /// Location of the patch log.
    pub fn patch_log(&self) -> &Utf8Path {
        &self.patch_log
    }
}

/// Setup logging with a rotating application log and the patch log.
///
/// The application log gets everything at the configured level with daily rotation.
/// The patch log only gets events with the `patch` target (per-file `[+]`/`[!]`
/// lines, flushed error reports and run summaries) and is cleared on every start.
///
/// # Arguments
/// * `log_dir` - Directory for log files (e.g., "logs")
/// * `log_prefix` - Prefix for application log files (e.g., "vivaldi-modder")
/// * `debug_mode` - If true, use debug level; otherwise use info level
/// * `console_output` - If true, also log to console
///
/// # Returns
/// A guard that must be held for the duration of the program to keep logging active
pub fn setup_logging(
    log_dir: &str,
    log_prefix: &str,
    debug_mode: bool,
    console_output: bool,
) -> Result<LogGuard> {
    let log_path = Utf8PathBuf::from(log_dir);
    if !log_path.exists() {
        fs::create_dir_all(&log_path)
            .with_context(|| format!("Failed to create log directory: {}", log_dir))?;
    }

    let patch_log = log_path.join(PATCH_LOG_FILE);
    clear_patch_log(&patch_log)?;

    let (app_writer, app_guard) = tracing_appender::non_blocking(rolling::daily(log_dir, log_prefix));
    let (patch_writer, patch_guard) =
        tracing_appender::non_blocking(rolling::never(log_dir, PATCH_LOG_FILE));

    let env_filter = if debug_mode {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(app_writer)
        .with_ansi(false) // No ANSI codes in log files
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_filter(env_filter);

    // Plain lines, readable by users
    let patch_layer = tracing_subscriber::fmt::layer()
        .with_writer(patch_writer)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .without_time()
        .with_filter(LevelFilter::INFO)
        .with_filter(filter_fn(|metadata| metadata.target() == PATCH_LOG_TARGET));

    let console_layer = console_output.then(|| {
        tracing_subscriber::fmt::layer()
            .with_ansi(true)
            .with_target(false)
            .with_filter(if debug_mode {
                LevelFilter::DEBUG
            } else {
                LevelFilter::INFO
            })
    });

    tracing_subscriber::registry()
        .with(file_layer)
        .with(patch_layer)
        .with(console_layer)
        .try_init()
        .context("Failed to install the global tracing subscriber")?;

    tracing::info!(
        "Logging initialized: dir={}, prefix={}, debug={}, console={}",
        log_dir,
        log_prefix,
        debug_mode,
        console_output
    );

    Ok(LogGuard {
        _app: app_guard,
        _patch: patch_guard,
        patch_log,
    })
}

/// Empty the patch log, creating it if needed.
///
/// Safe to call while the log is open for appending.
pub fn clear_patch_log(path: &Utf8Path) -> Result<()> {
    OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(path)
        .with_context(|| format!("Failed to clear patch log: {}", path))?;

    Ok(())
}
