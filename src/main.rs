//! VivaldiModder - Applies user mod files to Vivaldi browser installations
//!
//! Main entry point for the command line application.
//!
//! # Execution Flow
//!
//! 1. Load `settings.yaml` from the config directory (default `vivaldi-modder`)
//! 2. Initialize logging → `<log_dir>/vivaldi-modder.<date>` and `<log_dir>/patchlog.txt`
//! 3. Load and validate `mod-config.yaml`; stop if it has problems
//! 4. Spawn the patch worker on a tokio runtime
//! 5. Queue a patch run when `--apply` is given or `apply_on_start` is set
//! 6. Watch the installation directories until Ctrl-C if `watch_directories` is set
//! 7. Let queued work finish and shut down
//!
//! # Usage
//!
//! ```text
//! vivaldi-modder [--apply] [--all] [CONFIG_DIR]
//! ```

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use vivaldi_modder::{
    APP_NAME, ConfigManager, PatchProgressListener, PatchWorker, Patcher, VERSION,
};

const DEFAULT_CONFIG_DIR: &str = "vivaldi-modder";

struct Args {
    apply: bool,
    patch_all: bool,
    config_dir: Utf8PathBuf,
}

/// Writes run progress to the application log.
struct LogProgress;

impl PatchProgressListener for LogProgress {
    fn on_work_size(&self, version_dirs: usize, mod_files: usize) {
        tracing::info!(
            "Patching {} version directories with {} mod files",
            version_dirs,
            mod_files
        );
    }

    fn on_next_installation(&self, root: &Utf8Path) {
        tracing::info!("Installation: {}", root);
    }

    fn on_next_version(&self, version_dir: &Utf8Path) {
        tracing::debug!("Version: {}", version_dir);
    }

    fn on_patch_finished(&self, success: bool) {
        tracing::info!("Patch run finished (success: {})", success);
    }
}

fn parse_args() -> Option<Args> {
    let mut args = Args {
        apply: false,
        patch_all: false,
        config_dir: Utf8PathBuf::from(DEFAULT_CONFIG_DIR),
    };

    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--apply" | "-a" => args.apply = true,
            "--all" => args.patch_all = true,
            "--help" | "-h" => {
                println!("{} v{}", APP_NAME, VERSION);
                println!("Usage: {} [--apply] [--all] [CONFIG_DIR]", APP_NAME);
                println!("  --apply, -a   Patch all unpatched Vivaldi versions now");
                println!("  --all         Patch every version, including already patched ones");
                println!("  CONFIG_DIR    Directory with mod-config.yaml (default: {})", DEFAULT_CONFIG_DIR);
                return None;
            }
            other if other.starts_with('-') => eprintln!("Ignoring unknown option {}", other),
            other => args.config_dir = Utf8PathBuf::from(other),
        }
    }

    Some(args)
}

fn main() -> Result<()> {
    let Some(args) = parse_args() else {
        return Ok(());
    };

    let config_manager = ConfigManager::new(&args.config_dir)?;
    let settings = config_manager.load_settings()?;

    let log_dir = if Utf8Path::new(&settings.log_dir).is_absolute() {
        Utf8PathBuf::from(&settings.log_dir)
    } else {
        config_manager.config_dir().join(&settings.log_dir)
    };
    let log_guard =
        vivaldi_modder::logging::setup_logging(log_dir.as_str(), APP_NAME, settings.debug_mode, true)?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let mut mod_config = config_manager.load_mod_config()?;
    mod_config.resolve_application_dirs();

    let errors = mod_config.validate();
    if !errors.is_empty() {
        for error in &errors {
            tracing::error!("{}", error);
        }
        tracing::error!(
            "{} has {} problems, not patching anything",
            mod_config.config_location(),
            errors.len()
        );
        return Ok(());
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(2)
        .thread_name("vivaldi-modder-worker")
        .build()
        .context("Failed to create the tokio runtime")?;

    let mut patcher =
        Patcher::new(mod_config, config_manager.load_ledger()).with_search_depth(settings.search_depth);
    patcher.add_listener(Box::new(LogProgress));

    runtime.block_on(async move {
        let worker = PatchWorker::spawn_with_patch_log(
            patcher,
            config_manager,
            Some(log_guard.patch_log().to_path_buf()),
        );

        if args.apply || settings.apply_on_start {
            worker.apply_mods(args.patch_all, false)?;
        }

        if settings.watch_directories {
            worker.watch_directories(true)?;

            tracing::info!("Watching for new Vivaldi versions, press Ctrl-C to exit");
            tokio::signal::ctrl_c()
                .await
                .context("Failed to listen for Ctrl-C")?;
            tracing::info!("Ctrl-C received, finishing queued work");
        }

        let patcher = worker.shutdown().await?;
        patcher.metrics().log_summary();

        tracing::info!("Application shutdown complete");
        drop(log_guard);
        Ok::<(), anyhow::Error>(())
    })
}
