// VivaldiModder - Applies user mod files to Vivaldi browser installations
//
// This is the library crate containing the patch engine and its plumbing.
// The binary crate (main.rs) provides the command line entry point.

pub mod config;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod state;
pub mod watch;
pub mod worker;

// Re-export commonly used types for convenience
pub use crate::config::ConfigManager;
pub use models::{AppSettings, Instruction, ModConfig};
pub use services::{PatchSummary, PatchedVersions, Patcher};
pub use state::{ChannelListener, PatchEvent, PatchProgressListener};
pub use worker::{PatchQueue, PatchTask, PatchWorker};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
