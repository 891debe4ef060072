//! Data models for the patch engine.
//!
//! - [`Instruction`]: one "copy this mod file there" directive
//! - [`ModConfig`]: mod root, installation roots and instructions from `mod-config.yaml`
//! - [`AppSettings`]: application behaviour from `settings.yaml`
//!
//! All of them derive `Serialize`/`Deserialize` for YAML persistence through
//! [`ConfigManager`](crate::config::ConfigManager).

pub mod config;
pub mod instruction;

pub use config::{AppSettings, ModConfig};
pub use instruction::{ENTRY_POINT_FILE, Instruction};
