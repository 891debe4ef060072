use crate::models::{AppSettings, ModConfig};
use crate::services::PatchedVersions;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use ::config::{Config, Environment, File, FileFormat};
use std::fs;

/// File name of the mod configuration.
pub const MOD_CONFIG_FILE: &str = "mod-config.yaml";

/// File name of the application settings.
pub const SETTINGS_FILE: &str = "settings.yaml";

/// File name of the patched-version ledger.
pub const LEDGER_FILE: &str = "PATCHED";

/// Prefix of environment variables overriding [`AppSettings`], e.g.
/// `VIVALDI_MODDER__SEARCH_DEPTH=2`.
pub const ENV_PREFIX: &str = "VIVALDI_MODDER";

/// Configuration manager for the files in the configuration directory.
///
/// Manages three files:
/// - Mod config (`mod-config.yaml`): mod root, installation roots, instructions
/// - Settings (`settings.yaml`): application behaviour, layered with environment variables
/// - Ledger (`PATCHED`): versions that have been patched already
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    mod_config_path: Utf8PathBuf,
    settings_path: Utf8PathBuf,
    ledger_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager with the specified configuration directory.
    ///
    /// # Arguments
    /// * `config_dir` - Directory containing configuration files, created if missing
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            mod_config_path: config_dir.join(MOD_CONFIG_FILE),
            settings_path: config_dir.join(SETTINGS_FILE),
            ledger_path: config_dir.join(LEDGER_FILE),
            config_dir,
        })
    }

    /// Load the mod configuration.
    ///
    /// # Returns
    /// The loaded ModConfig, or an empty one if the file doesn't exist
    pub fn load_mod_config(&self) -> Result<ModConfig> {
        if !self.mod_config_path.exists() {
            tracing::warn!(
                "Mod config file not found at {}, starting with an empty config",
                self.mod_config_path
            );
            return Ok(ModConfig::empty(&self.mod_config_path));
        }

        let file_contents = fs::read_to_string(&self.mod_config_path)
            .with_context(|| format!("Failed to read mod config: {}", self.mod_config_path))?;

        let mut config: ModConfig = serde_yaml_ng::from_str(&file_contents)
            .with_context(|| format!("Failed to parse mod config: {}", self.mod_config_path))?;

        config.config_location = self.mod_config_path.clone();
        config.instructions.sort();

        tracing::info!(
            "Loaded mod config from {} ({} instructions, {} installations)",
            self.mod_config_path,
            config.instructions.len(),
            config.installation_roots.len()
        );
        Ok(config)
    }

    /// Save the mod configuration to the location it was loaded from.
    ///
    /// Configs without a location are saved to this manager's `mod-config.yaml`.
    pub fn save_mod_config(&self, config: &ModConfig) -> Result<()> {
        let path = if config.config_location().as_str().is_empty() {
            self.mod_config_path.as_path()
        } else {
            config.config_location()
        };

        let yaml_string =
            serde_yaml_ng::to_string(config).context("Failed to serialize mod config to YAML")?;

        fs::write(path, yaml_string)
            .with_context(|| format!("Failed to write mod config: {}", path))?;

        tracing::info!("Saved mod config to {}", path);
        Ok(())
    }

    /// Load the application settings.
    ///
    /// Defaults, overridden by `settings.yaml` if present, overridden by
    /// `VIVALDI_MODDER__*` environment variables.
    pub fn load_settings(&self) -> Result<AppSettings> {
        self.load_settings_with(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
    }

    fn load_settings_with(&self, environment: Environment) -> Result<AppSettings> {
        if !self.settings_path.exists() {
            tracing::debug!("Settings file not found at {}, using defaults", self.settings_path);
        }

        let settings: AppSettings = Config::builder()
            .add_source(File::new(self.settings_path.as_str(), FileFormat::Yaml).required(false))
            .add_source(environment)
            .build()
            .with_context(|| format!("Failed to read settings: {}", self.settings_path))?
            .try_deserialize()
            .with_context(|| format!("Failed to parse settings: {}", self.settings_path))?;

        tracing::info!("Loaded settings from {}", self.settings_path);
        Ok(settings)
    }

    /// Save the application settings.
    pub fn save_settings(&self, settings: &AppSettings) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(settings).context("Failed to serialize settings to YAML")?;

        fs::write(&self.settings_path, yaml_string)
            .with_context(|| format!("Failed to write settings: {}", self.settings_path))?;

        tracing::info!("Saved settings to {}", self.settings_path);
        Ok(())
    }

    /// Load the patched-version ledger; missing or unreadable files give an empty one.
    pub fn load_ledger(&self) -> PatchedVersions {
        PatchedVersions::load(&self.ledger_path)
    }

    /// Get the configuration directory path.
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    pub fn mod_config_path(&self) -> &Utf8Path {
        &self.mod_config_path
    }

    pub fn ledger_path(&self) -> &Utf8Path {
        &self.ledger_path
    }
}
