use crate::models::Instruction;
use crate::services::version_dirs;
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

/// Mod configuration from `mod-config.yaml`
///
/// Describes where the mod files live, which Vivaldi installations to patch and what
/// to copy where. The patch engine only ever reads it; edits replace the whole value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModConfig {
    /// Where this config was loaded from and is saved to.
    #[serde(skip)]
    pub config_location: Utf8PathBuf,

    /// Directory that instruction source files are relative to.
    pub mod_root: Utf8PathBuf,

    #[serde(default)]
    pub installation_roots: Vec<Utf8PathBuf>,

    #[serde(default)]
    pub instructions: Vec<Instruction>,
}

impl ModConfig {
    pub fn new(
        config_location: impl Into<Utf8PathBuf>,
        mod_root: impl Into<Utf8PathBuf>,
        installation_roots: Vec<Utf8PathBuf>,
        mut instructions: Vec<Instruction>,
    ) -> Self {
        instructions.sort();
        Self {
            config_location: config_location.into(),
            mod_root: mod_root.into(),
            installation_roots,
            instructions,
        }
    }

    /// An empty config saved at `config_location`, with the current directory as mod
    /// root.
    pub fn empty(config_location: impl Into<Utf8PathBuf>) -> Self {
        Self::new(config_location, Utf8PathBuf::from("."), Vec::new(), Vec::new())
    }

    /// Point each installation root at its `Application` folder where one exists.
    pub fn resolve_application_dirs(&mut self) {
        for root in &mut self.installation_roots {
            *root = version_dirs::resolve_application_dir(root);
        }
    }

    /// Absolute location of an instruction's source file.
    pub fn source_path(&self, instruction: &Instruction) -> Utf8PathBuf {
        self.mod_root.join(&instruction.source_file)
    }

    /// Check the config for problems that would make patching fail.
    ///
    /// # Returns
    /// One human-readable message per problem; empty when the config is usable
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        let mod_root_valid = self.validate_mod_root(&mut errors);
        self.validate_installation_roots(&mut errors);

        // Source files can only be checked against a usable mod root
        if mod_root_valid {
            self.validate_instructions(&mut errors);
        }

        errors
    }

    fn validate_mod_root(&self, errors: &mut Vec<String>) -> bool {
        if !self.mod_root.exists() {
            errors.push(format!("Invalid mod dir: {} does not exist!", self.mod_root));
            false
        } else if !self.mod_root.is_dir() {
            errors.push(format!("Invalid mod dir: {} is not a directory!", self.mod_root));
            false
        } else {
            true
        }
    }

    fn validate_installation_roots(&self, errors: &mut Vec<String>) {
        for root in &self.installation_roots {
            if !root.exists() {
                errors.push(format!("Invalid Vivaldi dir: {} does not exist!", root));
            } else if !root.is_dir() {
                errors.push(format!("Invalid Vivaldi dir: {} is not a directory!", root));
            } else if version_dirs::find_version_dirs(root, 0).is_empty() {
                errors.push(format!(
                    "Invalid Vivaldi dir: {} contains no version folders!",
                    root
                ));
            }
        }
    }

    fn validate_instructions(&self, errors: &mut Vec<String>) {
        for instruction in &self.instructions {
            let source = self.source_path(instruction);

            if !source.exists() {
                errors.push(format!("Invalid mod file: {} does not exist!", source));
            } else if !source.is_file() {
                errors.push(format!("Invalid mod file: {} is not a file!", source));
            }
        }
    }

    /// Whether any instruction replaces the entry point outright.
    pub fn has_entry_point_replacement(&self) -> bool {
        self.instructions.iter().any(Instruction::replaces_entry_point)
    }

    pub fn config_location(&self) -> &Utf8Path {
        &self.config_location
    }
}

/// Application settings from `settings.yaml`, overridable through
/// `VIVALDI_MODDER__*` environment variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Patch all unpatched versions as soon as the application starts.
    pub apply_on_start: bool,

    /// Watch installation roots and patch new version directories as they appear.
    pub watch_directories: bool,

    /// Extra directory levels to search below each installation root.
    pub search_depth: usize,

    pub debug_mode: bool,

    pub log_dir: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            apply_on_start: false,
            watch_directories: true,
            search_depth: 0,
            debug_mode: false,
            log_dir: "logs".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn utf8_root(temp_dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap()
    }

    #[test]
    fn test_app_settings_defaults() {
        let settings = AppSettings::default();
        assert!(!settings.apply_on_start);
        assert!(settings.watch_directories);
        assert_eq!(settings.search_depth, 0);
        assert_eq!(settings.log_dir, "logs");
    }

    #[test]
    fn test_new_sorts_instructions() {
        let config = ModConfig::new(
            "mod-config.yaml",
            "mods",
            Vec::new(),
            vec![
                Instruction::new("b.css", "style", false),
                Instruction::new("a.css", "style", false),
            ],
        );
        assert_eq!(config.instructions[0].source_file, "a.css");
    }

    #[test]
    fn test_validate_missing_mod_root_skips_instruction_checks() {
        let temp_dir = TempDir::new().unwrap();
        let root = utf8_root(&temp_dir);

        let config = ModConfig::new(
            root.join("mod-config.yaml"),
            root.join("missing"),
            Vec::new(),
            vec![Instruction::new("custom.css", "", false)],
        );

        let errors = config.validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("does not exist"));
    }

    #[test]
    fn test_validate_reports_each_problem() {
        let temp_dir = TempDir::new().unwrap();
        let root = utf8_root(&temp_dir);
        let mod_root = root.join("mods");
        fs::create_dir_all(mod_root.join("folder.css")).unwrap();
        let empty_install = root.join("empty-install");
        fs::create_dir_all(&empty_install).unwrap();

        let config = ModConfig::new(
            root.join("mod-config.yaml"),
            mod_root,
            vec![empty_install, root.join("gone")],
            vec![
                Instruction::new("missing.js", "", false),
                Instruction::new("folder.css", "", false),
            ],
        );

        let errors = config.validate();
        assert_eq!(errors.len(), 4);
        assert!(errors.iter().any(|e| e.contains("contains no version folders")));
        assert!(errors.iter().any(|e| e.contains("gone does not exist")));
        assert!(errors.iter().any(|e| e.contains("missing.js does not exist")));
        assert!(errors.iter().any(|e| e.contains("is not a file")));
    }

    #[test]
    fn test_validate_valid_config() {
        let temp_dir = TempDir::new().unwrap();
        let root = utf8_root(&temp_dir);
        let mod_root = root.join("mods");
        fs::create_dir_all(&mod_root).unwrap();
        fs::write(mod_root.join("custom.css"), "body {}").unwrap();
        let install = root.join("install");
        fs::create_dir_all(install.join("6.5.1").join("resources").join("vivaldi")).unwrap();

        let config = ModConfig::new(
            root.join("mod-config.yaml"),
            mod_root,
            vec![install],
            vec![Instruction::new("custom.css", "resources/vivaldi/style", false)],
        );

        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_has_entry_point_replacement() {
        let mut config = ModConfig::empty("mod-config.yaml");
        assert!(!config.has_entry_point_replacement());

        config
            .instructions
            .push(Instruction::new("browser.html", "resources/vivaldi", false));
        assert!(config.has_entry_point_replacement());
    }
}
