use crate::services::paths;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// File name of the HTML entry point inside `resources/vivaldi`.
pub const ENTRY_POINT_FILE: &str = "browser.html";

/// One copy directive: copy `source_file` (relative to the mod root) into
/// `target_directory` (relative to a version directory).
///
/// Paths are normalized to `/` separators on construction and never leave the
/// directory they are relative to: leading separators and `..` segments are dropped. Equality and ordering
/// only consider `(target_directory, source_file)`, so two instructions that copy the
/// same file to the same place are the same instruction regardless of the exclusion
/// flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "RawInstruction")]
pub struct Instruction {
    pub source_file: String,
    pub target_directory: String,
    /// Keep this file out of the generated entry point references.
    pub exclude_from_entry_point: bool,
}

#[derive(Deserialize)]
struct RawInstruction {
    source_file: String,
    #[serde(default)]
    target_directory: String,
    #[serde(default)]
    exclude_from_entry_point: bool,
}

impl From<RawInstruction> for Instruction {
    fn from(raw: RawInstruction) -> Self {
        Instruction::new(raw.source_file, raw.target_directory, raw.exclude_from_entry_point)
    }
}

impl Instruction {
    pub fn new(
        source_file: impl AsRef<str>,
        target_directory: impl AsRef<str>,
        exclude_from_entry_point: bool,
    ) -> Self {
        Self {
            source_file: paths::normalize_relative(source_file.as_ref()),
            target_directory: paths::normalize_relative(target_directory.as_ref()),
            exclude_from_entry_point,
        }
    }

    /// File name of the source, which is also the name of the copied file.
    pub fn file_name(&self) -> &str {
        paths::file_name(&self.source_file)
    }

    /// Target file path relative to the version directory.
    pub fn target_file(&self) -> String {
        paths::join(&self.target_directory, self.file_name())
    }

    /// Whether this instruction supplies a full replacement for the entry point.
    pub fn replaces_entry_point(&self) -> bool {
        self.file_name().eq_ignore_ascii_case(ENTRY_POINT_FILE)
    }

    pub fn is_style(&self) -> bool {
        self.source_file.to_ascii_lowercase().ends_with(".css")
    }

    pub fn is_script(&self) -> bool {
        self.source_file.to_ascii_lowercase().ends_with(".js")
    }
}

impl PartialEq for Instruction {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Instruction {}

impl PartialOrd for Instruction {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Instruction {
    fn cmp(&self, other: &Self) -> Ordering {
        self.target_directory
            .cmp(&other.target_directory)
            .then_with(|| self.source_file.cmp(&other.source_file))
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} > {}]", self.source_file, self.target_directory)
    }
}
