//! Error taxonomy and the per-version error report.
//!
//! Nothing that goes wrong while patching a single file is propagated. Failures are
//! turned into [`ErrorRecord`]s on the [`PatchReport`] of the version directory being
//! patched, and the report is flushed to the patch log once that version is done.

use camino::Utf8PathBuf;
use std::fmt;
use std::io;
use thiserror::Error;

/// Log target for everything that ends up in the patch log.
pub const PATCH_LOG_TARGET: &str = "patch";

/// Errors that can occur while patching a version directory
#[derive(Error, Debug)]
pub enum PatchError {
    #[error("{0} does not exist!")]
    MissingSource(Utf8PathBuf),

    #[error("{0} is not a file!")]
    NotAFile(Utf8PathBuf),

    #[error("Could not {action} {path}")]
    Io {
        action: &'static str,
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{0} does not exist, so it cannot be modified!")]
    MissingEntryPoint(Utf8PathBuf),

    #[error("Could not parse {path}: {message}")]
    Markup { path: Utf8PathBuf, message: String },
}

impl PatchError {
    pub fn io(action: &'static str, path: impl Into<Utf8PathBuf>, source: io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }
}

/// Severity of an [`ErrorRecord`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "WARNING"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// One problem met while patching a version directory.
#[derive(Debug)]
pub struct ErrorRecord {
    pub severity: Severity,
    pub message: String,
    pub cause: Option<PatchError>,
}

impl ErrorRecord {
    /// Render the message followed by one `Cause:` line per error in the chain.
    pub fn render(&self) -> String {
        let mut rendered = self.message.clone();

        let mut cause: Option<&dyn std::error::Error> =
            self.cause.as_ref().map(|e| e as &dyn std::error::Error);
        while let Some(error) = cause {
            rendered.push_str(&format!("\n        Cause: {}", error));
            cause = error.source();
        }

        rendered
    }
}

/// Errors collected during one version directory's patch attempt.
#[derive(Debug, Default)]
pub struct PatchReport {
    records: Vec<ErrorRecord>,
}

impl PatchReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warning(&mut self, message: impl Into<String>, cause: Option<PatchError>) {
        self.records.push(ErrorRecord {
            severity: Severity::Warning,
            message: message.into(),
            cause,
        });
    }

    pub fn error(&mut self, message: impl Into<String>, cause: Option<PatchError>) {
        self.records.push(ErrorRecord {
            severity: Severity::Error,
            message: message.into(),
            cause,
        });
    }

    pub fn records(&self) -> &[ErrorRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Write every record to the patch log and clear the report.
    pub fn flush(&mut self) {
        for record in self.records.drain(..) {
            match record.severity {
                Severity::Warning => {
                    tracing::warn!(target: PATCH_LOG_TARGET, "{}", record.render())
                }
                Severity::Error => {
                    tracing::error!(target: PATCH_LOG_TARGET, "{}", record.render())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_with_cause_chain() {
        let mut report = PatchReport::new();
        report.warning(
            "Could not back up custom.css, so it will not be replaced",
            Some(PatchError::io(
                "back up",
                "style/custom.css",
                io::Error::new(io::ErrorKind::PermissionDenied, "access denied"),
            )),
        );

        let rendered = report.records()[0].render();
        assert!(rendered.starts_with("Could not back up custom.css"));
        assert!(rendered.contains("Cause: Could not back up style/custom.css"));
        assert!(rendered.contains("Cause: access denied"));
    }

    #[test]
    fn test_render_without_cause() {
        let record = ErrorRecord {
            severity: Severity::Error,
            message: "Something broke".to_string(),
            cause: None,
        };
        assert_eq!(record.render(), "Something broke");
    }

    #[test]
    fn test_flush_clears_records() {
        let mut report = PatchReport::new();
        report.error("first", None);
        report.warning("second", Some(PatchError::MissingSource("a.css".into())));
        assert_eq!(report.len(), 2);

        report.flush();
        assert!(report.is_empty());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            PatchError::MissingSource("mods/a.css".into()).to_string(),
            "mods/a.css does not exist!"
        );
        assert_eq!(
            PatchError::NotAFile("mods/dir".into()).to_string(),
            "mods/dir is not a file!"
        );
    }
}
