//! Error types for signoff verification and flow configuration

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the signoff crates.
///
/// `LvsMismatch` and `DrcViolation` are verification failures: they describe a
/// real design defect and are never retried. Everything else is operational.
#[derive(Error, Debug)]
pub enum SignoffError {
    /// The LVS report did not declare a match.
    #[error("LVS mismatch (see log {})", .log.display())]
    LvsMismatch { log: PathBuf },

    /// The DRC report declared violations, or no clean total was found.
    #[error("DRC violations present (see log {})", .log.display())]
    DrcViolation { log: PathBuf },

    /// Filesystem error while reading a log or writing an archive
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Flow configuration is missing or inconsistent
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A signoff stage could not be executed
    #[error("Stage '{stage}' failed to execute: {reason}")]
    Stage { stage: String, reason: String },
}

impl SignoffError {
    /// Wrap an I/O error together with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SignoffError::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error is a verification failure rather than an operational one.
    pub fn is_verification_failure(&self) -> bool {
        matches!(
            self,
            SignoffError::LvsMismatch { .. } | SignoffError::DrcViolation { .. }
        )
    }
}

/// Result type for signoff operations
pub type Result<T> = std::result::Result<T, SignoffError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verification_failures_carry_log_path() {
        let err = SignoffError::LvsMismatch {
            log: PathBuf::from("/tmp/signoff.log"),
        };
        assert!(err.is_verification_failure());
        assert_eq!(err.to_string(), "LVS mismatch (see log /tmp/signoff.log)");

        let err = SignoffError::DrcViolation {
            log: PathBuf::from("drc.log"),
        };
        assert!(err.is_verification_failure());
        assert!(err.to_string().starts_with("DRC violations present"));
    }

    #[test]
    fn test_operational_errors_are_not_verification_failures() {
        let err = SignoffError::Config("no tools".to_string());
        assert!(!err.is_verification_failure());

        let err = SignoffError::io(
            "missing.log",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(!err.is_verification_failure());
        assert!(err.to_string().contains("missing.log"));
    }
}
