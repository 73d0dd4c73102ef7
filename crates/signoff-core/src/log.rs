//! Captured output of external signoff tool runs.

use crate::error::{Result, SignoffError};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Immutable text output of one or more tool runs.
///
/// Usually the combined stdout/stderr of the PAR/LVS and DRC invocations,
/// redirected into a single file by the CI runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolRunLog {
    source: Option<PathBuf>,
    lines: Vec<String>,
}

impl ToolRunLog {
    /// Build a log from in-memory lines.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            source: None,
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    /// Split captured text into lines.
    pub fn from_text(text: &str) -> Self {
        Self::from_lines(text.lines())
    }

    /// Read a log file from disk.
    ///
    /// Tool output is not guaranteed to be UTF-8, so bytes are decoded lossily.
    pub fn read(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| SignoffError::io(path, e))?;
        let text = String::from_utf8_lossy(&bytes);
        let mut log = Self::from_text(&text);
        log.source = Some(path.to_path_buf());
        Ok(log)
    }

    /// Attach the location the log was captured to.
    pub fn with_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = Some(path.into());
        self
    }

    /// Where the log came from, if it was read from a file.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Source path for diagnostics; `<memory>` for in-memory logs.
    pub fn display_source(&self) -> PathBuf {
        self.source
            .clone()
            .unwrap_or_else(|| PathBuf::from("<memory>"))
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// SHA-256 over the lines joined with `\n` (hex encoded).
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        for (i, line) in self.lines.iter().enumerate() {
            if i > 0 {
                hasher.update(b"\n");
            }
            hasher.update(line.as_bytes());
        }
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_from_text_strips_crlf() {
        let log = ToolRunLog::from_text("first\r\nsecond\n");
        let lines: Vec<&str> = log.lines().collect();
        assert_eq!(lines, vec!["first", "second"]);
    }

    #[test]
    fn test_read_empty_file_is_empty_log() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let log = ToolRunLog::read(file.path()).unwrap();
        assert!(log.is_empty());
        assert_eq!(log.source(), Some(file.path()));
    }

    #[test]
    fn test_read_tolerates_invalid_utf8() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"Pegasus \xff\xfe banner\nRun Result             : MATCH\n")
            .unwrap();

        let log = ToolRunLog::read(file.path()).unwrap();
        assert_eq!(log.len(), 2);
        assert!(log.lines().any(|l| l == "Run Result             : MATCH"));
    }

    #[test]
    fn test_read_missing_file_is_io_error() {
        let err = ToolRunLog::read(Path::new("/nonexistent/signoff.log")).unwrap_err();
        assert!(matches!(err, SignoffError::Io { .. }));
    }

    #[test]
    fn test_digest_deterministic_and_content_sensitive() {
        let a = ToolRunLog::from_lines(["x", "y"]);
        let b = ToolRunLog::from_lines(["x", "y"]);
        let c = ToolRunLog::from_lines(["x", "z"]);
        assert_eq!(a.digest(), b.digest());
        assert_ne!(a.digest(), c.digest());
        assert_eq!(a.digest().len(), 64);
    }

    #[test]
    fn test_display_source_defaults_to_memory() {
        let log = ToolRunLog::from_lines(Vec::<String>::new());
        assert_eq!(log.display_source(), PathBuf::from("<memory>"));
        let log = log.with_source("/tmp/run.log");
        assert_eq!(log.display_source(), PathBuf::from("/tmp/run.log"));
    }
}
