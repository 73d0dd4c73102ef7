//! Verification reports and failed-log archiving.

use crate::error::{Result, SignoffError};
use crate::log::ToolRunLog;
use crate::verdict::{DrcTotals, SignoffOutcome, Verdict};
use crate::verify::MatchMode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

/// Record of one verification, written next to archived logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub log_path: PathBuf,

    /// SHA-256 of the verified log content
    pub log_digest: String,
    pub log_lines: usize,
    pub mode: MatchMode,
    pub lvs: Verdict,
    pub drc: Verdict,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drc_totals: Option<DrcTotals>,
    pub passed: bool,
}

impl VerificationReport {
    pub fn new(log: &ToolRunLog, mode: MatchMode, outcome: &SignoffOutcome) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            log_path: log.display_source(),
            log_digest: log.digest(),
            log_lines: log.len(),
            mode,
            lvs: outcome.lvs.clone(),
            drc: outcome.drc.clone(),
            drc_totals: outcome.drc_totals,
            passed: outcome.passed(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?).map_err(|e| SignoffError::io(path, e))
    }
}

/// Where a failed log ended up after archiving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivedLog {
    pub log: PathBuf,
    pub report: PathBuf,
}

/// Directory keeping failed logs for human inspection.
#[derive(Debug, Clone)]
pub struct LogArchive {
    root: PathBuf,
}

impl LogArchive {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Copy `log_path` into the archive and write `report` beside it.
    ///
    /// Files are named `<timestamp>-<report id prefix>.log` / `.json`.
    pub fn preserve(&self, log_path: &Path, report: &VerificationReport) -> Result<ArchivedLog> {
        std::fs::create_dir_all(&self.root).map_err(|e| SignoffError::io(&self.root, e))?;

        let stem = format!(
            "{}-{}",
            report.created_at.format("%Y%m%dT%H%M%SZ"),
            &report.id.simple().to_string()[..8]
        );
        let archived_log = self.root.join(format!("{}.log", stem));
        let archived_report = self.root.join(format!("{}.json", stem));

        std::fs::copy(log_path, &archived_log).map_err(|e| SignoffError::io(log_path, e))?;
        report.write(&archived_report)?;

        info!(
            log = %archived_log.display(),
            report = %archived_report.display(),
            "Preserved failed signoff log"
        );

        Ok(ArchivedLog {
            log: archived_log,
            report: archived_report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verify::Verifier;

    fn failing_log(dir: &Path) -> (PathBuf, ToolRunLog) {
        let path = dir.join("signoff.log");
        std::fs::write(
            &path,
            "Run Result             : MISMATCH\nTotal DRC Results                 : 5 (5)\n",
        )
        .unwrap();
        let log = ToolRunLog::read(&path).unwrap();
        (path, log)
    }

    #[test]
    fn test_report_fields() {
        let dir = tempfile::tempdir().unwrap();
        let (path, log) = failing_log(dir.path());
        let outcome = Verifier::new(MatchMode::Structured).verify(&log);
        let report = VerificationReport::new(&log, MatchMode::Structured, &outcome);

        assert_eq!(report.log_path, path);
        assert_eq!(report.log_lines, 2);
        assert_eq!(report.log_digest, log.digest());
        assert!(!report.passed);
        assert_eq!(report.drc_totals.map(|t| t.violations), Some(5));
    }

    #[test]
    fn test_report_json_round_trip() {
        let log = ToolRunLog::from_lines(["Run Result             : MATCH"]);
        let outcome = Verifier::default().verify(&log);
        let report = VerificationReport::new(&log, MatchMode::Literal, &outcome);

        let json = report.to_json().unwrap();
        assert!(json.contains("\"mode\": \"literal\""));
        let parsed: VerificationReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, report);
    }

    #[test]
    fn test_preserve_copies_log_and_writes_report() {
        let dir = tempfile::tempdir().unwrap();
        let (path, log) = failing_log(dir.path());
        let outcome = Verifier::default().verify(&log);
        let report = VerificationReport::new(&log, MatchMode::Literal, &outcome);

        let archive = LogArchive::new(dir.path().join("archive/nested"));
        let archived = archive.preserve(&path, &report).unwrap();

        assert_eq!(
            std::fs::read(&archived.log).unwrap(),
            std::fs::read(&path).unwrap()
        );
        let written: VerificationReport =
            serde_json::from_str(&std::fs::read_to_string(&archived.report).unwrap()).unwrap();
        assert_eq!(written.id, report.id);
        assert!(archived.log.starts_with(archive.root()));
    }

    #[test]
    fn test_preserve_missing_log_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let log = ToolRunLog::from_lines(Vec::<String>::new());
        let outcome = Verifier::default().verify(&log);
        let report = VerificationReport::new(&log, MatchMode::Literal, &outcome);

        let err = LogArchive::new(dir.path())
            .preserve(&dir.path().join("absent.log"), &report)
            .unwrap_err();
        assert!(matches!(err, SignoffError::Io { .. }));
    }
}
