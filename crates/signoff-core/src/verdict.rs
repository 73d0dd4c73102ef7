//! Verification verdicts.

use crate::error::SignoffError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Reason reported when no LVS match marker is found.
pub const LVS_MISMATCH_REASON: &str = "LVS mismatch";

/// Reason reported when no clean DRC total is found.
pub const DRC_VIOLATION_REASON: &str = "DRC violations present";

/// Outcome of classifying one signoff report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Fail { reason: String },
}

impl Verdict {
    pub fn fail(reason: impl Into<String>) -> Self {
        Verdict::Fail {
            reason: reason.into(),
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Verdict::Pass => None,
            Verdict::Fail { reason } => Some(reason),
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Pass => write!(f, "PASS"),
            Verdict::Fail { reason } => write!(f, "FAIL ({})", reason),
        }
    }
}

/// The two signoff checks gated by CI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignoffCheck {
    Lvs,
    Drc,
}

impl SignoffCheck {
    pub fn name(&self) -> &'static str {
        match self {
            SignoffCheck::Lvs => "lvs",
            SignoffCheck::Drc => "drc",
        }
    }

    /// Terminal error for a failed check, pointing at the log to inspect.
    pub fn failure(&self, log: &Path) -> SignoffError {
        match self {
            SignoffCheck::Lvs => SignoffError::LvsMismatch {
                log: log.to_path_buf(),
            },
            SignoffCheck::Drc => SignoffError::DrcViolation {
                log: log.to_path_buf(),
            },
        }
    }
}

/// DRC totals as printed in a report: `<results> (<violations>)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrcTotals {
    pub results: u64,
    pub violations: u64,
}

impl DrcTotals {
    pub fn is_clean(&self) -> bool {
        self.results == 0 && self.violations == 0
    }
}

/// LVS and DRC verdicts for one log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignoffOutcome {
    pub lvs: Verdict,
    pub drc: Verdict,

    /// Last DRC totals seen, only populated by structured matching.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drc_totals: Option<DrcTotals>,
}

impl SignoffOutcome {
    pub fn passed(&self) -> bool {
        self.lvs.is_pass() && self.drc.is_pass()
    }

    /// Checks that failed, LVS first.
    pub fn failed_checks(&self) -> Vec<SignoffCheck> {
        let mut failed = Vec::new();
        if !self.lvs.is_pass() {
            failed.push(SignoffCheck::Lvs);
        }
        if !self.drc.is_pass() {
            failed.push(SignoffCheck::Drc);
        }
        failed
    }

    /// Terminal errors for every failed check.
    pub fn errors(&self, log: &Path) -> Vec<SignoffError> {
        self.failed_checks()
            .into_iter()
            .map(|check| check.failure(log))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_verdict_display() {
        assert_eq!(Verdict::Pass.to_string(), "PASS");
        assert_eq!(
            Verdict::fail(LVS_MISMATCH_REASON).to_string(),
            "FAIL (LVS mismatch)"
        );
    }

    #[test]
    fn test_verdict_serializes_tagged() {
        let json = serde_json::to_value(Verdict::fail(DRC_VIOLATION_REASON)).unwrap();
        assert_eq!(json["status"], "fail");
        assert_eq!(json["reason"], "DRC violations present");

        let json = serde_json::to_value(Verdict::Pass).unwrap();
        assert_eq!(json["status"], "pass");
    }

    #[test]
    fn test_outcome_failed_checks_order() {
        let outcome = SignoffOutcome {
            lvs: Verdict::fail(LVS_MISMATCH_REASON),
            drc: Verdict::fail(DRC_VIOLATION_REASON),
            drc_totals: None,
        };
        assert!(!outcome.passed());
        assert_eq!(
            outcome.failed_checks(),
            vec![SignoffCheck::Lvs, SignoffCheck::Drc]
        );

        let errors = outcome.errors(&PathBuf::from("run.log"));
        assert!(matches!(errors[0], SignoffError::LvsMismatch { .. }));
        assert!(matches!(errors[1], SignoffError::DrcViolation { .. }));
    }

    #[test]
    fn test_outcome_pass() {
        let outcome = SignoffOutcome {
            lvs: Verdict::Pass,
            drc: Verdict::Pass,
            drc_totals: Some(DrcTotals {
                results: 0,
                violations: 0,
            }),
        };
        assert!(outcome.passed());
        assert!(outcome.failed_checks().is_empty());
        assert!(outcome.errors(Path::new("run.log")).is_empty());
    }
}
