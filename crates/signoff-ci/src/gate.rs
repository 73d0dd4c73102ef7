//! Signoff gate: turns LVS/DRC verdicts into a CI pass/fail and exit code.

use crate::runner::StageResult;
use serde::{Deserialize, Serialize};
use signoff_core::{SignoffCheck, SignoffOutcome};

/// Both checks passed.
pub const EXIT_SUCCESS: i32 = 0;
/// Operational error: bad config, unreadable log, I/O failure.
pub const EXIT_ERROR: i32 = 1;
/// LVS mismatch only.
pub const EXIT_LVS_MISMATCH: i32 = 2;
/// DRC violations only.
pub const EXIT_DRC_VIOLATION: i32 = 3;
/// Both LVS and DRC failed.
pub const EXIT_LVS_AND_DRC: i32 = 4;

/// Gate evaluation verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateVerdict {
    /// Whether the gate passed.
    pub passed: bool,

    /// Checks that failed, LVS first.
    pub failed_checks: Vec<SignoffCheck>,

    /// Violations that caused failure (empty if passed).
    pub violations: Vec<String>,

    /// Stages that could not run to completion (spawn failure, timeout).
    pub stage_errors: Vec<String>,

    /// Stages that exited non-zero; informational only.
    pub warnings: Vec<String>,

    /// Summary message.
    pub message: String,
}

impl GateVerdict {
    /// Process exit code for the CI job.
    ///
    /// A stage error outranks the report verdicts: a killed or unstarted tool
    /// leaves the log incomplete.
    pub fn exit_code(&self) -> i32 {
        if !self.stage_errors.is_empty() {
            return EXIT_ERROR;
        }
        let lvs = self.failed_checks.contains(&SignoffCheck::Lvs);
        let drc = self.failed_checks.contains(&SignoffCheck::Drc);
        match (lvs, drc) {
            (false, false) => EXIT_SUCCESS,
            (true, false) => EXIT_LVS_MISMATCH,
            (false, true) => EXIT_DRC_VIOLATION,
            (true, true) => EXIT_LVS_AND_DRC,
        }
    }
}

/// Signoff gate evaluation rules.
pub struct SignoffGate;

impl SignoffGate {
    /// Evaluate the verifier outcome together with how the stages ended.
    ///
    /// Gate rule:
    /// - Both LVS and DRC verdicts must pass
    /// - Every stage must have run to completion; spawn failures and timeouts
    ///   fail the gate as operational errors
    /// - Non-zero stage exit codes are reported as warnings only
    pub fn evaluate(outcome: &SignoffOutcome, stages: &[StageResult]) -> GateVerdict {
        let failed_checks = outcome.failed_checks();

        let violations: Vec<String> = [(SignoffCheck::Lvs, &outcome.lvs), (SignoffCheck::Drc, &outcome.drc)]
            .into_iter()
            .filter_map(|(check, verdict)| {
                verdict
                    .reason()
                    .map(|reason| format!("{}: {}", check.name(), reason))
            })
            .collect();

        let stage_errors: Vec<String> = stages
            .iter()
            .filter_map(|s| {
                s.error
                    .as_ref()
                    .map(|error| format!("Stage '{}' did not complete: {}", s.stage_name, error))
            })
            .collect();

        let warnings = stages
            .iter()
            .filter(|s| s.error.is_none() && !s.passed())
            .map(|s| format!("Stage '{}' exited with code {}", s.stage_name, s.exit_code))
            .collect();

        let passed = failed_checks.is_empty() && stage_errors.is_empty();
        let message = if passed {
            "LVS and DRC clean".to_string()
        } else if !stage_errors.is_empty() {
            format!("Gate failed: {} stage(s) did not complete", stage_errors.len())
        } else {
            format!("Gate failed with {} violation(s)", violations.len())
        };

        GateVerdict {
            passed,
            failed_checks,
            violations,
            stage_errors,
            warnings,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use signoff_core::{Verdict, Verifier, ToolRunLog};

    fn outcome(lines: &[&str]) -> SignoffOutcome {
        Verifier::default().verify(&ToolRunLog::from_lines(lines.iter().copied()))
    }

    fn stage(name: &str, exit_code: i32) -> StageResult {
        StageResult {
            stage_name: name.to_string(),
            exit_code,
            duration_ms: 10,
            success: exit_code == 0,
            error: None,
        }
    }

    #[test]
    fn test_clean_log_passes() {
        let verdict = SignoffGate::evaluate(
            &outcome(&[
                "Run Result             : MATCH",
                "Total DRC Results                 : 0 (0)",
            ]),
            &[stage("lvs", 0), stage("drc", 0)],
        );
        assert!(verdict.passed);
        assert!(verdict.violations.is_empty());
        assert_eq!(verdict.exit_code(), EXIT_SUCCESS);
    }

    #[test]
    fn test_lvs_only_failure() {
        let verdict = SignoffGate::evaluate(
            &outcome(&["Total DRC Results                 : 0 (0)"]),
            &[],
        );
        assert!(!verdict.passed);
        assert_eq!(verdict.violations, vec!["lvs: LVS mismatch".to_string()]);
        assert_eq!(verdict.exit_code(), EXIT_LVS_MISMATCH);
    }

    #[test]
    fn test_drc_only_failure() {
        let verdict = SignoffGate::evaluate(
            &outcome(&[
                "Run Result             : MATCH",
                "Total DRC Results                 : 3 (3)",
            ]),
            &[],
        );
        assert_eq!(verdict.violations, vec!["drc: DRC violations present".to_string()]);
        assert_eq!(verdict.exit_code(), EXIT_DRC_VIOLATION);
    }

    #[test]
    fn test_empty_log_fails_both() {
        let verdict = SignoffGate::evaluate(&outcome(&[]), &[]);
        assert!(!verdict.passed);
        assert_eq!(verdict.violations.len(), 2);
        assert_eq!(verdict.exit_code(), EXIT_LVS_AND_DRC);
        assert!(verdict.message.contains("2 violation"));
    }

    fn clean() -> SignoffOutcome {
        SignoffOutcome {
            lvs: Verdict::Pass,
            drc: Verdict::Pass,
            drc_totals: None,
        }
    }

    #[test]
    fn test_nonzero_stage_exit_is_warning_only() {
        let verdict = SignoffGate::evaluate(&clean(), &[stage("par", 1), stage("lvs", 0)]);
        assert!(verdict.passed);
        assert!(verdict.stage_errors.is_empty());
        assert_eq!(verdict.warnings.len(), 1);
        assert!(verdict.warnings[0].contains("code 1"));
        assert_eq!(verdict.exit_code(), EXIT_SUCCESS);
    }

    #[test]
    fn test_timed_out_stage_is_operational_error() {
        // Markers were printed before the tool hung and was killed.
        let verdict = SignoffGate::evaluate(
            &clean(),
            &[
                stage("lvs", 0),
                StageResult::errored(
                    "drc".to_string(),
                    1000,
                    "Stage 'drc' failed to execute: timed out after 1 seconds".to_string(),
                ),
            ],
        );
        assert!(!verdict.passed);
        assert_eq!(verdict.stage_errors.len(), 1);
        assert!(verdict.stage_errors[0].contains("timed out"));
        assert!(verdict.warnings.is_empty());
        assert_eq!(verdict.exit_code(), EXIT_ERROR);
    }

    #[test]
    fn test_stage_error_outranks_check_failures() {
        let verdict = SignoffGate::evaluate(
            &outcome(&[]),
            &[StageResult::errored("lvs".to_string(), 0, "failed to spawn".to_string())],
        );
        assert_eq!(verdict.failed_checks.len(), 2);
        assert_eq!(verdict.exit_code(), EXIT_ERROR);
        assert!(verdict.message.contains("did not complete"));
    }
}
