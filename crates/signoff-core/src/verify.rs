//! Result verifier for signoff tool reports.
//!
//! Classifies captured LVS and DRC output as clean or failing. Two matching
//! modes are supported:
//!
//! - [`MatchMode::Literal`] looks for the exact report lines the signoff tool
//!   prints today, whitespace included. This is what CI gates on by default.
//! - [`MatchMode::Structured`] parses `key : value` report lines with
//!   whitespace normalised, and extracts the DRC totals. For well-formed
//!   reports it accepts everything literal matching accepts; a marker glued
//!   to more letters (`MATCHED`) passes literal matching only.
//!
//! Verification never fails with an error: a missing marker is a failing
//! verdict, including for an empty log.

use crate::log::ToolRunLog;
use crate::verdict::{
    DrcTotals, SignoffOutcome, Verdict, DRC_VIOLATION_REASON, LVS_MISMATCH_REASON,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Report line printed by the LVS tool when layout and schematic match.
pub const LVS_MATCH_MARKER: &str = "Run Result             : MATCH";

/// Report line printed by the DRC tool when no rule is violated.
pub const DRC_CLEAN_MARKER: &str = "Total DRC Results                 : 0 (0)";

const LVS_KEY: &str = "Run Result";
const LVS_MATCH_VALUE: &str = "MATCH";
const DRC_KEY: &str = "Total DRC Results";

/// How report lines are recognised.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Exact substring match on the marker lines.
    #[default]
    Literal,
    /// Whitespace-insensitive `key : value` parsing.
    Structured,
}

impl MatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchMode::Literal => "literal",
            MatchMode::Structured => "structured",
        }
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "literal" => Ok(MatchMode::Literal),
            "structured" => Ok(MatchMode::Structured),
            other => Err(format!(
                "unknown match mode '{}' (expected literal or structured)",
                other
            )),
        }
    }
}

/// PASS if any line contains [`LVS_MATCH_MARKER`].
pub fn verify_lvs(log: &ToolRunLog) -> Verdict {
    if log.lines().any(|line| line.contains(LVS_MATCH_MARKER)) {
        Verdict::Pass
    } else {
        Verdict::fail(LVS_MISMATCH_REASON)
    }
}

/// PASS if any line contains [`DRC_CLEAN_MARKER`].
pub fn verify_drc(log: &ToolRunLog) -> Verdict {
    if log.lines().any(|line| line.contains(DRC_CLEAN_MARKER)) {
        Verdict::Pass
    } else {
        Verdict::fail(DRC_VIOLATION_REASON)
    }
}

/// PASS if any line reports `Run Result : MATCH`, ignoring spacing.
///
/// The value's leading word is compared, so trailing punctuation such as
/// `MATCH,` or `MATCH.` still counts.
pub fn verify_lvs_structured(log: &ToolRunLog) -> Verdict {
    let matched = log
        .lines()
        .filter_map(|line| report_value(line, LVS_KEY))
        .any(|value| leading_word(&value) == LVS_MATCH_VALUE);

    if matched {
        Verdict::Pass
    } else {
        Verdict::fail(LVS_MISMATCH_REASON)
    }
}

/// PASS if any `Total DRC Results` line parses to `0 (0)`.
///
/// Also returns the last totals found, clean or not.
pub fn verify_drc_structured(log: &ToolRunLog) -> (Verdict, Option<DrcTotals>) {
    let mut clean = false;
    let mut last = None;

    for totals in log
        .lines()
        .filter_map(|line| report_value(line, DRC_KEY))
        .filter_map(|value| parse_drc_totals(&value))
    {
        clean |= totals.is_clean();
        last = Some(totals);
    }

    let verdict = if clean {
        Verdict::Pass
    } else {
        Verdict::fail(DRC_VIOLATION_REASON)
    };
    (verdict, last)
}

/// Stateless verifier bound to a match mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Verifier {
    mode: MatchMode,
}

impl Verifier {
    pub fn new(mode: MatchMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    pub fn lvs(&self, log: &ToolRunLog) -> Verdict {
        match self.mode {
            MatchMode::Literal => verify_lvs(log),
            MatchMode::Structured => verify_lvs_structured(log),
        }
    }

    pub fn drc(&self, log: &ToolRunLog) -> Verdict {
        match self.mode {
            MatchMode::Literal => verify_drc(log),
            MatchMode::Structured => verify_drc_structured(log).0,
        }
    }

    /// Run both checks over the same log.
    pub fn verify(&self, log: &ToolRunLog) -> SignoffOutcome {
        match self.mode {
            MatchMode::Literal => SignoffOutcome {
                lvs: verify_lvs(log),
                drc: verify_drc(log),
                drc_totals: None,
            },
            MatchMode::Structured => {
                let (drc, drc_totals) = verify_drc_structured(log);
                SignoffOutcome {
                    lvs: verify_lvs_structured(log),
                    drc,
                    drc_totals,
                }
            }
        }
    }
}

/// Collapse whitespace runs to one space and drop spaces around `:`.
fn normalize(line: &str) -> String {
    let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.replace(" :", ":").replace(": ", ":")
}

/// Value following `key:` on a normalised report line.
fn report_value(line: &str, key: &str) -> Option<String> {
    let normalized = normalize(line);
    let needle = format!("{}:", key);
    let start = normalized.find(&needle)? + needle.len();
    Some(normalized[start..].to_string())
}

/// Leading run of ASCII letters.
fn leading_word(value: &str) -> &str {
    let end = value
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(value.len());
    &value[..end]
}

/// Parse `<results> (<violations>)`, with or without the space.
fn parse_drc_totals(value: &str) -> Option<DrcTotals> {
    let (results, rest) = value.split_once('(')?;
    let (violations, _) = rest.split_once(')')?;
    Some(DrcTotals {
        results: results.trim().parse().ok()?,
        violations: violations.trim().parse().ok()?,
    })
}
