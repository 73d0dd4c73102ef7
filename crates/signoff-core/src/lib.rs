//! Signoff Core
//!
//! Decides whether a chip-design CI job passed physical verification:
//! - `verify`: LVS/DRC result verifier over captured tool output
//! - `log`: the captured tool-run log
//! - `config`: tool installs, license servers, PDK decks and stages
//! - `report`: verification reports and archiving of failed logs
//!
//! The verifier is pure: it never performs I/O and never errors. A missing
//! report marker is a failing verdict.

pub mod config;
pub mod error;
pub mod log;
pub mod report;
pub mod telemetry;
pub mod verdict;
pub mod verify;

pub use config::{
    DesignConfig, FlowConfig, LicenseConfig, PdkConfig, RuleDeck, StageEntry, ToolInstall,
};
pub use error::{Result, SignoffError};
pub use log::ToolRunLog;
pub use report::{ArchivedLog, LogArchive, VerificationReport};
pub use telemetry::{init_tracing, LogFormat};
pub use verdict::{DrcTotals, SignoffCheck, SignoffOutcome, Verdict};
pub use verify::{
    verify_drc, verify_drc_structured, verify_lvs, verify_lvs_structured, MatchMode, Verifier,
    DRC_CLEAN_MARKER, LVS_MATCH_MARKER,
};

/// Signoff version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
