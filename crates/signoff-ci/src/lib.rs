//! Signoff CI - physical-verification gating for chip-design CI jobs
//!
//! Provides a pipeline that:
//! - Executes signoff stages (PAR, LVS, DRC) with their output captured into one log
//! - Verifies the log for LVS match and clean DRC totals
//! - Maps the verdict to a process exit code and archives failing logs

pub mod gate;
pub mod pipeline;
pub mod runner;
pub mod stage;

// Re-export key types
pub use gate::{GateVerdict, SignoffGate};
pub use pipeline::{verify_log_file, PipelineOptions, PipelineResult, SignoffPipeline, Verification};
pub use runner::{StageExecutor, StageResult, StageRunner};
pub use stage::{BuiltinStage, StageConfig};
