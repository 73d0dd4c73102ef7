//! Signoff pipeline orchestration: run stages, verify the log, gate.

use crate::gate::{GateVerdict, SignoffGate};
use crate::runner::{StageExecutor, StageResult};
use crate::stage::StageConfig;
use anyhow::Context;
use signoff_core::{
    ArchivedLog, LogArchive, MatchMode, SignoffOutcome, ToolRunLog, VerificationReport, Verifier,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

/// Verification of one captured log.
#[derive(Debug, Clone)]
pub struct Verification {
    pub outcome: SignoffOutcome,
    pub report: VerificationReport,
    pub gate: GateVerdict,

    /// Set when the log failed and an archive directory was configured.
    pub archived: Option<ArchivedLog>,
}

impl Verification {
    pub fn passed(&self) -> bool {
        self.gate.passed
    }

    pub fn exit_code(&self) -> i32 {
        self.gate.exit_code()
    }
}

/// Verify an existing log file, preserving it in `archive` if it fails.
pub fn verify_log_file(
    log_path: &Path,
    mode: MatchMode,
    archive: Option<&LogArchive>,
    stages: &[StageResult],
) -> anyhow::Result<Verification> {
    let log = ToolRunLog::read(log_path)
        .with_context(|| format!("Failed to read signoff log {}", log_path.display()))?;

    let outcome = Verifier::new(mode).verify(&log);
    let report = VerificationReport::new(&log, mode, &outcome);
    let gate = SignoffGate::evaluate(&outcome, stages);

    info!(
        log = %log_path.display(),
        lines = log.len(),
        mode = %mode,
        lvs = %outcome.lvs,
        drc = %outcome.drc,
        "Verified signoff log"
    );

    let archived = match archive {
        Some(archive) if !gate.passed => Some(
            archive
                .preserve(log_path, &report)
                .context("Failed to archive signoff log")?,
        ),
        _ => None,
    };

    Ok(Verification {
        outcome,
        report,
        gate,
        archived,
    })
}

/// Options for a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// File receiving the combined output of every stage; truncated first.
    pub log_path: PathBuf,
    pub mode: MatchMode,
    pub archive: Option<LogArchive>,
}

impl PipelineOptions {
    pub fn new(log_path: impl Into<PathBuf>) -> Self {
        Self {
            log_path: log_path.into(),
            mode: MatchMode::default(),
            archive: None,
        }
    }

    pub fn with_mode(mut self, mode: MatchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_archive(mut self, archive: LogArchive) -> Self {
        self.archive = Some(archive);
        self
    }
}

/// Result of a complete signoff pipeline execution.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub run_id: String,

    /// Results of individual stages.
    pub stages: Vec<StageResult>,

    pub verification: Verification,

    /// Total duration in milliseconds.
    pub duration_ms: u64,
}

impl PipelineResult {
    /// Whether every stage completed and LVS and DRC both passed.
    pub fn success(&self) -> bool {
        self.verification.passed()
    }

    /// Number of stages that passed.
    pub fn passed_count(&self) -> usize {
        self.stages.iter().filter(|s| s.passed()).count()
    }

    /// Number of stages that failed.
    pub fn failed_count(&self) -> usize {
        self.stages.iter().filter(|s| !s.passed()).count()
    }
}

/// Signoff pipeline orchestrator.
pub struct SignoffPipeline;

impl SignoffPipeline {
    /// Run every enabled stage in order, then verify the captured log.
    ///
    /// Stages run in sequence; a stage that fails to start or times out is
    /// recorded and the next stage still runs. Such a stage fails the gate
    /// with an operational error even if the log markers are clean.
    pub async fn run(
        executor: Arc<dyn StageExecutor>,
        stages: Vec<StageConfig>,
        options: &PipelineOptions,
    ) -> anyhow::Result<PipelineResult> {
        let start = Instant::now();
        let run_id = Uuid::new_v4().to_string();

        if let Some(parent) = options.log_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        tokio::fs::write(&options.log_path, b"")
            .await
            .with_context(|| format!("Failed to truncate {}", options.log_path.display()))?;

        info!(run_id = %run_id, log = %options.log_path.display(), "Starting signoff pipeline");

        let mut stage_results = Vec::new();
        for config in stages {
            if !config.enabled {
                info!(stage = %config.name, "Skipping disabled stage");
                continue;
            }

            info!(stage = %config.name, "Executing stage");
            let stage_start = Instant::now();
            let result = match executor.execute(&config, &options.log_path).await {
                Ok(result) => result,
                Err(e) => {
                    warn!(stage = %config.name, error = %e, "Stage execution error");
                    StageResult::errored(
                        config.name.clone(),
                        stage_start.elapsed().as_millis() as u64,
                        e.to_string(),
                    )
                }
            };

            if !result.passed() && result.error.is_none() {
                warn!(stage = %result.stage_name, exit_code = result.exit_code, "Stage exited non-zero");
            }
            stage_results.push(result);
        }

        let verification = verify_log_file(
            &options.log_path,
            options.mode,
            options.archive.as_ref(),
            &stage_results,
        )?;

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            run_id = %run_id,
            passed = verification.passed(),
            duration_ms,
            "Signoff pipeline finished"
        );

        Ok(PipelineResult {
            run_id,
            stages: stage_results,
            verification,
            duration_ms,
        })
    }
}
