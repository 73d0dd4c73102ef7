//! Signoff stage execution with output capture.
//!
//! Each stage's stdout and stderr are both redirected into the same log file,
//! opened in append mode, so one log accumulates the whole PAR/LVS/DRC run.

use crate::stage::StageConfig;
use async_trait::async_trait;
use signoff_core::{FlowConfig, Result, SignoffError};
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, warn};

/// Result of a stage execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageResult {
    /// Stage name.
    pub stage_name: String,

    /// Exit code (0 = success, -1 = killed or never started).
    pub exit_code: i32,

    /// Duration in milliseconds.
    pub duration_ms: u64,

    /// Whether execution succeeded.
    pub success: bool,

    /// Set when the stage could not be run at all.
    pub error: Option<String>,
}

impl StageResult {
    /// Whether this stage passed (exit code 0).
    pub fn passed(&self) -> bool {
        self.success && self.exit_code == 0
    }

    /// Result for a stage that never produced an exit status.
    pub fn errored(stage_name: String, duration_ms: u64, error: String) -> Self {
        Self {
            stage_name,
            exit_code: -1,
            duration_ms,
            success: false,
            error: Some(error),
        }
    }
}

/// Runs one stage, capturing its output into a log file.
#[async_trait]
pub trait StageExecutor: Send + Sync {
    async fn execute(&self, config: &StageConfig, log_path: &Path) -> Result<StageResult>;
}

/// Executes stages as external processes.
#[derive(Debug, Clone, Default)]
pub struct StageRunner {
    env: BTreeMap<String, String>,
    working_dir: Option<PathBuf>,
}

impl StageRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runner with the flow's tool/license environment, working in its run directory.
    pub fn from_flow(config: &FlowConfig) -> Self {
        Self {
            env: config.env_vars(),
            working_dir: Some(config.design.run_dir.clone()),
        }
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }
}

#[async_trait]
impl StageExecutor for StageRunner {
    async fn execute(&self, config: &StageConfig, log_path: &Path) -> Result<StageResult> {
        let start = Instant::now();

        let (exe, args) = config.command.split_first().ok_or_else(|| SignoffError::Stage {
            stage: config.name.clone(),
            reason: "empty command".to_string(),
        })?;

        let stdout = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)
            .map_err(|e| SignoffError::io(log_path, e))?;
        let stderr = stdout.try_clone().map_err(|e| SignoffError::io(log_path, e))?;

        let mut command = Command::new(exe);
        command
            .args(args)
            .envs(&self.env)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        debug!(stage = %config.name, command = ?config.command, "Spawning stage");
        let mut child = command.spawn().map_err(|e| SignoffError::Stage {
            stage: config.name.clone(),
            reason: format!("failed to spawn '{}': {}", exe, e),
        })?;

        let waited = if config.timeout_secs > 0 {
            let timed =
                tokio::time::timeout(Duration::from_secs(config.timeout_secs), child.wait()).await;
            match timed {
                Ok(status) => status,
                Err(_) => {
                    warn!(stage = %config.name, timeout_secs = config.timeout_secs, "Stage timed out, killing");
                    if let Err(e) = child.kill().await {
                        warn!(stage = %config.name, error = %e, "Failed to kill timed out stage");
                    }
                    return Err(SignoffError::Stage {
                        stage: config.name.clone(),
                        reason: format!("timed out after {} seconds", config.timeout_secs),
                    });
                }
            }
        } else {
            child.wait().await
        };

        let status = waited.map_err(|e| SignoffError::Stage {
            stage: config.name.clone(),
            reason: format!("failed to wait for process: {}", e),
        })?;

        Ok(StageResult {
            stage_name: config.name.clone(),
            exit_code: status.code().unwrap_or(-1),
            duration_ms: start.elapsed().as_millis() as u64,
            success: status.success(),
            error: None,
        })
    }
}
