//! Signoff CLI
//!
//! The `signoff` command gates chip-design CI jobs on physical verification.
//!
//! ## Commands
//!
//! - `verify`: Check a captured PAR/LVS/DRC log for LVS match and clean DRC
//! - `run`: Execute the configured signoff stages, then verify their log
//! - `config`: Validate or print a flow configuration
//!
//! Exit code 0 means LVS and DRC both passed; see `signoff_ci::gate` for the
//! failure codes.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use signoff_ci::gate::EXIT_ERROR;
use signoff_ci::{
    verify_log_file, PipelineOptions, SignoffPipeline, StageConfig, StageRunner, Verification,
};
use signoff_core::config::CONFIG_ENV;
use signoff_core::{FlowConfig, LogArchive, LogFormat, MatchMode};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, Level};

#[derive(Parser)]
#[command(name = "signoff")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Gate chip-design CI on LVS/DRC signoff results", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify a captured signoff log
    Verify {
        /// Log file holding the combined LVS and DRC tool output
        #[arg(short, long)]
        log: PathBuf,

        /// Marker matching: literal (exact report lines) or structured
        #[arg(short, long, default_value = "literal")]
        mode: MatchMode,

        /// Copy failing logs and their report into this directory
        #[arg(long)]
        archive_dir: Option<PathBuf>,

        /// Write the JSON verification report to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Run signoff stages and verify their combined output
    Run {
        /// Flow configuration file (JSON)
        #[arg(short, long, env = CONFIG_ENV)]
        config: PathBuf,

        /// Log file receiving every stage's stdout and stderr
        #[arg(short, long, default_value = "signoff.log")]
        log: PathBuf,

        /// Stages to run (comma-separated, default: all configured)
        #[arg(short, long)]
        stages: Option<String>,

        /// Marker matching: literal (exact report lines) or structured
        #[arg(short, long, default_value = "literal")]
        mode: MatchMode,

        /// Copy failing logs and their report into this directory
        #[arg(long)]
        archive_dir: Option<PathBuf>,
    },

    /// Flow configuration operations
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate a flow configuration
    Check {
        #[arg(short, long, env = CONFIG_ENV)]
        config: PathBuf,
    },

    /// Print the effective stages and tool environment
    Show {
        #[arg(short, long, env = CONFIG_ENV)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    signoff_core::init_tracing(LogFormat::from_json_flag(cli.json), level);

    match dispatch(cli.command).await {
        Ok(code) => exit_code(code),
        Err(e) => {
            error!(error = %format!("{:#}", e), "signoff failed");
            eprintln!("Error: {:#}", e);
            exit_code(EXIT_ERROR)
        }
    }
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

async fn dispatch(command: Commands) -> Result<i32> {
    match command {
        Commands::Verify {
            log,
            mode,
            archive_dir,
            report,
        } => cmd_verify(&log, mode, archive_dir.as_deref(), report.as_deref()),
        Commands::Run {
            config,
            log,
            stages,
            mode,
            archive_dir,
        } => cmd_run(&config, &log, stages.as_deref(), mode, archive_dir.as_deref()).await,
        Commands::Config { action } => match action {
            ConfigAction::Check { config } => cmd_config_check(&config),
            ConfigAction::Show { config } => cmd_config_show(&config),
        },
    }
}

/// Verify an existing log
fn cmd_verify(
    log: &Path,
    mode: MatchMode,
    archive_dir: Option<&Path>,
    report: Option<&Path>,
) -> Result<i32> {
    let archive = archive_dir.map(LogArchive::new);
    let verification = verify_log_file(log, mode, archive.as_ref(), &[])?;

    if let Some(path) = report {
        verification
            .report
            .write(path)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
    }

    print_verification(&verification);
    Ok(verification.exit_code())
}

/// Run the configured stages, then verify
async fn cmd_run(
    config_path: &Path,
    log: &Path,
    stages_filter: Option<&str>,
    mode: MatchMode,
    archive_dir: Option<&Path>,
) -> Result<i32> {
    let config = FlowConfig::load(config_path)
        .with_context(|| format!("Failed to load flow config {}", config_path.display()))?;

    let stages = select_stages(StageConfig::from_flow(&config)?, stages_filter)?;

    std::fs::create_dir_all(&config.design.run_dir).with_context(|| {
        format!(
            "Failed to create run directory {}",
            config.design.run_dir.display()
        )
    })?;

    // Stages run inside run_dir, so anchor a relative log path to the caller's cwd
    let log = if log.is_relative() {
        std::env::current_dir()?.join(log)
    } else {
        log.to_path_buf()
    };

    let mut options = PipelineOptions::new(&log).with_mode(mode);
    if let Some(dir) = archive_dir {
        options = options.with_archive(LogArchive::new(dir));
    }

    println!("Running signoff for top module: {}", config.design.top_module);
    println!(
        "Stages: {}",
        stages
            .iter()
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("Log: {}", log.display());
    println!();

    let runner = Arc::new(StageRunner::from_flow(&config));
    let result = SignoffPipeline::run(runner, stages, &options)
        .await
        .context("Signoff pipeline failed to run")?;

    println!("Run ID: {}", result.run_id);
    println!("Duration: {}ms", result.duration_ms);
    for stage in &result.stages {
        let status = if stage.passed() { "✓" } else { "✗" };
        println!(
            "  {} {} ({}ms, exit code: {})",
            status, stage.stage_name, stage.duration_ms, stage.exit_code
        );
    }
    println!(
        "Summary: {}/{} stages exited cleanly",
        result.passed_count(),
        result.stages.len()
    );
    println!();

    print_verification(&result.verification);
    Ok(result.verification.exit_code())
}

/// Keep only the named stages, in configured order.
fn select_stages(stages: Vec<StageConfig>, filter: Option<&str>) -> Result<Vec<StageConfig>> {
    let Some(filter) = filter else {
        return Ok(stages);
    };

    let wanted: Vec<String> = filter
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();

    for name in &wanted {
        if !stages.iter().any(|s| &s.name.to_lowercase() == name) {
            anyhow::bail!("Unknown stage: {}", name);
        }
    }

    Ok(stages
        .into_iter()
        .filter(|s| wanted.contains(&s.name.to_lowercase()))
        .collect())
}

fn cmd_config_check(config_path: &Path) -> Result<i32> {
    let config = FlowConfig::load(config_path)
        .with_context(|| format!("Invalid flow config {}", config_path.display()))?;
    info!(path = %config_path.display(), "Flow configuration is valid");
    println!(
        "✓ {} is valid ({} tools, {} stages)",
        config_path.display(),
        config.tools.len(),
        StageConfig::from_flow(&config)?.len()
    );
    Ok(0)
}

fn cmd_config_show(config_path: &Path) -> Result<i32> {
    let config = FlowConfig::load(config_path)
        .with_context(|| format!("Invalid flow config {}", config_path.display()))?;

    let shown = serde_json::json!({
        "design": &config.design,
        "pdk": &config.pdk,
        "env": config.env_vars(),
        "stages": StageConfig::from_flow(&config)?,
    });
    println!("{}", serde_json::to_string_pretty(&shown)?);
    Ok(0)
}

fn print_verification(verification: &Verification) {
    let outcome = &verification.outcome;
    println!("LVS: {}", outcome.lvs);
    println!("DRC: {}", outcome.drc);
    if let Some(totals) = outcome.drc_totals {
        println!(
            "DRC totals: {} ({})",
            totals.results, totals.violations
        );
    }

    let gate = &verification.gate;
    println!(
        "Gate: {}",
        if gate.passed { "✓ PASSED" } else { "✗ FAILED" }
    );
    for violation in &gate.violations {
        println!("  - {}", violation);
    }
    for error in &gate.stage_errors {
        println!("  ✗ {}", error);
    }
    for warning in &gate.warnings {
        println!("  ! {}", warning);
    }
    if let Some(archived) = &verification.archived {
        println!("Log preserved at {}", archived.log.display());
    }
}
