//! Flow configuration: tool installs, license servers, PDK decks and stages.
//!
//! Loaded once at process start (from `--config` or `SIGNOFF_CONFIG`) and
//! passed by reference to whatever issues tool invocations.

use crate::error::{Result, SignoffError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming the flow configuration file.
pub const CONFIG_ENV: &str = "SIGNOFF_CONFIG";

/// Tool that runs place-and-route (and emits the LVS netlist).
pub const PAR_TOOL: &str = "innovus";

/// Tool that runs DRC and LVS signoff.
pub const SIGNOFF_TOOL: &str = "pegasus";

/// Default per-stage timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 3600;

/// Installed location of one EDA tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInstall {
    /// Installation root, e.g. `/opt/cadence/INNOVUS211`
    pub home: PathBuf,

    /// Executable path; relative paths are resolved against `home`.
    pub bin: PathBuf,

    /// Pinned version string, informational.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl ToolInstall {
    /// Absolute path to the tool executable.
    pub fn executable(&self) -> PathBuf {
        if self.bin.is_absolute() {
            self.bin.clone()
        } else {
            self.home.join(&self.bin)
        }
    }
}

/// License server endpoints, each `port@host`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseConfig {
    #[serde(default)]
    pub cadence: Vec<String>,
}

impl LicenseConfig {
    /// Environment variables the licensed tools read.
    pub fn env_vars(&self) -> BTreeMap<String, String> {
        let mut vars = BTreeMap::new();
        if !self.cadence.is_empty() {
            vars.insert("CDS_LIC_FILE".to_string(), self.cadence.join(":"));
        }
        vars
    }
}

/// A DRC or LVS rule deck shipped with the PDK.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDeck {
    pub tool_name: String,
    pub deck_name: String,
    pub path: PathBuf,
}

/// Process design kit locations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdkConfig {
    pub name: String,
    pub root: PathBuf,

    #[serde(default)]
    pub drc_decks: Vec<RuleDeck>,

    #[serde(default)]
    pub lvs_decks: Vec<RuleDeck>,
}

impl PdkConfig {
    /// First DRC deck for a tool, resolved against the PDK root.
    pub fn drc_deck(&self, tool: &str) -> Option<PathBuf> {
        find_deck(&self.drc_decks, tool).map(|d| self.root.join(&d.path))
    }

    /// First LVS deck for a tool, resolved against the PDK root.
    pub fn lvs_deck(&self, tool: &str) -> Option<PathBuf> {
        find_deck(&self.lvs_decks, tool).map(|d| self.root.join(&d.path))
    }
}

fn find_deck<'a>(decks: &'a [RuleDeck], tool: &str) -> Option<&'a RuleDeck> {
    decks.iter().find(|d| d.tool_name == tool)
}

/// Design under verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignConfig {
    pub top_module: String,

    /// Working directory for tool runs.
    #[serde(default = "default_run_dir")]
    pub run_dir: PathBuf,
}

fn default_run_dir() -> PathBuf {
    PathBuf::from("build/par-rundir")
}

/// A stage entry as written in the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageEntry {
    pub name: String,

    /// Command to execute (first element is executable).
    pub command: Vec<String>,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_enabled() -> bool {
    true
}

/// Complete flow configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowConfig {
    #[serde(default)]
    pub tools: BTreeMap<String, ToolInstall>,

    #[serde(default)]
    pub licenses: LicenseConfig,

    #[serde(default)]
    pub pdk: PdkConfig,

    pub design: DesignConfig,

    /// Explicit stages; when empty the builtin PAR, LVS, DRC sequence is used.
    #[serde(default)]
    pub stages: Vec<StageEntry>,
}

impl FlowConfig {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| SignoffError::io(path, e))?;
        let mut config: FlowConfig = serde_json::from_str(&raw)?;
        config.validate()?;

        let cwd = std::env::current_dir().map_err(|e| SignoffError::io(".", e))?;
        config.anchor_run_dir(&cwd);
        debug!(path = %path.display(), tools = config.tools.len(), "Loaded flow configuration");
        Ok(config)
    }

    /// Make a relative `design.run_dir` absolute against `base`.
    ///
    /// Stages run with `run_dir` as their working directory, so paths built
    /// from it must not be relative to it a second time.
    pub fn anchor_run_dir(&mut self, base: &Path) {
        if self.design.run_dir.is_relative() {
            self.design.run_dir = base.join(&self.design.run_dir);
        }
    }

    /// Load from the path named by `SIGNOFF_CONFIG`.
    pub fn from_env() -> Result<Self> {
        let path = std::env::var(CONFIG_ENV)
            .map_err(|_| SignoffError::Config(format!("{} not set", CONFIG_ENV)))?;
        Self::load(Path::new(&path))
    }

    pub fn tool(&self, name: &str) -> Option<&ToolInstall> {
        self.tools.get(name)
    }

    /// Like [`FlowConfig::tool`], but a missing tool is a configuration error.
    pub fn require_tool(&self, name: &str) -> Result<&ToolInstall> {
        self.tool(name)
            .ok_or_else(|| SignoffError::Config(format!("tool '{}' is not configured", name)))
    }

    /// Environment for tool invocations: license servers plus `<TOOL>_HOME`/`<TOOL>_BIN`.
    pub fn env_vars(&self) -> BTreeMap<String, String> {
        let mut vars = self.licenses.env_vars();
        for (name, install) in &self.tools {
            let prefix = name.to_uppercase().replace('-', "_");
            vars.insert(
                format!("{}_HOME", prefix),
                install.home.to_string_lossy().into_owned(),
            );
            vars.insert(
                format!("{}_BIN", prefix),
                install.executable().to_string_lossy().into_owned(),
            );
        }
        vars
    }

    /// Check internal consistency, reporting every problem at once.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        if self.design.top_module.trim().is_empty() {
            problems.push("design.top_module is empty".to_string());
        }

        for endpoint in &self.licenses.cadence {
            if !is_license_endpoint(endpoint) {
                problems.push(format!(
                    "license endpoint '{}' is not of the form port@host",
                    endpoint
                ));
            }
        }

        for deck in self.pdk.drc_decks.iter().chain(&self.pdk.lvs_decks) {
            if deck.path.as_os_str().is_empty() {
                problems.push(format!("rule deck '{}' has no path", deck.deck_name));
            }
        }

        if self.stages.is_empty() {
            for tool in [PAR_TOOL, SIGNOFF_TOOL] {
                if !self.tools.contains_key(tool) {
                    problems.push(format!("builtin stages require tool '{}'", tool));
                }
            }
            if self.pdk.lvs_deck(SIGNOFF_TOOL).is_none() {
                problems.push(format!("no LVS deck for '{}'", SIGNOFF_TOOL));
            }
            if self.pdk.drc_deck(SIGNOFF_TOOL).is_none() {
                problems.push(format!("no DRC deck for '{}'", SIGNOFF_TOOL));
            }
        }

        for stage in &self.stages {
            if stage.command.is_empty() {
                problems.push(format!("stage '{}' has an empty command", stage.name));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(SignoffError::Config(problems.join("; ")))
        }
    }
}

fn is_license_endpoint(endpoint: &str) -> bool {
    match endpoint.split_once('@') {
        Some((port, host)) => port.parse::<u16>().is_ok() && !host.trim().is_empty(),
        None => false,
    }
}
