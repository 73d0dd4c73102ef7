//! Signoff stage definitions and configuration.

use serde::{Deserialize, Serialize};
use signoff_core::config::{FlowConfig, StageEntry, DEFAULT_TIMEOUT_SECS, PAR_TOOL, SIGNOFF_TOOL};
use signoff_core::{Result, SignoffError};
use std::path::Path;

/// Builtin signoff stages, in flow order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinStage {
    /// innovus -nowin -files <run_dir>/par.tcl
    Par,

    /// pegasus -lvs -top_cell <top> <lvs deck>
    Lvs,

    /// pegasus -drc -top_cell <top> <drc deck>
    Drc,
}

impl BuiltinStage {
    /// All builtin stages in the order they run.
    pub const FLOW: [BuiltinStage; 3] = [BuiltinStage::Par, BuiltinStage::Lvs, BuiltinStage::Drc];

    /// Get the stage name as a string.
    pub fn name(&self) -> &'static str {
        match self {
            BuiltinStage::Par => "par",
            BuiltinStage::Lvs => "lvs",
            BuiltinStage::Drc => "drc",
        }
    }

    /// Parse a stage name as given on the command line.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "par" => Some(BuiltinStage::Par),
            "lvs" => Some(BuiltinStage::Lvs),
            "drc" => Some(BuiltinStage::Drc),
            _ => None,
        }
    }

    /// Build the stage's command from the flow configuration.
    pub fn command(&self, config: &FlowConfig) -> Result<Vec<String>> {
        let top = config.design.top_module.clone();
        match self {
            BuiltinStage::Par => {
                let innovus = config.require_tool(PAR_TOOL)?.executable();
                let script = config.design.run_dir.join("par.tcl");
                Ok(vec![
                    path_arg(&innovus),
                    "-nowin".to_string(),
                    "-files".to_string(),
                    path_arg(&script),
                ])
            }
            BuiltinStage::Lvs => {
                let pegasus = config.require_tool(SIGNOFF_TOOL)?.executable();
                let deck = config.pdk.lvs_deck(SIGNOFF_TOOL).ok_or_else(|| {
                    SignoffError::Config(format!("no LVS deck for '{}'", SIGNOFF_TOOL))
                })?;
                Ok(vec![
                    path_arg(&pegasus),
                    "-lvs".to_string(),
                    "-top_cell".to_string(),
                    top,
                    path_arg(&deck),
                ])
            }
            BuiltinStage::Drc => {
                let pegasus = config.require_tool(SIGNOFF_TOOL)?.executable();
                let deck = config.pdk.drc_deck(SIGNOFF_TOOL).ok_or_else(|| {
                    SignoffError::Config(format!("no DRC deck for '{}'", SIGNOFF_TOOL))
                })?;
                Ok(vec![
                    path_arg(&pegasus),
                    "-drc".to_string(),
                    "-top_cell".to_string(),
                    top,
                    path_arg(&deck),
                ])
            }
        }
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Configuration for a signoff stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageConfig {
    /// Human-readable stage name.
    pub name: String,

    /// Command to execute (first element is executable).
    pub command: Vec<String>,

    /// Timeout in seconds (0 disables the timeout).
    pub timeout_secs: u64,

    /// Whether this stage is enabled.
    pub enabled: bool,
}

impl StageConfig {
    /// Create a stage configuration from a builtin stage.
    pub fn from_builtin(stage: BuiltinStage, config: &FlowConfig, timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            name: stage.name().to_string(),
            command: stage.command(config)?,
            timeout_secs,
            enabled: true,
        })
    }

    /// Create a custom stage configuration.
    pub fn custom(name: String, command: Vec<String>, timeout_secs: u64) -> Self {
        Self {
            name,
            command,
            timeout_secs,
            enabled: true,
        }
    }

    /// Disable this stage.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// The flow's stages: explicit entries if any, else PAR, LVS, DRC.
    pub fn from_flow(config: &FlowConfig) -> Result<Vec<Self>> {
        if config.stages.is_empty() {
            BuiltinStage::FLOW
                .iter()
                .map(|stage| Self::from_builtin(*stage, config, DEFAULT_TIMEOUT_SECS))
                .collect()
        } else {
            Ok(config.stages.iter().map(Self::from).collect())
        }
    }
}

impl From<&StageEntry> for StageConfig {
    fn from(entry: &StageEntry) -> Self {
        Self {
            name: entry.name.clone(),
            command: entry.command.clone(),
            timeout_secs: entry.timeout_secs,
            enabled: entry.enabled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flow() -> FlowConfig {
        serde_json::from_str(
            r#"{
                "tools": {
                    "innovus": { "home": "/opt/innovus", "bin": "bin/innovus" },
                    "pegasus": { "home": "/opt/pegasus", "bin": "bin/pegasus" }
                },
                "pdk": {
                    "name": "asap7",
                    "root": "/pdk",
                    "drc_decks": [{ "tool_name": "pegasus", "deck_name": "drc", "path": "drc.rul" }],
                    "lvs_decks": [{ "tool_name": "pegasus", "deck_name": "lvs", "path": "lvs.rul" }]
                },
                "design": { "top_module": "gcd", "run_dir": "/work/run" }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_builtin_stage_names() {
        assert_eq!(BuiltinStage::Par.name(), "par");
        assert_eq!(BuiltinStage::Lvs.name(), "lvs");
        assert_eq!(BuiltinStage::Drc.name(), "drc");
        assert_eq!(BuiltinStage::from_name(" DRC "), Some(BuiltinStage::Drc));
        assert_eq!(BuiltinStage::from_name("fmt"), None);
    }

    #[test]
    fn test_builtin_stage_commands() {
        let config = flow();

        let par = BuiltinStage::Par.command(&config).unwrap();
        assert_eq!(par, vec!["/opt/innovus/bin/innovus", "-nowin", "-files", "/work/run/par.tcl"]);

        let lvs = BuiltinStage::Lvs.command(&config).unwrap();
        assert_eq!(lvs[0], "/opt/pegasus/bin/pegasus");
        assert!(lvs.contains(&"-lvs".to_string()));
        assert_eq!(lvs.last().unwrap(), "/pdk/lvs.rul");

        let drc = BuiltinStage::Drc.command(&config).unwrap();
        assert!(drc.contains(&"gcd".to_string()));
        assert_eq!(drc.last().unwrap(), "/pdk/drc.rul");
    }

    #[test]
    fn test_par_script_absolute_with_default_run_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flow.json");
        let mut json: serde_json::Value = serde_json::to_value(flow()).unwrap();
        json["design"] = serde_json::json!({ "top_module": "gcd" });
        std::fs::write(&path, json.to_string()).unwrap();

        let config = FlowConfig::load(&path).unwrap();
        let par = BuiltinStage::Par.command(&config).unwrap();
        let script = Path::new(&par[3]);

        // Stages run inside run_dir, so the script path must not be relative to it.
        assert!(script.is_absolute());
        assert_eq!(script, config.design.run_dir.join("par.tcl"));
        assert!(script.ends_with("build/par-rundir/par.tcl"));
    }

    #[test]
    fn test_builtin_stage_missing_tool() {
        let mut config = flow();
        config.tools.remove("pegasus");
        assert!(BuiltinStage::Drc.command(&config).is_err());
        assert!(BuiltinStage::Par.command(&config).is_ok());
    }

    #[test]
    fn test_from_flow_defaults_to_builtin_order() {
        let stages = StageConfig::from_flow(&flow()).unwrap();
        let names: Vec<&str> = stages.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["par", "lvs", "drc"]);
        assert!(stages.iter().all(|s| s.timeout_secs == DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn test_from_flow_uses_explicit_entries() {
        let mut config = flow();
        config.stages.push(StageEntry {
            name: "klayout_drc".to_string(),
            command: vec!["klayout".to_string(), "-b".to_string()],
            timeout_secs: 120,
            enabled: false,
        });
        let stages = StageConfig::from_flow(&config).unwrap();
        assert_eq!(stages.len(), 1);
        assert_eq!(stages[0].name, "klayout_drc");
        assert!(!stages[0].enabled);
    }

    #[test]
    fn test_stage_config_custom_and_disabled() {
        let config = StageConfig::custom(
            "my_stage".to_string(),
            vec!["echo".to_string(), "hello".to_string()],
            60,
        );
        assert_eq!(config.timeout_secs, 60);
        assert!(config.enabled);
        assert!(!config.disabled().enabled);
    }
}
