//! Tracing setup for the signoff binaries.
//!
//! Logs always go to stderr so stdout carries only the verification
//! summary that CI scripts capture.

use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Shape of emitted log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable, for local runs.
    #[default]
    Text,
    /// One JSON object per event, for CI log collectors.
    Json,
}

impl LogFormat {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// Filter directive used when `RUST_LOG` is unset or unparseable.
fn default_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()))
}

/// Install the global subscriber.
///
/// Returns `false` if a subscriber was already installed; the first one wins.
pub fn init_tracing(format: LogFormat, level: Level) -> bool {
    let stderr = fmt::layer().with_target(false).with_writer(std::io::stderr);
    let events = match format {
        LogFormat::Json => stderr.json().boxed(),
        LogFormat::Text => stderr.boxed(),
    };

    tracing_subscriber::registry()
        .with(events)
        .with(default_filter(level))
        .try_init()
        .is_ok()
}
