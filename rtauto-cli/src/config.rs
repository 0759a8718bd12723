//! Run settings: optional TOML file, overridden by command-line flags.
//!
//! ```toml
//! tool = "/opt/rawtherapee/rawtherapee-cli"
//! gate_interval_ms = 100
//! exit_grace_secs = 30
//!
//! [monitor]
//! poll_interval_ms = 100
//! settle_time_ms = 0
//! collision_policy = "warn"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use staging_monitor::{CollisionPolicy, MonitorConfig};

use crate::cli::Args;
use crate::error::{AppError, Result};

/// Contents of the `--config` file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub tool: Option<PathBuf>,
    pub profile: Option<PathBuf>,
    pub gate_interval_ms: Option<u64>,
    pub exit_grace_secs: Option<u64>,
    pub monitor: MonitorConfig,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::parse(&content)
            .map_err(|e| AppError::config(format!("invalid {}: {}", path.display(), e)))
    }

    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

/// Everything a run needs, after merging file and flags.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub tool: Option<PathBuf>,
    pub profile: Option<PathBuf>,
    pub monitor: MonitorConfig,
    /// How often the completion gate is checked.
    pub gate_interval: Duration,
    /// Give up this long after the converter exited without progress.
    pub exit_grace: Option<Duration>,
    pub forward_tool_output: bool,
}

const DEFAULT_GATE_INTERVAL_MS: u64 = 100;

impl RunSettings {
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            tool: None,
            profile: None,
            monitor: MonitorConfig::default(),
            gate_interval: Duration::from_millis(DEFAULT_GATE_INTERVAL_MS),
            exit_grace: None,
            forward_tool_output: false,
        }
    }

    pub fn from_args(args: &Args) -> Result<Self> {
        let file = match &args.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Self::merge(args, file)
    }

    fn merge(args: &Args, file: FileConfig) -> Result<Self> {
        if !args.source.is_dir() {
            return Err(AppError::InvalidInput(format!(
                "{} is not an existing directory",
                args.source.display()
            )));
        }
        if args.destination.exists() && !args.destination.is_dir() {
            return Err(AppError::InvalidInput(format!(
                "{} exists and is not a directory",
                args.destination.display()
            )));
        }

        let mut monitor = file.monitor;
        if let Some(ms) = args.poll_interval_ms {
            monitor.poll_interval_ms = ms;
        }
        if let Some(ms) = args.settle_ms {
            monitor.settle_time_ms = ms;
        }
        if args.abort_on_collision {
            monitor.collision_policy = CollisionPolicy::Abort;
        }

        Ok(Self {
            source: args.source.clone(),
            destination: args.destination.clone(),
            tool: args.tool.clone().or(file.tool),
            profile: args.profile.clone().or(file.profile),
            monitor,
            gate_interval: Duration::from_millis(
                file.gate_interval_ms.unwrap_or(DEFAULT_GATE_INTERVAL_MS).max(1),
            ),
            exit_grace: args
                .exit_grace_secs
                .or(file.exit_grace_secs)
                .map(Duration::from_secs),
            forward_tool_output: args.tool_output,
        })
    }
}
