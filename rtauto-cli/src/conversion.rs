//! The external converter: locating it, building its command line and
//! watching it run.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use process_utils::{ExitOutcome, ExitWatch, locate_program, spawn_exit_watcher, tokio_command};
use tempfile::NamedTempFile;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{AppError, Result};

/// Executable searched on `PATH` when no tool is configured.
pub const DEFAULT_TOOL: &str = "rawtherapee-cli";

/// Processing profile used when none is given.
const BUNDLED_PROFILE: &str = include_str!("../assets/auto-correction.pp3");

/// Resolve the converter executable, failing before anything is launched.
pub fn locate_tool(configured: Option<&Path>) -> Result<PathBuf> {
    let program = configured
        .map(|p| p.as_os_str().to_owned())
        .unwrap_or_else(|| OsString::from(DEFAULT_TOOL));

    locate_program(&program).map_err(|e| {
        debug!(error = %e, "Converter lookup failed");
        AppError::not_installed(
            "RawTherapee CLI",
            Some("Please go to rawtherapee.com and install the CLI tool before continuing."),
        )
    })
}

/// A processing profile on disk. The bundled one lives in a temp file for
/// as long as this value exists.
#[derive(Debug)]
pub enum Profile {
    Bundled(NamedTempFile),
    File(PathBuf),
}

impl Profile {
    pub fn resolve(configured: Option<&Path>) -> Result<Self> {
        match configured {
            Some(path) if path.is_file() => Ok(Self::File(path.to_path_buf())),
            Some(path) => Err(AppError::config(format!(
                "profile {} does not exist",
                path.display()
            ))),
            None => {
                let mut file = tempfile::Builder::new()
                    .prefix("rtauto-profile-")
                    .suffix(".pp3")
                    .tempfile()?;
                std::io::Write::write_all(&mut file, BUNDLED_PROFILE.as_bytes())?;
                Ok(Self::Bundled(file))
            }
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Bundled(file) => file.path(),
            Self::File(path) => path,
        }
    }
}

/// Command line for one batch run of the converter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub program: PathBuf,
    pub profile: PathBuf,
    pub output_dir: PathBuf,
    pub input_dir: PathBuf,
}

impl ToolInvocation {
    pub fn args(&self) -> Vec<OsString> {
        vec![
            "-p".into(),
            self.profile.clone().into_os_string(),
            "-O".into(),
            self.output_dir.clone().into_os_string(),
            // 16-bit compressed PNG output.
            "-n".into(),
            // Overwrite existing output.
            "-Y".into(),
            // Process every supported type, not only the ones enabled in the GUI preferences.
            "-a".into(),
            // Must come last: everything after it is input.
            "-c".into(),
            self.input_dir.clone().into_os_string(),
        ]
    }

    pub fn command(&self, forward_output: bool) -> tokio::process::Command {
        let mut cmd = tokio_command(&self.program);
        cmd.args(self.args()).stdin(Stdio::null());
        if !forward_output {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
        }
        cmd
    }
}

/// A running converter process.
#[derive(Debug)]
pub struct ConversionJob {
    watch: ExitWatch,
}

impl ConversionJob {
    /// Spawn `command` and start watching it.
    pub fn spawn(mut command: tokio::process::Command, token: CancellationToken) -> Result<Self> {
        let child = command.spawn()?;
        info!(pid = ?child.id(), "Converter started");
        Ok(Self {
            watch: spawn_exit_watcher(child, token),
        })
    }

    /// True once the process is gone, whatever the reason.
    pub fn has_exited(&mut self) -> bool {
        self.watch.has_exited()
    }

    pub fn outcome(&mut self) -> Option<ExitOutcome> {
        self.watch.try_outcome()
    }

    pub fn kill(&self) {
        self.watch.kill();
    }

    pub async fn wait(&mut self) -> ExitOutcome {
        self.watch.wait().await
    }
}
