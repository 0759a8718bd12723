//! Small process-related helpers shared across the workspace.
//!
//! - [`locate_program`] resolves an executable on `PATH` (or checks an
//!   explicit path) before anything gets launched.
//! - [`tokio_command`] builds commands that never pop up a console window
//!   on Windows.
//! - [`spawn_exit_watcher`] turns a running child into a pollable
//!   [`ExitWatch`].

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[cfg(feature = "tokio")]
mod exit;

#[cfg(feature = "tokio")]
pub use exit::{ExitOutcome, ExitWatch, spawn_exit_watcher};

#[cfg(all(windows, feature = "tokio"))]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// The requested program could not be resolved to an executable file.
#[derive(Debug, Error)]
#[error("program `{program}` was not found: {reason}")]
pub struct ProgramNotFound {
    pub program: String,
    pub reason: String,
}

/// Resolve `program` to an executable path.
///
/// Bare names are searched on `PATH`. Anything containing a path separator
/// is treated as an explicit location and only checked for existence.
pub fn locate_program(program: impl AsRef<OsStr>) -> Result<PathBuf, ProgramNotFound> {
    let program = program.as_ref();
    let as_path = Path::new(program);

    if as_path.components().count() > 1 {
        return if as_path.is_file() {
            Ok(as_path.to_path_buf())
        } else {
            Err(ProgramNotFound {
                program: program.to_string_lossy().into_owned(),
                reason: "no such file".to_string(),
            })
        };
    }

    which::which(program).map_err(|e| ProgramNotFound {
        program: program.to_string_lossy().into_owned(),
        reason: e.to_string(),
    })
}

/// Create a `tokio::process::Command` with `CREATE_NO_WINDOW` applied on Windows.
///
/// The child is killed if its handle is dropped, so an aborted run never
/// leaves an orphaned converter behind.
#[cfg(feature = "tokio")]
pub fn tokio_command(program: impl AsRef<OsStr>) -> tokio::process::Command {
    let mut cmd = tokio::process::Command::new(program);
    #[cfg(windows)]
    cmd.creation_flags(CREATE_NO_WINDOW);
    cmd.kill_on_drop(true);
    cmd
}
