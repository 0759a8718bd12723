use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type for monitor operations.
pub type Result<T> = std::result::Result<T, MonitorError>;

/// Errors raised while building or driving the unit registry.
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("I/O error while {op} {}: {source}", path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Refusing to overwrite existing file {}", path.display())]
    DestinationExists { path: PathBuf },

    #[error(
        "File {base_name} exists with multiple file extensions ({kept} and {skipped}), only one of which will be processed"
    )]
    NameCollision {
        base_name: String,
        kept: String,
        skipped: String,
    },

    #[error("Source path {} is not a directory", path.display())]
    SourceNotDirectory { path: PathBuf },

    #[error("Monitor task failed: {0}")]
    TaskFailed(String),
}

impl MonitorError {
    /// Wrap an I/O error with the operation and path it happened on.
    pub fn io_path(op: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            op,
            path: path.to_path_buf(),
            source,
        }
    }
}
