//! A single source item and the artifacts it is waiting for.

use std::path::PathBuf;

use tracing::debug;

use crate::Result;
use crate::fs::{move_file, remove_file};
use crate::naming::{ArtifactNaming, split_extension};

/// The three directories a run works with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directories {
    /// Where the source images live.
    pub source: PathBuf,
    /// Where the converter writes previews and sidecars.
    pub staging: PathBuf,
    /// Where finished source files and sidecars end up.
    pub destination: PathBuf,
}

impl Directories {
    pub fn new(
        source: impl Into<PathBuf>,
        staging: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source: source.into(),
            staging: staging.into(),
            destination: destination.into(),
        }
    }
}

/// Every path a unit touches, derived from its file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedPaths {
    /// `<source>/<file name>`
    pub source: PathBuf,
    /// `<destination>/<file name>`
    pub destination: PathBuf,
    /// `<staging>/<base>.<preview ext>`
    pub preview: PathBuf,
    /// `<staging>/<base>.<preview ext>.<sidecar suffix>`
    pub staged_sidecar: PathBuf,
    /// `<destination>/<file name>.<sidecar suffix>`
    pub destination_sidecar: PathBuf,
}

impl ExpectedPaths {
    pub fn derive(
        base_name: &str,
        file_name: &str,
        dirs: &Directories,
        naming: &ArtifactNaming,
    ) -> Self {
        let preview_name = naming.preview_file_name(base_name);
        Self {
            source: dirs.source.join(file_name),
            destination: dirs.destination.join(file_name),
            staged_sidecar: dirs.staging.join(naming.sidecar_file_name(&preview_name)),
            preview: dirs.staging.join(preview_name),
            destination_sidecar: dirs.destination.join(naming.sidecar_file_name(file_name)),
        }
    }
}

/// Tracks one source file until its preview and sidecar both show up, then
/// moves it (and the sidecar) into the destination.
#[derive(Debug, Clone)]
pub struct CompletionUnit {
    base_name: String,
    file_name: String,
    paths: ExpectedPaths,
    preview_present: bool,
    sidecar_present: bool,
    claimed: bool,
}

impl CompletionUnit {
    /// Create a unit for `file_name`. Returns `None` if the name has no
    /// extension to strip.
    pub fn new(file_name: &str, dirs: &Directories, naming: &ArtifactNaming) -> Option<Self> {
        let (base_name, _) = split_extension(file_name)?;
        Some(Self {
            paths: ExpectedPaths::derive(base_name, file_name, dirs, naming),
            base_name: base_name.to_string(),
            file_name: file_name.to_string(),
            preview_present: false,
            sidecar_present: false,
            claimed: false,
        })
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn paths(&self) -> &ExpectedPaths {
        &self.paths
    }

    pub fn is_preview_present(&self) -> bool {
        self.preview_present
    }

    pub fn is_sidecar_present(&self) -> bool {
        self.sidecar_present
    }

    /// Whether finalization has been attempted.
    pub fn is_claimed(&self) -> bool {
        self.claimed
    }

    pub fn mark_preview_present(&mut self) {
        self.preview_present = true;
    }

    pub fn mark_sidecar_present(&mut self) {
        self.sidecar_present = true;
    }

    /// Both artifacts seen and not finalized yet.
    pub fn is_ready(&self) -> bool {
        self.preview_present && self.sidecar_present && !self.claimed
    }

    /// Delete the preview and move the sidecar and source file into the
    /// destination.
    ///
    /// Returns `Ok(false)` without touching the filesystem unless the unit is
    /// ready. The unit is claimed before the first mutation, so a failure
    /// part-way leaves it partially moved and every later call is a no-op.
    pub fn finalize(&mut self) -> Result<bool> {
        if !self.is_ready() {
            return Ok(false);
        }
        self.claimed = true;

        remove_file(&self.paths.preview)?;
        self.preview_present = false;

        move_file(&self.paths.staged_sidecar, &self.paths.destination_sidecar)?;
        self.sidecar_present = false;

        move_file(&self.paths.source, &self.paths.destination)?;

        debug!(
            base_name = %self.base_name,
            destination = %self.paths.destination.display(),
            "Unit finalized"
        );
        Ok(true)
    }
}
