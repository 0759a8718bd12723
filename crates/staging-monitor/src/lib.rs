//! # Staging Monitor
//!
//! Tracks the outputs an external batch converter writes into a staging
//! directory and, once both artifacts of a source file exist (the rendered
//! preview and its sidecar), deletes the preview and moves the sidecar and
//! the source file into the destination directory.
//!
//! - [`CompletionUnit`]: one source file and the artifacts it waits for
//! - [`UnitRegistry`]: base name → unit map built from the source directory
//! - [`OutputReconciler`]: one scan-then-finalize pass over the staging area
//! - [`PollScheduler`]: runs the reconciler on a fixed cadence until no
//!   unit is outstanding
//!
//! The monitor only looks at file names and presence; it never reads the
//! converter's output.

mod config;
mod error;
mod fs;
mod naming;
pub mod progress;
mod reconciler;
mod registry;
mod scheduler;
mod unit;

#[cfg(test)]
mod test_utils;

pub use config::{CollisionPolicy, MonitorConfig, SUPPORTED_EXTENSIONS};
pub use error::{MonitorError, Result};
pub use naming::{ArtifactKind, ArtifactNaming, split_extension};
pub use progress::{CountingProgress, NoopProgress, ProgressSink};
pub use reconciler::{CycleReport, FailedUnit, OutputReconciler};
pub use registry::{NameCollision, UnitRegistry};
pub use scheduler::{MonitorStatus, PollScheduler, SchedulerState};
pub use unit::{CompletionUnit, Directories, ExpectedPaths};
