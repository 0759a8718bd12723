//! One reconciliation pass: look at the staging directory, update unit
//! flags, then finalize every unit that became complete.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tracing::{debug, error, info};

use crate::config::MonitorConfig;
use crate::fs::list_regular_files;
use crate::naming::{ArtifactKind, ArtifactNaming};
use crate::progress::{NoopProgress, ProgressSink};
use crate::registry::UnitRegistry;
use crate::unit::{CompletionUnit, Directories};
use crate::{MonitorError, Result};

/// A unit whose finalization failed. It may be partially moved.
#[derive(Debug)]
pub struct FailedUnit {
    pub unit: CompletionUnit,
    pub error: MonitorError,
}

/// What a single cycle saw and did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Previews matched to a unit.
    pub previews_seen: usize,
    /// Sidecars matched to a unit.
    pub sidecars_seen: usize,
    /// Staging files that matched no unit.
    pub ignored: usize,
    /// Base names finalized in this cycle.
    pub finalized: Vec<String>,
    /// Base names whose finalization failed in this cycle.
    pub failed: Vec<String>,
    /// Units still waiting after this cycle.
    pub outstanding: usize,
}

/// Owns the unit registry and reconciles it against the staging directory.
pub struct OutputReconciler {
    staging: PathBuf,
    naming: ArtifactNaming,
    settle_time: Duration,
    registry: UnitRegistry,
    failed: Vec<FailedUnit>,
    finalized: usize,
    progress: Arc<dyn ProgressSink>,
}

impl OutputReconciler {
    pub fn new(registry: UnitRegistry, staging: impl Into<PathBuf>, config: &MonitorConfig) -> Self {
        Self {
            staging: staging.into(),
            naming: config.naming.clone(),
            settle_time: config.settle_time(),
            registry,
            failed: Vec::new(),
            finalized: 0,
            progress: Arc::new(NoopProgress),
        }
    }

    /// Build the registry from `dirs.source` and watch `dirs.staging`.
    pub fn initialize(dirs: &Directories, config: &MonitorConfig) -> Result<Self> {
        let registry = UnitRegistry::initialize(dirs, config)?;
        Ok(Self::new(registry, &dirs.staging, config))
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging
    }

    pub fn registry(&self) -> &UnitRegistry {
        &self.registry
    }

    pub fn progress(&self) -> &Arc<dyn ProgressSink> {
        &self.progress
    }

    /// Units still waiting for artifacts.
    pub fn outstanding(&self) -> usize {
        self.registry.len()
    }

    /// Units moved so far.
    pub fn finalized_count(&self) -> usize {
        self.finalized
    }

    pub fn failures(&self) -> &[FailedUnit] {
        &self.failed
    }

    /// No unit is outstanding.
    pub fn is_done(&self) -> bool {
        self.registry.is_empty()
    }

    /// Run one reconciliation cycle.
    ///
    /// All presence flags from this snapshot are updated before any unit is
    /// finalized. A unit that fails to finalize leaves the registry and is
    /// kept in [`failures`](Self::failures); it is never retried.
    pub fn scan_and_move(&mut self) -> Result<CycleReport> {
        let mut report = CycleReport::default();

        self.observe(&mut report)?;
        self.finalize_ready(&mut report);

        report.outstanding = self.registry.len();
        Ok(report)
    }

    fn observe(&mut self, report: &mut CycleReport) -> Result<()> {
        let files = list_regular_files(&self.staging)?;
        let now = SystemTime::now();

        for file in files {
            let Some((kind, base_name)) = self.naming.classify(&file.name) else {
                report.ignored += 1;
                continue;
            };
            let Some(unit) = self.registry.get_mut(base_name) else {
                debug!(file = %file.name, "Ignoring staging file without a matching unit");
                report.ignored += 1;
                continue;
            };
            if !is_settled(file.modified, now, self.settle_time) {
                debug!(file = %file.name, "Artifact not settled yet");
                continue;
            }

            match kind {
                ArtifactKind::Preview => {
                    unit.mark_preview_present();
                    report.previews_seen += 1;
                }
                ArtifactKind::Sidecar => {
                    unit.mark_sidecar_present();
                    report.sidecars_seen += 1;
                }
            }
        }

        Ok(())
    }

    fn finalize_ready(&mut self, report: &mut CycleReport) {
        let ready: Vec<String> = self
            .registry
            .units()
            .filter(|unit| unit.is_ready())
            .map(|unit| unit.base_name().to_string())
            .collect();

        for base_name in ready {
            let Some(unit) = self.registry.get_mut(&base_name) else {
                continue;
            };

            match unit.finalize() {
                Ok(true) => {
                    let destination = unit.paths().destination.clone();
                    self.registry.remove(&base_name);
                    self.finalized += 1;
                    self.progress.advance(1);
                    info!(
                        base_name = %base_name,
                        destination = %destination.display(),
                        "Moved completed photo"
                    );
                    report.finalized.push(base_name);
                }
                Ok(false) => {}
                Err(e) => {
                    error!(base_name = %base_name, error = %e, "Failed to finalize unit");
                    if let Some(unit) = self.registry.remove(&base_name) {
                        self.failed.push(FailedUnit { unit, error: e });
                    }
                    report.failed.push(base_name);
                }
            }
        }
    }
}

fn is_settled(modified: Option<SystemTime>, now: SystemTime, settle_time: Duration) -> bool {
    if settle_time.is_zero() {
        return true;
    }
    match modified {
        Some(modified) => now
            .duration_since(modified)
            .map(|age| age >= settle_time)
            .unwrap_or(false),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::CountingProgress;
    use crate::test_utils::{Workspace, init_tracing};

    #[test]
    fn test_waits_for_both_artifacts() {
        init_tracing();
        let ws = Workspace::new(&["photo1.raw"]);
        let mut reconciler = ws.reconciler(&MonitorConfig::default());

        let report = reconciler.scan_and_move().unwrap();
        assert!(report.finalized.is_empty());
        assert_eq!(report.outstanding, 1);

        ws.stage("photo1.png");
        let report = reconciler.scan_and_move().unwrap();
        assert_eq!(report.previews_seen, 1);
        assert!(report.finalized.is_empty());

        ws.stage("photo1.png.pp3");
        let report = reconciler.scan_and_move().unwrap();
        assert_eq!(report.finalized, vec!["photo1".to_string()]);
        assert_eq!(report.outstanding, 0);
        assert!(reconciler.is_done());

        assert!(ws.dirs.destination.join("photo1.raw").exists());
        assert!(ws.dirs.destination.join("photo1.raw.pp3").exists());
        assert!(!ws.dirs.staging.join("photo1.png").exists());
        assert!(!ws.dirs.source.join("photo1.raw").exists());
    }

    #[test]
    fn test_both_artifacts_in_one_snapshot_finalize_same_cycle() {
        let ws = Workspace::new(&["a.nef", "b.nef"]);
        let progress = Arc::new(CountingProgress::new());
        let mut reconciler = ws
            .reconciler(&MonitorConfig::default())
            .with_progress(progress.clone());

        ws.stage("a.png");
        ws.stage("a.png.pp3");
        ws.stage("b.png");

        let report = reconciler.scan_and_move().unwrap();

        assert_eq!(report.finalized, vec!["a".to_string()]);
        assert_eq!(report.outstanding, 1);
        assert_eq!(progress.completed(), 1);
        assert_eq!(reconciler.finalized_count(), 1);
    }

    #[test]
    fn test_stray_files_are_ignored() {
        let ws = Workspace::new(&["photo1.raw"]);
        let mut reconciler = ws.reconciler(&MonitorConfig::default());
        ws.stage("orphan.png");
        ws.stage("orphan.png.pp3");
        ws.stage("notes.txt");

        let report = reconciler.scan_and_move().unwrap();

        assert_eq!(report.ignored, 3);
        assert_eq!(reconciler.outstanding(), 1);
        assert!(reconciler.registry().get("orphan").is_none());
        assert!(ws.dirs.staging.join("orphan.png").exists());
    }

    #[test]
    fn test_failed_unit_does_not_block_others() {
        let ws = Workspace::new(&["bad.raw", "good.raw"]);
        std::fs::write(ws.dirs.destination.join("bad.raw.pp3"), b"taken").unwrap();
        let mut reconciler = ws.reconciler(&MonitorConfig::default());
        for name in ["bad.png", "bad.png.pp3", "good.png", "good.png.pp3"] {
            ws.stage(name);
        }

        let report = reconciler.scan_and_move().unwrap();

        assert_eq!(report.failed, vec!["bad".to_string()]);
        assert_eq!(report.finalized, vec!["good".to_string()]);
        assert!(reconciler.is_done());
        assert_eq!(reconciler.failures().len(), 1);
        assert_eq!(reconciler.failures()[0].unit.base_name(), "bad");
        assert!(matches!(
            reconciler.failures()[0].error,
            MonitorError::DestinationExists { .. }
        ));

        // No retry on later cycles.
        let report = reconciler.scan_and_move().unwrap();
        assert!(report.failed.is_empty());
        assert_eq!(reconciler.failures().len(), 1);
    }

    #[test]
    fn test_missing_staging_directory_fails_cycle() {
        let ws = Workspace::new(&["photo1.raw"]);
        std::fs::remove_dir(&ws.dirs.staging).unwrap();
        let mut reconciler = ws.reconciler(&MonitorConfig::default());

        assert!(reconciler.scan_and_move().is_err());
        assert_eq!(reconciler.outstanding(), 1);
    }

    #[test]
    fn test_settle_time_delays_presence() {
        let ws = Workspace::new(&["photo1.raw"]);
        let config = MonitorConfig::new().with_settle_time_ms(60_000);
        let mut reconciler = ws.reconciler(&config);
        ws.stage("photo1.png");
        ws.stage("photo1.png.pp3");

        let report = reconciler.scan_and_move().unwrap();

        assert_eq!(report.previews_seen, 0);
        assert!(report.finalized.is_empty());
        assert!(!reconciler.registry().get("photo1").unwrap().is_preview_present());
    }

    #[test]
    fn test_is_settled() {
        let now = SystemTime::now();
        let second = Duration::from_secs(1);
        assert!(is_settled(Some(now), now, Duration::ZERO));
        assert!(is_settled(None, now, second));
        assert!(is_settled(Some(now - second * 2), now, second));
        assert!(!is_settled(Some(now), now, second));
        assert!(!is_settled(Some(now + second), now, second));
    }
}
