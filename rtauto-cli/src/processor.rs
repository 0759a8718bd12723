//! One batch run: the converter process plus the staging monitor, and the
//! gate that decides when both are finished.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use process_utils::ExitOutcome;
use staging_monitor::{
    Directories, MonitorError, MonitorStatus, OutputReconciler, PollScheduler, ProgressSink,
};
use tempfile::TempDir;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::RunSettings;
use crate::conversion::{ConversionJob, Profile, ToolInvocation, locate_tool};
use crate::error::{AppError, Result};

const STAGING_PREFIX: &str = ".rtauto-staging-";

/// How a run ended, when it was not interrupted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub finalized: usize,
    /// `(base name, error)` for every unit that could not be moved.
    pub failed: Vec<(String, String)>,
    /// Units still waiting when the exit grace period ran out.
    pub stalled: Vec<String>,
    pub job_outcome: Option<ExitOutcome>,
}

impl RunSummary {
    /// Turn leftover work into the matching error.
    pub fn into_result(self) -> Result<Self> {
        if !self.stalled.is_empty() {
            return Err(AppError::Stalled {
                remaining: self.stalled,
            });
        }
        if !self.failed.is_empty() {
            return Err(AppError::UnitsFailed {
                count: self.failed.len(),
            });
        }
        Ok(self)
    }
}

pub struct Processor {
    scheduler: PollScheduler,
    job: Option<ConversionJob>,
    invocation: ToolInvocation,
    forward_tool_output: bool,
    gate_interval: Duration,
    exit_grace: Option<Duration>,
    shutdown: CancellationToken,
    dirs: Directories,
    // Both removed on drop, so they go last.
    _profile: Profile,
    _staging: TempDir,
}

impl Processor {
    /// Prepare a run without starting anything.
    ///
    /// The converter is located before any directory is created.
    /// `make_progress` receives the number of photos found in the source
    /// directory.
    pub fn new(
        settings: &RunSettings,
        make_progress: impl FnOnce(usize) -> Arc<dyn ProgressSink>,
    ) -> Result<Self> {
        let program = locate_tool(settings.tool.as_deref())?;
        debug!(tool = %program.display(), "Using converter");
        let profile = Profile::resolve(settings.profile.as_deref())?;

        if !settings.destination.exists() {
            warn!(
                path = %settings.destination.display(),
                "Destination does not exist, creating it"
            );
            std::fs::create_dir_all(&settings.destination)?;
        }

        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(&settings.destination)?;
        let dirs = Directories::new(&settings.source, staging.path(), &settings.destination);

        let reconciler = OutputReconciler::initialize(&dirs, &settings.monitor)?;
        let total = reconciler.outstanding();
        info!(photos = total, source = %dirs.source.display(), "Found photos to process");
        let reconciler = reconciler.with_progress(make_progress(total));

        let invocation = ToolInvocation {
            program,
            profile: profile.path().to_path_buf(),
            output_dir: dirs.staging.clone(),
            input_dir: dirs.source.clone(),
        };

        Ok(Self {
            scheduler: PollScheduler::new(reconciler, settings.monitor.poll_interval()),
            job: None,
            invocation,
            forward_tool_output: settings.forward_tool_output,
            gate_interval: settings.gate_interval,
            exit_grace: settings.exit_grace,
            shutdown: CancellationToken::new(),
            dirs,
            _profile: profile,
            _staging: staging,
        })
    }

    pub fn invocation(&self) -> &ToolInvocation {
        &self.invocation
    }

    pub fn staging_dir(&self) -> &Path {
        &self.dirs.staging
    }

    pub fn status(&self) -> MonitorStatus {
        self.scheduler.status()
    }

    /// Cancelling this token interrupts [`wait`](Self::wait) and kills the converter.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Launch the converter and start monitoring.
    pub fn run(&mut self) -> Result<()> {
        let command = self.invocation.command(self.forward_tool_output);
        self.launch(command)
    }

    /// Like [`run`](Self::run), with a caller-supplied command in place of
    /// the converter.
    pub fn launch(&mut self, command: tokio::process::Command) -> Result<()> {
        if self.job.is_some() {
            return Err(AppError::InvalidInput(
                "the converter has already been launched".to_string(),
            ));
        }
        self.job = Some(ConversionJob::spawn(command, self.shutdown.child_token())?);
        self.scheduler.start();
        Ok(())
    }

    /// The converter has exited and no photo is outstanding.
    pub fn done(&mut self) -> bool {
        self.job_exited() && self.scheduler.done()
    }

    fn job_exited(&mut self) -> bool {
        self.job.as_mut().is_some_and(|job| job.has_exited())
    }

    /// Block until [`done`](Self::done), checking every gate interval.
    pub async fn wait(&mut self) -> Result<RunSummary> {
        if self.job.is_none() {
            return Err(AppError::InvalidInput(
                "the converter was never launched".to_string(),
            ));
        }

        let shutdown = self.shutdown.clone();
        let mut last_change: Option<(Instant, MonitorStatus)> = None;
        let mut exit_reported = false;

        loop {
            if self.done() {
                break;
            }

            let status = self.scheduler.status();
            if status.halted {
                error!("Staging monitor stopped unexpectedly");
                if let Some(job) = &self.job {
                    job.kill();
                }
                self.scheduler.stop().await?;
                return Err(MonitorError::TaskFailed("staging monitor halted".to_string()).into());
            }

            if self.job_exited() {
                if !exit_reported {
                    exit_reported = true;
                    info!(
                        outstanding = status.outstanding,
                        "Converter exited, waiting for remaining photos"
                    );
                }
                if let Some(grace) = self.exit_grace {
                    let now = Instant::now();
                    match last_change {
                        Some((_, seen)) if !progressed(&seen, &status) => {}
                        _ => last_change = Some((now, status)),
                    }
                    if let Some((since, _)) = last_change
                        && now.duration_since(since) >= grace
                    {
                        warn!(
                            outstanding = status.outstanding,
                            grace = ?grace,
                            "No progress since the converter exited, giving up"
                        );
                        return self.finish(true).await;
                    }
                }
            }

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    warn!("Interrupted, stopping converter");
                    if let Some(job) = &self.job {
                        job.kill();
                    }
                    if let Err(e) = self.scheduler.stop().await {
                        warn!(error = %e, "Failed to stop staging monitor");
                    }
                    return Err(AppError::Interrupted);
                }
                _ = tokio::time::sleep(self.gate_interval) => {}
            }
        }

        self.finish(false).await
    }

    async fn finish(&mut self, stalled: bool) -> Result<RunSummary> {
        self.scheduler.stop().await?;

        let job_outcome = match self.job.as_mut() {
            Some(job) => job.outcome(),
            None => None,
        };
        if let Some(outcome) = job_outcome
            && !outcome.success()
        {
            warn!(outcome = ?outcome, "Converter did not exit cleanly");
        }

        let mut summary = RunSummary {
            job_outcome,
            ..RunSummary::default()
        };
        if let Some(reconciler) = self.scheduler.reconciler() {
            summary.finalized = reconciler.finalized_count();
            summary.failed = reconciler
                .failures()
                .iter()
                .map(|f| (f.unit.base_name().to_string(), f.error.to_string()))
                .collect();
            if stalled {
                summary.stalled = reconciler
                    .registry()
                    .base_names()
                    .map(str::to_string)
                    .collect();
            }
        }

        info!(
            finalized = summary.finalized,
            failed = summary.failed.len(),
            stalled = summary.stalled.len(),
            "Run finished"
        );
        Ok(summary)
    }
}

fn progressed(before: &MonitorStatus, now: &MonitorStatus) -> bool {
    before.outstanding != now.outstanding
        || before.finalized != now.finalized
        || before.failed != now.failed
}
