//! Recurring driver for the reconciler.
//!
//! The scheduler owns the reconciler. While scheduled, the reconciler lives
//! inside a single background task that runs one cycle per tick; the next
//! tick is only awaited after the previous cycle returned, so cycles never
//! overlap. [`PollScheduler::stop`] hands the reconciler back.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::progress::ProgressSink;
use crate::reconciler::OutputReconciler;
use crate::{MonitorError, Result};

/// Whether a cycle is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Stopped,
    Scheduled,
}

/// Snapshot published after every cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonitorStatus {
    /// Units still waiting for artifacts.
    pub outstanding: usize,
    /// Units moved into the destination.
    pub finalized: usize,
    /// Units whose move failed.
    pub failed: usize,
    /// Cycles run so far.
    pub cycles: u64,
    /// The background task died and the reconciler is gone.
    pub halted: bool,
}

impl MonitorStatus {
    fn of(reconciler: &OutputReconciler, cycles: u64) -> Self {
        Self {
            outstanding: reconciler.outstanding(),
            finalized: reconciler.finalized_count(),
            failed: reconciler.failures().len(),
            cycles,
            halted: false,
        }
    }
}

struct RunningTask {
    token: CancellationToken,
    handle: JoinHandle<Result<OutputReconciler>>,
}

pub struct PollScheduler {
    interval: Duration,
    reconciler: Option<OutputReconciler>,
    running: Option<RunningTask>,
    progress: Arc<dyn ProgressSink>,
    progress_finished: bool,
    status_tx: Arc<watch::Sender<MonitorStatus>>,
    status_rx: watch::Receiver<MonitorStatus>,
}

impl PollScheduler {
    pub fn new(reconciler: OutputReconciler, interval: Duration) -> Self {
        let (status_tx, status_rx) = watch::channel(MonitorStatus::of(&reconciler, 0));
        Self {
            interval,
            progress: reconciler.progress().clone(),
            reconciler: Some(reconciler),
            running: None,
            progress_finished: false,
            status_tx: Arc::new(status_tx),
            status_rx,
        }
    }

    pub fn state(&self) -> SchedulerState {
        match &self.running {
            Some(task) if !task.handle.is_finished() => SchedulerState::Scheduled,
            _ => SchedulerState::Stopped,
        }
    }

    /// Schedule cycles until no unit is outstanding.
    ///
    /// Does nothing when already scheduled or when there is no work. Must be
    /// called from within a tokio runtime.
    pub fn start(&mut self) {
        let Some(reconciler) = self.reconciler.take() else {
            return;
        };
        if reconciler.is_done() {
            debug!("No outstanding units, not scheduling");
            self.reconciler = Some(reconciler);
            return;
        }

        let token = CancellationToken::new();
        let handle = tokio::spawn(run_cycles(
            reconciler,
            self.interval,
            token.clone(),
            self.status_tx.clone(),
        ));
        self.running = Some(RunningTask { token, handle });
        debug!(interval = ?self.interval, "Poll scheduler started");
    }

    /// Cancel the pending cycle and take the reconciler back.
    ///
    /// A cycle that is already moving files is allowed to finish. Also
    /// finishes the progress sink. Calling it again is a no-op.
    pub async fn stop(&mut self) -> Result<()> {
        let result = match self.running.take() {
            Some(task) => {
                task.token.cancel();
                match task.handle.await {
                    Ok(Ok(reconciler)) => {
                        self.reconciler = Some(reconciler);
                        Ok(())
                    }
                    Ok(Err(e)) => Err(e),
                    Err(e) => Err(MonitorError::TaskFailed(e.to_string())),
                }
            }
            None => Ok(()),
        };

        if !self.progress_finished {
            self.progress.finish();
            self.progress_finished = true;
        }
        result
    }

    /// No unit is outstanding.
    pub fn done(&self) -> bool {
        self.status_rx.borrow().outstanding == 0
    }

    pub fn status(&self) -> MonitorStatus {
        *self.status_rx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<MonitorStatus> {
        self.status_rx.clone()
    }

    /// The reconciler, when no task holds it.
    pub fn reconciler(&self) -> Option<&OutputReconciler> {
        self.reconciler.as_ref()
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        if let Some(task) = &self.running {
            task.token.cancel();
        }
        if !self.progress_finished {
            self.progress.finish();
        }
    }
}

async fn run_cycles(
    mut reconciler: OutputReconciler,
    period: Duration,
    token: CancellationToken,
    status_tx: Arc<watch::Sender<MonitorStatus>>,
) -> Result<OutputReconciler> {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut cycles: u64 = 0;

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!("Poll scheduler cancelled");
                break;
            }
            _ = ticker.tick() => {}
        }

        let joined = tokio::task::spawn_blocking(move || {
            let outcome = reconciler.scan_and_move();
            (reconciler, outcome)
        })
        .await;

        let outcome = match joined {
            Ok((returned, outcome)) => {
                reconciler = returned;
                outcome
            }
            Err(e) => {
                error!(error = %e, "Reconciliation cycle panicked");
                status_tx.send_modify(|status| status.halted = true);
                return Err(MonitorError::TaskFailed(e.to_string()));
            }
        };
        cycles += 1;

        match outcome {
            Ok(report) if !report.finalized.is_empty() || !report.failed.is_empty() => {
                debug!(
                    cycle = cycles,
                    finalized = report.finalized.len(),
                    failed = report.failed.len(),
                    outstanding = report.outstanding,
                    "Reconciliation cycle complete"
                );
            }
            Ok(_) => {}
            Err(e) => warn!(cycle = cycles, error = %e, "Reconciliation cycle failed"),
        }

        status_tx.send_replace(MonitorStatus::of(&reconciler, cycles));

        if reconciler.is_done() {
            info!(
                finalized = reconciler.finalized_count(),
                failed = reconciler.failures().len(),
                "No outstanding units left"
            );
            break;
        }
    }

    Ok(reconciler)
}
