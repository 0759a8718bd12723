//! Exit watching for spawned child processes.

use tokio::process::Child;
use tokio::sync::oneshot::{self, error::TryRecvError};
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

/// How a watched process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    /// The process exited on its own. The code is `None` when it was
    /// terminated by a signal.
    Exited(Option<i32>),
    /// The process was killed because the watcher was cancelled.
    Cancelled,
    /// Waiting on the process failed, or the watcher task went away.
    WaitFailed,
}

impl ExitOutcome {
    /// True if the process exited on its own with status 0.
    pub fn success(&self) -> bool {
        matches!(self, ExitOutcome::Exited(Some(0)))
    }
}

/// A pollable handle on a child process' termination.
#[derive(Debug)]
pub struct ExitWatch {
    rx: oneshot::Receiver<ExitOutcome>,
    outcome: Option<ExitOutcome>,
    token: CancellationToken,
}

impl ExitWatch {
    /// Non-blocking check. Returns the outcome once the process has ended;
    /// later calls keep returning the same outcome.
    pub fn try_outcome(&mut self) -> Option<ExitOutcome> {
        if self.outcome.is_none() {
            self.outcome = match self.rx.try_recv() {
                Ok(outcome) => Some(outcome),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Closed) => Some(ExitOutcome::WaitFailed),
            };
        }
        self.outcome
    }

    /// True once the process is no longer running.
    pub fn has_exited(&mut self) -> bool {
        self.try_outcome().is_some()
    }

    /// Wait for the process to end.
    pub async fn wait(&mut self) -> ExitOutcome {
        if let Some(outcome) = self.outcome {
            return outcome;
        }
        let outcome = (&mut self.rx).await.unwrap_or(ExitOutcome::WaitFailed);
        self.outcome = Some(outcome);
        outcome
    }

    /// Ask the watcher to kill the process. Does nothing if it already ended.
    pub fn kill(&self) {
        self.token.cancel();
    }
}

/// Spawn a task that waits for `child` to exit and records the outcome.
///
/// Cancelling `cancellation_token` (or calling [`ExitWatch::kill`]) kills
/// the process.
pub fn spawn_exit_watcher(mut child: Child, cancellation_token: CancellationToken) -> ExitWatch {
    let (tx, rx) = oneshot::channel();
    let token = cancellation_token.clone();

    tokio::spawn(async move {
        let outcome = tokio::select! {
            _ = cancellation_token.cancelled() => {
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "Failed to kill process");
                }
                ExitOutcome::Cancelled
            }
            status = child.wait() => {
                match status {
                    Ok(exit_status) => {
                        let code = exit_status.code();
                        if let Some(c) = code
                            && c != 0
                        {
                            warn!("Process exited with code: {}", c);
                        }
                        ExitOutcome::Exited(code)
                    }
                    Err(e) => {
                        error!("Error waiting for process: {}", e);
                        ExitOutcome::WaitFailed
                    }
                }
            }
        };
        let _ = tx.send(outcome);
    });

    ExitWatch {
        rx,
        outcome: None,
        token,
    }
}
