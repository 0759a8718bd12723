//! Progress reporting hooks.
//!
//! Progress is observability only: the monitor calls [`ProgressSink::advance`]
//! once per finalized unit and [`ProgressSink::finish`] when it is stopped.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

pub trait ProgressSink: Send + Sync {
    /// `n` more units were finalized.
    fn advance(&self, n: u64);

    /// Release whatever the sink holds (terminal line, file, ...).
    fn finish(&self) {}
}

/// Discards all progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn advance(&self, _n: u64) {}
}

/// Counts finalized units.
#[derive(Debug, Default)]
pub struct CountingProgress {
    completed: AtomicU64,
    finished: AtomicBool,
}

impl CountingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Relaxed)
    }
}

impl ProgressSink for CountingProgress {
    fn advance(&self, n: u64) {
        self.completed.fetch_add(n, Ordering::Relaxed);
    }

    fn finish(&self) {
        self.finished.store(true, Ordering::Relaxed);
    }
}
