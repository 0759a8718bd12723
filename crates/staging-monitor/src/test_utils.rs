use std::path::PathBuf;
use std::time::Duration;

use tempfile::TempDir;

use crate::config::MonitorConfig;
use crate::reconciler::OutputReconciler;
use crate::unit::Directories;

/// Initialize tracing for tests with appropriate settings
#[inline]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Source, staging and destination directories under one temp root.
pub struct Workspace {
    _root: TempDir,
    pub dirs: Directories,
}

impl Workspace {
    pub fn new(source_files: &[&str]) -> Self {
        let root = TempDir::new().unwrap();
        let dirs = Directories::new(
            root.path().join("in"),
            root.path().join("staging"),
            root.path().join("out"),
        );
        for dir in [&dirs.source, &dirs.staging, &dirs.destination] {
            std::fs::create_dir(dir).unwrap();
        }
        for name in source_files {
            std::fs::write(dirs.source.join(name), name.as_bytes()).unwrap();
        }
        Self { _root: root, dirs }
    }

    /// Write a file into the staging directory.
    pub fn stage(&self, name: &str) -> PathBuf {
        let path = self.dirs.staging.join(name);
        std::fs::write(&path, name.as_bytes()).unwrap();
        path
    }

    pub fn reconciler(&self, config: &MonitorConfig) -> OutputReconciler {
        OutputReconciler::initialize(&self.dirs, config).unwrap()
    }
}

/// Poll `condition` until it holds or `timeout` elapses.
pub async fn wait_until(mut condition: impl FnMut() -> bool, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
