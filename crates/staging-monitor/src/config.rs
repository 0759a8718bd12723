//! Monitor configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::naming::ArtifactNaming;

/// Source formats the converter accepts. Matched case-insensitively.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "3fr", "arw", "arq", "cr2", "cr3", "crf", "crw", "dcr", "dng", "fff", "iiq", "jpg", "jpeg",
    "kdc", "mef", "mos", "mrw", "nef", "nrw", "orf", "ori", "pef", "png", "raf", "raw", "rw2",
    "rwl", "rwz", "sr2", "srf", "srw", "tif", "tiff", "x3f",
];

/// What to do when two source files share a base name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Log a warning and track only the first file (by name order).
    #[default]
    Warn,
    /// Fail initialization.
    Abort,
}

/// Configuration for the staging monitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Delay between reconciliation cycles in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Minimum age of an artifact before it counts as present.
    /// 0 disables the check.
    #[serde(default)]
    pub settle_time_ms: u64,

    #[serde(default)]
    pub collision_policy: CollisionPolicy,

    #[serde(default)]
    pub naming: ArtifactNaming,

    /// Source extensions that get a completion unit.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_extensions() -> Vec<String> {
    SUPPORTED_EXTENSIONS.iter().map(|e| e.to_string()).collect()
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            settle_time_ms: 0,
            collision_policy: CollisionPolicy::default(),
            naming: ArtifactNaming::default(),
            extensions: default_extensions(),
        }
    }
}

impl MonitorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_poll_interval_ms(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    pub fn with_settle_time_ms(mut self, ms: u64) -> Self {
        self.settle_time_ms = ms;
        self
    }

    pub fn with_collision_policy(mut self, policy: CollisionPolicy) -> Self {
        self.collision_policy = policy;
        self
    }

    pub fn with_naming(mut self, naming: ArtifactNaming) -> Self {
        self.naming = naming;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn settle_time(&self) -> Duration {
        Duration::from_millis(self.settle_time_ms)
    }

    /// Whether a source file with this extension gets tracked.
    pub fn is_supported(&self, extension: &str) -> bool {
        self.extensions
            .iter()
            .any(|e| e.eq_ignore_ascii_case(extension))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monitor_config_default() {
        let config = MonitorConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_millis(100));
        assert_eq!(config.settle_time(), Duration::ZERO);
        assert_eq!(config.collision_policy, CollisionPolicy::Warn);
        assert_eq!(config.naming.preview_extension, "png");
        assert_eq!(config.naming.sidecar_suffix, "pp3");
    }

    #[test]
    fn test_monitor_config_builder() {
        let config = MonitorConfig::new()
            .with_poll_interval_ms(250)
            .with_settle_time_ms(500)
            .with_collision_policy(CollisionPolicy::Abort);

        assert_eq!(config.poll_interval_ms, 250);
        assert_eq!(config.settle_time(), Duration::from_millis(500));
        assert_eq!(config.collision_policy, CollisionPolicy::Abort);
    }

    #[test]
    fn test_extensions_are_case_insensitive() {
        let config = MonitorConfig::default();
        assert!(config.is_supported("CR2"));
        assert!(config.is_supported("raw"));
        assert!(config.is_supported("Tiff"));
        assert!(!config.is_supported("txt"));
        assert!(!config.is_supported("pp3"));
        assert!(!config.is_supported(""));
    }

    #[test]
    fn test_zero_poll_interval_is_clamped() {
        let config = MonitorConfig::new().with_poll_interval_ms(0);
        assert_eq!(config.poll_interval(), Duration::from_millis(1));
    }
}
