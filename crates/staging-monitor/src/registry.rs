//! The set of units still waiting for their artifacts.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::config::{CollisionPolicy, MonitorConfig};
use crate::fs::list_regular_files;
use crate::naming::split_extension;
use crate::unit::{CompletionUnit, Directories};
use crate::{MonitorError, Result};

/// Two source files that map to the same base name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameCollision {
    pub base_name: String,
    /// File that keeps the unit.
    pub kept: String,
    /// File that will not be tracked.
    pub skipped: String,
}

impl From<NameCollision> for MonitorError {
    fn from(c: NameCollision) -> Self {
        MonitorError::NameCollision {
            base_name: c.base_name,
            kept: c.kept,
            skipped: c.skipped,
        }
    }
}

/// Base name → unit map. Built once, then only shrinks.
#[derive(Debug, Default)]
pub struct UnitRegistry {
    units: BTreeMap<String, CompletionUnit>,
    collisions: Vec<NameCollision>,
}

impl UnitRegistry {
    /// Scan the source directory and create one unit per supported file.
    ///
    /// Files are visited in name order, so on a collision the file whose
    /// name sorts first is the one that gets tracked.
    pub fn initialize(dirs: &Directories, config: &MonitorConfig) -> Result<Self> {
        if !dirs.source.is_dir() {
            return Err(MonitorError::SourceNotDirectory {
                path: dirs.source.clone(),
            });
        }

        let mut registry = Self::default();
        for file in list_regular_files(&dirs.source)? {
            let supported = split_extension(&file.name)
                .map(|(_, ext)| config.is_supported(ext))
                .unwrap_or(false);
            if !supported {
                debug!(file = %file.name, "Skipping unsupported source file");
                continue;
            }

            let Some(unit) = CompletionUnit::new(&file.name, dirs, &config.naming) else {
                continue;
            };

            if let Some(collision) = registry.insert(unit) {
                match config.collision_policy {
                    CollisionPolicy::Abort => return Err(collision.into()),
                    CollisionPolicy::Warn => warn!(
                        base_name = %collision.base_name,
                        kept = %collision.kept,
                        skipped = %collision.skipped,
                        "File exists with multiple file extensions, only one of which will be processed"
                    ),
                }
            }
        }

        info!(
            source = %dirs.source.display(),
            units = registry.len(),
            collisions = registry.collisions.len(),
            "Unit registry initialized"
        );
        Ok(registry)
    }

    /// Add a unit. An existing unit with the same base name wins and the
    /// collision is recorded and returned.
    pub fn insert(&mut self, unit: CompletionUnit) -> Option<NameCollision> {
        if let Some(existing) = self.units.get(unit.base_name()) {
            let collision = NameCollision {
                base_name: unit.base_name().to_string(),
                kept: existing.file_name().to_string(),
                skipped: unit.file_name().to_string(),
            };
            self.collisions.push(collision.clone());
            return Some(collision);
        }
        self.units.insert(unit.base_name().to_string(), unit);
        None
    }

    pub fn get(&self, base_name: &str) -> Option<&CompletionUnit> {
        self.units.get(base_name)
    }

    pub fn get_mut(&mut self, base_name: &str) -> Option<&mut CompletionUnit> {
        self.units.get_mut(base_name)
    }

    pub fn remove(&mut self, base_name: &str) -> Option<CompletionUnit> {
        self.units.remove(base_name)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn base_names(&self) -> impl Iterator<Item = &str> {
        self.units.keys().map(String::as_str)
    }

    pub fn units(&self) -> impl Iterator<Item = &CompletionUnit> {
        self.units.values()
    }

    /// Collisions found while building the registry.
    pub fn collisions(&self) -> &[NameCollision] {
        &self.collisions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup(files: &[&str]) -> (TempDir, Directories) {
        let root = TempDir::new().unwrap();
        let dirs = Directories::new(
            root.path().join("in"),
            root.path().join("staging"),
            root.path().join("out"),
        );
        std::fs::create_dir(&dirs.source).unwrap();
        for name in files {
            std::fs::write(dirs.source.join(name), b"x").unwrap();
        }
        (root, dirs)
    }

    #[test]
    fn test_one_unit_per_supported_file() {
        let (_root, dirs) = setup(&["a.raw", "b.CR2", "c.jpeg", "notes.txt", "d.pp3", "noext"]);
        std::fs::create_dir(dirs.source.join("folder.raw")).unwrap();

        let registry = UnitRegistry::initialize(&dirs, &MonitorConfig::default()).unwrap();

        let names: Vec<_> = registry.base_names().collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert!(registry.collisions().is_empty());
        assert_eq!(registry.get("b").unwrap().file_name(), "b.CR2");
    }

    #[test]
    fn test_collision_warns_and_keeps_one() {
        let (_root, dirs) = setup(&["photoA.raw", "photoA.jpg"]);

        let registry = UnitRegistry::initialize(&dirs, &MonitorConfig::default()).unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.collisions(),
            &[NameCollision {
                base_name: "photoA".to_string(),
                kept: "photoA.jpg".to_string(),
                skipped: "photoA.raw".to_string(),
            }]
        );
        assert_eq!(registry.get("photoA").unwrap().file_name(), "photoA.jpg");
    }

    #[test]
    fn test_collision_aborts_when_configured() {
        let (_root, dirs) = setup(&["photoA.raw", "photoA.jpg"]);
        let config = MonitorConfig::new().with_collision_policy(CollisionPolicy::Abort);

        let err = UnitRegistry::initialize(&dirs, &config).unwrap_err();

        match err {
            MonitorError::NameCollision { base_name, .. } => assert_eq!(base_name, "photoA"),
            other => panic!("expected collision, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_source_directory() {
        let root = TempDir::new().unwrap();
        let dirs = Directories::new(root.path().join("nope"), root.path(), root.path());

        let err = UnitRegistry::initialize(&dirs, &MonitorConfig::default()).unwrap_err();
        assert!(matches!(err, MonitorError::SourceNotDirectory { .. }));
    }

    #[test]
    fn test_empty_source_directory() {
        let (_root, dirs) = setup(&[]);
        let registry = UnitRegistry::initialize(&dirs, &MonitorConfig::default()).unwrap();
        assert!(registry.is_empty());
    }
}
