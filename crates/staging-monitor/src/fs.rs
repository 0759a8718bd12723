//! Filesystem helpers with operation + path context on every error.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, warn};

use crate::{MonitorError, Result};

/// A regular file found while listing a directory.
#[derive(Debug, Clone)]
pub(crate) struct ListedFile {
    pub name: String,
    pub path: PathBuf,
    pub modified: Option<SystemTime>,
}

/// List the regular files of `dir` (symlinks followed), sorted by name.
///
/// Entries that disappear during the listing or whose metadata cannot be
/// read are skipped. So are names that are not valid UTF-8, since base names
/// are matched as strings.
pub(crate) fn list_regular_files(dir: &Path) -> Result<Vec<ListedFile>> {
    let entries =
        std::fs::read_dir(dir).map_err(|e| MonitorError::io_path("listing", dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| MonitorError::io_path("listing", dir, e))?;
        let path = entry.path();

        let metadata = match std::fs::metadata(&path) {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "Entry vanished during listing");
                continue;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unreadable entry");
                continue;
            }
        };
        if !metadata.is_file() {
            continue;
        }

        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            warn!(path = %path.display(), "Skipping file with a non UTF-8 name");
            continue;
        };

        files.push(ListedFile {
            name,
            path,
            modified: metadata.modified().ok(),
        });
    }

    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

/// Move `from` to `to` without ever replacing an existing `to`.
///
/// Uses a rename when possible and falls back to copy + remove when the two
/// paths live on different filesystems.
///
/// The existence check and the rename are not atomic: a file created at `to`
/// in between is replaced. Nothing but this process writes to the
/// destination during a run.
pub(crate) fn move_file(from: &Path, to: &Path) -> Result<()> {
    if std::fs::symlink_metadata(to).is_ok() {
        return Err(MonitorError::DestinationExists {
            path: to.to_path_buf(),
        });
    }

    match std::fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::CrossesDevices => {
            debug!(from = %from.display(), to = %to.display(), "Rename crosses devices, copying");
            std::fs::copy(from, to).map_err(|e| MonitorError::io_path("copying", from, e))?;
            std::fs::remove_file(from)
                .map_err(|e| MonitorError::io_path("removing moved file", from, e))
        }
        Err(e) => Err(MonitorError::io_path("moving", from, e)),
    }
}

/// Delete a file.
pub(crate) fn remove_file(path: &Path) -> Result<()> {
    std::fs::remove_file(path).map_err(|e| MonitorError::io_path("removing", path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_list_regular_files_skips_directories() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.png"), b"b").unwrap();
        std::fs::write(dir.path().join("a.png"), b"a").unwrap();
        std::fs::create_dir(dir.path().join("nested.png")).unwrap();

        let files = list_regular_files(dir.path()).unwrap();
        let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.png", "b.png"]);
        assert!(files[0].modified.is_some());
    }

    #[test]
    fn test_list_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let err = list_regular_files(&dir.path().join("gone")).unwrap_err();
        assert!(matches!(err, MonitorError::Io { op: "listing", .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_list_regular_files_skips_unreadable_entries() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("photo1.png"), b"a").unwrap();
        // Self-referencing symlink: metadata fails with a loop error.
        std::os::unix::fs::symlink("loop.png", dir.path().join("loop.png")).unwrap();

        let files = list_regular_files(dir.path()).unwrap();
        let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["photo1.png"]);
    }

    #[test]
    fn test_move_file() {
        let dir = TempDir::new().unwrap();
        let from = dir.path().join("from.txt");
        let to = dir.path().join("to.txt");
        std::fs::write(&from, "content").unwrap();

        move_file(&from, &to).unwrap();

        assert!(!from.exists());
        assert_eq!(std::fs::read_to_string(&to).unwrap(), "content");
    }

    #[test]
    fn test_move_file_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let from = dir.path().join("from.txt");
        let to = dir.path().join("to.txt");
        std::fs::write(&from, "new").unwrap();
        std::fs::write(&to, "old").unwrap();

        let err = move_file(&from, &to).unwrap_err();

        assert!(matches!(err, MonitorError::DestinationExists { .. }));
        assert!(from.exists());
        assert_eq!(std::fs::read_to_string(&to).unwrap(), "old");
    }
}
