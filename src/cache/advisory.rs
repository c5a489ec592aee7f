//! Best-effort operations
//!
//! Removing a cache slot that is no longer needed may fail (permissions,
//! files held open, a racing invocation). Such failures only leave disk space
//! behind, so they are collected into an [`Advisory`] and logged, never
//! propagated as errors.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Outcome of a best-effort cleanup
#[derive(Debug, Default)]
#[must_use = "advisory results should be logged with `log`"]
pub struct Advisory {
    /// Paths that were removed
    pub removed: Vec<PathBuf>,
    /// Paths whose removal failed
    pub failures: Vec<(PathBuf, io::Error)>,
}

impl Advisory {
    /// Remove a directory tree, recording the outcome
    pub fn remove_dir(&mut self, path: &Path) {
        match std::fs::remove_dir_all(path) {
            Ok(()) => self.removed.push(path.to_path_buf()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => self.failures.push((path.to_path_buf(), e)),
        }
    }

    /// Remove a single file, recording the outcome
    pub fn remove_file(&mut self, path: &Path) {
        match std::fs::remove_file(path) {
            Ok(()) => self.removed.push(path.to_path_buf()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => self.failures.push((path.to_path_buf(), e)),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Emit the outcome to the log and discard it
    pub fn log(self, operation: &str) {
        for path in &self.removed {
            debug!(operation, path = %path.display(), "Removed cache path");
        }
        for (path, error) in &self.failures {
            warn!(
                operation,
                path = %path.display(),
                error = %error,
                "Could not remove cache path; it will be retried by the next sweep"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_remove_dir_records_success() {
        let temp = tempdir().unwrap();
        let dir = temp.path().join("slot");
        std::fs::create_dir_all(dir.join("bin")).unwrap();

        let mut advisory = Advisory::default();
        advisory.remove_dir(&dir);

        assert!(!dir.exists());
        assert_eq!(advisory.removed, vec![dir]);
        assert!(advisory.is_clean());
    }

    #[test]
    fn test_missing_path_is_not_a_failure() {
        let temp = tempdir().unwrap();
        let mut advisory = Advisory::default();
        advisory.remove_dir(&temp.path().join("gone"));
        advisory.remove_file(&temp.path().join("gone.txt"));

        assert!(advisory.removed.is_empty());
        assert!(advisory.is_clean());
    }

    #[test]
    fn test_remove_dir_on_file_is_failure() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("plain");
        std::fs::write(&file, "x").unwrap();

        let mut advisory = Advisory::default();
        advisory.remove_dir(&file);

        assert!(!advisory.is_clean());
        advisory.log("test");
    }
}
