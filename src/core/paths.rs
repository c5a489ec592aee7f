//! Path utilities
//!
//! Project keys are normalized to use '/' as separator so the index is stable
//! across platforms.

use std::io;
use std::path::{Path, PathBuf};

/// Name of the persisted cache index inside the launcher home
pub const INDEX_FILE: &str = "config.json";

/// Name of the directory holding cache slots inside the launcher home
pub const SLOTS_DIR: &str = "cache";

/// Normalize a path to use '/' as separator (for cross-platform consistency)
pub fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Build the project key for the directory holding a project's config file.
///
/// The directory must exist; symlinks and `..` components are resolved.
pub fn project_key(dir: &Path) -> io::Result<String> {
    let canonical = dir.canonicalize()?;
    Ok(normalize_path(&canonical))
}

/// Default launcher home: the per-user application data directory
pub fn default_home() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("pinrun"))
        .unwrap_or_else(|| PathBuf::from(".pinrun-home"))
}

/// Location of the cache index for a launcher home
pub fn index_path(home: &Path) -> PathBuf {
    home.join(INDEX_FILE)
}

/// Location of the slot directory for a launcher home
pub fn slots_dir(home: &Path) -> PathBuf {
    home.join(SLOTS_DIR)
}

/// Resolve `path` against `base` unless it is already absolute
pub fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        let path = Path::new("src/main.rs");
        assert_eq!(normalize_path(path), "src/main.rs");
    }

    #[test]
    fn test_layout_under_home() {
        let home = Path::new("/home/u/.local/share/pinrun");
        assert_eq!(
            index_path(home),
            PathBuf::from("/home/u/.local/share/pinrun/config.json")
        );
        assert_eq!(
            slots_dir(home),
            PathBuf::from("/home/u/.local/share/pinrun/cache")
        );
    }

    #[test]
    fn test_project_key_resolves_dot_components() {
        let temp = tempfile::tempdir().unwrap();
        let sub = temp.path().join("proj");
        std::fs::create_dir(&sub).unwrap();

        let direct = project_key(&sub).unwrap();
        let roundabout = project_key(&sub.join("..").join("proj")).unwrap();
        assert_eq!(direct, roundabout);
        assert!(!direct.contains('\\'));
    }

    #[test]
    fn test_project_key_missing_dir() {
        let temp = tempfile::tempdir().unwrap();
        assert!(project_key(&temp.path().join("nope")).is_err());
    }

    #[test]
    fn test_resolve_against() {
        let base = Path::new("/project");
        assert_eq!(
            resolve_against(base, Path::new("dist/tool.zip")),
            PathBuf::from("/project/dist/tool.zip")
        );
        assert_eq!(
            resolve_against(base, Path::new("/abs/tool.zip")),
            PathBuf::from("/abs/tool.zip")
        );
    }

    #[test]
    fn test_default_home_ends_with_app_name() {
        let home = default_home();
        let name = home.file_name().and_then(|n| n.to_str()).unwrap();
        assert!(name == "pinrun" || name == ".pinrun-home");
    }
}
