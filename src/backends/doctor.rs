//! Doctor - Environment checking

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use std::path::Path;

use crate::backends::transport::UNZIP;
use crate::core::paths::{index_path, slots_dir};
use crate::core::render::{RenderConfig, Renderer, Row};
use crate::core::util::command_exists;

/// Result of one environment check
#[derive(Debug, Clone, Serialize)]
pub struct CheckStatus {
    pub name: String,
    pub ok: bool,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Row for CheckStatus {
    fn to_text(&self) -> String {
        let status = if self.ok {
            "✓".green()
        } else if self.required {
            "✗".red()
        } else {
            "✗".yellow()
        };
        let required = if self.required {
            "required"
        } else {
            "optional"
        };
        match &self.detail {
            Some(detail) => format!("{} {} ({}) - {}", status, self.name, required, detail),
            None => format!("{} {} ({})", status, self.name, required),
        }
    }
}

/// Check the launcher's prerequisites for `home`
pub fn check_environment(home: &Path) -> Vec<CheckStatus> {
    let mut checks = Vec::new();

    let unzip = command_exists(UNZIP);
    checks.push(CheckStatus {
        name: UNZIP.to_string(),
        ok: unzip,
        required: true,
        detail: (!unzip).then(|| "Install: apt install unzip / brew install unzip".to_string()),
    });

    let writable = home_writable(home);
    checks.push(CheckStatus {
        name: "home".to_string(),
        ok: writable.is_ok(),
        required: true,
        detail: Some(match writable {
            Ok(()) => home.display().to_string(),
            Err(e) => format!("{}: {}", home.display(), e),
        }),
    });

    let index = index_path(home);
    let index_problem = match std::fs::read_to_string(&index) {
        Ok(text) => serde_json::from_str::<crate::cache::entry::CacheIndex>(&text)
            .err()
            .map(|_| {
                format!(
                    "{} cannot be decoded; inspect it or run `pinrun cache clear`",
                    index.display()
                )
            }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => Some(format!("{} cannot be read: {}", index.display(), e)),
    };
    checks.push(CheckStatus {
        name: "index".to_string(),
        ok: index_problem.is_none(),
        required: true,
        detail: index_problem,
    });

    let slots = slots_dir(home);
    let slots_ok = !slots.exists() || slots.is_dir();
    checks.push(CheckStatus {
        name: "cache root".to_string(),
        ok: slots_ok,
        required: false,
        detail: (!slots_ok).then(|| {
            format!(
                "{} is not a directory; the next sweep removes it",
                slots.display()
            )
        }),
    });

    checks
}

fn home_writable(home: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(home)?;
    tempfile::NamedTempFile::new_in(home).map(|_| ())
}

/// Run the doctor command
pub fn run_doctor(home: &Path, config: RenderConfig) -> Result<()> {
    let checks = check_environment(home);

    let renderer = Renderer::with_config(config);
    renderer.render_to(&checks, std::io::stdout())?;

    if checks.iter().any(|c| c.required && !c.ok) {
        eprintln!("\n⚠️  Some required checks failed!");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_check_environment_names() {
        let temp = tempdir().unwrap();
        let checks = check_environment(temp.path());

        let names: Vec<_> = checks.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["unzip", "home", "index", "cache root"]);
        assert!(checks[1].ok, "temp home should be writable");
        assert!(checks[2].ok, "missing index is fine");
    }

    #[test]
    fn test_corrupt_index_is_flagged() {
        let temp = tempdir().unwrap();
        std::fs::write(temp.path().join("config.json"), "[1,").unwrap();

        let checks = check_environment(temp.path());
        let index = checks.iter().find(|c| c.name == "index").unwrap();
        assert!(!index.ok);
    }

    #[test]
    fn test_cache_root_file_is_flagged() {
        let temp = tempdir().unwrap();
        std::fs::write(temp.path().join("cache"), "x").unwrap();

        let checks = check_environment(temp.path());
        let root = checks.iter().find(|c| c.name == "cache root").unwrap();
        assert!(!root.ok);
        assert!(!root.required);
    }

    #[test]
    fn test_unreadable_index_is_flagged() {
        let temp = tempdir().unwrap();
        std::fs::create_dir(temp.path().join("config.json")).unwrap();

        let checks = check_environment(temp.path());
        let index = checks.iter().find(|c| c.name == "index").unwrap();
        assert!(!index.ok);
        assert!(index.detail.as_deref().unwrap().contains("cannot be read"));
    }
}
