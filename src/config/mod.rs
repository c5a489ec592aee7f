//! Config module - Locates and resolves a project's `.pinrun` file
//!
//! Provides:
//! - discover: nearest ancestor directory holding the config file
//! - parse: `KEY = value` / `KEY[arch] = value` lines
//! - Descriptor: everything one launch needs, validated up front

pub mod parse;

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::cache::entry::VersionToken;
use crate::core::error::ConfigError;
use crate::core::paths::{normalize_path, project_key, resolve_against};
use crate::core::render::Row;

/// Default config file name
pub const CONFIG_FILE: &str = ".pinrun";

/// Environment variable overriding the config file name
pub const CONFIG_NAME_ENV: &str = "PINRUN_CONFIG_NAME";

/// Prefix of keys that inject environment variables into the tool
pub const ENV_PREFIX: &str = "ENV_";

/// Where the archive comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FetchSpec {
    Remote { url: String },
    Local { path: PathBuf },
}

impl FetchSpec {
    /// Classify a URL value; local paths are resolved against `base`
    pub fn from_url(url: &str, base: &Path) -> Self {
        if let Some(rest) = url.strip_prefix("file://") {
            return FetchSpec::Local {
                path: resolve_against(base, Path::new(rest)),
            };
        }
        if url.contains("://") {
            return FetchSpec::Remote {
                url: url.to_string(),
            };
        }
        FetchSpec::Local {
            path: resolve_against(base, Path::new(url)),
        }
    }

    pub fn is_local_file(&self) -> bool {
        matches!(self, FetchSpec::Local { .. })
    }

    pub fn describe(&self) -> String {
        match self {
            FetchSpec::Remote { url } => url.clone(),
            FetchSpec::Local { path } => path.display().to_string(),
        }
    }
}

/// A project's resolved launch settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Descriptor {
    /// Normalized directory of the config file; the cache index key
    pub project_key: String,
    /// Config file the descriptor was read from
    pub config_path: PathBuf,
    /// Binary path relative to the extracted archive
    pub executable: String,
    pub fetch: FetchSpec,
    pub version: VersionToken,
    /// Extra environment for the tool, in key order
    pub env: Vec<(String, String)>,
}

impl Row for Descriptor {
    fn to_text(&self) -> String {
        let mut lines = vec![
            format!("project:    {}", self.project_key),
            format!("config:     {}", self.config_path.display()),
            format!("executable: {}", self.executable),
            format!(
                "source:     {}{}",
                self.fetch.describe(),
                if self.fetch.is_local_file() { " (local)" } else { "" }
            ),
            format!("checksum:   {}", self.version.as_str().unwrap_or("-")),
        ];
        for (key, value) in &self.env {
            lines.push(format!("env:        {}={}", key, value));
        }
        lines.join("\n")
    }
}

/// Config file name in effect
pub fn config_file_name() -> String {
    std::env::var(CONFIG_NAME_ENV)
        .ok()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| CONFIG_FILE.to_string())
}

/// Find the nearest `name` file in `start` or any parent directory
pub fn discover(start: &Path, name: &str) -> Result<PathBuf, ConfigError> {
    let start = start.canonicalize().unwrap_or_else(|_| start.to_path_buf());
    for dir in start.ancestors() {
        let candidate = dir.join(name);
        if candidate.is_file() {
            debug!(path = %candidate.display(), "Found project config");
            return Ok(candidate);
        }
    }
    Err(ConfigError::NotFound {
        start,
        name: name.to_string(),
    })
}

/// Read and validate the config at `path` for the running architecture
pub fn load(path: &Path) -> Result<Descriptor, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    resolve(&text, path, std::env::consts::ARCH)
}

/// Build a descriptor from config text located at `path`
pub fn resolve(text: &str, path: &Path, arch: &str) -> Result<Descriptor, ConfigError> {
    let settings = parse::parse(text, path, arch)?;
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let dir = if dir.as_os_str().is_empty() {
        Path::new(".")
    } else {
        dir
    };

    let required = |key: &'static str| {
        settings
            .get(key)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ConfigError::MissingKey {
                path: path.to_path_buf(),
                key,
            })
    };

    let url = required("URL")?;
    let executable = required("EXECUTABLE")?.to_string();
    let fetch = FetchSpec::from_url(url, dir);

    let checksum = settings
        .get("CHECKSUM")
        .filter(|value| !value.is_empty())
        .map(str::to_string);
    let version = match (checksum, &fetch) {
        (Some(checksum), _) => VersionToken::Checksum(checksum),
        (None, FetchSpec::Local { .. }) => VersionToken::LocalSource,
        (None, FetchSpec::Remote { url }) => {
            return Err(ConfigError::MissingChecksum { url: url.clone() })
        }
    };

    let project_key = project_key(dir).unwrap_or_else(|_| normalize_path(dir));
    let env = settings
        .with_prefix(ENV_PREFIX)
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();

    Ok(Descriptor {
        project_key,
        config_path: path.to_path_buf(),
        executable,
        fetch,
        version,
        env,
    })
}
