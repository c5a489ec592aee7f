//! Error taxonomy
//!
//! Fatal failures are typed per concern and funnel into [`LaunchError`].
//! Best-effort cleanup failures never appear here; see `cache::advisory`.

use std::path::PathBuf;

/// Failures of the persisted cache index and its slot directories
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache index {path:?} exists but cannot be decoded")]
    CorruptIndex {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to read cache index {path:?}")]
    IndexRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write cache index {path:?}")]
    IndexWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create cache directory {path:?}")]
    DirectoryCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures while locating or decoding a project's config file
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no {name} file found in {start:?} or any parent directory")]
    NotFound { start: PathBuf, name: String },

    #[error("failed to read {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path:?}:{line}: expected `KEY = value` or `KEY[arch] = value`, got {text:?}")]
    Syntax {
        path: PathBuf,
        line: usize,
        text: String,
    },

    #[error("{path:?}: missing required key {key}")]
    MissingKey { path: PathBuf, key: &'static str },

    #[error("remote archive {url} requires a CHECKSUM entry")]
    MissingChecksum { url: String },
}

/// Failures fetching or unpacking an archive into a cache slot
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to download {url}: {message}")]
    Network { url: String, message: String },

    #[error("download of {url} failed with HTTP {status}")]
    Http { url: String, status: u16 },

    #[error("local archive {path:?} does not exist")]
    MissingArchive { path: PathBuf },

    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("archive extraction failed ({status}): {diagnostic}")]
    Extraction { status: String, diagnostic: String },

    #[error("required tool `{tool}` could not be started")]
    ToolUnavailable {
        tool: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Failures handing control to the cached binary
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("executable {path:?} not found in cached archive")]
    BinaryMissing { path: PathBuf },

    #[error("failed to execute {path:?}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Any fatal failure of a single launcher invocation
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Exec(#[from] ExecError),
}
