//! Archive transport
//!
//! Fetches a tool archive (HTTP download or local file) and unpacks it into a
//! cache slot with the external `unzip` tool.

use std::path::Path;
use std::process::Command;
use tracing::{debug, info};

use crate::config::FetchSpec;
use crate::core::error::TransportError;
use crate::core::util::diagnostic_text;

/// Archive tool invoked for extraction
pub const UNZIP: &str = "unzip";

/// Populates a cache slot from an archive source
pub trait ArchiveTransport {
    fn populate(&self, fetch: &FetchSpec, dest: &Path) -> Result<(), TransportError>;
}

/// Downloads with reqwest and extracts with `unzip`
#[derive(Debug, Clone, Default)]
pub struct UnzipTransport;

impl UnzipTransport {
    /// Download `url` into a temporary file
    fn download(&self, url: &str) -> Result<tempfile::NamedTempFile, TransportError> {
        let network = |e: reqwest::Error| TransportError::Network {
            url: url.to_string(),
            message: e.to_string(),
        };

        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("pinrun/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(network)?;

        info!(url, "Downloading archive");
        let mut response = client.get(url).send().map_err(network)?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Http {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let mut file = tempfile::NamedTempFile::new().map_err(|source| TransportError::Io {
            context: "failed to create temporary download file".to_string(),
            source,
        })?;
        let bytes = response.copy_to(file.as_file_mut()).map_err(network)?;
        debug!(url, bytes, "Download complete");
        Ok(file)
    }
}

impl ArchiveTransport for UnzipTransport {
    fn populate(&self, fetch: &FetchSpec, dest: &Path) -> Result<(), TransportError> {
        match fetch {
            FetchSpec::Remote { url } => {
                let archive = self.download(url)?;
                extract(archive.path(), dest)
            }
            FetchSpec::Local { path } => {
                if !path.is_file() {
                    return Err(TransportError::MissingArchive { path: path.clone() });
                }
                extract(path, dest)
            }
        }
    }
}

/// Unpack `archive` into `dest`, overwriting existing files
pub fn extract(archive: &Path, dest: &Path) -> Result<(), TransportError> {
    debug!(archive = %archive.display(), dest = %dest.display(), "Extracting archive");
    let output = Command::new(UNZIP)
        .arg("-q")
        .arg("-o")
        .arg(archive)
        .arg("-d")
        .arg(dest)
        .output()
        .map_err(|source| TransportError::ToolUnavailable {
            tool: UNZIP,
            source,
        })?;

    if !output.status.success() {
        return Err(TransportError::Extraction {
            status: output.status.to_string(),
            diagnostic: diagnostic_text(&output),
        });
    }
    Ok(())
}
