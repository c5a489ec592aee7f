//! Cache index model
//!
//! The index maps a project key to the slot currently holding that project's
//! extracted archive. It is persisted as `config.json`:
//!
//! ```json
//! {
//!   "entries": {
//!     "/home/u/proj": {
//!       "directory": "6f1c...",
//!       "lastUsageDate": "2026-10-19T08:00:00Z",
//!       "checksum": "abc"
//!     }
//!   }
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Invalidation token recorded with a cache entry.
///
/// There is deliberately no `Default`: every new entry must state which
/// token it was fetched under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum VersionToken {
    /// Caller-declared checksum string, compared verbatim
    Checksum(String),
    /// Archive read from the local filesystem without a declared checksum
    LocalSource,
}

impl VersionToken {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            VersionToken::Checksum(value) => Some(value.as_str()),
            VersionToken::LocalSource => None,
        }
    }
}

impl From<Option<String>> for VersionToken {
    fn from(value: Option<String>) -> Self {
        match value {
            Some(checksum) => VersionToken::Checksum(checksum),
            None => VersionToken::LocalSource,
        }
    }
}

impl From<VersionToken> for Option<String> {
    fn from(token: VersionToken) -> Self {
        match token {
            VersionToken::Checksum(checksum) => Some(checksum),
            VersionToken::LocalSource => None,
        }
    }
}

/// Metadata for one cached archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Slot directory name under the cache root
    pub directory: String,

    /// Last time the entry was created or reused
    #[serde(rename = "lastUsageDate")]
    pub last_used_at: DateTime<Utc>,

    /// Token the slot was populated under
    #[serde(rename = "checksum")]
    pub version: VersionToken,
}

impl CacheEntry {
    /// Create an entry for a freshly populated slot
    pub fn new(directory: impl Into<String>, version: VersionToken) -> Self {
        Self {
            directory: directory.into(),
            last_used_at: Utc::now(),
            version,
        }
    }
}

/// Persisted mapping from project key to cache entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheIndex {
    #[serde(default)]
    pub entries: BTreeMap<String, CacheEntry>,
}

impl CacheIndex {
    pub fn lookup(&self, project_key: &str) -> Option<&CacheEntry> {
        self.entries.get(project_key)
    }

    /// Whether any entry other than the one for `except_key` claims `directory`
    pub fn is_claimed_elsewhere(&self, directory: &str, except_key: &str) -> bool {
        self.entries
            .iter()
            .any(|(key, entry)| key != except_key && entry.directory == directory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_serializes_wire_names() {
        let entry = CacheEntry::new("d1", VersionToken::Checksum("abc".to_string()));
        let json = serde_json::to_value(&entry).unwrap();

        assert_eq!(json["directory"], "d1");
        assert_eq!(json["checksum"], "abc");
        assert!(json["lastUsageDate"].as_str().unwrap().contains('T'));
    }

    #[test]
    fn test_local_source_serializes_as_null() {
        let entry = CacheEntry::new("d2", VersionToken::LocalSource);
        let json = serde_json::to_value(&entry).unwrap();
        assert!(json["checksum"].is_null());
    }

    #[test]
    fn test_decode_index_document() {
        let text = r#"{
            "entries": {
                "/home/u/proj": {
                    "directory": "d1",
                    "lastUsageDate": "2026-01-02T03:04:05Z",
                    "checksum": null
                }
            }
        }"#;
        let index: CacheIndex = serde_json::from_str(text).unwrap();
        let entry = index.lookup("/home/u/proj").unwrap();

        assert_eq!(entry.directory, "d1");
        assert_eq!(entry.version, VersionToken::LocalSource);
        assert_eq!(entry.last_used_at.to_rfc3339(), "2026-01-02T03:04:05+00:00");
    }

    #[test]
    fn test_empty_document_is_empty_index() {
        let index: CacheIndex = serde_json::from_str("{}").unwrap();
        assert!(index.entries.is_empty());
    }

    #[test]
    fn test_is_claimed_elsewhere() {
        let mut index = CacheIndex::default();
        index.entries.insert(
            "/a".to_string(),
            CacheEntry::new("d1", VersionToken::LocalSource),
        );

        assert!(!index.is_claimed_elsewhere("d1", "/a"));
        assert!(index.is_claimed_elsewhere("d1", "/b"));
        assert!(!index.is_claimed_elsewhere("d2", "/b"));
    }
}
