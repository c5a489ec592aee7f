//! Cache policy - reuse-or-refresh decisions and retention

use chrono::{DateTime, Duration, Utc};
use std::path::PathBuf;
use tracing::debug;

use crate::cache::entry::{CacheEntry, VersionToken};
use crate::cache::store::CacheStore;

/// Default retention window in days
pub const DEFAULT_RETENTION_DAYS: u32 = 30;

/// Outcome of consulting the cache for one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The recorded slot is current and present on disk
    Reuse(PathBuf),
    /// The archive must be fetched into a new slot
    Refresh(RefreshReason),
}

/// Why a refresh was required
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshReason {
    NoEntry,
    TokenChanged,
    DirectoryMissing,
}

impl RefreshReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefreshReason::NoEntry => "no cache entry",
            RefreshReason::TokenChanged => "version token changed",
            RefreshReason::DirectoryMissing => "cache directory missing",
        }
    }
}

/// Decide whether the cached slot for `project_key` can be reused.
///
/// Tokens are compared verbatim; a checksum on one side and none on the
/// other is a mismatch.
pub fn decide(store: &CacheStore, project_key: &str, expected: &VersionToken) -> Decision {
    let decision = match store.lookup(project_key) {
        None => Decision::Refresh(RefreshReason::NoEntry),
        Some(entry) if entry.version != *expected => {
            Decision::Refresh(RefreshReason::TokenChanged)
        }
        Some(entry) => match store.directory_if_present(&entry.directory) {
            Some(path) => Decision::Reuse(path),
            None => Decision::Refresh(RefreshReason::DirectoryMissing),
        },
    };

    match &decision {
        Decision::Reuse(path) => {
            debug!(project = project_key, path = %path.display(), "Cache hit")
        }
        Decision::Refresh(reason) => {
            debug!(project = project_key, reason = reason.as_str(), "Cache miss")
        }
    }
    decision
}

/// How long an unused slot survives the sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub window: Duration,
}

impl RetentionPolicy {
    pub fn days(days: u32) -> Self {
        Self {
            window: Duration::days(i64::from(days)),
        }
    }

    /// Whether `entry` was used within the window ending at `now`
    pub fn is_fresh(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(entry.last_used_at) <= self.window
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::days(DEFAULT_RETENTION_DAYS)
    }
}
