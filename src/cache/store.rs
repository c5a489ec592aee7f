//! Cache store - Read/write the cache index and manage slot directories
//!
//! Layout under the launcher home:
//!
//! ```text
//! <home>/
//! ├── config.json        # CacheIndex, pretty-printed
//! └── cache/
//!     └── <directory>/   # one extracted archive per entry
//! ```
//!
//! There is no cross-process locking. Each invocation loads the index once,
//! mutates it and rewrites the whole file; concurrent invocations race with
//! last-writer-wins semantics. A slot whose entry is lost that way is
//! reclaimed by the next sweep.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::cache::advisory::Advisory;
use crate::cache::entry::{CacheEntry, CacheIndex};
use crate::cache::policy::RetentionPolicy;
use crate::core::error::CacheError;
use crate::core::paths::{index_path, slots_dir};

/// Durable cache index plus the slot directories it references
#[derive(Debug)]
pub struct CacheStore {
    home: PathBuf,
    index: CacheIndex,
}

impl CacheStore {
    /// Load the index under `home`; a missing index file is an empty index
    pub fn load(home: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let home = home.into();
        let path = index_path(&home);

        let index = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content)
                .map_err(|source| CacheError::CorruptIndex {
                    path: path.clone(),
                    source,
                })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No cache index yet");
                CacheIndex::default()
            }
            Err(source) => return Err(CacheError::IndexRead { path, source }),
        };

        debug!(
            path = %path.display(),
            entries = index.entries.len(),
            "Loaded cache index"
        );
        Ok(Self { home, index })
    }

    pub fn index(&self) -> &CacheIndex {
        &self.index
    }

    pub fn lookup(&self, project_key: &str) -> Option<&CacheEntry> {
        self.index.lookup(project_key)
    }

    /// Path of a slot, only if it exists and is a directory
    pub fn directory_if_present(&self, directory: &str) -> Option<PathBuf> {
        let path = self.slot_path(directory)?;
        path.is_dir().then_some(path)
    }

    /// Path of a slot under the cache root.
    ///
    /// `None` unless `directory` is a single plain path component.
    fn slot_path(&self, directory: &str) -> Option<PathBuf> {
        let mut components = Path::new(directory).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Some(slots_dir(&self.home).join(directory)),
            _ => {
                if !directory.is_empty() {
                    warn!(directory, "Ignoring cache slot name outside the cache root");
                }
                None
            }
        }
    }

    /// Create a fresh, never-used slot directory
    pub fn allocate_directory(&self) -> Result<(String, PathBuf), CacheError> {
        let slots = slots_dir(&self.home);
        loop {
            let name = Uuid::new_v4().simple().to_string();
            let path = slots.join(&name);
            if path.exists() || self.index.entries.values().any(|e| e.directory == name) {
                continue;
            }
            fs::create_dir_all(&path).map_err(|source| CacheError::DirectoryCreate {
                path: path.clone(),
                source,
            })?;
            debug!(directory = %name, "Allocated cache slot");
            return Ok((name, path));
        }
    }

    /// Record `entry` for `project_key`, stamped with the current time
    pub fn save(&mut self, entry: CacheEntry, project_key: &str) -> Result<Advisory, CacheError> {
        self.save_at(entry, project_key, Utc::now())
    }

    /// Record `entry` for `project_key`, stamped with `now`.
    ///
    /// A superseded slot for the same key is removed after the index is
    /// written; failures there are returned as advisory.
    pub fn save_at(
        &mut self,
        mut entry: CacheEntry,
        project_key: &str,
        now: DateTime<Utc>,
    ) -> Result<Advisory, CacheError> {
        entry.last_used_at = now;
        let new_directory = entry.directory.clone();
        let previous = self.index.entries.insert(project_key.to_string(), entry);
        self.write_index()?;

        let mut advisory = Advisory::default();
        if let Some(previous) = previous {
            if previous.directory != new_directory
                && !self
                    .index
                    .is_claimed_elsewhere(&previous.directory, project_key)
            {
                if let Some(old_slot) = self.slot_path(&previous.directory) {
                    info!(
                        project = project_key,
                        old = %previous.directory,
                        new = %new_directory,
                        "Superseding cache slot"
                    );
                    advisory.remove_dir(&old_slot);
                }
            }
        }
        Ok(advisory)
    }

    /// Drop the entry for `project_key` and remove its slot
    pub fn forget(&mut self, project_key: &str) -> Result<Option<Advisory>, CacheError> {
        let Some(previous) = self.index.entries.remove(project_key) else {
            return Ok(None);
        };
        self.write_index()?;

        let mut advisory = Advisory::default();
        if !self
            .index
            .is_claimed_elsewhere(&previous.directory, project_key)
        {
            if let Some(old_slot) = self.slot_path(&previous.directory) {
                advisory.remove_dir(&old_slot);
            }
        }
        Ok(Some(advisory))
    }

    /// Remove the index file and every slot under `home`.
    ///
    /// Works without loading the index, so a corrupt index can be cleared.
    pub fn clear_home(home: &Path) -> Advisory {
        let mut advisory = Advisory::default();
        advisory.remove_file(&index_path(home));

        let slots = slots_dir(home);
        if slots.is_dir() {
            advisory.remove_dir(&slots);
        } else {
            advisory.remove_file(&slots);
        }
        advisory
    }

    /// Remove slots not referenced by an entry used within the retention window.
    ///
    /// The entry for `in_use`, if given, is kept regardless of its age.
    pub fn sweep_stale(&mut self, policy: &RetentionPolicy, in_use: Option<&str>) -> Advisory {
        self.sweep_stale_at(policy, Utc::now(), in_use)
    }

    /// Sweep against an explicit clock.
    ///
    /// Entries that aged out are pruned from the index as well; if the
    /// pruned index cannot be written the failure is reported as advisory.
    pub fn sweep_stale_at(
        &mut self,
        policy: &RetentionPolicy,
        now: DateTime<Utc>,
        in_use: Option<&str>,
    ) -> Advisory {
        let mut advisory = Advisory::default();
        let slots = slots_dir(&self.home);

        match fs::metadata(&slots) {
            Ok(meta) if !meta.is_dir() => {
                info!(path = %slots.display(), "Cache root is not a directory, removing it");
                advisory.remove_file(&slots);
                return advisory;
            }
            Ok(_) => {}
            Err(_) => return advisory,
        }

        let stale: Vec<String> = self
            .index
            .entries
            .iter()
            .filter(|(key, entry)| Some(key.as_str()) != in_use && !policy.is_fresh(entry, now))
            .map(|(key, _)| key.clone())
            .collect();
        if !stale.is_empty() {
            for key in &stale {
                debug!(project = %key, "Pruning stale cache entry");
                self.index.entries.remove(key);
            }
            if let Err(e) = self.write_index() {
                let path = index_path(&self.home);
                advisory.failures.push((path, io::Error::other(e.to_string())));
            }
        }

        let keep: HashSet<&str> = self
            .index
            .entries
            .values()
            .map(|entry| entry.directory.as_str())
            .collect();

        for dir_entry in WalkDir::new(&slots)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !dir_entry.file_type().is_dir() {
                continue;
            }
            let name = dir_entry.file_name().to_string_lossy();
            if keep.contains(name.as_ref()) {
                continue;
            }
            advisory.remove_dir(dir_entry.path());
        }

        advisory
    }

    /// Rewrite the whole index file, replacing it atomically
    fn write_index(&self) -> Result<(), CacheError> {
        let path = index_path(&self.home);
        let write_err = |source: io::Error| CacheError::IndexWrite {
            path: path.clone(),
            source,
        };

        fs::create_dir_all(&self.home).map_err(write_err)?;
        let json = serde_json::to_string_pretty(&self.index)
            .map_err(|e| write_err(io::Error::other(e)))?;

        let mut file = tempfile::NamedTempFile::new_in(&self.home).map_err(write_err)?;
        file.write_all(json.as_bytes()).map_err(write_err)?;
        file.write_all(b"\n").map_err(write_err)?;
        file.persist(&path).map_err(|e| write_err(e.error))?;

        debug!(path = %path.display(), entries = self.index.entries.len(), "Wrote cache index");
        Ok(())
    }
}
