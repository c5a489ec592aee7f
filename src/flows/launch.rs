//! Launch flow
//!
//! One invocation end to end: consult the cache policy, refresh the slot
//! through the archive transport when needed, record the entry, sweep aged
//! slots and finally hand the binary to the executor.
//!
//! The index is loaded once per invocation and written back by the store;
//! nothing is carried between runs except `config.json` and the slots.

use std::ffi::OsString;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::backends::exec::{Executor, Invocation};
use crate::backends::transport::ArchiveTransport;
use crate::cache::advisory::Advisory;
use crate::cache::entry::CacheEntry;
use crate::cache::policy::{decide, Decision, RetentionPolicy};
use crate::cache::store::CacheStore;
use crate::config::Descriptor;
use crate::core::error::LaunchError;

/// A slot ready to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prepared {
    pub slot: PathBuf,
    /// Whether the archive was fetched during this invocation
    pub refreshed: bool,
}

/// Sequences cache decisions with fetch and exec for a single run
pub struct Launcher<'a> {
    store: CacheStore,
    transport: &'a dyn ArchiveTransport,
    retention: RetentionPolicy,
}

impl<'a> Launcher<'a> {
    pub fn new(
        store: CacheStore,
        transport: &'a dyn ArchiveTransport,
        retention: RetentionPolicy,
    ) -> Self {
        Self {
            store,
            transport,
            retention,
        }
    }

    /// Make sure the descriptor's archive is present in a current slot
    pub fn prepare(&mut self, descriptor: &Descriptor) -> Result<Prepared, LaunchError> {
        let key = descriptor.project_key.as_str();

        let prepared = match decide(&self.store, key, &descriptor.version) {
            Decision::Reuse(slot) => match self.store.lookup(key).cloned() {
                Some(entry) => {
                    self.store.save(entry, key)?.log("restamp");
                    Prepared {
                        slot,
                        refreshed: false,
                    }
                }
                None => self.refresh(descriptor)?,
            },
            Decision::Refresh(reason) => {
                info!(
                    project = key,
                    reason = reason.as_str(),
                    source = %descriptor.fetch.describe(),
                    "Refreshing cached archive"
                );
                self.refresh(descriptor)?
            }
        };

        self.store
            .sweep_stale(&self.retention, Some(key))
            .log("sweep");
        Ok(prepared)
    }

    /// Prepare, then execute the tool with `args`
    pub fn run(
        &mut self,
        descriptor: &Descriptor,
        args: Vec<OsString>,
        executor: &dyn Executor,
    ) -> Result<i32, LaunchError> {
        let prepared = self.prepare(descriptor)?;
        let invocation = Invocation::new(
            &prepared.slot,
            &descriptor.executable,
            args,
            &descriptor.env,
        );
        Ok(executor.exec(&invocation)?)
    }

    fn refresh(&mut self, descriptor: &Descriptor) -> Result<Prepared, LaunchError> {
        let (directory, slot) = self.store.allocate_directory()?;

        if let Err(e) = self.transport.populate(&descriptor.fetch, &slot) {
            let mut advisory = Advisory::default();
            advisory.remove_dir(&slot);
            advisory.log("abandon slot");
            return Err(e.into());
        }

        let entry = CacheEntry::new(directory, descriptor.version.clone());
        self.store
            .save(entry, &descriptor.project_key)?
            .log("supersede");
        debug!(slot = %slot.display(), "Cache slot populated");

        Ok(Prepared {
            slot,
            refreshed: true,
        })
    }
}
