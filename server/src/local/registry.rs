//! Registry of open local tallies.
//!
//! Tallies are opened on the first mutation and kept in memory afterwards,
//! up to a fixed number. Reads of a tally that is not open load it from disk
//! without keeping it. Access to one client's tally goes through its map
//! entry, so calls for the same client never overlap.

use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use tally_engine::TallyStore;

use super::{is_safe_name, FileStore};

/// A client's tally.
pub type LocalTally = TallyStore<FileStore>;

/// Default number of tallies held in memory.
pub const DEFAULT_MAX_OPEN: usize = 1024;

/// Open tallies keyed by client id.
#[derive(Debug)]
pub struct LocalTallies {
    data_dir: PathBuf,
    max_open: usize,
    tallies: DashMap<String, LocalTally>,
}

/// Client id that cannot name a storage directory.
#[derive(Debug, thiserror::Error)]
#[error("invalid client id: {0:?}")]
pub struct InvalidClientId(pub String);

impl LocalTallies {
    /// Create an empty registry storing tallies under `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self::with_max_open(data_dir, DEFAULT_MAX_OPEN)
    }

    /// Create an empty registry holding at most `max_open` tallies in memory.
    pub fn with_max_open(data_dir: impl Into<PathBuf>, max_open: usize) -> Self {
        Self {
            data_dir: data_dir.into(),
            max_open: max_open.max(1),
            tallies: DashMap::new(),
        }
    }

    /// Create a registry wrapped in Arc for sharing.
    pub fn new_shared(data_dir: impl Into<PathBuf>, max_open: usize) -> Arc<Self> {
        Arc::new(Self::with_max_open(data_dir, max_open))
    }

    /// Run `f` on the client's tally, opening and keeping it if needed.
    ///
    /// When the registry is full another tally is evicted first.
    /// This does blocking file IO; call it off the async runtime.
    pub fn with_tally<R>(
        &self,
        client_id: &str,
        f: impl FnOnce(&mut LocalTally) -> R,
    ) -> Result<R, InvalidClientId> {
        check_client_id(client_id)?;

        if !self.tallies.contains_key(client_id) && self.tallies.len() >= self.max_open {
            self.evict_one(client_id);
        }

        let mut tally = self
            .tallies
            .entry(client_id.to_string())
            .or_insert_with(|| {
                tracing::info!(client_id = %client_id, "Opening local tally");
                self.open(client_id)
            });

        Ok(f(tally.value_mut()))
    }

    /// Run `f` on the client's tally without keeping it open.
    ///
    /// An open tally is read in place; otherwise it is loaded from disk and
    /// dropped afterwards.
    pub fn read_tally<R>(
        &self,
        client_id: &str,
        f: impl FnOnce(&LocalTally) -> R,
    ) -> Result<R, InvalidClientId> {
        check_client_id(client_id)?;

        if let Some(tally) = self.tallies.get(client_id) {
            return Ok(f(tally.value()));
        }

        Ok(f(&self.open(client_id)))
    }

    /// Number of tallies held in memory.
    pub fn open_count(&self) -> usize {
        self.tallies.len()
    }

    fn open(&self, client_id: &str) -> LocalTally {
        TallyStore::open(FileStore::new(self.data_dir.join(client_id)))
    }

    fn evict_one(&self, keep: &str) {
        let victim = self
            .tallies
            .iter()
            .map(|entry| entry.key().clone())
            .find(|key| key != keep);

        if let Some((client_id, mut tally)) = victim.and_then(|key| self.tallies.remove(&key)) {
            // Mutations flush as they go; this only matters after a failed flush.
            if let Err(e) = tally.flush() {
                tracing::error!(client_id = %client_id, error = %e, "Flush on eviction failed");
            }
            tracing::debug!(client_id = %client_id, "Evicted local tally");
        }
    }
}

fn check_client_id(client_id: &str) -> Result<(), InvalidClientId> {
    if is_safe_name(client_id) {
        Ok(())
    } else {
        Err(InvalidClientId(client_id.to_string()))
    }
}
