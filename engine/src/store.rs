//! Store - the local tally container.
//!
//! The store owns the ordered record list and an injected [`KeyValueStore`].
//! It loads the list when opened and flushes it after every mutation.
//! Flushing is best effort: a failed write is logged and reported with the
//! result, but the in-memory change stays applied.

use crate::{
    adapter::KeyValueStore, aggregate, error::Result, snapshot, Error, Summary, VoteCount,
    VoteRecord,
};
use serde::{Deserialize, Serialize};

/// Maximum number of names returned by [`TallyStore::suggest`].
pub const MAX_SUGGESTIONS: usize = 10;

/// What [`TallyStore::add`] did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AddOutcome {
    /// A new record was appended with one vote
    Added { name: String },
    /// An existing record (matched ignoring case) gained one vote
    Incremented { name: String, votes: VoteCount },
}

impl AddOutcome {
    /// Name of the affected record, as stored.
    pub fn name(&self) -> &str {
        match self {
            AddOutcome::Added { name } | AddOutcome::Incremented { name, .. } => name,
        }
    }

    /// Vote count after the add.
    pub fn votes(&self) -> VoteCount {
        match self {
            AddOutcome::Added { .. } => 1,
            AddOutcome::Incremented { votes, .. } => *votes,
        }
    }
}

/// Result of a mutation together with the outcome of flushing it.
#[derive(Debug, Clone, PartialEq)]
pub struct Applied<T> {
    /// What the mutation did
    pub value: T,
    /// Set when the change could not be written to storage
    pub flush_error: Option<Error>,
}

impl<T> Applied<T> {
    /// Whether the change reached storage.
    pub fn is_persisted(&self) -> bool {
        self.flush_error.is_none()
    }
}

/// The local tally.
#[derive(Debug)]
pub struct TallyStore<S> {
    /// Persistence adapter
    storage: S,
    /// Key the collection is stored under
    key: String,
    /// Records in insertion order
    records: Vec<VoteRecord>,
}

impl<S: KeyValueStore> TallyStore<S> {
    /// Open a store on the default key, loading whatever is stored there.
    pub fn open(storage: S) -> Self {
        Self::open_with_key(storage, snapshot::STORAGE_KEY)
    }

    /// Open a store on a specific key.
    ///
    /// Unreadable or missing data yields an empty tally; a read failure is
    /// logged rather than returned so the store is always usable.
    pub fn open_with_key(storage: S, key: impl Into<String>) -> Self {
        let key = key.into();
        let raw = match storage.get(&key) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(key = %key, "Failed to read tally: {}", e);
                None
            }
        };
        let records = snapshot::decode_stored(raw.as_deref());

        tracing::debug!(key = %key, records = records.len(), "Tally loaded");

        Self {
            storage,
            key,
            records,
        }
    }

    /// Records in insertion order.
    pub fn records(&self) -> &[VoteRecord] {
        &self.records
    }

    /// Look up a record by exact name.
    pub fn get(&self, name: &str) -> Option<&VoteRecord> {
        self.records.iter().find(|r| r.name == name)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the tally has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records ordered by votes descending.
    pub fn sorted_view(&self) -> Vec<VoteRecord> {
        aggregate::sorted_view(&self.records)
    }

    /// Aggregate statistics.
    pub fn summary(&self) -> Summary {
        aggregate::summarize(&self.records)
    }

    /// The persistence adapter.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Add one vote for `name`, creating the record if needed.
    ///
    /// The name is trimmed and matched ignoring case. An empty name is
    /// rejected and nothing changes.
    pub fn add(&mut self, name: &str) -> Result<Applied<AddOutcome>> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::EmptyName);
        }

        let outcome = match self.records.iter_mut().find(|r| r.matches(name)) {
            Some(record) => {
                let votes = record.adjust(1);
                AddOutcome::Incremented {
                    name: record.name.clone(),
                    votes,
                }
            }
            None => {
                self.records.push(VoteRecord::new(name, 1));
                AddOutcome::Added {
                    name: name.to_string(),
                }
            }
        };

        Ok(self.flushed(outcome))
    }

    /// Adjust the record named exactly `name` by `delta`, clamping at zero.
    ///
    /// Returns the new count, or `None` if no such record exists.
    pub fn adjust(&mut self, name: &str, delta: i64) -> Applied<Option<VoteCount>> {
        let votes = self
            .records
            .iter_mut()
            .find(|r| r.name == name)
            .map(|r| r.adjust(delta));

        self.flushed(votes)
    }

    /// Remove the record named exactly `name`. Returns whether one existed.
    pub fn remove(&mut self, name: &str) -> Applied<bool> {
        let before = self.records.len();
        self.records.retain(|r| r.name != name);
        let removed = self.records.len() != before;

        self.flushed(removed)
    }

    /// Remove every record. Returns how many there were.
    pub fn reset_all(&mut self) -> Applied<usize> {
        let cleared = self.records.len();
        self.records.clear();

        tracing::info!(key = %self.key, cleared, "Tally reset");
        self.flushed(cleared)
    }

    /// Names containing `query` (ignoring case), at most [`MAX_SUGGESTIONS`].
    pub fn suggest(&self, query: &str) -> Vec<String> {
        if query.is_empty() {
            return Vec::new();
        }
        let query = query.to_lowercase();

        self.records
            .iter()
            .filter(|r| r.name.to_lowercase().contains(&query))
            .take(MAX_SUGGESTIONS)
            .map(|r| r.name.clone())
            .collect()
    }

    /// Write the current records to storage.
    pub fn flush(&mut self) -> Result<()> {
        let json = snapshot::to_json(&self.records)?;
        self.storage.set(&self.key, &json)
    }

    fn flushed<T>(&mut self, value: T) -> Applied<T> {
        let flush_error = match self.flush() {
            Ok(()) => None,
            Err(e) => {
                tracing::error!(key = %self.key, "Failed to save tally: {}", e);
                Some(e)
            }
        };

        Applied { value, flush_error }
    }
}
