//! Vote record type.

use crate::{CandidateName, VoteCount};
use serde::{Deserialize, Serialize};

/// One tally row: a name and its vote count.
///
/// The name is the identity key and is compared case-insensitively when new
/// votes are added. `votes` defaults to zero when absent from stored JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRecord {
    /// Display name, stored with the casing it was first added with
    pub name: CandidateName,
    /// Current vote count
    #[serde(default)]
    pub votes: VoteCount,
}

impl VoteRecord {
    /// Create a new record.
    pub fn new(name: impl Into<CandidateName>, votes: VoteCount) -> Self {
        Self {
            name: name.into(),
            votes,
        }
    }

    /// Case-insensitive name comparison.
    pub fn matches(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }

    /// Apply a signed delta, clamping at zero.
    pub fn adjust(&mut self, delta: i64) -> VoteCount {
        self.votes = apply_delta(self.votes, delta);
        self.votes
    }
}

/// `max(0, votes + delta)` without overflow.
pub fn apply_delta(votes: VoteCount, delta: i64) -> VoteCount {
    if delta >= 0 {
        votes.saturating_add(delta.unsigned_abs())
    } else {
        votes.saturating_sub(delta.unsigned_abs())
    }
}
