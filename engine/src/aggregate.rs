//! Derived statistics over a set of vote records.
//!
//! Everything here is a pure function of the records. Callers recompute after
//! each mutation instead of caching results.

use crate::{CandidateName, VoteCount, VoteRecord};
use serde::{Deserialize, Serialize};

/// What a UI shows in place of the leader when there are no records.
pub const LEADER_PLACEHOLDER: &str = "—";

/// Aggregate view of a tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    /// Number of records
    pub total_voters: usize,
    /// Sum of all vote counts
    pub total_votes: VoteCount,
    /// Name of the leading record, if any
    pub leader: Option<CandidateName>,
}

impl Summary {
    /// Leader name, or [`LEADER_PLACEHOLDER`] when empty.
    pub fn leader_label(&self) -> &str {
        self.leader.as_deref().unwrap_or(LEADER_PLACEHOLDER)
    }
}

/// Records ordered by votes descending.
///
/// The sort is stable, so records with equal votes keep collection order.
pub fn sorted_view(records: &[VoteRecord]) -> Vec<VoteRecord> {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| b.votes.cmp(&a.votes));
    sorted
}

/// Sum of all vote counts.
pub fn total_votes(records: &[VoteRecord]) -> VoteCount {
    records
        .iter()
        .fold(0, |sum: VoteCount, r| sum.saturating_add(r.votes))
}

/// The first record with the highest vote count, in collection order.
///
/// This is the head of [`sorted_view`] without the allocation.
pub fn leader(records: &[VoteRecord]) -> Option<&VoteRecord> {
    records.iter().fold(None, |best: Option<&VoteRecord>, r| match best {
        Some(b) if b.votes >= r.votes => Some(b),
        _ => Some(r),
    })
}

/// Compute the full summary.
pub fn summarize(records: &[VoteRecord]) -> Summary {
    Summary {
        total_voters: records.len(),
        total_votes: total_votes(records),
        leader: leader(records).map(|r| r.name.clone()),
    }
}
