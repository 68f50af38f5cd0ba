//! Entry batches - the multi-user tally.
//!
//! In this variant nobody stores vote counts directly. Every save writes one
//! [`BatchEntry`] per selected candidate, all sharing a fresh batch number,
//! and the visible tally is the per-candidate sum of entry deltas.
//!
//! The free functions here are the rules; a SQL backend applies them against
//! its own tables. [`BatchLedger`] applies them to an in-memory table.

use crate::{
    aggregate, error::Result, record::apply_delta, BatchNumber, CandidateName, EntryId, Error,
    Summary, UserId, VoteRecord,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One vote entry written by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchEntry {
    pub id: EntryId,
    pub user_id: UserId,
    pub candidate_name: CandidateName,
    pub vote_delta: i64,
    pub batch_number: BatchNumber,
}

/// An entry that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEntry {
    pub user_id: UserId,
    pub candidate_name: CandidateName,
    pub vote_delta: i64,
    pub batch_number: BatchNumber,
}

/// What to do for a vote adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdjustPlan {
    /// Overwrite the delta of an existing entry
    Update { id: EntryId, vote_delta: i64 },
    /// Insert a new entry carrying the delta
    Insert { vote_delta: i64 },
    /// Nothing to do
    Skip,
}

/// Aggregated tally derived from entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TallyView {
    /// Records ordered by votes descending
    pub records: Vec<VoteRecord>,
    pub summary: Summary,
    /// Highest batch number issued so far, across all users
    pub max_batch_number: Option<BatchNumber>,
}

/// Result of a save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveReceipt {
    pub batch_number: BatchNumber,
    pub user_id: UserId,
    /// Candidates that received a vote, in roster order
    pub candidates: Vec<CandidateName>,
}

impl SaveReceipt {
    /// Describe a planned save. `None` for an empty plan.
    pub fn for_entries(entries: &[NewEntry]) -> Option<Self> {
        let first = entries.first()?;
        Some(Self {
            batch_number: first.batch_number,
            user_id: first.user_id,
            candidates: entries.iter().map(|e| e.candidate_name.clone()).collect(),
        })
    }
}

/// Result of an undo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoReceipt {
    pub batch_number: BatchNumber,
    pub user_id: UserId,
    pub removed: usize,
}

/// Require a selected user.
pub fn require_user(user_id: Option<UserId>) -> Result<UserId> {
    user_id.ok_or(Error::NoUserSelected)
}

/// Roster names not in the exclusion set, in roster order.
///
/// Exclusions match names exactly, as the roster is the source of both.
pub fn remaining_selection<'a>(
    roster: &'a [CandidateName],
    excluded: &[CandidateName],
) -> Vec<&'a CandidateName> {
    roster.iter().filter(|name| !excluded.contains(name)).collect()
}

/// The batch number following the current maximum.
///
/// Only existing entries count. Once the highest batch is undone or its
/// entries deleted, its number is issued again by the next save.
pub fn next_batch_number(current_max: Option<BatchNumber>) -> BatchNumber {
    current_max.map_or(1, |max| max + 1)
}

/// Validate a save and build its entries.
pub fn plan_save(
    roster: &[CandidateName],
    excluded: &[CandidateName],
    user_id: Option<UserId>,
    current_max: Option<BatchNumber>,
) -> Result<Vec<NewEntry>> {
    let user_id = require_user(user_id)?;
    let remaining = remaining_selection(roster, excluded);
    if remaining.is_empty() {
        return Err(Error::NothingToSave);
    }

    let batch_number = next_batch_number(current_max);
    Ok(remaining
        .into_iter()
        .map(|name| NewEntry {
            user_id,
            candidate_name: name.clone(),
            vote_delta: 1,
            batch_number,
        })
        .collect())
}

/// Decide how to apply `delta` given the user's existing entry, if any.
pub fn plan_adjust(existing: Option<(EntryId, i64)>, delta: i64) -> AdjustPlan {
    match existing {
        Some((id, current)) => AdjustPlan::Update {
            id,
            vote_delta: clamped_delta(current, delta),
        },
        None if delta > 0 => AdjustPlan::Insert { vote_delta: delta },
        None => AdjustPlan::Skip,
    }
}

/// `max(0, current + delta)` for entry deltas.
pub fn clamped_delta(current: i64, delta: i64) -> i64 {
    current.saturating_add(delta).max(0)
}

/// Group entries by candidate, summing deltas.
///
/// Candidates appear in the order they are first seen. Sums below zero are
/// shown as zero.
pub fn aggregate_entries<'a>(entries: impl IntoIterator<Item = &'a BatchEntry>) -> Vec<VoteRecord> {
    let mut order: Vec<CandidateName> = Vec::new();
    let mut sums: HashMap<CandidateName, i64> = HashMap::new();

    for entry in entries {
        let sum = sums.entry(entry.candidate_name.clone()).or_insert_with(|| {
            order.push(entry.candidate_name.clone());
            0
        });
        *sum = sum.saturating_add(entry.vote_delta);
    }

    order
        .into_iter()
        .map(|name| {
            let sum = sums.get(&name).copied().unwrap_or(0);
            VoteRecord::new(name, apply_delta(0, sum))
        })
        .collect()
}

/// Build the aggregate view from entries and the current maximum batch.
pub fn tally_view(records: Vec<VoteRecord>, max_batch_number: Option<BatchNumber>) -> TallyView {
    let summary = aggregate::summarize(&records);
    TallyView {
        records: aggregate::sorted_view(&records),
        summary,
        max_batch_number,
    }
}

/// In-memory entries table with the batch operations on top.
#[derive(Debug, Clone)]
pub struct BatchLedger {
    roster: Vec<CandidateName>,
    entries: Vec<BatchEntry>,
    next_id: EntryId,
}

impl BatchLedger {
    /// Create an empty ledger over a fixed roster.
    pub fn new(roster: Vec<CandidateName>) -> Self {
        Self {
            roster,
            entries: Vec::new(),
            next_id: 1,
        }
    }

    /// The candidate roster.
    pub fn roster(&self) -> &[CandidateName] {
        &self.roster
    }

    /// All entries in insertion order.
    pub fn entries(&self) -> &[BatchEntry] {
        &self.entries
    }

    /// Highest batch number across all users.
    pub fn max_batch_number(&self) -> Option<BatchNumber> {
        self.entries.iter().map(|e| e.batch_number).max()
    }

    /// Highest batch number written by `user_id`.
    pub fn last_batch_for(&self, user_id: UserId) -> Option<BatchNumber> {
        self.entries
            .iter()
            .filter(|e| e.user_id == user_id)
            .map(|e| e.batch_number)
            .max()
    }

    /// Give one vote to every roster candidate not excluded.
    pub fn save_selection(
        &mut self,
        excluded: &[CandidateName],
        user_id: Option<UserId>,
    ) -> Result<SaveReceipt> {
        let planned = plan_save(&self.roster, excluded, user_id, self.max_batch_number())?;

        let receipt = SaveReceipt::for_entries(&planned).ok_or(Error::NothingToSave)?;
        for entry in planned {
            self.insert(entry);
        }

        Ok(receipt)
    }

    /// Adjust the user's entry for `name` by `delta`.
    ///
    /// Returns the entry delta after the change, or `None` when nothing was
    /// written.
    pub fn adjust_vote(
        &mut self,
        name: &str,
        delta: i64,
        user_id: Option<UserId>,
    ) -> Result<Option<i64>> {
        let user_id = require_user(user_id)?;
        let existing = self
            .entries
            .iter()
            .rev()
            .find(|e| e.user_id == user_id && e.candidate_name == name)
            .map(|e| (e.id, e.vote_delta));

        match plan_adjust(existing, delta) {
            AdjustPlan::Update { id, vote_delta } => {
                if let Some(entry) = self.entries.iter_mut().find(|e| e.id == id) {
                    entry.vote_delta = vote_delta;
                }
                Ok(Some(vote_delta))
            }
            AdjustPlan::Insert { vote_delta } => {
                let batch_number = next_batch_number(self.max_batch_number());
                self.insert(NewEntry {
                    user_id,
                    candidate_name: name.to_string(),
                    vote_delta,
                    batch_number,
                });
                Ok(Some(vote_delta))
            }
            AdjustPlan::Skip => Ok(None),
        }
    }

    /// Delete every entry for `name`, across all users and batches.
    pub fn delete_candidate(&mut self, name: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.candidate_name != name);
        before - self.entries.len()
    }

    /// Delete the user's most recent batch.
    pub fn undo_last_batch(&mut self, user_id: Option<UserId>) -> Result<UndoReceipt> {
        let user_id = require_user(user_id)?;
        let batch_number = self.last_batch_for(user_id).ok_or(Error::NothingToUndo)?;

        let before = self.entries.len();
        self.entries
            .retain(|e| !(e.user_id == user_id && e.batch_number == batch_number));

        Ok(UndoReceipt {
            batch_number,
            user_id,
            removed: before - self.entries.len(),
        })
    }

    /// Recompute the aggregate view.
    pub fn refresh_aggregate(&self) -> TallyView {
        tally_view(aggregate_entries(&self.entries), self.max_batch_number())
    }

    fn insert(&mut self, entry: NewEntry) {
        self.entries.push(BatchEntry {
            id: self.next_id,
            user_id: entry.user_id,
            candidate_name: entry.candidate_name,
            vote_delta: entry.vote_delta,
            batch_number: entry.batch_number,
        });
        self.next_id += 1;
    }
}
