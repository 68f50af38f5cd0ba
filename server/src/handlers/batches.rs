//! Entry batch handlers - the shared, multi-user tally.
//!
//! Every handler re-reads what it needs from the database and applies the
//! batch rules from `tally_engine::batch`. Nothing is cached between calls.
//!
//! `handle_adjust_vote` reads the user's entry and then writes it in a second
//! statement. Two clients adjusting the same user and candidate at once can
//! both read the old delta; the later write wins.

use crate::db;
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tally_engine::batch::{self, AdjustPlan};
use tally_engine::{
    BatchNumber, CandidateName, EntryId, NewEntry, SaveReceipt, TallyView, UndoReceipt, UserId,
};

/// Request body for saving a selection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest {
    /// Operator making the save
    pub user_id: Option<UserId>,
    /// Roster names that should not get a vote
    #[serde(default)]
    pub excluded: Vec<CandidateName>,
}

/// Request body for adjusting one candidate's vote.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustVoteRequest {
    pub user_id: Option<UserId>,
    pub name: CandidateName,
    pub delta: i64,
}

/// Response for a vote adjustment.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustVoteResponse {
    /// The user's entry delta after the change, if anything was written
    pub vote_delta: Option<i64>,
    pub tally: TallyView,
}

/// Request body for undoing a batch.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoRequest {
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub confirm: bool,
}

/// Response for a global candidate delete.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteCandidateResponse {
    pub removed: u64,
    pub tally: TallyView,
}

/// Query parameters for a user's entry history.
#[derive(Debug, Deserialize)]
pub struct EntriesQuery {
    pub limit: Option<i64>,
}

/// One entry in a user's history.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryView {
    pub id: EntryId,
    pub candidate_name: CandidateName,
    pub vote_delta: i64,
    pub batch_number: BatchNumber,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Default limit for entry history.
const DEFAULT_LIMIT: i64 = 100;

/// Maximum limit for entry history.
const MAX_LIMIT: i64 = 1000;

/// Re-read all entries and rebuild the aggregate view.
pub async fn handle_refresh(pool: &PgPool) -> Result<TallyView> {
    let stored = db::get_all_entries(pool).await?;
    let entries: Vec<_> = stored.iter().map(db::StoredEntry::to_entry).collect();
    let max_batch_number = entries.iter().map(|e| e.batch_number).max();

    Ok(batch::tally_view(
        batch::aggregate_entries(&entries),
        max_batch_number,
    ))
}

/// Give one vote to every roster candidate not excluded, as a new batch.
pub async fn handle_save(pool: &PgPool, request: SaveRequest) -> Result<SaveReceipt> {
    let user_id = batch::require_user(request.user_id)?;
    ensure_user(pool, user_id).await?;

    let roster = db::get_candidates(pool).await?;
    let current_max = db::get_max_batch_number(pool).await?;
    let planned = batch::plan_save(&roster, &request.excluded, Some(user_id), current_max)?;

    let receipt = SaveReceipt::for_entries(&planned)
        .ok_or_else(|| AppError::Internal("save planned no entries".to_string()))?;

    db::insert_entries(pool, &planned).await?;

    tracing::info!(
        user_id,
        batch_number = receipt.batch_number,
        candidates = receipt.candidates.len(),
        "Batch saved"
    );

    Ok(receipt)
}

/// Adjust the user's most recent entry for a candidate.
pub async fn handle_adjust_vote(
    pool: &PgPool,
    request: AdjustVoteRequest,
) -> Result<AdjustVoteResponse> {
    let user_id = batch::require_user(request.user_id)?;
    ensure_user(pool, user_id).await?;

    let existing = db::find_user_entry(pool, user_id, &request.name).await?;

    let vote_delta = match batch::plan_adjust(existing, request.delta) {
        AdjustPlan::Update { id, vote_delta } => {
            db::update_entry_delta(pool, id, vote_delta).await?;
            tracing::debug!(user_id, entry_id = id, vote_delta, "Entry updated");
            Some(vote_delta)
        }
        AdjustPlan::Insert { vote_delta } => {
            let batch_number =
                batch::next_batch_number(db::get_max_batch_number(pool).await?);
            let entry = NewEntry {
                user_id,
                candidate_name: request.name.clone(),
                vote_delta,
                batch_number,
            };
            db::insert_entries(pool, std::slice::from_ref(&entry)).await?;
            tracing::debug!(user_id, batch_number, candidate = %request.name, "Entry inserted");
            Some(vote_delta)
        }
        AdjustPlan::Skip => None,
    };

    let tally = handle_refresh(pool).await?;
    Ok(AdjustVoteResponse { vote_delta, tally })
}

/// Delete a candidate's entries for every user and batch.
pub async fn handle_delete_candidate(
    pool: &PgPool,
    name: String,
) -> Result<DeleteCandidateResponse> {
    let removed = db::delete_candidate_entries(pool, &name).await?;
    tracing::info!(candidate = %name, removed, "Candidate entries deleted");

    let tally = handle_refresh(pool).await?;
    Ok(DeleteCandidateResponse { removed, tally })
}

/// Delete the user's most recent batch. Requires `confirm: true`.
pub async fn handle_undo(pool: &PgPool, request: UndoRequest) -> Result<UndoReceipt> {
    let user_id = batch::require_user(request.user_id)?;

    let batch_number = db::get_last_batch_for_user(pool, user_id)
        .await?
        .ok_or(tally_engine::Error::NothingToUndo)?;

    if !request.confirm {
        return Err(AppError::BadRequest(format!(
            "undo of batch {} requires confirmation",
            batch_number
        )));
    }

    let removed = db::delete_user_batch(pool, user_id, batch_number).await?;
    tracing::info!(user_id, batch_number, removed, "Batch undone");

    Ok(UndoReceipt {
        batch_number,
        user_id,
        removed: removed as usize,
    })
}

/// A user's entries, newest first.
pub async fn handle_user_entries(
    pool: &PgPool,
    user_id: UserId,
    query: EntriesQuery,
) -> Result<Vec<EntryView>> {
    let limit = query
        .limit
        .map(|l| l.clamp(1, MAX_LIMIT))
        .unwrap_or(DEFAULT_LIMIT);

    let stored = db::get_user_entries(pool, user_id, limit).await?;
    Ok(stored
        .into_iter()
        .map(|e| EntryView {
            id: e.id,
            candidate_name: e.candidate_name,
            vote_delta: e.vote_delta,
            batch_number: e.batch_number,
            created_at: e.created_at,
        })
        .collect())
}

async fn ensure_user(pool: &PgPool, user_id: UserId) -> Result<()> {
    if db::user_exists(pool, user_id).await? {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!("unknown user: {}", user_id)))
    }
}
