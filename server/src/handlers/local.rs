//! Local tally handlers - one flat tally per client.

use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::local::{LocalTallies, LocalTally};
use serde::{Deserialize, Serialize};
use tally_engine::{AddOutcome, Applied, Summary, VoteCount, VoteRecord};

/// Current state of a local tally, ready to render.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalView {
    /// Records ordered by votes descending
    pub records: Vec<VoteRecord>,
    pub summary: Summary,
}

impl LocalView {
    fn of(tally: &LocalTally) -> Self {
        Self {
            records: tally.sorted_view(),
            summary: tally.summary(),
        }
    }
}

/// Request body for adding a vote by name.
#[derive(Debug, Deserialize)]
pub struct AddRequest {
    pub name: String,
}

/// Request body for adjusting a record.
#[derive(Debug, Deserialize)]
pub struct AdjustRequest {
    pub name: String,
    pub delta: i64,
}

/// Request body for clearing the tally.
#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    #[serde(default)]
    pub confirm: bool,
}

/// Query parameters for suggestions.
#[derive(Debug, Deserialize)]
pub struct SuggestQuery {
    pub q: Option<String>,
}

/// Response for any local mutation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationResponse<T> {
    /// What the mutation did
    pub result: T,
    /// Whether the change reached storage
    pub persisted: bool,
    /// Why it did not, if so
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flush_error: Option<String>,
    /// State after the change
    pub view: LocalView,
}

impl<T> MutationResponse<T> {
    fn from_applied(applied: Applied<T>, tally: &LocalTally) -> Self {
        Self {
            persisted: applied.is_persisted(),
            flush_error: applied.flush_error.map(|e| e.to_string()),
            result: applied.value,
            view: LocalView::of(tally),
        }
    }
}

/// Run `f` against a client's tally on the blocking pool.
pub async fn with_local_tally<T, F>(
    tallies: Arc<LocalTallies>,
    client_id: String,
    f: F,
) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&mut LocalTally) -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || tallies.with_tally(&client_id, f))
        .await
        .map_err(|e| AppError::Internal(format!("local tally task failed: {}", e)))?
        .map_err(|e| AppError::BadRequest(e.to_string()))?
}

/// Run `f` against a client's tally without keeping it open.
pub async fn read_local_tally<T, F>(
    tallies: Arc<LocalTallies>,
    client_id: String,
    f: F,
) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&LocalTally) -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || tallies.read_tally(&client_id, f))
        .await
        .map_err(|e| AppError::Internal(format!("local tally task failed: {}", e)))?
        .map_err(|e| AppError::BadRequest(e.to_string()))?
}

/// Render the tally.
pub fn handle_view(tally: &LocalTally) -> Result<LocalView> {
    Ok(LocalView::of(tally))
}

/// Add one vote for a name, creating the record if needed.
pub fn handle_add(
    tally: &mut LocalTally,
    request: AddRequest,
) -> Result<MutationResponse<AddOutcome>> {
    let applied = tally.add(&request.name)?;

    match &applied.value {
        AddOutcome::Added { name } => tracing::info!(name = %name, "Record added"),
        AddOutcome::Incremented { name, votes } => {
            tracing::info!(name = %name, votes, "Record incremented")
        }
    }

    Ok(MutationResponse::from_applied(applied, tally))
}

/// Adjust a record's votes. Unknown names are a no-op.
pub fn handle_adjust(
    tally: &mut LocalTally,
    request: AdjustRequest,
) -> Result<MutationResponse<Option<VoteCount>>> {
    let applied = tally.adjust(&request.name, request.delta);
    Ok(MutationResponse::from_applied(applied, tally))
}

/// Remove a record. Unknown names are a no-op.
pub fn handle_remove(tally: &mut LocalTally, name: String) -> Result<MutationResponse<bool>> {
    let applied = tally.remove(&name);
    if applied.value {
        tracing::info!(name = %name, "Record removed");
    }
    Ok(MutationResponse::from_applied(applied, tally))
}

/// Clear the tally. Requires `confirm: true`.
pub fn handle_reset(
    tally: &mut LocalTally,
    request: ResetRequest,
) -> Result<MutationResponse<usize>> {
    if !request.confirm {
        return Err(AppError::BadRequest(
            "reset requires confirmation".to_string(),
        ));
    }

    let applied = tally.reset_all();
    Ok(MutationResponse::from_applied(applied, tally))
}

/// Names matching a search string.
pub fn handle_suggest(tally: &LocalTally, query: SuggestQuery) -> Result<Vec<String>> {
    Ok(tally.suggest(query.q.as_deref().unwrap_or("")))
}
