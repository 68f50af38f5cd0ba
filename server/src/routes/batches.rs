//! Roster, tally and entry batch routes.

use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post},
    Json, Router,
};
use tally_engine::{CandidateName, SaveReceipt, TallyView, UndoReceipt, UserId};

use crate::auth::AuthUser;
use crate::db;
use crate::error::Result;
use crate::handlers::{
    handle_adjust_vote, handle_delete_candidate, handle_refresh, handle_save, handle_undo,
    handle_user_entries, AdjustVoteRequest, AdjustVoteResponse, DeleteCandidateResponse,
    EntriesQuery, EntryView, SaveRequest, UndoRequest,
};
use crate::AppState;

/// Create batch routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/roster/candidates", get(candidates_handler))
        .route("/roster/users", get(users_handler))
        .route("/tally", get(tally_handler))
        .route("/batches", post(save_handler))
        .route("/batches/undo", post(undo_handler))
        .route("/entries/adjust", post(adjust_handler))
        .route("/users/{user_id}/entries", get(user_entries_handler))
        .route("/candidates/{name}/entries", delete(delete_candidate_handler))
}

/// GET /roster/candidates - Candidate roster.
async fn candidates_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> Result<Json<Vec<CandidateName>>> {
    Ok(Json(db::get_candidates(&state.pool).await?))
}

/// GET /roster/users - Data-entry operators.
async fn users_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> Result<Json<Vec<db::StoredUser>>> {
    Ok(Json(db::get_users(&state.pool).await?))
}

/// GET /tally - Aggregated votes across all entries.
async fn tally_handler(State(state): State<AppState>, _auth: AuthUser) -> Result<Json<TallyView>> {
    Ok(Json(handle_refresh(&state.pool).await?))
}

/// POST /batches - Save a selection as a new batch.
async fn save_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Json(request): Json<SaveRequest>,
) -> Result<Json<SaveReceipt>> {
    let receipt = handle_save(&state.pool, request).await?;
    Ok(Json(receipt))
}

/// POST /batches/undo - Remove the user's latest batch.
async fn undo_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Json(request): Json<UndoRequest>,
) -> Result<Json<UndoReceipt>> {
    let receipt = handle_undo(&state.pool, request).await?;
    Ok(Json(receipt))
}

/// POST /entries/adjust - Adjust one candidate's vote for a user.
async fn adjust_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Json(request): Json<AdjustVoteRequest>,
) -> Result<Json<AdjustVoteResponse>> {
    let response = handle_adjust_vote(&state.pool, request).await?;
    Ok(Json(response))
}

/// GET /users/{user_id}/entries - A user's entry history.
async fn user_entries_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(user_id): Path<UserId>,
    Query(query): Query<EntriesQuery>,
) -> Result<Json<Vec<EntryView>>> {
    let entries = handle_user_entries(&state.pool, user_id, query).await?;
    Ok(Json(entries))
}

/// DELETE /candidates/{name}/entries - Delete a candidate for everyone.
async fn delete_candidate_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(name): Path<String>,
) -> Result<Json<DeleteCandidateResponse>> {
    let response = handle_delete_candidate(&state.pool, name).await?;
    Ok(Json(response))
}
