//! Local tally routes.

use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post},
    Json, Router,
};
use tally_engine::{AddOutcome, VoteCount};

use crate::auth::AuthUser;
use crate::error::Result;
use crate::handlers::{
    handle_add, handle_adjust, handle_remove, handle_reset, handle_suggest, handle_view,
    read_local_tally, with_local_tally, AddRequest, AdjustRequest, LocalView, MutationResponse, ResetRequest,
    SuggestQuery,
};
use crate::AppState;

/// Create local tally routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/local", get(view_handler))
        .route("/local/votes", post(add_handler))
        .route("/local/votes/adjust", post(adjust_handler))
        .route("/local/votes/{name}", delete(remove_handler))
        .route("/local/reset", post(reset_handler))
        .route("/local/suggest", get(suggest_handler))
}

/// GET /local - Current tally.
async fn view_handler(State(state): State<AppState>, auth: AuthUser) -> Result<Json<LocalView>> {
    let view = read_local_tally(state.tallies, auth.client_id, handle_view).await?;
    Ok(Json(view))
}

/// POST /local/votes - Add one vote by name.
async fn add_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<AddRequest>,
) -> Result<Json<MutationResponse<AddOutcome>>> {
    let response =
        with_local_tally(state.tallies, auth.client_id, move |t| handle_add(t, request)).await?;
    Ok(Json(response))
}

/// POST /local/votes/adjust - Add or remove votes on a record.
async fn adjust_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<AdjustRequest>,
) -> Result<Json<MutationResponse<Option<VoteCount>>>> {
    let response =
        with_local_tally(state.tallies, auth.client_id, move |t| handle_adjust(t, request)).await?;
    Ok(Json(response))
}

/// DELETE /local/votes/{name} - Remove a record.
async fn remove_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(name): Path<String>,
) -> Result<Json<MutationResponse<bool>>> {
    let response =
        with_local_tally(state.tallies, auth.client_id, move |t| handle_remove(t, name)).await?;
    Ok(Json(response))
}

/// POST /local/reset - Clear the tally.
async fn reset_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<ResetRequest>,
) -> Result<Json<MutationResponse<usize>>> {
    let response =
        with_local_tally(state.tallies, auth.client_id, move |t| handle_reset(t, request)).await?;
    Ok(Json(response))
}

/// GET /local/suggest?q= - Names for autocomplete.
async fn suggest_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<SuggestQuery>,
) -> Result<Json<Vec<String>>> {
    let names =
        read_local_tally(state.tallies, auth.client_id, move |t| handle_suggest(t, query)).await?;
    Ok(Json(names))
}
