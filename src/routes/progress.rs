use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    dto::{
        common::StatusResponse,
        progress::{LoadProgressQuery, LoadProgressResponse, SaveProgressRequest},
    },
    error::AppError,
    services::progress_service,
    state::SharedState,
};

/// Routes storing and consuming per-player snapshots.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/save", post(save_progress))
        .route("/load", get(load_progress))
}

/// Store the player's in-progress game, replacing any previous snapshot.
#[utoipa::path(
    post,
    path = "/save",
    tag = "progress",
    request_body = SaveProgressRequest,
    responses(
        (status = 200, description = "Snapshot stored", body = StatusResponse),
        (status = 400, description = "Missing uid or empty state"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn save_progress(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<SaveProgressRequest>>,
) -> Result<Json<StatusResponse>, AppError> {
    progress_service::save_progress(&state, &payload.uid, payload.state).await?;
    Ok(Json(StatusResponse::ok()))
}

/// Return the player's snapshot and remove it; a second load returns `null`.
#[utoipa::path(
    get,
    path = "/load",
    tag = "progress",
    params(("uid" = String, Query, description = "Player identifier")),
    responses(
        (status = 200, description = "Snapshot or null", body = LoadProgressResponse),
        (status = 400, description = "Missing uid"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn load_progress(
    State(state): State<SharedState>,
    Valid(Query(query)): Valid<Query<LoadProgressQuery>>,
) -> Result<Json<LoadProgressResponse>, AppError> {
    let state = progress_service::load_progress(&state, &query.uid).await?;
    Ok(Json(LoadProgressResponse { state }))
}
