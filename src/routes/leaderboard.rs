use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    dto::{
        common::StatusResponse,
        leaderboard::{LeaderboardQuery, LeaderboardResponse, LeaderboardView, SubmitScoreRequest},
    },
    error::AppError,
    services::progress_service,
    state::SharedState,
};

/// Score submission and ranking endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/submit", post(submit_score))
        .route("/leaderboard", get(get_leaderboard))
}

/// Record a completed run and retire the player's in-progress snapshot.
#[utoipa::path(
    post,
    path = "/submit",
    tag = "leaderboard",
    request_body = SubmitScoreRequest,
    responses(
        (status = 200, description = "Score recorded", body = StatusResponse),
        (status = 400, description = "Missing uid, name, or score"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn submit_score(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<SubmitScoreRequest>>,
) -> Result<Json<StatusResponse>, AppError> {
    progress_service::submit_score(&state, &payload.uid, &payload.name, payload.score).await?;
    Ok(Json(StatusResponse::ok()))
}

/// Return the top entries, merged with in-progress scores unless `view=completed`.
#[utoipa::path(
    get,
    path = "/leaderboard",
    tag = "leaderboard",
    params(("view" = Option<LeaderboardView>, Query, description = "`live` (default) or `completed`")),
    responses(
        (status = 200, description = "Ranked entries, best first", body = LeaderboardResponse),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn get_leaderboard(
    State(state): State<SharedState>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<LeaderboardResponse>, AppError> {
    let entries = match query.view {
        LeaderboardView::Live => progress_service::get_leaderboard(&state).await?,
        LeaderboardView::Completed => progress_service::get_completed_leaderboard(&state).await?,
    };
    Ok(Json(entries.into()))
}
