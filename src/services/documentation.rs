use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the progress and leaderboard service.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::progress::save_progress,
        crate::routes::progress::load_progress,
        crate::routes::leaderboard::submit_score,
        crate::routes::leaderboard::get_leaderboard,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::health::HealthStatus,
            crate::dto::progress::SaveProgressRequest,
            crate::dto::progress::LoadProgressResponse,
            crate::dto::leaderboard::SubmitScoreRequest,
            crate::dto::leaderboard::LeaderboardResponse,
            crate::dto::leaderboard::LeaderboardEntryDto,
            crate::dto::leaderboard::EntryStatusDto,
            crate::dto::leaderboard::LeaderboardView,
            crate::dto::common::StatusResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "progress", description = "Per-player in-progress snapshots"),
        (name = "leaderboard", description = "Score submission and rankings"),
    )
)]
pub struct ApiDoc;
