/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Snapshot and score operations exposed to the transport layer.
pub mod progress_service;
/// Ranking rules for the persisted leaderboard and the live view.
pub mod ranking;
/// Storage connection supervisor toggling degraded mode.
pub mod storage_supervisor;
