use tracing::warn;

use crate::{dao::storage::with_timeout, dto::health::HealthResponse, state::SharedState};

/// Report the current health status while logging connectivity issues.
///
/// A failed check reports degraded right away; the storage supervisor decides when to
/// actually drop the backend.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let Some(store) = state.kv_store().await else {
        warn!("storage unavailable (degraded mode)");
        return HealthResponse::degraded();
    };

    let limit = state.config().backend_timeout;
    if let Err(err) = with_timeout(limit, "health_check", store.health_check()).await {
        warn!(error = %err, "storage health check failed");
        return HealthResponse::degraded();
    }

    if state.is_degraded() {
        HealthResponse::degraded()
    } else {
        HealthResponse::ok()
    }
}
