use serde::Serialize;
use utoipa::ToSchema;

/// Acknowledgement returned by write endpoints.
#[derive(Debug, Serialize, ToSchema)]
pub struct StatusResponse {
    /// Always "ok"; failures use the error body instead.
    pub status: String,
}

impl StatusResponse {
    /// Successful acknowledgement.
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}
