use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

use crate::dto::validation::{validate_required_text, validate_snapshot};

/// Payload storing a player's in-progress game.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SaveProgressRequest {
    /// Opaque player identifier.
    #[serde(default)]
    pub uid: String,
    /// Arbitrary game state. `score` and `username` feed the live leaderboard when present.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub state: Value,
}

impl Validate for SaveProgressRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(e) = validate_required_text(&self.uid) {
            errors.add("uid", e);
        }
        if let Err(e) = validate_snapshot(&self.state) {
            errors.add("state", e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Query selecting whose snapshot to load.
#[derive(Debug, Deserialize, Validate)]
pub struct LoadProgressQuery {
    /// Player whose snapshot is consumed.
    #[serde(default)]
    #[validate(length(min = 1, message = "uid is required"))]
    pub uid: String,
}

/// Loaded snapshot, or `null` when the player has nothing saved.
#[derive(Debug, Serialize, ToSchema)]
pub struct LoadProgressResponse {
    /// The consumed snapshot, `null` when none was saved.
    #[schema(value_type = Option<Object>)]
    pub state: Option<Value>,
}
