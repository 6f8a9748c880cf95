//! Validation helpers for DTOs.

use serde_json::Value;
use validator::ValidationError;

use crate::dao::models::SnapshotEntity;

/// Validates that a required text field was provided and is not empty.
pub fn validate_required_text(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        let mut err = ValidationError::new("required");
        err.message = Some("must not be empty".into());
        return Err(err);
    }
    Ok(())
}

/// Validates that a snapshot carries something worth saving.
///
/// `null`, `false`, `0`, and empty strings, arrays, or objects are rejected.
pub fn validate_snapshot(value: &Value) -> Result<(), ValidationError> {
    if SnapshotEntity(value.clone()).is_empty() {
        let mut err = ValidationError::new("snapshot_empty");
        err.message = Some("state must be a non-empty value".into());
        return Err(err);
    }
    Ok(())
}

/// Validates that a score was provided as a finite number.
pub fn validate_score(score: Option<f64>) -> Result<(), ValidationError> {
    match score {
        Some(value) if value.is_finite() => Ok(()),
        Some(_) => {
            let mut err = ValidationError::new("score_not_finite");
            err.message = Some("score must be a finite number".into());
            Err(err)
        }
        None => {
            let mut err = ValidationError::new("required");
            err.message = Some("score is required".into());
            Err(err)
        }
    }
}
