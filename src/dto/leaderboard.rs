use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

use crate::{
    dto::{
        format_system_time,
        validation::{validate_required_text, validate_score},
    },
    services::ranking::{EntryStatus, RankedEntry},
};

/// Payload recording a completed run.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitScoreRequest {
    /// Player whose in-progress snapshot gets retired.
    #[serde(default)]
    pub uid: String,
    /// Display name shown on the leaderboard.
    #[serde(default)]
    pub name: String,
    /// Final score. Any finite number is accepted, including zero and negatives.
    #[serde(default)]
    pub score: Option<f64>,
}

impl Validate for SubmitScoreRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(e) = validate_required_text(&self.uid) {
            errors.add("uid", e);
        }
        if let Err(e) = validate_required_text(&self.name) {
            errors.add("name", e);
        }
        if let Err(e) = validate_score(self.score) {
            errors.add("score", e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Which ranking the leaderboard endpoint returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LeaderboardView {
    /// Completed runs merged with in-progress scores.
    #[default]
    Live,
    /// Persisted completed runs only.
    Completed,
}

/// Query parameters of the leaderboard endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct LeaderboardQuery {
    /// Ranking to return; `live` when omitted.
    #[serde(default)]
    pub view: LeaderboardView,
}

/// Status of a leaderboard row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum EntryStatusDto {
    /// Finished run stored on the leaderboard.
    Completed,
    /// Score taken from a game still being played.
    InProgress,
}

impl From<EntryStatus> for EntryStatusDto {
    fn from(status: EntryStatus) -> Self {
        match status {
            EntryStatus::Completed => EntryStatusDto::Completed,
            EntryStatus::InProgress => EntryStatusDto::InProgress,
        }
    }
}

/// One ranked row as exposed to clients.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntryDto {
    /// 1-based position in the ranking.
    pub rank: usize,
    /// Opaque identifier of the player.
    pub player_id: String,
    /// Display name.
    pub name: String,
    /// Score the row is ranked by.
    pub score: f64,
    /// Completed or in-progress.
    pub status: EntryStatusDto,
    /// RFC 3339 submission time, absent for in-progress entries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<String>,
}

/// Ordered leaderboard rows, best first.
#[derive(Debug, Serialize, ToSchema)]
pub struct LeaderboardResponse {
    /// Rows ordered by rank.
    pub entries: Vec<LeaderboardEntryDto>,
}

impl From<Vec<RankedEntry>> for LeaderboardResponse {
    fn from(entries: Vec<RankedEntry>) -> Self {
        let entries = entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| LeaderboardEntryDto {
                rank: index + 1,
                player_id: entry.player_id,
                name: entry.name,
                score: entry.score,
                status: entry.status.into(),
                submitted_at: entry.submitted_at.map(format_system_time),
            })
            .collect();
        Self { entries }
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use serde_json::json;

    use super::*;

    #[test]
    fn missing_score_is_a_validation_error() {
        let request: SubmitScoreRequest =
            serde_json::from_value(json!({"uid": "p", "name": "Alice"})).unwrap();
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("score"));
    }

    #[test]
    fn zero_score_is_accepted() {
        let request: SubmitScoreRequest =
            serde_json::from_value(json!({"uid": "p", "name": "Alice", "score": 0})).unwrap();
        assert!(request.validate().is_ok());
    }

    #[test]
    fn view_defaults_to_live() {
        let query: LeaderboardQuery = serde_json::from_value(json!({})).unwrap();
        assert_eq!(query.view, LeaderboardView::Live);
    }

    #[test]
    fn response_numbers_ranks_and_formats_entries() {
        let response = LeaderboardResponse::from(vec![
            RankedEntry {
                player_id: "a".into(),
                name: "Ann".into(),
                score: 90.0,
                status: EntryStatus::Completed,
                submitted_at: Some(SystemTime::UNIX_EPOCH),
            },
            RankedEntry {
                player_id: "q".into(),
                name: "q".into(),
                score: 85.0,
                status: EntryStatus::InProgress,
                submitted_at: None,
            },
        ]);

        let body = serde_json::to_value(&response).unwrap();
        assert_eq!(
            body,
            json!({"entries": [
                {"rank": 1, "playerId": "a", "name": "Ann", "score": 90.0,
                 "status": "completed", "submittedAt": "1970-01-01T00:00:00Z"},
                {"rank": 2, "playerId": "q", "name": "q", "score": 85.0,
                 "status": "in-progress"},
            ]})
        );
    }
}
