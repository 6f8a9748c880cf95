use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Namespace under which each player's snapshot is stored.
pub const SNAPSHOT_PREFIX: &str = "progress:";
/// Single key holding the persisted top-N completed runs.
pub const LEADERBOARD_KEY: &str = "leaderboard";

/// Backend key of the snapshot slot owned by `player_id`.
pub fn snapshot_key(player_id: &str) -> String {
    format!("{SNAPSHOT_PREFIX}{player_id}")
}

/// Saved in-progress game state. Only `score` and `username` are interpreted; everything else
/// is kept as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotEntity(pub Value);

impl SnapshotEntity {
    /// Numeric `score` carried by the snapshot, if any.
    pub fn score(&self) -> Option<f64> {
        self.0.get("score").and_then(Value::as_f64)
    }

    /// Non-empty `username` carried by the snapshot, if any.
    pub fn username(&self) -> Option<&str> {
        self.0
            .get("username")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
    }

    /// Whether the payload counts as "nothing to save": `null`, `false`, `0`, or an empty
    /// string, array, or object.
    pub fn is_empty(&self) -> bool {
        match &self.0 {
            Value::Null => true,
            Value::Bool(flag) => !flag,
            Value::Number(number) => number.as_f64() == Some(0.0),
            Value::String(text) => text.is_empty(),
            Value::Array(items) => items.is_empty(),
            Value::Object(fields) => fields.is_empty(),
        }
    }

    /// Unwrap the raw JSON payload.
    pub fn into_value(self) -> Value {
        self.0
    }
}

/// A completed run as persisted in the leaderboard collection. Never mutated once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardRecord {
    pub player_id: String,
    /// Display name given at submission.
    pub name: String,
    pub score: f64,
    /// Submission time; earlier runs win ties.
    pub submitted_at: SystemTime,
}
