//! Ordering rules shared by the persisted leaderboard and the live view.
//!
//! Both rankings sort descending by score with a stable sort, so entries with equal scores
//! keep the order in which they were handed in, then cut the list to the configured capacity.

use std::time::SystemTime;

use crate::dao::models::{LeaderboardRecord, SnapshotEntity};

/// Whether a ranked entry is a finished run or a snapshot still being played.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    /// Persisted on the leaderboard.
    Completed,
    /// Derived from a saved snapshot; never persisted as a ranking.
    InProgress,
}

/// One row of a ranking as handed to the transport layer.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedEntry {
    /// Opaque identifier of the player.
    pub player_id: String,
    /// Display name shown in the ranking.
    pub name: String,
    /// Value the ranking sorts by.
    pub score: f64,
    /// Completed run or live snapshot.
    pub status: EntryStatus,
    /// Only completed runs carry a submission time.
    pub submitted_at: Option<SystemTime>,
}

impl From<LeaderboardRecord> for RankedEntry {
    fn from(record: LeaderboardRecord) -> Self {
        Self {
            player_id: record.player_id,
            name: record.name,
            score: record.score,
            status: EntryStatus::Completed,
            submitted_at: Some(record.submitted_at),
        }
    }
}

impl RankedEntry {
    /// Synthesize an in-progress entry from a snapshot, or `None` when it carries no score.
    pub fn from_snapshot(player_id: String, snapshot: &SnapshotEntity) -> Option<Self> {
        let score = snapshot.score()?;
        let name = snapshot
            .username()
            .map(str::to_owned)
            .unwrap_or_else(|| player_id.clone());

        Some(Self {
            player_id,
            name,
            score,
            status: EntryStatus::InProgress,
            submitted_at: None,
        })
    }
}

/// Stable sort descending by `score`, then keep the first `capacity` items.
pub fn rank_descending<T>(items: &mut Vec<T>, capacity: usize, score: impl Fn(&T) -> f64) {
    items.sort_by(|left, right| score(right).total_cmp(&score(left)));
    items.truncate(capacity);
}

/// Append a completed run to the persisted records and re-rank them.
pub fn insert_completed(
    mut records: Vec<LeaderboardRecord>,
    record: LeaderboardRecord,
    capacity: usize,
) -> Vec<LeaderboardRecord> {
    records.push(record);
    rank_descending(&mut records, capacity, |record| record.score);
    records
}

/// Merge persisted runs with scored in-progress snapshots into a transient top-`capacity`.
///
/// Completed entries are listed before in-progress ones prior to sorting, so on equal scores a
/// completed run ranks above a live one.
pub fn compose_view(
    completed: Vec<LeaderboardRecord>,
    in_progress: Vec<(String, SnapshotEntity)>,
    capacity: usize,
) -> Vec<RankedEntry> {
    let mut entries: Vec<RankedEntry> = completed.into_iter().map(RankedEntry::from).collect();
    entries.extend(
        in_progress
            .into_iter()
            .filter_map(|(player_id, snapshot)| RankedEntry::from_snapshot(player_id, &snapshot)),
    );

    rank_descending(&mut entries, capacity, |entry| entry.score);
    entries
}
