use std::{sync::Arc, time::Duration};

use crate::dao::{
    kv_store::KvStore,
    models::{LEADERBOARD_KEY, LeaderboardRecord},
    storage::{StorageError, StorageResult, with_timeout},
};

/// Data access object for the single leaderboard collection value.
#[derive(Clone)]
pub struct LeaderboardRepository {
    store: Arc<dyn KvStore>,
    timeout: Duration,
}

impl LeaderboardRepository {
    /// `timeout` bounds each backend call.
    pub fn new(store: Arc<dyn KvStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Persisted completed runs in stored order. A missing collection reads as empty.
    ///
    /// May be served from a cache; use [`LeaderboardRepository::list_latest`] before replacing.
    pub async fn list(&self) -> StorageResult<Vec<LeaderboardRecord>> {
        let bytes = with_timeout(self.timeout, "get", self.store.get(LEADERBOARD_KEY)).await?;
        decode(bytes)
    }

    /// Persisted completed runs as the durable backend holds them right now.
    pub async fn list_latest(&self) -> StorageResult<Vec<LeaderboardRecord>> {
        let bytes =
            with_timeout(self.timeout, "get", self.store.get_fresh(LEADERBOARD_KEY)).await?;
        decode(bytes)
    }

    /// Overwrite the whole collection. The leaderboard never expires.
    pub async fn replace(&self, records: &[LeaderboardRecord]) -> StorageResult<()> {
        let bytes = serde_json::to_vec(records).map_err(|source| StorageError::Corrupted {
            key: LEADERBOARD_KEY.to_owned(),
            source,
        })?;

        with_timeout(
            self.timeout,
            "set",
            self.store.set(LEADERBOARD_KEY, bytes, None),
        )
        .await
    }
}

fn decode(bytes: Option<Vec<u8>>) -> StorageResult<Vec<LeaderboardRecord>> {
    let Some(bytes) = bytes else {
        return Ok(Vec::new());
    };

    serde_json::from_slice(&bytes).map_err(|source| StorageError::Corrupted {
        key: LEADERBOARD_KEY.to_owned(),
        source,
    })
}
