use std::{sync::Arc, time::Duration};

use tracing::warn;

use crate::dao::{
    kv_store::KvStore,
    models::{SNAPSHOT_PREFIX, SnapshotEntity, snapshot_key},
    storage::{StorageError, StorageResult, with_timeout},
};

/// Data access object for the one-slot-per-player snapshot namespace.
#[derive(Clone)]
pub struct ProgressRepository {
    store: Arc<dyn KvStore>,
    ttl: Option<Duration>,
    timeout: Duration,
}

impl ProgressRepository {
    /// `ttl` bounds how long an abandoned snapshot survives; `timeout` bounds each backend call.
    pub fn new(store: Arc<dyn KvStore>, ttl: Option<Duration>, timeout: Duration) -> Self {
        Self {
            store,
            ttl,
            timeout,
        }
    }

    /// Replace the player's snapshot.
    pub async fn save(&self, player_id: &str, snapshot: &SnapshotEntity) -> StorageResult<()> {
        let key = snapshot_key(player_id);
        let bytes = serde_json::to_vec(snapshot).map_err(|source| StorageError::Corrupted {
            key: key.clone(),
            source,
        })?;

        with_timeout(self.timeout, "set", self.store.set(&key, bytes, self.ttl)).await
    }

    /// Remove the player's snapshot and return it. At most one caller receives a given snapshot.
    ///
    /// A value that no longer decodes is already gone once taken, so it reads as absent.
    pub async fn load(&self, player_id: &str) -> StorageResult<Option<SnapshotEntity>> {
        let key = snapshot_key(player_id);
        let Some(bytes) = with_timeout(self.timeout, "take", self.store.take(&key)).await? else {
            return Ok(None);
        };

        match serde_json::from_slice(&bytes) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(err) => {
                warn!(key = %key, error = %err, "discarding undecodable snapshot");
                Ok(None)
            }
        }
    }

    /// Drop the player's snapshot if one exists.
    pub async fn retire(&self, player_id: &str) -> StorageResult<()> {
        let key = snapshot_key(player_id);
        with_timeout(self.timeout, "delete", self.store.delete(&key)).await
    }

    /// Every live snapshot paired with its player id, ordered by player id.
    ///
    /// Values that no longer decode are skipped rather than failing the whole listing.
    pub async fn list_in_progress(&self) -> StorageResult<Vec<(String, SnapshotEntity)>> {
        let rows = with_timeout(self.timeout, "scan", self.store.scan(SNAPSHOT_PREFIX)).await?;

        let mut snapshots = Vec::with_capacity(rows.len());
        for (key, bytes) in rows {
            let Some(player_id) = key.strip_prefix(SNAPSHOT_PREFIX) else {
                continue;
            };
            match serde_json::from_slice::<SnapshotEntity>(&bytes) {
                Ok(snapshot) => snapshots.push((player_id.to_owned(), snapshot)),
                Err(err) => warn!(key = %key, error = %err, "skipping undecodable snapshot"),
            }
        }

        Ok(snapshots)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::dao::kv_store::MemoryKvStore;

    fn repository(backend: &MemoryKvStore) -> ProgressRepository {
        ProgressRepository::new(
            Arc::new(backend.clone()),
            Some(Duration::from_secs(60)),
            Duration::from_secs(1),
        )
    }

    #[tokio::test]
    async fn save_overwrites_previous_snapshot() {
        let backend = MemoryKvStore::new();
        let repo = repository(&backend);

        repo.save("p", &SnapshotEntity(json!({"level": 1}))).await.unwrap();
        repo.save("p", &SnapshotEntity(json!({"level": 2}))).await.unwrap();

        let loaded = repo.load("p").await.unwrap();
        assert_eq!(loaded, Some(SnapshotEntity(json!({"level": 2}))));
    }

    #[tokio::test]
    async fn load_consumes_the_snapshot() {
        let backend = MemoryKvStore::new();
        let repo = repository(&backend);

        repo.save("p", &SnapshotEntity(json!({"level": 1}))).await.unwrap();
        assert!(repo.load("p").await.unwrap().is_some());
        assert_eq!(repo.load("p").await.unwrap(), None);
    }

    #[tokio::test]
    async fn undecodable_snapshot_loads_as_absent() {
        let backend = MemoryKvStore::new();
        let repo = repository(&backend);
        backend
            .set("progress:p", b"{not json".to_vec(), None)
            .await
            .unwrap();

        assert_eq!(repo.load("p").await.unwrap(), None);
        assert_eq!(backend.get("progress:p").await.unwrap(), None);
    }

    #[tokio::test]
    async fn retire_is_idempotent() {
        let backend = MemoryKvStore::new();
        let repo = repository(&backend);

        repo.retire("nobody").await.unwrap();
        repo.save("p", &SnapshotEntity(json!({"level": 1}))).await.unwrap();
        repo.retire("p").await.unwrap();
        repo.retire("p").await.unwrap();
        assert_eq!(repo.load("p").await.unwrap(), None);
    }

    #[tokio::test]
    async fn listing_strips_prefix_and_skips_garbage() {
        let backend = MemoryKvStore::new();
        let repo = repository(&backend);

        repo.save("b", &SnapshotEntity(json!({"score": 2}))).await.unwrap();
        repo.save("a", &SnapshotEntity(json!({"score": 1}))).await.unwrap();
        backend
            .set("progress:broken", b"{not json".to_vec(), None)
            .await
            .unwrap();
        backend
            .set("leaderboard", b"[]".to_vec(), None)
            .await
            .unwrap();

        let listed = repo.list_in_progress().await.unwrap();
        let ids: Vec<&str> = listed.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
    }
}
