use std::time::SystemTime;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    dao::{
        models::{LeaderboardRecord, SnapshotEntity},
        storage::StorageError,
    },
    error::ServiceError,
    services::ranking::{self, RankedEntry},
    state::SharedState,
};

/// Store the player's in-progress snapshot, replacing any previous one.
pub async fn save_progress(
    state: &SharedState,
    player_id: &str,
    snapshot: Value,
) -> Result<(), ServiceError> {
    require_field("uid", player_id)?;
    let snapshot = SnapshotEntity(snapshot);
    if snapshot.is_empty() {
        return Err(ServiceError::InvalidInput("state must not be empty".into()));
    }

    let repository = state.progress_repository().await?;
    repository
        .save(player_id, &snapshot)
        .await
        .map_err(storage_failure("save progress"))?;

    debug!(player_id = %player_id, "progress saved");
    Ok(())
}

/// Hand the player's snapshot to the caller and remove it from storage.
pub async fn load_progress(
    state: &SharedState,
    player_id: &str,
) -> Result<Option<Value>, ServiceError> {
    require_field("uid", player_id)?;

    let repository = state.progress_repository().await?;
    let snapshot = repository
        .load(player_id)
        .await
        .map_err(storage_failure("load progress"))?;

    debug!(player_id = %player_id, found = snapshot.is_some(), "progress loaded");
    Ok(snapshot.map(SnapshotEntity::into_value))
}

/// Record a completed run, then retire the player's in-progress snapshot.
///
/// The leaderboard write decides the outcome. A failed retirement only leaves a stale snapshot
/// behind, so it is logged and the call still succeeds.
pub async fn submit_score(
    state: &SharedState,
    player_id: &str,
    name: &str,
    score: Option<f64>,
) -> Result<(), ServiceError> {
    require_field("uid", player_id)?;
    require_field("name", name)?;
    let score = match score {
        Some(score) if score.is_finite() => score,
        Some(_) => return Err(ServiceError::InvalidInput("score must be finite".into())),
        None => return Err(ServiceError::InvalidInput("score is required".into())),
    };

    let leaderboard = state.leaderboard_repository().await?;
    let progress = state.progress_repository().await?;
    let capacity = state.config().leaderboard_capacity;
    let record = LeaderboardRecord {
        player_id: player_id.to_owned(),
        name: name.to_owned(),
        score,
        submitted_at: SystemTime::now(),
    };

    {
        let _gate = state.lock_leaderboard().await;
        let records = leaderboard
            .list_latest()
            .await
            .map_err(storage_failure("read leaderboard"))?;
        let ranked = ranking::insert_completed(records, record, capacity);
        leaderboard
            .replace(&ranked)
            .await
            .map_err(storage_failure("write leaderboard"))?;
    }

    info!(player_id = %player_id, score, "score submitted");

    if let Err(err) = progress.retire(player_id).await {
        warn!(
            player_id = %player_id,
            error = %err,
            "score recorded but in-progress snapshot could not be retired"
        );
    }

    Ok(())
}

/// Live ranking: completed runs merged with every scored in-progress snapshot.
pub async fn get_leaderboard(state: &SharedState) -> Result<Vec<RankedEntry>, ServiceError> {
    let leaderboard = state.leaderboard_repository().await?;
    let progress = state.progress_repository().await?;

    let completed = leaderboard
        .list()
        .await
        .map_err(storage_failure("read leaderboard"))?;
    let in_progress = progress
        .list_in_progress()
        .await
        .map_err(storage_failure("list snapshots"))?;

    Ok(ranking::compose_view(
        completed,
        in_progress,
        state.config().leaderboard_capacity,
    ))
}

/// Persisted completed runs only.
pub async fn get_completed_leaderboard(
    state: &SharedState,
) -> Result<Vec<RankedEntry>, ServiceError> {
    let leaderboard = state.leaderboard_repository().await?;
    let mut records = leaderboard
        .list()
        .await
        .map_err(storage_failure("read leaderboard"))?;

    ranking::rank_descending(&mut records, state.config().leaderboard_capacity, |record| {
        record.score
    });
    Ok(records.into_iter().map(RankedEntry::from).collect())
}

fn require_field(field: &str, value: &str) -> Result<(), ServiceError> {
    if value.is_empty() {
        return Err(ServiceError::InvalidInput(format!("{field} is required")));
    }
    Ok(())
}

fn storage_failure(operation: &'static str) -> impl FnOnce(StorageError) -> ServiceError {
    move |err| {
        warn!(operation, error = %err, "storage operation failed");
        err.into()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Arc,
            atomic::{AtomicBool, AtomicUsize, Ordering},
        },
        time::Duration,
    };

    use futures::future::{self, BoxFuture};
    use serde_json::json;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            kv_store::{CachedStore, KvStore, MemoryKvStore},
            leaderboard::LeaderboardRepository,
            storage::StorageResult,
        },
        services::ranking::EntryStatus,
        state::AppState,
    };

    /// Memory store that counts writes and can be told to fail deletes or stall every call.
    #[derive(Clone, Default)]
    struct FlakyStore {
        inner: MemoryKvStore,
        writes: Arc<AtomicUsize>,
        fail_deletes: Arc<AtomicBool>,
        stall: Arc<AtomicBool>,
    }

    impl FlakyStore {
        fn guard<T: Send + 'static>(
            &self,
            call: BoxFuture<'static, StorageResult<T>>,
        ) -> BoxFuture<'static, StorageResult<T>> {
            if self.stall.load(Ordering::SeqCst) {
                Box::pin(future::pending())
            } else {
                call
            }
        }
    }

    impl KvStore for FlakyStore {
        fn get(&self, key: &str) -> BoxFuture<'static, StorageResult<Option<Vec<u8>>>> {
            self.guard(self.inner.get(key))
        }

        fn set(
            &self,
            key: &str,
            value: Vec<u8>,
            ttl: Option<Duration>,
        ) -> BoxFuture<'static, StorageResult<()>> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.guard(self.inner.set(key, value, ttl))
        }

        fn delete(&self, key: &str) -> BoxFuture<'static, StorageResult<()>> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            if self.fail_deletes.load(Ordering::SeqCst) {
                let err = std::io::Error::other("delete refused");
                return Box::pin(future::ready(Err(StorageError::unavailable(
                    "delete refused".into(),
                    err,
                ))));
            }
            self.guard(self.inner.delete(key))
        }

        fn take(&self, key: &str) -> BoxFuture<'static, StorageResult<Option<Vec<u8>>>> {
            self.guard(self.inner.take(key))
        }

        fn scan(
            &self,
            prefix: &str,
        ) -> BoxFuture<'static, StorageResult<Vec<(String, Vec<u8>)>>> {
            self.guard(self.inner.scan(prefix))
        }

        fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.health_check()
        }

        fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.try_reconnect()
        }
    }

    async fn state_with(store: &FlakyStore) -> SharedState {
        let config = AppConfig {
            backend_timeout: Duration::from_millis(50),
            ..AppConfig::default()
        };
        let state = AppState::new(config);
        state.set_kv_store(Arc::new(store.clone())).await;
        state
    }

    fn view_scores(entries: &[RankedEntry]) -> Vec<f64> {
        entries.iter().map(|entry| entry.score).collect()
    }

    #[tokio::test]
    async fn second_save_wins_and_load_consumes() {
        let store = FlakyStore::default();
        let state = state_with(&store).await;

        save_progress(&state, "p", json!({"level": 1})).await.unwrap();
        save_progress(&state, "p", json!({"level": 2})).await.unwrap();

        assert_eq!(
            load_progress(&state, "p").await.unwrap(),
            Some(json!({"level": 2}))
        );
        assert_eq!(load_progress(&state, "p").await.unwrap(), None);
    }

    #[tokio::test]
    async fn submitting_retires_the_snapshot() {
        let store = FlakyStore::default();
        let state = state_with(&store).await;

        save_progress(&state, "p", json!({"score": 70})).await.unwrap();
        submit_score(&state, "p", "Alice", Some(70.0)).await.unwrap();

        assert_eq!(load_progress(&state, "p").await.unwrap(), None);
        let board = get_completed_leaderboard(&state).await.unwrap();
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].name, "Alice");
        assert_eq!(board[0].status, EntryStatus::Completed);
    }

    #[tokio::test]
    async fn failed_retirement_keeps_the_score() {
        let store = FlakyStore::default();
        let state = state_with(&store).await;
        save_progress(&state, "p", json!({"score": 70})).await.unwrap();

        store.fail_deletes.store(true, Ordering::SeqCst);
        submit_score(&state, "p", "Alice", Some(70.0)).await.unwrap();

        let board = get_completed_leaderboard(&state).await.unwrap();
        assert_eq!(view_scores(&board), [70.0]);
        // The stale snapshot is still there.
        assert_eq!(
            load_progress(&state, "p").await.unwrap(),
            Some(json!({"score": 70}))
        );
    }

    #[tokio::test]
    async fn live_view_shows_and_then_drops_in_progress_scores() {
        let store = FlakyStore::default();
        let state = state_with(&store).await;
        submit_score(&state, "a", "Ann", Some(90.0)).await.unwrap();
        submit_score(&state, "b", "Ben", Some(80.0)).await.unwrap();
        save_progress(&state, "q", json!({"score": 85})).await.unwrap();

        let view = get_leaderboard(&state).await.unwrap();
        assert_eq!(view_scores(&view), [90.0, 85.0, 80.0]);
        assert_eq!(view[1].status, EntryStatus::InProgress);

        load_progress(&state, "q").await.unwrap();
        let view = get_leaderboard(&state).await.unwrap();
        assert_eq!(view_scores(&view), [90.0, 80.0]);
    }

    #[tokio::test]
    async fn invalid_input_is_rejected_without_backend_writes() {
        let store = FlakyStore::default();
        let state = state_with(&store).await;

        let attempts = [
            save_progress(&state, "", json!({"score": 1})).await,
            save_progress(&state, "p", Value::Null).await,
            save_progress(&state, "p", json!({})).await,
            submit_score(&state, "p", "", Some(10.0)).await,
            submit_score(&state, "p", "Alice", None).await,
            submit_score(&state, "p", "Alice", Some(f64::NAN)).await,
        ];
        for result in attempts {
            assert!(matches!(result, Err(ServiceError::InvalidInput(_))));
        }
        assert!(matches!(
            load_progress(&state, "").await,
            Err(ServiceError::InvalidInput(_))
        ));
        assert_eq!(store.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn stalled_backend_surfaces_as_unavailable() {
        let store = FlakyStore::default();
        let state = state_with(&store).await;
        store.stall.store(true, Ordering::SeqCst);

        assert!(matches!(
            load_progress(&state, "p").await,
            Err(ServiceError::Unavailable(StorageError::Timeout { .. }))
        ));
        assert!(matches!(
            get_leaderboard(&state).await,
            Err(ServiceError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn degraded_mode_rejects_store_operations() {
        let state = AppState::new(AppConfig::default());

        assert!(matches!(
            save_progress(&state, "p", json!({"score": 1})).await,
            Err(ServiceError::Degraded)
        ));
        assert!(matches!(
            get_leaderboard(&state).await,
            Err(ServiceError::Degraded)
        ));
    }

    #[tokio::test]
    async fn concurrent_submissions_are_not_lost() {
        let store = FlakyStore::default();
        let state = state_with(&store).await;

        let tasks: Vec<_> = (0..5)
            .map(|i| {
                let state = state.clone();
                tokio::spawn(async move {
                    submit_score(&state, &format!("p{i}"), "Racer", Some(i as f64)).await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let board = get_completed_leaderboard(&state).await.unwrap();
        assert_eq!(view_scores(&board), [4.0, 3.0, 2.0, 1.0, 0.0]);
    }

    async fn cached_instance(shared: &MemoryKvStore) -> SharedState {
        let state = AppState::new(AppConfig::default());
        let backend: Arc<dyn KvStore> = Arc::new(shared.clone());
        state
            .set_kv_store(Arc::new(CachedStore::new(backend, Duration::from_secs(5))))
            .await;
        state
    }

    #[tokio::test]
    async fn instances_sharing_a_backend_keep_every_score() {
        let shared = MemoryKvStore::new();
        let first = cached_instance(&shared).await;
        let second = cached_instance(&shared).await;

        submit_score(&first, "a1", "Ann", Some(90.0)).await.unwrap();
        submit_score(&second, "b", "Ben", Some(80.0)).await.unwrap();
        submit_score(&first, "a2", "Ann", Some(70.0)).await.unwrap();

        let persisted = LeaderboardRepository::new(Arc::new(shared), Duration::from_secs(1))
            .list()
            .await
            .unwrap();
        let scores: Vec<(&str, f64)> = persisted
            .iter()
            .map(|record| (record.player_id.as_str(), record.score))
            .collect();
        assert_eq!(scores, [("a1", 90.0), ("b", 80.0), ("a2", 70.0)]);
    }

    #[tokio::test]
    async fn unbounded_snapshot_ttl_is_accepted() {
        let config = AppConfig {
            snapshot_ttl: Some(Duration::from_secs(u64::MAX)),
            ..AppConfig::default()
        };
        let state = AppState::new(config);
        state.set_kv_store(Arc::new(MemoryKvStore::new())).await;

        save_progress(&state, "p", json!({"score": 1})).await.unwrap();
        assert_eq!(
            load_progress(&state, "p").await.unwrap(),
            Some(json!({"score": 1}))
        );
    }
}
