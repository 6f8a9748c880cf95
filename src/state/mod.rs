use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard, RwLock, watch};

use crate::{
    config::AppConfig,
    dao::{kv_store::KvStore, leaderboard::LeaderboardRepository, progress::ProgressRepository},
    error::ServiceError,
};

/// Handle to the application state shared by every request and background task.
pub type SharedState = Arc<AppState>;

/// Central application state holding the configuration and the installed storage backend.
pub struct AppState {
    kv_store: RwLock<Option<Arc<dyn KvStore>>>,
    degraded: watch::Sender<bool>,
    config: AppConfig,
    leaderboard_gate: Mutex<()>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            kv_store: RwLock::new(None),
            degraded: degraded_tx,
            config,
            leaderboard_gate: Mutex::new(()),
        })
    }

    /// Runtime configuration loaded at startup.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Obtain a handle to the current store, if one is installed.
    pub async fn kv_store(&self) -> Option<Arc<dyn KvStore>> {
        let guard = self.kv_store.read().await;
        guard.as_ref().cloned()
    }

    /// Obtain the current store, failing with [`ServiceError::Degraded`] while storage is down.
    pub async fn require_kv_store(&self) -> Result<Arc<dyn KvStore>, ServiceError> {
        if self.is_degraded() {
            return Err(ServiceError::Degraded);
        }
        self.kv_store().await.ok_or(ServiceError::Degraded)
    }

    /// Snapshot repository bound to the current store and configured limits.
    pub async fn progress_repository(&self) -> Result<ProgressRepository, ServiceError> {
        let store = self.require_kv_store().await?;
        Ok(ProgressRepository::new(
            store,
            self.config.snapshot_ttl,
            self.config.backend_timeout,
        ))
    }

    /// Leaderboard repository bound to the current store.
    pub async fn leaderboard_repository(&self) -> Result<LeaderboardRepository, ServiceError> {
        let store = self.require_kv_store().await?;
        Ok(LeaderboardRepository::new(
            store,
            self.config.backend_timeout,
        ))
    }

    /// Install a new store implementation and leave degraded mode.
    pub async fn set_kv_store(&self, store: Arc<dyn KvStore>) {
        {
            let mut guard = self.kv_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current store and enter degraded mode.
    pub async fn clear_kv_store(&self) {
        {
            let mut guard = self.kv_store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
    }

    /// Serialize leaderboard read-modify-write cycles issued by this process.
    pub async fn lock_leaderboard(&self) -> MutexGuard<'_, ()> {
        self.leaderboard_gate.lock().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::kv_store::MemoryKvStore;

    #[tokio::test]
    async fn starts_degraded_until_store_installed() {
        let state = AppState::new(AppConfig::default());
        assert!(state.is_degraded());
        assert!(matches!(
            state.require_kv_store().await,
            Err(ServiceError::Degraded)
        ));

        state.set_kv_store(Arc::new(MemoryKvStore::new())).await;
        assert!(!state.is_degraded());
        assert!(state.require_kv_store().await.is_ok());
    }

    #[tokio::test]
    async fn clearing_store_enters_degraded_mode() {
        let state = AppState::new(AppConfig::default());
        state.set_kv_store(Arc::new(MemoryKvStore::new())).await;

        state.clear_kv_store().await;
        assert!(state.is_degraded());
        assert!(state.kv_store().await.is_none());
    }
}
