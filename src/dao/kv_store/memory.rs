//! Process-local backend used for development, tests, and single-instance deployments.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use dashmap::DashMap;
use futures::future::{self, BoxFuture};

use crate::dao::{kv_store::KvStore, storage::StorageResult};

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl MemoryEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }
}

/// In-memory [`KvStore`] backed by a concurrent map. Expired entries are dropped lazily on access.
#[derive(Clone, Default)]
pub struct MemoryKvStore {
    entries: Arc<DashMap<String, MemoryEntry>>,
}

impl MemoryKvStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self, key: &str) -> Option<Vec<u8>> {
        let now = Instant::now();
        let hit = self
            .entries
            .get(key)
            .map(|entry| (entry.value.clone(), entry.is_expired(now)));

        match hit {
            Some((_, true)) => {
                self.entries.remove_if(key, |_, entry| entry.is_expired(now));
                None
            }
            Some((value, false)) => Some(value),
            None => None,
        }
    }

    fn write(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) {
        // A deadline past what `Instant` can represent means the entry never expires.
        let expires_at = ttl.and_then(|ttl| Instant::now().checked_add(ttl));
        self.entries
            .insert(key.to_owned(), MemoryEntry { value, expires_at });
    }

    fn remove(&self, key: &str) -> Option<Vec<u8>> {
        let now = Instant::now();
        self.entries
            .remove(key)
            .filter(|(_, entry)| !entry.is_expired(now))
            .map(|(_, entry)| entry.value)
    }

    fn list(&self, prefix: &str) -> Vec<(String, Vec<u8>)> {
        let now = Instant::now();
        let mut rows: Vec<(String, Vec<u8>)> = self
            .entries
            .iter()
            .filter(|entry| entry.key().starts_with(prefix) && !entry.is_expired(now))
            .map(|entry| (entry.key().clone(), entry.value.clone()))
            .collect();
        rows.sort_by(|(left, _), (right, _)| left.cmp(right));
        rows
    }
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &str) -> BoxFuture<'static, StorageResult<Option<Vec<u8>>>> {
        Box::pin(future::ready(Ok(self.read(key))))
    }

    fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.write(key, value, ttl);
        Box::pin(future::ready(Ok(())))
    }

    fn delete(&self, key: &str) -> BoxFuture<'static, StorageResult<()>> {
        self.entries.remove(key);
        Box::pin(future::ready(Ok(())))
    }

    fn take(&self, key: &str) -> BoxFuture<'static, StorageResult<Option<Vec<u8>>>> {
        Box::pin(future::ready(Ok(self.remove(key))))
    }

    fn scan(&self, prefix: &str) -> BoxFuture<'static, StorageResult<Vec<(String, Vec<u8>)>>> {
        Box::pin(future::ready(Ok(self.list(prefix))))
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(future::ready(Ok(())))
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(future::ready(Ok(())))
    }
}
