//! Write-through cache layered over a durable [`KvStore`].
//!
//! The wrapped backend stays the source of truth: every write goes to it first, deletes and
//! consuming reads invalidate before reaching it, and cached values are only trusted for
//! `max_age`. Prefix scans and [`KvStore::get_fresh`] always go to the backend.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use dashmap::DashMap;
use futures::future::BoxFuture;
use tracing::debug;

use crate::dao::{kv_store::KvStore, storage::StorageResult};

struct CachedValue {
    value: Vec<u8>,
    expires_at: Instant,
}

/// Cache-aside decorator for any [`KvStore`].
#[derive(Clone)]
pub struct CachedStore {
    inner: Arc<dyn KvStore>,
    entries: Arc<DashMap<String, CachedValue>>,
    max_age: Duration,
}

impl CachedStore {
    /// Wrap `inner`, trusting cached values for at most `max_age`.
    pub fn new(inner: Arc<dyn KvStore>, max_age: Duration) -> Self {
        Self {
            inner,
            entries: Arc::new(DashMap::new()),
            max_age,
        }
    }

    fn lookup(&self, key: &str) -> Option<Vec<u8>> {
        let now = Instant::now();
        let hit = self
            .entries
            .get(key)
            .map(|cached| (cached.value.clone(), cached.expires_at <= now));

        match hit {
            Some((_, true)) => {
                self.entries
                    .remove_if(key, |_, cached| cached.expires_at <= now);
                None
            }
            Some((value, false)) => Some(value),
            None => None,
        }
    }

    fn remember(&self, key: String, value: Vec<u8>, ttl: Option<Duration>) {
        let age = ttl.map_or(self.max_age, |ttl| ttl.min(self.max_age));
        // Unrepresentable deadline: leave the key uncached.
        let Some(expires_at) = Instant::now().checked_add(age) else {
            self.invalidate(&key);
            return;
        };
        self.entries.insert(key, CachedValue { value, expires_at });
    }

    fn invalidate(&self, key: &str) {
        self.entries.remove(key);
    }
}

impl KvStore for CachedStore {
    fn get(&self, key: &str) -> BoxFuture<'static, StorageResult<Option<Vec<u8>>>> {
        let cache = self.clone();
        let key = key.to_owned();
        Box::pin(async move {
            if let Some(value) = cache.lookup(&key) {
                debug!(key = %key, "cache hit");
                return Ok(Some(value));
            }

            let fetched = cache.inner.get(&key).await?;
            if let Some(value) = &fetched {
                cache.remember(key, value.clone(), None);
            }
            Ok(fetched)
        })
    }

    fn get_fresh(&self, key: &str) -> BoxFuture<'static, StorageResult<Option<Vec<u8>>>> {
        let cache = self.clone();
        let key = key.to_owned();
        Box::pin(async move {
            let fetched = cache.inner.get_fresh(&key).await?;
            match &fetched {
                Some(value) => cache.remember(key, value.clone(), None),
                None => cache.invalidate(&key),
            }
            Ok(fetched)
        })
    }

    fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let cache = self.clone();
        let key = key.to_owned();
        Box::pin(async move {
            match cache.inner.set(&key, value.clone(), ttl).await {
                Ok(()) => {
                    cache.remember(key, value, ttl);
                    Ok(())
                }
                Err(err) => {
                    cache.invalidate(&key);
                    Err(err)
                }
            }
        })
    }

    fn delete(&self, key: &str) -> BoxFuture<'static, StorageResult<()>> {
        self.invalidate(key);
        self.inner.delete(key)
    }

    fn take(&self, key: &str) -> BoxFuture<'static, StorageResult<Option<Vec<u8>>>> {
        self.invalidate(key);
        self.inner.take(key)
    }

    fn scan(&self, prefix: &str) -> BoxFuture<'static, StorageResult<Vec<(String, Vec<u8>)>>> {
        self.inner.scan(prefix)
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.health_check()
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.try_reconnect()
    }
}
