mod backend;
pub mod cache;
#[cfg(feature = "couch-store")]
pub mod couchdb;
pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use std::time::Duration;

use futures::future::BoxFuture;

use crate::dao::storage::StorageResult;

pub use backend::StorageBackend;
pub use cache::CachedStore;
pub use memory::MemoryKvStore;

/// Abstraction over the durable key-value backend holding snapshots and the leaderboard.
///
/// Every method touches a single key (or a single prefix range for [`KvStore::scan`]); callers
/// must not rely on atomicity across keys.
pub trait KvStore: Send + Sync {
    /// Fetch the value stored under `key`, skipping expired entries.
    fn get(&self, key: &str) -> BoxFuture<'static, StorageResult<Option<Vec<u8>>>>;
    /// Like [`KvStore::get`], but always answered by the durable backend. Read-modify-write
    /// cycles must start from this.
    fn get_fresh(&self, key: &str) -> BoxFuture<'static, StorageResult<Option<Vec<u8>>>> {
        self.get(key)
    }
    /// Store `value` under `key`, replacing any previous value. `ttl` bounds its lifetime.
    fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Remove `key`. Removing a missing key succeeds.
    fn delete(&self, key: &str) -> BoxFuture<'static, StorageResult<()>>;
    /// Remove `key` and hand back the value it held, so only one caller observes it.
    fn take(&self, key: &str) -> BoxFuture<'static, StorageResult<Option<Vec<u8>>>>;
    /// List every live `(key, value)` pair whose key starts with `prefix`, ordered by key.
    fn scan(&self, prefix: &str) -> BoxFuture<'static, StorageResult<Vec<(String, Vec<u8>)>>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
