use std::{sync::Arc, time::Duration};

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{Collection, Database, IndexModel, bson::doc, options::IndexOptions};
use tokio::sync::RwLock;

use super::{
    connection::MongoConfig,
    error::{MongoDaoError, MongoResult},
    models::{MongoEntryDocument, key_filter, prefix_filter},
};
use crate::dao::{kv_store::KvStore, storage::StorageResult};

const ENTRY_COLLECTION_NAME: &str = "entries";

/// [`KvStore`] backed by a single MongoDB collection keyed by `_id`.
#[derive(Clone)]
pub struct MongoKvStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    database: RwLock<Database>,
    config: MongoConfig,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = self.database.read().await.clone();

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let database = self.config.open().await?;
        *self.database.write().await = database;
        Ok(())
    }
}

impl MongoKvStore {
    /// Establish a connection to MongoDB and ensure the TTL index is present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let database = config.open().await?;
        let inner = Arc::new(MongoInner {
            database: RwLock::new(database),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let index = IndexModel::builder()
            .keys(doc! { "expires_at": 1 })
            .options(
                IndexOptions::builder()
                    .name(Some("entry_expiry_idx".to_owned()))
                    .expire_after(Some(Duration::ZERO))
                    .build(),
            )
            .build();

        self.collection()
            .await
            .create_index(index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: ENTRY_COLLECTION_NAME,
                index: "expires_at",
                source,
            })?;

        Ok(())
    }

    async fn collection(&self) -> Collection<MongoEntryDocument> {
        self.inner
            .database
            .read()
            .await
            .collection::<MongoEntryDocument>(ENTRY_COLLECTION_NAME)
    }

    async fn find(&self, key: String) -> MongoResult<Option<Vec<u8>>> {
        let document = self
            .collection()
            .await
            .find_one(key_filter(&key))
            .await
            .map_err(|source| MongoDaoError::Read { key, source })?;

        Ok(document.map(|doc| doc.into_pair().1))
    }

    async fn upsert(&self, key: String, value: Vec<u8>, ttl: Option<Duration>) -> MongoResult<()> {
        let document = MongoEntryDocument::new(key.clone(), value, ttl);
        self.collection()
            .await
            .replace_one(doc! { "_id": key.as_str() }, &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::Write { key, source })?;

        Ok(())
    }

    async fn remove(&self, key: String) -> MongoResult<()> {
        self.collection()
            .await
            .delete_one(doc! { "_id": key.as_str() })
            .await
            .map_err(|source| MongoDaoError::Delete { key, source })?;

        Ok(())
    }

    async fn find_and_remove(&self, key: String) -> MongoResult<Option<Vec<u8>>> {
        let document = self
            .collection()
            .await
            .find_one_and_delete(key_filter(&key))
            .await
            .map_err(|source| MongoDaoError::Delete { key, source })?;

        Ok(document.map(|doc| doc.into_pair().1))
    }

    async fn list(&self, prefix: String) -> MongoResult<Vec<(String, Vec<u8>)>> {
        let documents: Vec<MongoEntryDocument> = self
            .collection()
            .await
            .find(prefix_filter(&prefix))
            .sort(doc! { "_id": 1 })
            .await
            .map_err(|source| MongoDaoError::Scan {
                prefix: prefix.clone(),
                source,
            })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::Scan { prefix, source })?;

        Ok(documents
            .into_iter()
            .map(MongoEntryDocument::into_pair)
            .collect())
    }
}

impl KvStore for MongoKvStore {
    fn get(&self, key: &str) -> BoxFuture<'static, StorageResult<Option<Vec<u8>>>> {
        let store = self.clone();
        let key = key.to_owned();
        Box::pin(async move { store.find(key).await.map_err(Into::into) })
    }

    fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let key = key.to_owned();
        Box::pin(async move { store.upsert(key, value, ttl).await.map_err(Into::into) })
    }

    fn delete(&self, key: &str) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let key = key.to_owned();
        Box::pin(async move { store.remove(key).await.map_err(Into::into) })
    }

    fn take(&self, key: &str) -> BoxFuture<'static, StorageResult<Option<Vec<u8>>>> {
        let store = self.clone();
        let key = key.to_owned();
        Box::pin(async move { store.find_and_remove(key).await.map_err(Into::into) })
    }

    fn scan(&self, prefix: &str) -> BoxFuture<'static, StorageResult<Vec<(String, Vec<u8>)>>> {
        let store = self.clone();
        let prefix = prefix.to_owned();
        Box::pin(async move { store.list(prefix).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
