use std::{env, sync::Arc};

#[cfg(feature = "couch-store")]
use super::couchdb::{CouchConfig, CouchKvStore};
#[cfg(feature = "mongo-store")]
use super::mongodb::{MongoConfig, MongoKvStore};
use super::{KvStore, MemoryKvStore};
use crate::dao::storage::{StorageError, StorageResult};

/// Environment variable selecting the storage backend.
const STORAGE_BACKEND_ENV: &str = "STORAGE_BACKEND";

/// Backend chosen at startup. Business logic never branches on this; it only decides which
/// [`KvStore`] implementation gets installed.
#[derive(Clone)]
pub enum StorageBackend {
    /// Process-local map; the instance is kept so reconnects do not lose data.
    Memory(MemoryKvStore),
    #[cfg(feature = "mongo-store")]
    /// MongoDB collection with a TTL index.
    Mongo {
        uri: String,
        database: Option<String>,
    },
    #[cfg(feature = "couch-store")]
    /// CouchDB database reached over HTTP.
    Couch(CouchConfig),
}

impl StorageBackend {
    /// Read the backend selection from `STORAGE_BACKEND` (`memory`, `mongo`, or `couch`).
    pub fn from_env() -> StorageResult<Self> {
        let kind = env::var(STORAGE_BACKEND_ENV).unwrap_or_else(|_| "memory".into());
        match kind.trim().to_ascii_lowercase().as_str() {
            "" | "memory" => Ok(Self::Memory(MemoryKvStore::new())),
            #[cfg(feature = "mongo-store")]
            "mongo" | "mongodb" => Ok(Self::Mongo {
                uri: env::var("MONGO_URI").unwrap_or_else(|_| "mongodb://localhost:27017".into()),
                database: env::var("MONGO_DB").ok(),
            }),
            #[cfg(feature = "couch-store")]
            "couch" | "couchdb" => Ok(Self::Couch(CouchConfig::from_env()?)),
            other => Err(StorageError::Misconfigured(format!(
                "unsupported storage backend `{other}`"
            ))),
        }
    }

    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            #[cfg(feature = "mongo-store")]
            Self::Mongo { .. } => "mongodb",
            #[cfg(feature = "couch-store")]
            Self::Couch(_) => "couchdb",
        }
    }

    /// Open a connection to the selected backend.
    pub async fn connect(&self) -> StorageResult<Arc<dyn KvStore>> {
        match self {
            Self::Memory(store) => Ok(Arc::new(store.clone())),
            #[cfg(feature = "mongo-store")]
            Self::Mongo { uri, database } => {
                let config = MongoConfig::from_uri(uri, database.as_deref()).await?;
                Ok(Arc::new(MongoKvStore::connect(config).await?))
            }
            #[cfg(feature = "couch-store")]
            Self::Couch(config) => Ok(Arc::new(CouchKvStore::connect(config.clone()).await?)),
        }
    }
}
