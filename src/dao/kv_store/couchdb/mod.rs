mod config;
mod error;
mod models;
mod store;

pub use config::CouchConfig;
pub use error::CouchDaoError;
pub use store::CouchKvStore;

use crate::dao::storage::StorageError;

impl From<CouchDaoError> for StorageError {
    fn from(err: CouchDaoError) -> Self {
        match err {
            CouchDaoError::MissingEnvVar { .. } | CouchDaoError::InvalidBaseUrl { .. } => {
                StorageError::Misconfigured(err.to_string())
            }
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}
