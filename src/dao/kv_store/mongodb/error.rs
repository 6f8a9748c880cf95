use mongodb::error::Error as MongoError;
use thiserror::Error;

pub type MongoResult<T> = Result<T, MongoDaoError>;

/// Failures that can occur while interacting with MongoDB.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to read entry `{key}`")]
    Read {
        key: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to write entry `{key}`")]
    Write {
        key: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to delete entry `{key}`")]
    Delete {
        key: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to scan entries with prefix `{prefix}`")]
    Scan {
        prefix: String,
        #[source]
        source: MongoError,
    },
}
