use std::{error::Error, future::Future, time::Duration};

use thiserror::Error;
use tokio::time::timeout;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of the underlying database.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend rejected the call or could not be reached.
    #[error("storage unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The backend did not answer within the per-call limit.
    #[error("storage `{operation}` timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
    /// A stored value no longer matches the expected shape.
    #[error("stored value under `{key}` could not be decoded")]
    Corrupted {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    /// Backend settings are missing or invalid.
    #[error("storage misconfigured: {0}")]
    Misconfigured(String),
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}

/// Run a backend call, failing with [`StorageError::Timeout`] when it exceeds `limit`.
pub async fn with_timeout<T, Fut>(
    limit: Duration,
    operation: &'static str,
    call: Fut,
) -> StorageResult<T>
where
    Fut: Future<Output = StorageResult<T>>,
{
    match timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(StorageError::Timeout {
            operation,
            after: limit,
        }),
    }
}
