use std::{sync::Arc, time::Duration};

use futures::future::BoxFuture;
use reqwest::{Client, Method, StatusCode, Url};
use serde_json::from_value;
use tracing::warn;

use crate::dao::{kv_store::KvStore, storage::StorageResult};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{AllDocsResponse, CouchEntryDocument, END_SUFFIX},
};

/// Revision conflicts tolerated before a write gives up.
const MAX_CONFLICT_RETRIES: u32 = 3;

/// Outcome of a revision-guarded write or delete.
enum Revision {
    Applied,
    Conflict,
}

/// [`KvStore`] backed by one CouchDB database, one document per key.
#[derive(Clone)]
pub struct CouchKvStore {
    client: Client,
    base_url: Url,
    database: Arc<str>,
    auth: Option<(Arc<str>, Arc<str>)>,
}

impl CouchKvStore {
    /// Establish a connection to CouchDB and ensure the database exists.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| CouchDaoError::ClientBuilder { source })?;

        let auth = config
            .credentials
            .map(|(user, pass)| (Arc::<str>::from(user), Arc::<str>::from(pass)));

        let store = Self {
            client,
            base_url: config.base_url,
            database: Arc::<str>::from(config.database),
            auth,
        };

        store.ensure_database().await?;
        Ok(store)
    }

    /// Build `{base}/{database}/{segments...}` with every segment percent-encoded.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push(&self.database).extend(segments);
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, url);
        if let Some((ref user, ref pass)) = self.auth {
            builder.basic_auth(user.as_ref(), Some(pass.as_ref()))
        } else {
            builder
        }
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let database = self.database.to_string();
        let response = self
            .request(Method::GET, self.url(&[]))
            .send()
            .await
            .map_err(|source| CouchDaoError::DatabaseQuery {
                database: database.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => {
                let create = self
                    .request(Method::PUT, self.url(&[]))
                    .send()
                    .await
                    .map_err(|source| CouchDaoError::DatabaseCreate {
                        database: database.clone(),
                        source,
                    })?;
                if create.status().is_success() {
                    Ok(())
                } else {
                    Err(CouchDaoError::DatabaseStatus {
                        database,
                        status: create.status(),
                    })
                }
            }
            other => Err(CouchDaoError::DatabaseStatus {
                database,
                status: other,
            }),
        }
    }

    async fn get_document(&self, key: &str) -> CouchResult<Option<CouchEntryDocument>> {
        let response = self
            .request(Method::GET, self.url(&[key]))
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: key.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => response
                .json::<CouchEntryDocument>()
                .await
                .map(Some)
                .map_err(|source| CouchDaoError::DecodeResponse {
                    path: key.to_string(),
                    source,
                }),
            other => Err(CouchDaoError::RequestStatus {
                path: key.to_string(),
                status: other,
            }),
        }
    }

    async fn put_document(&self, document: &CouchEntryDocument) -> CouchResult<Revision> {
        let response = self
            .request(Method::PUT, self.url(&[document.id.as_str()]))
            .json(document)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: document.id.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::CONFLICT => Ok(Revision::Conflict),
            status if status.is_success() => Ok(Revision::Applied),
            other => Err(CouchDaoError::RequestStatus {
                path: document.id.clone(),
                status: other,
            }),
        }
    }

    async fn delete_document(&self, key: &str, rev: &str) -> CouchResult<Revision> {
        let response = self
            .request(Method::DELETE, self.url(&[key]))
            .query(&[("rev", rev)])
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: key.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::CONFLICT | StatusCode::NOT_FOUND => Ok(Revision::Conflict),
            status if status.is_success() => Ok(Revision::Applied),
            other => Err(CouchDaoError::RequestStatus {
                path: key.to_string(),
                status: other,
            }),
        }
    }

    async fn write(&self, key: String, value: Vec<u8>, ttl: Option<Duration>) -> CouchResult<()> {
        let mut document = CouchEntryDocument::new(key.clone(), &value, ttl);
        for _ in 0..MAX_CONFLICT_RETRIES {
            document.rev = self.get_document(&key).await?.and_then(|existing| existing.rev);
            if let Revision::Applied = self.put_document(&document).await? {
                return Ok(());
            }
        }

        Err(CouchDaoError::Conflict {
            key,
            attempts: MAX_CONFLICT_RETRIES,
        })
    }

    async fn remove(&self, key: String) -> CouchResult<()> {
        for _ in 0..MAX_CONFLICT_RETRIES {
            let Some(rev) = self.get_document(&key).await?.and_then(|doc| doc.rev) else {
                return Ok(());
            };
            if let Revision::Applied = self.delete_document(&key, &rev).await? {
                return Ok(());
            }
        }

        Err(CouchDaoError::Conflict {
            key,
            attempts: MAX_CONFLICT_RETRIES,
        })
    }

    /// Read then delete under the read revision. Losing the revision race means another caller
    /// consumed or replaced the document, so the read is retried against the new state.
    async fn consume(&self, key: String) -> CouchResult<Option<Vec<u8>>> {
        for _ in 0..MAX_CONFLICT_RETRIES {
            let Some(document) = self.get_document(&key).await? else {
                return Ok(None);
            };
            let Some(rev) = document.rev.clone() else {
                return Ok(None);
            };

            if !document.is_live() {
                if let Err(err) = self.delete_document(&key, &rev).await {
                    warn!(key = %key, error = %err, "failed to drop expired CouchDB document");
                }
                return Ok(None);
            }

            let value = document.decode_value()?;
            match self.delete_document(&key, &rev).await {
                Ok(Revision::Applied) => return Ok(Some(value)),
                Ok(Revision::Conflict) => continue,
                Err(err) => {
                    warn!(
                        key = %key,
                        error = %err,
                        "failed to delete consumed CouchDB document; returning value anyway"
                    );
                    return Ok(Some(value));
                }
            }
        }

        Err(CouchDaoError::Conflict {
            key,
            attempts: MAX_CONFLICT_RETRIES,
        })
    }

    async fn list_documents(&self, prefix: &str) -> CouchResult<Vec<CouchEntryDocument>> {
        const ALL_DOCS: &str = "_all_docs";
        let encode = |key: String| {
            serde_json::to_string(&key).map_err(|source| CouchDaoError::DeserializeValue {
                path: ALL_DOCS.to_string(),
                source,
            })
        };
        let query = [
            ("include_docs", "true".to_string()),
            ("startkey", encode(prefix.to_string())?),
            ("endkey", encode(format!("{prefix}{END_SUFFIX}"))?),
        ];

        let response = self
            .request(Method::GET, self.url(&[ALL_DOCS]))
            .query(&query)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: ALL_DOCS.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(CouchDaoError::RequestStatus {
                path: ALL_DOCS.to_string(),
                status: response.status(),
            });
        }

        let payload = response.json::<AllDocsResponse>().await.map_err(|source| {
            CouchDaoError::DecodeResponse {
                path: ALL_DOCS.to_string(),
                source,
            }
        })?;

        let mut documents = Vec::new();
        for row in payload.rows {
            if let Some(doc) = row.doc {
                let parsed = from_value(doc).map_err(|source| CouchDaoError::DeserializeValue {
                    path: row.id,
                    source,
                })?;
                documents.push(parsed);
            }
        }

        Ok(documents)
    }

    async fn scan_live(&self, prefix: String) -> CouchResult<Vec<(String, Vec<u8>)>> {
        let mut rows = Vec::new();
        for document in self.list_documents(&prefix).await? {
            if document.is_live() {
                let value = document.decode_value()?;
                rows.push((document.id, value));
            }
        }
        Ok(rows)
    }
}

impl KvStore for CouchKvStore {
    fn get(&self, key: &str) -> BoxFuture<'static, StorageResult<Option<Vec<u8>>>> {
        let store = self.clone();
        let key = key.to_owned();
        Box::pin(async move {
            let Some(document) = store.get_document(&key).await? else {
                return Ok(None);
            };
            if !document.is_live() {
                return Ok(None);
            }
            Ok(Some(document.decode_value()?))
        })
    }

    fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let key = key.to_owned();
        Box::pin(async move { store.write(key, value, ttl).await.map_err(Into::into) })
    }

    fn delete(&self, key: &str) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let key = key.to_owned();
        Box::pin(async move { store.remove(key).await.map_err(Into::into) })
    }

    fn take(&self, key: &str) -> BoxFuture<'static, StorageResult<Option<Vec<u8>>>> {
        let store = self.clone();
        let key = key.to_owned();
        Box::pin(async move { store.consume(key).await.map_err(Into::into) })
    }

    fn scan(&self, prefix: &str) -> BoxFuture<'static, StorageResult<Vec<(String, Vec<u8>)>>> {
        let store = self.clone();
        let prefix = prefix.to_owned();
        Box::pin(async move { store.scan_live(prefix).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let url = store.url(&[]);
            let path = url.to_string();
            let response = store
                .request(Method::GET, url)
                .send()
                .await
                .map_err(|source| CouchDaoError::RequestSend {
                    path: path.clone(),
                    source,
                })?;

            if response.status().is_success() {
                Ok(())
            } else {
                Err(CouchDaoError::RequestStatus {
                    path,
                    status: response.status(),
                }
                .into())
            }
        })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_database().await.map_err(Into::into) })
    }
}
