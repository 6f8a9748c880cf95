use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{CouchDaoError, CouchResult};

pub const END_SUFFIX: &str = "\u{ffff}";

#[derive(Debug, Deserialize)]
pub struct AllDocsResponse {
    pub rows: Vec<AllDocsRow>,
}

#[derive(Debug, Deserialize)]
pub struct AllDocsRow {
    pub id: String,
    #[serde(default)]
    pub doc: Option<Value>,
}

/// Key-value pair stored as a CouchDB document. CouchDB has no native expiry, so the deadline
/// is stored alongside the value and checked on every read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchEntryDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at_ms: Option<u64>,
}

impl CouchEntryDocument {
    pub fn new(id: String, value: &[u8], ttl: Option<Duration>) -> Self {
        Self {
            id,
            rev: None,
            value: STANDARD.encode(value),
            expires_at_ms: ttl.map(|ttl| {
                now_ms().saturating_add(u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX))
            }),
        }
    }

    pub fn is_live(&self) -> bool {
        self.expires_at_ms.is_none_or(|deadline| deadline > now_ms())
    }

    pub fn decode_value(&self) -> CouchResult<Vec<u8>> {
        STANDARD
            .decode(&self.value)
            .map_err(|source| CouchDaoError::DecodeValue {
                key: self.id.clone(),
                source,
            })
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}
