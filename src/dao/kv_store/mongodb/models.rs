use std::time::{Duration, SystemTime};

use mongodb::bson::{Binary, DateTime, Document, doc, spec::BinarySubtype};
use serde::{Deserialize, Serialize};

/// One key-value pair stored as a MongoDB document. `expires_at` feeds the TTL index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoEntryDocument {
    #[serde(rename = "_id")]
    pub key: String,
    pub value: Binary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime>,
}

impl MongoEntryDocument {
    pub fn new(key: String, value: Vec<u8>, ttl: Option<Duration>) -> Self {
        Self {
            key,
            value: Binary {
                subtype: BinarySubtype::Generic,
                bytes: value,
            },
            expires_at: ttl
                .and_then(|ttl| SystemTime::now().checked_add(ttl))
                .map(DateTime::from_system_time),
        }
    }

    pub fn into_pair(self) -> (String, Vec<u8>) {
        (self.key, self.value.bytes)
    }
}

/// Matches documents that have no expiry or have not reached it yet. The TTL monitor only runs
/// periodically, so reads filter stale documents themselves.
pub fn live_filter() -> Document {
    doc! {
        "$or": [
            { "expires_at": null },
            { "expires_at": { "$gt": DateTime::now() } },
        ]
    }
}

pub fn key_filter(key: &str) -> Document {
    let mut filter = live_filter();
    filter.insert("_id", key);
    filter
}

pub fn prefix_filter(prefix: &str) -> Document {
    let mut filter = live_filter();
    filter.insert(
        "_id",
        doc! { "$gte": prefix, "$lt": format!("{prefix}\u{ffff}") },
    );
    filter
}
