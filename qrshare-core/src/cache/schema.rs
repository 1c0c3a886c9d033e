//! On-store serialization schema.
//!
//! All cached items live under one store key as a versioned JSON document:
//!
//! ```json
//! {"version":1,"entries":[{"id":"3f2a9c1b0d","type":"text","data":"hello",
//!   "created":"2024-05-01T12:00:00Z","expires":null}]}
//! ```
//!
//! Documents written before versioning was introduced are a bare array of the
//! same records and are read as version 0.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use super::CacheError;
use crate::content::{ContentId, ContentItem, ContentKind, ContentPayload, DataUrl};

/// Store key holding the cache document.
pub const STORE_KEY: &str = "qr-share-content";

/// Schema version written by this build.
pub const SCHEMA_VERSION: u32 = 1;

/// One cached item in its stored form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub data: String,
    #[serde(rename = "mimeType", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub expires: Option<DateTime<Utc>>,
}

impl StoredRecord {
    /// Converts an item to its stored form.
    pub fn from_item(item: &ContentItem) -> Self {
        let kind = item.kind();
        let (data, mime_type) = match item.payload() {
            ContentPayload::Text(text) => (text.clone(), None),
            ContentPayload::VideoUrl(url) => (url.to_string(), None),
            ContentPayload::VideoFile(data_url) => {
                (data_url.to_string(), Some(data_url.media_type().to_string()))
            }
        };

        Self {
            id: item.id().to_string(),
            kind: kind.type_tag().to_string(),
            source: kind.source_tag().map(str::to_string),
            data,
            mime_type,
            created: item.created_at(),
            expires: item.expires_at(),
        }
    }

    /// True when the record has an expiry at or before `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires.is_some_and(|expires| expires <= now)
    }

    /// Rebuilds the content item, validating the payload for its kind.
    ///
    /// # Errors
    ///
    /// - `CacheError::InvalidRecord` - Unknown kind, invalid payload, or inconsistent timestamps
    pub fn into_item(self) -> Result<ContentItem, CacheError> {
        let invalid = |reason: String| CacheError::InvalidRecord {
            id: self.id.clone(),
            reason,
        };

        let id = ContentId::parse(&self.id).map_err(|e| invalid(e.to_string()))?;
        let payload = match (self.kind.as_str(), self.source.as_deref()) {
            ("text", _) => ContentPayload::Text(self.data.clone()),
            ("video", Some("url")) => {
                ContentPayload::VideoUrl(Url::parse(&self.data).map_err(|e| invalid(e.to_string()))?)
            }
            ("video", Some("file")) => {
                ContentPayload::VideoFile(DataUrl::parse(&self.data).map_err(|e| invalid(e.to_string()))?)
            }
            (kind, source) => {
                return Err(invalid(format!(
                    "unsupported type '{kind}' with source {source:?}"
                )));
            }
        };

        ContentItem::new(id, payload, self.created, self.expires).map_err(|e| invalid(e.to_string()))
    }

    /// Kind declared by the record, if recognised.
    pub fn content_kind(&self) -> Option<ContentKind> {
        match (self.kind.as_str(), self.source.as_deref()) {
            ("text", _) => Some(ContentKind::Text),
            ("video", Some("url")) => Some(ContentKind::VideoUrlReference),
            ("video", Some("file")) => Some(ContentKind::VideoFileReference),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
struct StoredDocument<'a> {
    version: u32,
    entries: &'a [StoredRecord],
}

/// Parses a stored document into its records, migrating older layouts.
///
/// Malformed records are skipped so they cannot hide the rest of the cache;
/// the next write drops them.
///
/// # Errors
///
/// - `CacheError::Serialization` - Document is not valid JSON
/// - `CacheError::UnsupportedSchema` - Document was written by a newer schema version
/// - `CacheError::InvalidRecord` - Document or its entry list has the wrong shape
pub fn decode_document(raw: &str) -> Result<Vec<StoredRecord>, CacheError> {
    let document: Value = serde_json::from_str(raw)?;

    match document {
        Value::Array(entries) => {
            tracing::debug!("Migrating unversioned cache document");
            Ok(decode_entries(entries))
        }
        Value::Object(mut fields) => {
            let version = fields
                .get("version")
                .and_then(Value::as_u64)
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or(0);
            if version > SCHEMA_VERSION {
                return Err(CacheError::UnsupportedSchema {
                    found: version,
                    supported: SCHEMA_VERSION,
                });
            }

            match fields.remove("entries") {
                None | Some(Value::Null) => Ok(Vec::new()),
                Some(Value::Array(entries)) => Ok(decode_entries(entries)),
                Some(_) => Err(CacheError::InvalidRecord {
                    id: STORE_KEY.to_string(),
                    reason: "entries is not an array".to_string(),
                }),
            }
        }
        _ => Err(CacheError::InvalidRecord {
            id: STORE_KEY.to_string(),
            reason: "document is neither an object nor an array".to_string(),
        }),
    }
}

fn decode_entries(entries: Vec<Value>) -> Vec<StoredRecord> {
    entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let id = entry
                .get("id")
                .and_then(Value::as_str)
                .map(str::to_string);
            match serde_json::from_value::<StoredRecord>(entry) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(
                        "Skipping malformed cache entry {} ({}): {e}",
                        index,
                        id.as_deref().unwrap_or("no id")
                    );
                    None
                }
            }
        })
        .collect()
}

/// Serializes records under the current schema version.
///
/// # Errors
///
/// - `CacheError::Serialization` - Records cannot be serialized
pub fn encode_document(entries: &[StoredRecord]) -> Result<String, CacheError> {
    Ok(serde_json::to_string(&StoredDocument {
        version: SCHEMA_VERSION,
        entries,
    })?)
}
