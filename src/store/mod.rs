//! Document-store facade.
//!
//! The sync services only ever talk to the remote backend through the
//! [`DocumentStore`] and [`AccountApi`] traits. `clients::appwrite` provides the
//! HTTPS implementation and [`memory`] an in-process one.

pub mod account;
pub mod memory;

pub use account::{Account, AccountApi, Session};
pub use memory::{InMemoryAccounts, InMemoryStore};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Reserved attribute addressing the document id in queries.
pub const ID_ATTRIBUTE: &str = "$id";

/// Field map of a stored document.
pub type Fields = Map<String, Value>;

/// Errors surfaced by a document store or account backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Document already exists: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Store API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed response: {0}")]
    Decode(String),
}

impl StoreError {
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// A stored document: its id plus the user-defined fields.
///
/// Backend metadata (`$createdAt`, `$permissions`, ...) is not kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub data: Fields,
}

impl Document {
    #[must_use]
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.data.get(field).and_then(Value::as_str)
    }

    #[must_use]
    pub fn get_bool(&self, field: &str) -> Option<bool> {
        self.data.get(field).and_then(Value::as_bool)
    }

    /// Decodes the fields into a typed record.
    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> Result<T, StoreError> {
        serde_json::from_value(Value::Object(self.data.clone())).map_err(|e| {
            StoreError::Decode(format!("document {}: {e}", self.id))
        })
    }
}

/// Query predicates understood by every store implementation.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    Equal(String, Value),
    NotEqual(String, Value),
    Limit(u32),
    Offset(u32),
}

impl Query {
    pub fn equal(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Equal(field.into(), value.into())
    }

    pub fn not_equal(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::NotEqual(field.into(), value.into())
    }

    /// Lookup by document id.
    pub fn id(id: impl Into<String>) -> Self {
        Self::Equal(ID_ATTRIBUTE.to_string(), Value::String(id.into()))
    }

    /// Serializes to the backend's JSON query syntax.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Equal(field, value) => serde_json::json!({
                "method": "equal",
                "attribute": field,
                "values": [value],
            }),
            Self::NotEqual(field, value) => serde_json::json!({
                "method": "notEqual",
                "attribute": field,
                "values": [value],
            }),
            Self::Limit(n) => serde_json::json!({ "method": "limit", "values": [n] }),
            Self::Offset(n) => serde_json::json!({ "method": "offset", "values": [n] }),
        }
    }
}

/// Database and collection ids the services operate on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    pub database_id: String,
    pub users: String,
    pub media: String,
    pub media_source: String,
    pub collections: String,
}

/// Remote document store addressed by (database id, collection id, document id).
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    async fn list_documents(
        &self,
        database_id: &str,
        collection_id: &str,
        queries: &[Query],
    ) -> Result<Vec<Document>, StoreError>;

    /// Inserts a document under `document_id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when a document with that id exists.
    async fn create_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: &str,
        data: Fields,
    ) -> Result<Document, StoreError>;

    /// Merges `data` into an existing document.
    async fn update_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: &str,
        data: Fields,
    ) -> Result<Document, StoreError>;

    async fn delete_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: &str,
    ) -> Result<(), StoreError>;
}

/// Lists every document matching `queries`, one page of `page_size` at a time.
pub async fn list_all(
    store: &dyn DocumentStore,
    database_id: &str,
    collection_id: &str,
    queries: &[Query],
    page_size: u32,
) -> Result<Vec<Document>, StoreError> {
    let page_size = page_size.max(1);
    let mut documents = Vec::new();
    let mut offset = 0u32;

    loop {
        let mut page_queries = queries.to_vec();
        page_queries.push(Query::Limit(page_size));
        page_queries.push(Query::Offset(offset));

        let page = store
            .list_documents(database_id, collection_id, &page_queries)
            .await?;
        let fetched = page.len();
        documents.extend(page);

        if fetched < page_size as usize {
            return Ok(documents);
        }
        offset += page_size;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn list_all_walks_every_page() {
        let store = InMemoryStore::new();
        for i in 0..7 {
            store
                .create_document("db", "c", &format!("d{i}"), Fields::new())
                .await
                .unwrap();
        }

        let all = list_all(&store, "db", "c", &[], 3).await.unwrap();
        assert_eq!(all.len(), 7);
        assert_eq!(all[6].id, "d6");
    }

    #[test]
    fn equal_query_serializes_to_json_syntax() {
        let query = Query::equal("title_zh", "葬送的芙莉莲");
        assert_eq!(
            query.to_json(),
            json!({"method": "equal", "attribute": "title_zh", "values": ["葬送的芙莉莲"]})
        );
    }

    #[test]
    fn id_query_targets_reserved_attribute() {
        assert_eq!(
            Query::id("abc"),
            Query::Equal("$id".to_string(), json!("abc"))
        );
        assert_eq!(Query::Limit(25).to_json(), json!({"method": "limit", "values": [25]}));
    }

    #[test]
    fn document_accessors() {
        let mut data = Fields::new();
        data.insert("media_id".to_string(), json!("m1"));
        data.insert("watch_status".to_string(), json!(true));
        let doc = Document {
            id: "c1".to_string(),
            data,
        };

        assert_eq!(doc.get_str("media_id"), Some("m1"));
        assert_eq!(doc.get_bool("watch_status"), Some(true));
        assert_eq!(doc.get_str("watch_status"), None);
        assert_eq!(doc.get_str("missing"), None);
    }
}
