//! In-process [`DocumentStore`] and [`AccountApi`] implementations.
//!
//! Every call yields to the scheduler once before touching state so that
//! concurrent callers interleave the way they would over the network.

use std::collections::{HashMap, HashSet};

use serde_json::Value;
use tokio::sync::Mutex;

use super::{
    Account, AccountApi, Document, DocumentStore, Fields, ID_ATTRIBUTE, Query, Session,
    StoreError,
};

type CollectionKey = (String, String);

#[derive(Default)]
struct StoreState {
    collections: HashMap<CollectionKey, Vec<Document>>,
    failing: HashSet<String>,
    create_attempts: HashMap<String, usize>,
}

#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every create and update against `collection_id` fail with a 503.
    pub async fn fail_writes_to(&self, collection_id: &str) {
        self.state
            .lock()
            .await
            .failing
            .insert(collection_id.to_string());
    }

    pub async fn heal(&self, collection_id: &str) {
        self.state.lock().await.failing.remove(collection_id);
    }

    /// Create calls received for `collection_id`, failed ones included.
    pub async fn create_attempts(&self, collection_id: &str) -> usize {
        self.state
            .lock()
            .await
            .create_attempts
            .get(collection_id)
            .copied()
            .unwrap_or(0)
    }

    /// All documents of a collection in insertion order.
    pub async fn documents(&self, database_id: &str, collection_id: &str) -> Vec<Document> {
        self.state
            .lock()
            .await
            .collections
            .get(&key(database_id, collection_id))
            .cloned()
            .unwrap_or_default()
    }
}

fn key(database_id: &str, collection_id: &str) -> CollectionKey {
    (database_id.to_string(), collection_id.to_string())
}

fn field_value<'a>(doc: &'a Document, field: &str) -> Option<std::borrow::Cow<'a, Value>> {
    if field == ID_ATTRIBUTE {
        Some(std::borrow::Cow::Owned(Value::String(doc.id.clone())))
    } else {
        doc.data.get(field).map(std::borrow::Cow::Borrowed)
    }
}

fn matches(doc: &Document, queries: &[Query]) -> bool {
    queries.iter().all(|query| match query {
        Query::Equal(field, value) => field_value(doc, field).is_some_and(|v| *v == *value),
        Query::NotEqual(field, value) => field_value(doc, field).is_none_or(|v| *v != *value),
        Query::Limit(_) | Query::Offset(_) => true,
    })
}

fn unavailable(collection_id: &str) -> StoreError {
    StoreError::Api {
        status: 503,
        message: format!("collection {collection_id} is unavailable"),
    }
}

#[async_trait::async_trait]
impl DocumentStore for InMemoryStore {
    async fn list_documents(
        &self,
        database_id: &str,
        collection_id: &str,
        queries: &[Query],
    ) -> Result<Vec<Document>, StoreError> {
        tokio::task::yield_now().await;

        let mut limit = None;
        let mut offset = 0usize;
        for query in queries {
            match query {
                Query::Limit(n) => limit = Some(*n as usize),
                Query::Offset(n) => offset = *n as usize,
                _ => {}
            }
        }

        let state = self.state.lock().await;
        let docs = state
            .collections
            .get(&key(database_id, collection_id))
            .map(Vec::as_slice)
            .unwrap_or_default();

        Ok(docs
            .iter()
            .filter(|doc| matches(doc, queries))
            .skip(offset)
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn create_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: &str,
        data: Fields,
    ) -> Result<Document, StoreError> {
        tokio::task::yield_now().await;

        let mut state = self.state.lock().await;
        *state
            .create_attempts
            .entry(collection_id.to_string())
            .or_default() += 1;

        if state.failing.contains(collection_id) {
            return Err(unavailable(collection_id));
        }

        let docs = state
            .collections
            .entry(key(database_id, collection_id))
            .or_default();

        if docs.iter().any(|d| d.id == document_id) {
            return Err(StoreError::Conflict(document_id.to_string()));
        }

        let doc = Document {
            id: document_id.to_string(),
            data,
        };
        docs.push(doc.clone());
        Ok(doc)
    }

    async fn update_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: &str,
        data: Fields,
    ) -> Result<Document, StoreError> {
        tokio::task::yield_now().await;

        let mut state = self.state.lock().await;
        if state.failing.contains(collection_id) {
            return Err(unavailable(collection_id));
        }

        let doc = state
            .collections
            .get_mut(&key(database_id, collection_id))
            .and_then(|docs| docs.iter_mut().find(|d| d.id == document_id))
            .ok_or_else(|| StoreError::NotFound(document_id.to_string()))?;

        doc.data.extend(data);
        Ok(doc.clone())
    }

    async fn delete_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: &str,
    ) -> Result<(), StoreError> {
        tokio::task::yield_now().await;

        let mut state = self.state.lock().await;
        let docs = state
            .collections
            .get_mut(&key(database_id, collection_id))
            .ok_or_else(|| StoreError::NotFound(document_id.to_string()))?;

        let index = docs
            .iter()
            .position(|d| d.id == document_id)
            .ok_or_else(|| StoreError::NotFound(document_id.to_string()))?;
        docs.remove(index);
        Ok(())
    }
}

struct StoredAccount {
    account: Account,
    password: String,
}

#[derive(Default)]
struct AccountsState {
    accounts: Vec<StoredAccount>,
    current: Option<String>,
}

/// Account backend that keeps a single current session, like a device does.
#[derive(Default)]
pub struct InMemoryAccounts {
    state: Mutex<AccountsState>,
}

impl InMemoryAccounts {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An account that is already signed in.
    #[must_use]
    pub fn signed_in(id: &str, name: &str, email: &str) -> Self {
        let state = AccountsState {
            accounts: vec![StoredAccount {
                account: Account {
                    id: id.to_string(),
                    name: name.to_string(),
                    email: email.to_string(),
                },
                password: String::new(),
            }],
            current: Some(id.to_string()),
        };
        Self {
            state: Mutex::new(state),
        }
    }
}

#[async_trait::async_trait]
impl AccountApi for InMemoryAccounts {
    async fn create_account(
        &self,
        user_id: &str,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<Account, StoreError> {
        tokio::task::yield_now().await;

        let mut state = self.state.lock().await;
        if state
            .accounts
            .iter()
            .any(|a| a.account.id == user_id || a.account.email == email)
        {
            return Err(StoreError::Conflict(format!("account {email}")));
        }

        let account = Account {
            id: user_id.to_string(),
            name: name.to_string(),
            email: email.to_string(),
        };
        state.accounts.push(StoredAccount {
            account: account.clone(),
            password: password.to_string(),
        });
        Ok(account)
    }

    async fn create_email_session(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, StoreError> {
        tokio::task::yield_now().await;

        let mut state = self.state.lock().await;
        if state.current.is_some() {
            return Err(StoreError::Unauthorized(
                "Creation of a session is prohibited when a session is active".to_string(),
            ));
        }

        let user_id = state
            .accounts
            .iter()
            .find(|a| a.account.email == email && a.password == password)
            .map(|a| a.account.id.clone())
            .ok_or_else(|| StoreError::Unauthorized("Invalid credentials".to_string()))?;

        state.current = Some(user_id.clone());
        Ok(Session {
            id: uuid::Uuid::new_v4().simple().to_string(),
            user_id,
        })
    }

    async fn delete_current_session(&self) -> Result<(), StoreError> {
        tokio::task::yield_now().await;

        let mut state = self.state.lock().await;
        if state.current.take().is_none() {
            return Err(StoreError::Unauthorized("No active session".to_string()));
        }
        Ok(())
    }

    async fn current_account(&self) -> Result<Option<Account>, StoreError> {
        tokio::task::yield_now().await;

        let state = self.state.lock().await;
        Ok(state.current.as_ref().and_then(|id| {
            state
                .accounts
                .iter()
                .find(|a| &a.account.id == id)
                .map(|a| a.account.clone())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(pairs: &[(&str, Value)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn create_rejects_duplicate_ids() {
        let store = InMemoryStore::new();
        store
            .create_document("db", "media", "m1", fields(&[("title_zh", json!("A"))]))
            .await
            .unwrap();

        let err = store
            .create_document("db", "media", "m1", Fields::new())
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(store.create_attempts("media").await, 2);
    }

    #[tokio::test]
    async fn list_applies_filters_and_paging() {
        let store = InMemoryStore::new();
        for i in 0..5 {
            let parity = if i % 2 == 0 { "even" } else { "odd" };
            store
                .create_document(
                    "db",
                    "c",
                    &format!("d{i}"),
                    fields(&[("parity", json!(parity))]),
                )
                .await
                .unwrap();
        }

        let even = store
            .list_documents("db", "c", &[Query::equal("parity", "even")])
            .await
            .unwrap();
        assert_eq!(even.len(), 3);

        let page = store
            .list_documents("db", "c", &[Query::Limit(2), Query::Offset(3)])
            .await
            .unwrap();
        let ids: Vec<_> = page.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["d3", "d4"]);

        let by_id = store
            .list_documents("db", "c", &[Query::id("d1")])
            .await
            .unwrap();
        assert_eq!(by_id.len(), 1);

        let not_odd = store
            .list_documents("db", "c", &[Query::not_equal("parity", "odd")])
            .await
            .unwrap();
        assert_eq!(not_odd.len(), 3);
    }

    #[tokio::test]
    async fn update_merges_and_delete_removes() {
        let store = InMemoryStore::new();
        store
            .create_document(
                "db",
                "c",
                "x",
                fields(&[("watch_status", json!(false)), ("notes", json!(""))]),
            )
            .await
            .unwrap();

        let updated = store
            .update_document("db", "c", "x", fields(&[("watch_status", json!(true))]))
            .await
            .unwrap();
        assert_eq!(updated.get_bool("watch_status"), Some(true));
        assert_eq!(updated.get_str("notes"), Some(""));

        store.delete_document("db", "c", "x").await.unwrap();
        assert!(matches!(
            store.delete_document("db", "c", "x").await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn failing_collection_rejects_writes_until_healed() {
        let store = InMemoryStore::new();
        store.fail_writes_to("users").await;
        assert!(matches!(
            store.create_document("db", "users", "u", Fields::new()).await,
            Err(StoreError::Api { status: 503, .. })
        ));

        store.heal("users").await;
        assert!(
            store
                .create_document("db", "users", "u", Fields::new())
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn session_lifecycle() {
        let accounts = InMemoryAccounts::new();
        accounts
            .create_account("u1", "a@example.com", "secret", "Ann")
            .await
            .unwrap();
        assert_eq!(accounts.current_account().await.unwrap(), None);

        assert!(
            accounts
                .create_email_session("a@example.com", "wrong")
                .await
                .is_err()
        );
        let session = accounts
            .create_email_session("a@example.com", "secret")
            .await
            .unwrap();
        assert_eq!(session.user_id, "u1");

        // a second session while one is active is refused
        assert!(
            accounts
                .create_email_session("a@example.com", "secret")
                .await
                .is_err()
        );

        accounts.delete_current_session().await.unwrap();
        assert!(accounts.delete_current_session().await.is_err());
    }
}
