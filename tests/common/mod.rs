//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use dramatracker::config::Config;
use dramatracker::models::SearchResult;
use dramatracker::state::AppState;
use dramatracker::store::{InMemoryAccounts, InMemoryStore};

pub const DB: &str = "db";
pub const USERS: &str = "users";
pub const MEDIA: &str = "media";
pub const MEDIA_SOURCE: &str = "media_source";
pub const COLLECTIONS: &str = "collections";

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.appwrite.project_id = "test-project".to_string();
    config.appwrite.database_id = DB.to_string();
    config.appwrite.collections.users = USERS.to_string();
    config.appwrite.collections.media = MEDIA.to_string();
    config.appwrite.collections.media_source = MEDIA_SOURCE.to_string();
    config.appwrite.collections.collections = COLLECTIONS.to_string();
    config.validate().expect("test config should be valid");
    config
}

pub struct TestApp {
    pub store: Arc<InMemoryStore>,
    pub accounts: Arc<InMemoryAccounts>,
    pub state: AppState,
}

impl TestApp {
    pub fn with_accounts(accounts: InMemoryAccounts) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let accounts = Arc::new(accounts);
        let state = AppState::with_backend(test_config(), store.clone(), accounts.clone());
        Self {
            store,
            accounts,
            state,
        }
    }

    /// Signed in as `user-1`.
    pub fn signed_in() -> Self {
        Self::with_accounts(InMemoryAccounts::signed_in(
            "user-1",
            "Lin Xiao",
            "lin@example.com",
        ))
    }

    pub fn signed_out() -> Self {
        Self::with_accounts(InMemoryAccounts::new())
    }

    pub async fn count(&self, collection_id: &str) -> usize {
        self.store.documents(DB, collection_id).await.len()
    }
}

pub fn frieren() -> SearchResult {
    let mut result = SearchResult::new("douban", "36283581", "葬送的芙莉莲", "2023-09-29");
    result.source_url = "https://movie.douban.com/subject/36283581/".to_string();
    result.media_type = "anime".to_string();
    result.title_original = "葬送のフリーレン".to_string();
    result.poster_url = "https://img.example.com/frieren.jpg".to_string();
    result.duration = Some("28".to_string());
    result.rating_douban = 9.5;
    result
}
