use serde::{Deserialize, Serialize};

use super::StoreError;

/// The signed-in account as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
}

/// Account and session operations of the backend.
#[async_trait::async_trait]
pub trait AccountApi: Send + Sync {
    async fn create_account(
        &self,
        user_id: &str,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<Account, StoreError>;

    async fn create_email_session(&self, email: &str, password: &str)
    -> Result<Session, StoreError>;

    async fn delete_current_session(&self) -> Result<(), StoreError>;

    /// Returns `None` when nobody is signed in.
    async fn current_account(&self) -> Result<Option<Account>, StoreError>;
}
