//! [`AuthService`] over the [`AccountApi`] and [`DocumentStore`] facades.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::domain::UserId;
use crate::models::{UserDocument, UserProfile};
use crate::models::user::{fallback_avatar_url, registration_avatar_url};
use crate::services::auth_service::{AuthError, AuthService, validate_registration};
use crate::services::retry::{RetryPolicy, retry_fixed};
use crate::store::{AccountApi, DocumentStore, Query, Session, StoreError, StoreLayout};

pub struct StoreAuthService {
    store: Arc<dyn DocumentStore>,
    accounts: Arc<dyn AccountApi>,
    layout: StoreLayout,
    user_document_retry: RetryPolicy,
}

impl StoreAuthService {
    #[must_use]
    pub fn new(
        store: Arc<dyn DocumentStore>,
        accounts: Arc<dyn AccountApi>,
        layout: StoreLayout,
        user_document_retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            accounts,
            layout,
            user_document_retry,
        }
    }

    /// Drops whatever session the device holds; having none is fine.
    async fn clear_session(&self) {
        if let Err(e) = self.accounts.delete_current_session().await {
            debug!(error = %e, "No existing session to delete");
        }
    }
}

fn new_unique_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

#[async_trait]
impl AuthService for StoreAuthService {
    async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<UserId, AuthError> {
        validate_registration(email, password, name)?;
        info!(email, name, "Registering user");

        self.clear_session().await;

        let account = self
            .accounts
            .create_account(&new_unique_id(), email, password, name)
            .await?;
        let user_id = UserId::new(account.id);
        info!(user_id = %user_id, "Account created");

        let avatar_url = registration_avatar_url(name);
        let document_id = self
            .create_user_document(email, name, &user_id, &avatar_url)
            .await?;
        debug!(document_id = %document_id, "User document created");

        match self.accounts.create_email_session(email, password).await {
            Ok(session) => info!(user_id = %session.user_id, "Signed in after registration"),
            Err(e) => error!(error = %e, "Automatic sign-in after registration failed"),
        }

        Ok(user_id)
    }

    async fn login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        self.clear_session().await;

        let session = self
            .accounts
            .create_email_session(email, password)
            .await
            .map_err(|e| match e {
                StoreError::Unauthorized(_) => AuthError::InvalidCredentials,
                other => AuthError::Store(other),
            })?;

        info!(user_id = %session.user_id, "Login succeeded");
        Ok(session)
    }

    async fn logout(&self) -> Result<(), AuthError> {
        self.accounts
            .delete_current_session()
            .await
            .map_err(|e| match e {
                StoreError::Unauthorized(_) => AuthError::NotSignedIn,
                other => AuthError::Store(other),
            })?;
        info!("Logged out");
        Ok(())
    }

    async fn current_profile(&self) -> Result<Option<UserProfile>, AuthError> {
        let Some(account) = self.accounts.current_account().await? else {
            debug!("No signed-in user");
            return Ok(None);
        };

        let docs = self
            .store
            .list_documents(
                &self.layout.database_id,
                &self.layout.users,
                &[Query::equal("user_id", account.id.as_str()), Query::Limit(1)],
            )
            .await?;

        let profile = match docs.into_iter().next() {
            Some(doc) => {
                let avatar_url = doc
                    .get_str("avatar_url")
                    .filter(|url| !url.is_empty())
                    .map_or_else(|| fallback_avatar_url(&account.name), ToString::to_string);
                UserProfile {
                    user_id: account.id,
                    avatar_url,
                    name: account.name,
                    email: account.email,
                    document_id: Some(doc.id),
                }
            }
            None => {
                warn!(user_id = %account.id, "User document missing, using default avatar");
                UserProfile {
                    avatar_url: registration_avatar_url(&account.name),
                    user_id: account.id,
                    name: account.name,
                    email: account.email,
                    document_id: None,
                }
            }
        };

        Ok(Some(profile))
    }

    async fn current_user_id(&self) -> Result<Option<UserId>, AuthError> {
        Ok(self
            .accounts
            .current_account()
            .await?
            .map(|account| UserId::new(account.id)))
    }

    async fn create_user_document(
        &self,
        email: &str,
        name: &str,
        user_id: &UserId,
        avatar_url: &str,
    ) -> Result<String, AuthError> {
        let record = UserDocument {
            user_id: user_id.to_string(),
            email: email.to_string(),
            name: name.to_string(),
            avatar_url: Some(avatar_url.to_string()),
        };
        let Value::Object(fields) = serde_json::to_value(&record).map_err(StoreError::from)?
        else {
            return Err(StoreError::Decode("user document is not an object".to_string()).into());
        };

        let store = &self.store;
        let layout = &self.layout;
        let fields = &fields;
        let policy = self.user_document_retry;
        let document = retry_fixed(policy, "create_user_document", || async move {
            store
                .create_document(
                    &layout.database_id,
                    &layout.users,
                    &new_unique_id(),
                    fields.clone(),
                )
                .await
        })
        .await?;

        Ok(document.id)
    }
}
