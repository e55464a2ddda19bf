//! Domain service for authentication and user profiles.
//!
//! Handles registration, sessions and the signed-in user's profile.

use thiserror::Error;

use crate::domain::UserId;
use crate::models::UserProfile;
use crate::store::{Session, StoreError};

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Not signed in")]
    NotSignedIn,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Creates the account and its user document, then signs in.
    ///
    /// A failed sign-in after the account exists does not fail registration.
    ///
    /// # Errors
    ///
    /// - Returns [`AuthError::Validation`] for malformed input
    /// - Returns [`AuthError::Store`] when the account or user document cannot be created
    async fn register(&self, email: &str, password: &str, name: &str)
    -> Result<UserId, AuthError>;

    /// Replaces any current session with a new one for these credentials.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] if login fails.
    async fn login(&self, email: &str, password: &str) -> Result<Session, AuthError>;

    async fn logout(&self) -> Result<(), AuthError>;

    /// The signed-in user merged with their user document, or `None`.
    async fn current_profile(&self) -> Result<Option<UserProfile>, AuthError>;

    async fn current_user_id(&self) -> Result<Option<UserId>, AuthError>;

    /// Writes the `users` document, retrying with a fixed delay.
    ///
    /// Returns the new document id.
    ///
    /// # Errors
    ///
    /// Returns the last store error once every attempt has failed.
    async fn create_user_document(
        &self,
        email: &str,
        name: &str,
        user_id: &UserId,
        avatar_url: &str,
    ) -> Result<String, AuthError>;
}

/// Rejects registration input the backend would refuse anyway.
pub fn validate_registration(email: &str, password: &str, name: &str) -> Result<(), AuthError> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(AuthError::Validation(format!("Invalid email: {email}")));
    }

    if password.chars().count() < 8 {
        return Err(AuthError::Validation(
            "Password must be at least 8 characters".to_string(),
        ));
    }

    if name.trim().is_empty() {
        return Err(AuthError::Validation("Name cannot be empty".to_string()));
    }

    Ok(())
}
