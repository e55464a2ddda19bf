//! Domain service for a user's watch collection.
//!
//! Adding a title touches three collections in order: `media` (deduplicated
//! on title and release date), `media_source` (deduplicated on source id) and
//! `collections` (deduplicated on user and media). The steps are not
//! transactional; a failure leaves earlier rows in place.

use crate::domain::{MediaId, UserId};
use crate::models::{CollectionEntry, MediaRecord, SearchResult};
use crate::store::StoreError;
use thiserror::Error;
use tracing::{error, warn};
use uuid::Uuid;

/// Errors for collection operations.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("{kind} not found: {key}")]
    NotFound { kind: &'static str, key: String },

    #[error("Not signed in")]
    NotSignedIn,

    #[error("Invalid document {id}: {reason}")]
    InvalidDocument { id: String, reason: String },
}

impl SyncError {
    pub fn not_found(kind: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            key: key.into(),
        }
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// What an add-to-collection call ended up writing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddOutcome {
    pub media_id: MediaId,
    pub media_created: bool,
    pub source_created: bool,
    pub collection_created: bool,
}

/// Domain service trait for the watch collection.
///
/// Each operation comes in two forms: `try_*` returns the error, the plain
/// form logs it and reports a boolean, which is what list screens need.
#[async_trait::async_trait]
pub trait CollectionService: Send + Sync {
    /// Ensures media, media source and collection rows exist for `result`.
    ///
    /// Rows that already exist are reused, never refreshed.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Store`] from the first step the store rejects;
    /// rows written by earlier steps are kept.
    async fn try_add_to_collection(
        &self,
        result: &SearchResult,
        user_id: &UserId,
    ) -> Result<AddOutcome, SyncError>;

    /// Deletes the signed-in user's entry for the media behind `source_id`.
    ///
    /// The media source row itself is kept.
    ///
    /// # Errors
    ///
    /// - [`SyncError::NotFound`] when the source or the entry does not exist
    /// - [`SyncError::NotSignedIn`] without a session
    async fn try_remove_from_collection(&self, source_id: &str) -> Result<(), SyncError>;

    /// Resolves a collection document back to its source id and removes it
    /// through [`Self::try_remove_from_collection`].
    async fn try_remove_by_collection_id(&self, collection_id: &str) -> Result<(), SyncError>;

    /// # Errors
    ///
    /// Returns [`SyncError::NotFound`] when the user has no entry for the media.
    async fn try_set_watch_status(
        &self,
        user_id: &UserId,
        media_id: &MediaId,
        watched: bool,
    ) -> Result<(), SyncError>;

    /// Whether any media source row exists for `source_id`.
    async fn is_source_collected(&self, source_id: &str) -> Result<bool, SyncError>;

    async fn list_user_collections(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<CollectionEntry>, SyncError>;

    async fn get_media(&self, media_id: &MediaId) -> Result<Option<MediaRecord>, SyncError>;

    async fn add_to_collection(&self, result: &SearchResult, user_id: &UserId) -> bool {
        match self.try_add_to_collection(result, user_id).await {
            Ok(_) => true,
            Err(e) => {
                error!(
                    source_id = %result.source_id,
                    title = %result.title_zh,
                    user_id = %user_id,
                    error = %e,
                    "Failed to add to collection"
                );
                false
            }
        }
    }

    async fn remove_from_collection(&self, source_id: &str) -> bool {
        report(
            self.try_remove_from_collection(source_id).await,
            "remove_from_collection",
            source_id,
        )
    }

    async fn remove_by_collection_id(&self, collection_id: &str) -> bool {
        report(
            self.try_remove_by_collection_id(collection_id).await,
            "remove_by_collection_id",
            collection_id,
        )
    }

    async fn set_watch_status(&self, user_id: &UserId, media_id: &MediaId, watched: bool) -> bool {
        report(
            self.try_set_watch_status(user_id, media_id, watched).await,
            "set_watch_status",
            media_id.as_str(),
        )
    }
}

fn report(result: Result<(), SyncError>, operation: &str, key: &str) -> bool {
    match result {
        Ok(()) => true,
        Err(e) if e.is_not_found() => {
            warn!(operation, key, error = %e, "Nothing to update");
            false
        }
        Err(e) => {
            error!(operation, key, error = %e, "Collection operation failed");
            false
        }
    }
}

/// Document ids derived from natural keys.
///
/// Inserting under these ids makes the store itself reject a second row for
/// the same key, so callers racing through the existence check converge on
/// one document.
pub mod natural_key {
    use super::Uuid;

    const SEPARATOR: char = '\u{1f}';

    fn derive(kind: &str, parts: &[&str]) -> String {
        let mut name = kind.to_string();
        for part in parts {
            name.push(SEPARATOR);
            name.push_str(part);
        }
        Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes())
            .simple()
            .to_string()
    }

    #[must_use]
    pub fn media(title_zh: &str, release_date: &str) -> String {
        derive("media", &[title_zh, release_date])
    }

    #[must_use]
    pub fn media_source(source_id: &str) -> String {
        derive("media_source", &[source_id])
    }

    #[must_use]
    pub fn collection(user_id: &str, media_id: &str) -> String {
        derive("collection", &[user_id, media_id])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn natural_keys_are_stable_and_distinct() {
        let a = natural_key::media("葬送的芙莉莲", "2023-09-29");
        assert_eq!(a, natural_key::media("葬送的芙莉莲", "2023-09-29"));
        assert_ne!(a, natural_key::media("葬送的芙莉莲", "2023-09-30"));
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn natural_key_parts_do_not_run_together() {
        assert_ne!(
            natural_key::collection("ab", "c"),
            natural_key::collection("a", "bc")
        );
        assert_ne!(natural_key::media_source("x"), natural_key::media("x", ""));
    }

    #[test]
    fn sync_error_display() {
        let err = SyncError::not_found("media_source", "35235192");
        assert_eq!(err.to_string(), "media_source not found: 35235192");
        assert!(err.is_not_found());
        assert!(!SyncError::NotSignedIn.is_not_found());
    }
}
