//! [`CollectionService`] over the [`DocumentStore`] and [`AccountApi`] facades.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::domain::{MediaId, UserId};
use crate::models::{
    CollectionEntry, CollectionRecord, MediaRecord, MediaSourceRecord, SearchResult,
};
use crate::services::collection_service::{
    AddOutcome, CollectionService, SyncError, natural_key,
};
use crate::store::{AccountApi, Document, DocumentStore, Fields, Query, StoreLayout, list_all};

const LIST_PAGE_SIZE: u32 = 100;

pub struct StoreCollectionService {
    store: Arc<dyn DocumentStore>,
    accounts: Arc<dyn AccountApi>,
    layout: StoreLayout,
}

impl StoreCollectionService {
    #[must_use]
    pub fn new(
        store: Arc<dyn DocumentStore>,
        accounts: Arc<dyn AccountApi>,
        layout: StoreLayout,
    ) -> Self {
        Self {
            store,
            accounts,
            layout,
        }
    }

    async fn find_first(
        &self,
        collection_id: &str,
        queries: &[Query],
    ) -> Result<Option<Document>, SyncError> {
        let mut queries = queries.to_vec();
        queries.push(Query::Limit(1));

        let docs = self
            .store
            .list_documents(&self.layout.database_id, collection_id, &queries)
            .await?;
        Ok(docs.into_iter().next())
    }

    /// Creates the document unless one with `document_id` already exists.
    ///
    /// Returns whether this call created it.
    async fn insert_if_absent(
        &self,
        collection_id: &str,
        document_id: &str,
        fields: Fields,
    ) -> Result<bool, SyncError> {
        match self
            .store
            .create_document(&self.layout.database_id, collection_id, document_id, fields)
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.is_conflict() => {
                debug!(
                    collection = collection_id,
                    id = document_id,
                    "Document created concurrently, reusing it"
                );
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn ensure_media(&self, result: &SearchResult) -> Result<(String, bool), SyncError> {
        let queries = [
            Query::equal("title_zh", result.title_zh.as_str()),
            Query::equal("release_date", result.release_date.as_str()),
        ];

        if let Some(existing) = self.find_first(&self.layout.media, &queries).await? {
            debug!(media_id = %existing.id, "Media exists");
            return Ok((existing.id, false));
        }

        let media_id = natural_key::media(&result.title_zh, &result.release_date);
        let record = MediaRecord::from(result);
        debug!(media_id = %media_id, ?record, "Inserting media");
        let created = self
            .insert_if_absent(&self.layout.media, &media_id, to_fields(&record)?)
            .await?;
        Ok((media_id, created))
    }

    async fn ensure_media_source(
        &self,
        media_id: &str,
        result: &SearchResult,
    ) -> Result<bool, SyncError> {
        let queries = [Query::equal("source_id", result.source_id.as_str())];
        if self
            .find_first(&self.layout.media_source, &queries)
            .await?
            .is_some()
        {
            debug!(source_id = %result.source_id, "Media source exists, skipping insertion");
            return Ok(false);
        }

        let record = MediaSourceRecord::new(media_id, result);
        self.insert_if_absent(
            &self.layout.media_source,
            &natural_key::media_source(&result.source_id),
            to_fields(&record)?,
        )
        .await
    }

    async fn ensure_collection(&self, user_id: &str, media_id: &str) -> Result<bool, SyncError> {
        if self.find_collection(user_id, media_id).await?.is_some() {
            debug!(user_id, media_id, "Collection entry exists, skipping insertion");
            return Ok(false);
        }

        let record = CollectionRecord::new(user_id, media_id, Utc::now());
        self.insert_if_absent(
            &self.layout.collections,
            &natural_key::collection(user_id, media_id),
            to_fields(&record)?,
        )
        .await
    }

    async fn find_collection(
        &self,
        user_id: &str,
        media_id: &str,
    ) -> Result<Option<Document>, SyncError> {
        let queries = [
            Query::equal("user_id", user_id),
            Query::equal("media_id", media_id),
        ];
        self.find_first(&self.layout.collections, &queries).await
    }
}

fn to_fields<T: Serialize>(record: &T) -> Result<Fields, SyncError> {
    match serde_json::to_value(record).map_err(crate::store::StoreError::from)? {
        Value::Object(fields) => Ok(fields),
        other => Err(SyncError::InvalidDocument {
            id: String::new(),
            reason: format!("expected an object, got {other}"),
        }),
    }
}

fn required_str<'a>(doc: &'a Document, field: &str) -> Result<&'a str, SyncError> {
    doc.get_str(field)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| SyncError::InvalidDocument {
            id: doc.id.clone(),
            reason: format!("missing {field}"),
        })
}

#[async_trait::async_trait]
impl CollectionService for StoreCollectionService {
    async fn try_add_to_collection(
        &self,
        result: &SearchResult,
        user_id: &UserId,
    ) -> Result<AddOutcome, SyncError> {
        debug!(
            source_id = %result.source_id,
            title = %result.title_zh,
            release_date = %result.release_date,
            user_id = %user_id,
            "Adding to collection"
        );

        let (media_id, media_created) = self.ensure_media(result).await?;
        let source_created = self.ensure_media_source(&media_id, result).await?;
        let collection_created = self.ensure_collection(user_id.as_str(), &media_id).await?;

        info!(
            media_id = %media_id,
            media_created,
            source_created,
            collection_created,
            "Added to collection"
        );

        Ok(AddOutcome {
            media_id: MediaId::new(media_id),
            media_created,
            source_created,
            collection_created,
        })
    }

    async fn try_remove_from_collection(&self, source_id: &str) -> Result<(), SyncError> {
        let source = self
            .find_first(
                &self.layout.media_source,
                &[Query::equal("source_id", source_id)],
            )
            .await?
            .ok_or_else(|| SyncError::not_found("media_source", source_id))?;
        let media_id = required_str(&source, "media_id")?;

        let account = self
            .accounts
            .current_account()
            .await?
            .ok_or(SyncError::NotSignedIn)?;

        let entry = self
            .find_collection(&account.id, media_id)
            .await?
            .ok_or_else(|| {
                SyncError::not_found("collection", format!("{}/{media_id}", account.id))
            })?;

        self.store
            .delete_document(&self.layout.database_id, &self.layout.collections, &entry.id)
            .await?;

        info!(source_id, media_id, collection_id = %entry.id, "Removed from collection");
        Ok(())
    }

    async fn try_remove_by_collection_id(&self, collection_id: &str) -> Result<(), SyncError> {
        let entry = self
            .find_first(&self.layout.collections, &[Query::id(collection_id)])
            .await?
            .ok_or_else(|| SyncError::not_found("collection", collection_id))?;
        let media_id = required_str(&entry, "media_id")?;

        let source = self
            .find_first(
                &self.layout.media_source,
                &[Query::equal("media_id", media_id)],
            )
            .await?
            .ok_or_else(|| SyncError::not_found("media_source", media_id))?;
        let source_id = required_str(&source, "source_id")?;

        debug!(collection_id, source_id, "Resolved source for collection entry");
        self.try_remove_from_collection(source_id).await
    }

    async fn try_set_watch_status(
        &self,
        user_id: &UserId,
        media_id: &MediaId,
        watched: bool,
    ) -> Result<(), SyncError> {
        let entry = self
            .find_collection(user_id.as_str(), media_id.as_str())
            .await?
            .ok_or_else(|| SyncError::not_found("collection", format!("{user_id}/{media_id}")))?;

        let mut fields = Fields::new();
        fields.insert("watch_status".to_string(), Value::Bool(watched));
        self.store
            .update_document(
                &self.layout.database_id,
                &self.layout.collections,
                &entry.id,
                fields,
            )
            .await?;

        info!(collection_id = %entry.id, watched, "Updated watch status");
        Ok(())
    }

    async fn is_source_collected(&self, source_id: &str) -> Result<bool, SyncError> {
        let source = self
            .find_first(
                &self.layout.media_source,
                &[Query::equal("source_id", source_id)],
            )
            .await?;
        Ok(source.is_some())
    }

    async fn list_user_collections(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<CollectionEntry>, SyncError> {
        let docs = list_all(
            self.store.as_ref(),
            &self.layout.database_id,
            &self.layout.collections,
            &[Query::equal("user_id", user_id.as_str())],
            LIST_PAGE_SIZE,
        )
        .await?;

        docs.into_iter()
            .map(|doc| -> Result<CollectionEntry, SyncError> {
                Ok(CollectionEntry {
                    record: doc.decode()?,
                    id: doc.id,
                })
            })
            .collect()
    }

    async fn get_media(&self, media_id: &MediaId) -> Result<Option<MediaRecord>, SyncError> {
        let doc = self
            .find_first(&self.layout.media, &[Query::id(media_id.as_str())])
            .await?;
        Ok(doc.map(|d| d.decode()).transpose()?)
    }
}
