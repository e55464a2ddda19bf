//! Cleanup pass over the media, media source and collection documents.
//!
//! Adding to a collection is not transactional, so an interrupted add can
//! leave rows behind and older clients could insert duplicates. The
//! reconciler finds both and deletes what can be deleted safely.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::services::collection_service::SyncError;
use crate::store::{Document, DocumentStore, StoreError, StoreLayout, list_all};

const DELETE_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub dry_run: bool,
    pub orphaned_sources: usize,
    pub orphaned_collections: usize,
    pub duplicate_sources: usize,
    pub duplicate_collections: usize,
    /// Counted only; the rows pointing at them are left alone.
    pub duplicate_media: usize,
    pub deleted: usize,
    pub failed: usize,
}

impl ReconcileReport {
    #[must_use]
    pub const fn removable(&self) -> usize {
        self.orphaned_sources
            + self.orphaned_collections
            + self.duplicate_sources
            + self.duplicate_collections
    }
}

impl fmt::Display for ReconcileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "orphaned sources: {}, orphaned collections: {}, duplicate sources: {}, \
             duplicate collections: {}, duplicate media: {}, deleted: {}, failed: {}",
            self.orphaned_sources,
            self.orphaned_collections,
            self.duplicate_sources,
            self.duplicate_collections,
            self.duplicate_media,
            self.deleted,
            self.failed
        )?;
        if self.dry_run {
            write!(f, " (dry run)")?;
        }
        Ok(())
    }
}

pub struct Reconciler {
    store: Arc<dyn DocumentStore>,
    layout: StoreLayout,
    page_size: u32,
}

impl Reconciler {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, layout: StoreLayout, page_size: u32) -> Self {
        Self {
            store,
            layout,
            page_size,
        }
    }

    async fn list(&self, collection_id: &str) -> Result<Vec<Document>, StoreError> {
        list_all(
            self.store.as_ref(),
            &self.layout.database_id,
            collection_id,
            &[],
            self.page_size,
        )
        .await
    }

    pub async fn run(&self, dry_run: bool) -> Result<ReconcileReport, SyncError> {
        info!(dry_run, "Starting reconciliation");

        // Media is never deleted and must be listed after its children, so a
        // row added mid-pass still finds its parent.
        let sources = self.list(&self.layout.media_source).await?;
        let collections = self.list(&self.layout.collections).await?;
        let media = self.list(&self.layout.media).await?;
        debug!(
            media = media.len(),
            sources = sources.len(),
            collections = collections.len(),
            "Loaded documents"
        );

        let media_ids: HashSet<&str> = media.iter().map(|m| m.id.as_str()).collect();
        let mut report = ReconcileReport {
            dry_run,
            duplicate_media: count_duplicate_media(&media),
            ..ReconcileReport::default()
        };

        let (orphaned, duplicates) = stale_sources(&sources, &media_ids);
        report.orphaned_sources = orphaned.len();
        report.duplicate_sources = duplicates.len();
        let stale_source_ids: Vec<String> = orphaned.into_iter().chain(duplicates).collect();

        let (orphaned, duplicates) = stale_collections(&collections, &media_ids);
        report.orphaned_collections = orphaned.len();
        report.duplicate_collections = duplicates.len();
        let stale_collection_ids: Vec<String> = orphaned.into_iter().chain(duplicates).collect();

        if report.duplicate_media > 0 {
            warn!(
                count = report.duplicate_media,
                "Duplicate media documents found, leaving them in place"
            );
        }

        if dry_run {
            info!(%report, "Reconciliation finished");
            return Ok(report);
        }

        let targets: Vec<(String, String)> = stale_source_ids
            .into_iter()
            .map(|id| (self.layout.media_source.clone(), id))
            .chain(
                stale_collection_ids
                    .into_iter()
                    .map(|id| (self.layout.collections.clone(), id)),
            )
            .collect();

        let outcomes: Vec<bool> = stream::iter(targets)
            .map(|(collection_id, document_id)| async move {
                self.delete(&collection_id, &document_id).await
            })
            .buffer_unordered(DELETE_CONCURRENCY)
            .collect()
            .await;

        report.deleted = outcomes.iter().filter(|ok| **ok).count();
        report.failed = outcomes.len() - report.deleted;

        info!(%report, "Reconciliation finished");
        Ok(report)
    }

    async fn delete(&self, collection_id: &str, document_id: &str) -> bool {
        match self
            .store
            .delete_document(&self.layout.database_id, collection_id, document_id)
            .await
        {
            Ok(()) => {
                debug!(
                    collection = collection_id,
                    id = document_id,
                    "Deleted stale document"
                );
                true
            }
            Err(StoreError::NotFound(_)) => {
                debug!(collection = collection_id, id = document_id, "Already gone");
                true
            }
            Err(e) => {
                warn!(
                    collection = collection_id,
                    id = document_id,
                    error = %e,
                    "Failed to delete stale document"
                );
                false
            }
        }
    }
}

fn count_duplicate_media(media: &[Document]) -> usize {
    let mut seen = HashSet::new();
    media
        .iter()
        .filter(|m| {
            let key = (
                m.get_str("title_zh").unwrap_or_default(),
                m.get_str("release_date").unwrap_or_default(),
            );
            !seen.insert(key)
        })
        .count()
}

/// Returns (orphaned, duplicate) source ids. The first listed source per
/// source id is kept.
fn stale_sources(sources: &[Document], media_ids: &HashSet<&str>) -> (Vec<String>, Vec<String>) {
    let mut orphaned = Vec::new();
    let mut duplicates = Vec::new();
    let mut seen = HashSet::new();

    for source in sources {
        let media_id = source.get_str("media_id").unwrap_or_default();
        if !media_ids.contains(media_id) {
            orphaned.push(source.id.clone());
        } else if !seen.insert(source.get_str("source_id").unwrap_or_default()) {
            duplicates.push(source.id.clone());
        }
    }

    (orphaned, duplicates)
}

/// Returns (orphaned, duplicate) collection ids. Per user and media the
/// earliest entry is kept, ties broken by id.
fn stale_collections(
    collections: &[Document],
    media_ids: &HashSet<&str>,
) -> (Vec<String>, Vec<String>) {
    let mut orphaned = Vec::new();
    let mut groups: HashMap<(&str, &str), Vec<&Document>> = HashMap::new();

    for entry in collections {
        let media_id = entry.get_str("media_id").unwrap_or_default();
        if media_ids.contains(media_id) {
            let user_id = entry.get_str("user_id").unwrap_or_default();
            groups.entry((user_id, media_id)).or_default().push(entry);
        } else {
            orphaned.push(entry.id.clone());
        }
    }

    let mut duplicates: Vec<String> = groups
        .into_values()
        .filter(|group| group.len() > 1)
        .flat_map(|mut group| {
            group.sort_by(|a, b| {
                let a_time = a.get_str("added_time").unwrap_or_default();
                let b_time = b.get_str("added_time").unwrap_or_default();
                a_time.cmp(b_time).then_with(|| a.id.cmp(&b.id))
            });
            group
                .into_iter()
                .skip(1)
                .map(|d| d.id.clone())
                .collect::<Vec<_>>()
        })
        .collect();
    duplicates.sort();

    (orphaned, duplicates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Fields;
    use serde_json::json;

    fn doc(id: &str, value: serde_json::Value) -> Document {
        let data: Fields = serde_json::from_value(value).unwrap();
        Document {
            id: id.to_string(),
            data,
        }
    }

    #[test]
    fn keeps_earliest_collection_entry() {
        let media_ids: HashSet<&str> = ["m1"].into_iter().collect();
        let collections = vec![
            doc(
                "c-late",
                json!({"user_id": "u1", "media_id": "m1", "added_time": "2024-05-02T00:00:00Z"}),
            ),
            doc(
                "c-early",
                json!({"user_id": "u1", "media_id": "m1", "added_time": "2024-05-01T00:00:00Z"}),
            ),
            doc(
                "c-other",
                json!({"user_id": "u2", "media_id": "m1", "added_time": "2024-05-03T00:00:00Z"}),
            ),
            doc(
                "c-orphan",
                json!({"user_id": "u1", "media_id": "gone", "added_time": "2024-05-01T00:00:00Z"}),
            ),
        ];

        let (orphaned, duplicates) = stale_collections(&collections, &media_ids);
        assert_eq!(orphaned, vec!["c-orphan"]);
        assert_eq!(duplicates, vec!["c-late"]);
    }

    #[test]
    fn keeps_first_listed_source() {
        let media_ids: HashSet<&str> = ["m1"].into_iter().collect();
        let sources = vec![
            doc("s1", json!({"media_id": "m1", "source_id": "35235192"})),
            doc("s2", json!({"media_id": "m1", "source_id": "35235192"})),
            doc("s3", json!({"source_id": "1"})),
        ];

        let (orphaned, duplicates) = stale_sources(&sources, &media_ids);
        assert_eq!(orphaned, vec!["s3"]);
        assert_eq!(duplicates, vec!["s2"]);
    }

    fn assert_send<T: Send>(_: T) {}

    #[test]
    fn run_future_is_send() {
        let store: Arc<dyn DocumentStore> = Arc::new(crate::store::InMemoryStore::new());
        let layout = StoreLayout {
            database_id: "db".to_string(),
            users: "users".to_string(),
            media: "media".to_string(),
            media_source: "media_source".to_string(),
            collections: "collections".to_string(),
        };
        let reconciler = Reconciler::new(store, layout, 25);
        assert_send(reconciler.run(false));
    }

    #[test]
    fn counts_duplicate_media() {
        let media = vec![
            doc("a", json!({"title_zh": "繁花", "release_date": "2023-12-27"})),
            doc("b", json!({"title_zh": "繁花", "release_date": "2023-12-27"})),
            doc("c", json!({"title_zh": "繁花", "release_date": "2024-01-01"})),
        ];
        assert_eq!(count_duplicate_media(&media), 1);
    }

    #[test]
    fn report_display_marks_dry_run() {
        let report = ReconcileReport {
            dry_run: true,
            orphaned_sources: 2,
            ..ReconcileReport::default()
        };
        assert_eq!(report.removable(), 2);
        assert!(report.to_string().ends_with("(dry run)"));
    }
}
