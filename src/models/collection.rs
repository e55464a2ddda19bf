use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp layout of `added_time`, always UTC.
pub const ADDED_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

#[must_use]
pub fn format_added_time(at: DateTime<Utc>) -> String {
    at.format(ADDED_TIME_FORMAT).to_string()
}

/// Fields of a `collections` document: one user's list entry for one media.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionRecord {
    pub user_id: String,
    pub media_id: String,
    pub added_time: String,
    #[serde(default)]
    pub watch_status: bool,
    #[serde(default)]
    pub notes: String,
}

impl CollectionRecord {
    /// A fresh, unwatched entry stamped with `added_at`.
    #[must_use]
    pub fn new(user_id: &str, media_id: &str, added_at: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            media_id: media_id.to_string(),
            added_time: format_added_time(added_at),
            watch_status: false,
            notes: String::new(),
        }
    }
}

/// A collection entry together with its document id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionEntry {
    pub id: String,
    #[serde(flatten)]
    pub record: CollectionRecord,
}
