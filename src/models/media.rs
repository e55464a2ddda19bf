use serde::{Deserialize, Serialize};

use super::search_result::SearchResult;

/// Ratings outside `[0, 10]` (NaN included) are treated as unknown.
#[must_use]
pub fn sanitize_rating(rating: f64) -> Option<f64> {
    (0.0..=10.0).contains(&rating).then_some(rating)
}

/// Blank text and the scraped literal `"null"` are treated as missing.
#[must_use]
pub fn sanitize_text(text: Option<&str>) -> Option<String> {
    text.filter(|t| !t.trim().is_empty() && *t != "null")
        .map(ToString::to_string)
}

/// Fields of a `media` document.
///
/// Absent optional values serialize as explicit `null`s so the stored
/// document never carries a stale or out-of-range value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaRecord {
    pub media_type: String,
    pub title_zh: String,
    #[serde(default)]
    pub title_origin: String,
    pub release_date: String,
    #[serde(default)]
    pub poster_url: String,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub staff: Option<String>,
    #[serde(default)]
    pub rating_douban: Option<f64>,
    #[serde(default)]
    pub rating_imdb: Option<f64>,
    #[serde(default)]
    pub rating_bangumi: Option<f64>,
}

impl From<&SearchResult> for MediaRecord {
    fn from(result: &SearchResult) -> Self {
        Self {
            media_type: result.media_type.clone(),
            title_zh: result.title_zh.clone(),
            title_origin: result.title_original.clone(),
            release_date: result.release_date.clone(),
            poster_url: result.poster_url.clone(),
            duration: sanitize_text(result.duration.as_deref()),
            summary: sanitize_text(result.summary.as_deref()),
            staff: sanitize_text(result.staff.as_deref()),
            rating_douban: sanitize_rating(result.rating_douban),
            rating_imdb: sanitize_rating(result.rating_imdb),
            rating_bangumi: sanitize_rating(result.rating_bangumi),
        }
    }
}

/// Fields of a `media_source` document linking a media to where it was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaSourceRecord {
    pub media_id: String,
    pub source_type: String,
    pub source_id: String,
    #[serde(default)]
    pub source_url: String,
}

impl MediaSourceRecord {
    #[must_use]
    pub fn new(media_id: &str, result: &SearchResult) -> Self {
        Self {
            media_id: media_id.to_string(),
            source_type: result.source_type.clone(),
            source_id: result.source_id.clone(),
            source_url: result.source_url.clone(),
        }
    }
}
