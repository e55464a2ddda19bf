use serde::{Deserialize, Serialize};

/// Rating value used by search providers for "no rating".
pub const UNRATED: f64 = -1.0;

const fn unrated() -> f64 {
    UNRATED
}

/// A title as returned by one of the search providers.
///
/// Optional text fields arrive exactly as scraped, so they may be blank or the
/// literal string `"null"`; ratings use [`UNRATED`] when unknown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// douban / imdb / bgm / tmdb
    pub source_type: String,
    pub source_id: String,
    pub source_url: String,

    /// movie / tv / anime
    pub media_type: String,
    pub title_zh: String,
    #[serde(default)]
    pub title_original: String,
    /// Full first-air date.
    pub release_date: String,
    /// Minutes for films, episode count for series.
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub poster_url: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub staff: Option<String>,

    #[serde(default = "unrated")]
    pub rating: f64,
    #[serde(default = "unrated")]
    pub rating_douban: f64,
    #[serde(default = "unrated")]
    pub rating_imdb: f64,
    #[serde(default = "unrated")]
    pub rating_bangumi: f64,

    #[serde(default)]
    pub is_collected: bool,
}

impl SearchResult {
    /// Minimal result with every optional field empty and every rating unknown.
    #[must_use]
    pub fn new(
        source_type: impl Into<String>,
        source_id: impl Into<String>,
        title_zh: impl Into<String>,
        release_date: impl Into<String>,
    ) -> Self {
        Self {
            source_type: source_type.into(),
            source_id: source_id.into(),
            source_url: String::new(),
            media_type: String::new(),
            title_zh: title_zh.into(),
            title_original: String::new(),
            release_date: release_date.into(),
            duration: None,
            year: None,
            poster_url: String::new(),
            summary: None,
            staff: None,
            rating: UNRATED,
            rating_douban: UNRATED,
            rating_imdb: UNRATED,
            rating_bangumi: UNRATED,
            is_collected: false,
        }
    }

    /// Year taken from the explicit field, or else the leading digits of the release date.
    #[must_use]
    pub fn display_year(&self) -> Option<&str> {
        self.year
            .as_deref()
            .filter(|y| !y.trim().is_empty())
            .or_else(|| self.release_date.get(..4))
            .filter(|y| y.chars().all(|c| c.is_ascii_digit()))
    }
}
