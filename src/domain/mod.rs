//! Strongly typed identifiers.
//!
//! Media and user ids are both opaque strings assigned by the backend. The
//! newtypes keep them from being swapped in call sites such as
//! `set_watch_status(user_id, media_id, ..)`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Document id of a `media` record.
///
/// # Examples
///
/// ```rust
/// use dramatracker::domain::MediaId;
///
/// let id = MediaId::new("65f1c0de");
/// assert_eq!(id.as_str(), "65f1c0de");
/// assert_eq!(id.to_string(), "65f1c0de");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaId(String);

impl MediaId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for MediaId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for MediaId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Account id of a user (not the id of their user document).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_serialize_as_plain_strings() {
        let id = MediaId::new("m1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"m1\"");

        let user: UserId = serde_json::from_str("\"u1\"").unwrap();
        assert_eq!(user, UserId::from("u1"));
    }
}
