use serde::{Deserialize, Serialize};

const AVATAR_SERVICE: &str = "https://ui-avatars.com/api/";

/// Avatar stored on the user document at registration.
#[must_use]
pub fn registration_avatar_url(name: &str) -> String {
    format!("{AVATAR_SERVICE}?name={}", name.replace(' ', "+"))
}

/// Avatar shown when a user document exists but carries no avatar.
#[must_use]
pub fn fallback_avatar_url(name: &str) -> String {
    format!(
        "{AVATAR_SERVICE}?name={}&size=200&background=random&format=png&rounded=true",
        urlencoding::encode(name)
    )
}

/// Fields of a `users` document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDocument {
    pub user_id: String,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// The signed-in user as presented to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub avatar_url: String,
    /// Id of the backing user document, if one exists.
    pub document_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_avatar_joins_words_with_plus() {
        assert_eq!(
            registration_avatar_url("Lonely Drama Fan"),
            "https://ui-avatars.com/api/?name=Lonely+Drama+Fan"
        );
    }

    #[test]
    fn fallback_avatar_is_url_encoded() {
        let url = fallback_avatar_url("张 三");
        assert!(url.starts_with("https://ui-avatars.com/api/?name=%E5%BC%A0%20%E4%B8%89&"));
        assert!(url.ends_with("rounded=true"));
    }
}
