use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use url::Url;

use crate::config::AppwriteConfig;
use crate::store::{
    Account, AccountApi, Document, DocumentStore, Fields, Query, Session, StoreError,
};

const PROJECT_HEADER: &str = "X-Appwrite-Project";
const RESPONSE_FORMAT_HEADER: &str = "X-Appwrite-Response-Format";
const RESPONSE_FORMAT: &str = "1.5.0";
const FALLBACK_COOKIES_HEADER: &str = "X-Fallback-Cookies";

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default, rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct DocumentList {
    #[serde(default)]
    documents: Vec<Fields>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedSession {
    fallback_cookies: Option<String>,
}

/// HTTPS client for an Appwrite project.
///
/// Serves both [`DocumentStore`] and [`AccountApi`]. The session cookie lives in
/// reqwest's cookie store; the `X-Fallback-Cookies` value is kept alongside it
/// and written to `session_path` so later processes reuse the session.
pub struct AppwriteClient {
    client: Client,
    endpoint: String,
    session_path: Option<PathBuf>,
    fallback_cookies: RwLock<Option<String>>,
}

impl AppwriteClient {
    pub fn new(
        config: &AppwriteConfig,
        session_path: Option<PathBuf>,
    ) -> Result<Self, StoreError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            PROJECT_HEADER,
            HeaderValue::from_str(&config.project_id)
                .map_err(|e| StoreError::Transport(format!("invalid project id: {e}")))?,
        );
        headers.insert(
            RESPONSE_FORMAT_HEADER,
            HeaderValue::from_static(RESPONSE_FORMAT),
        );

        let client = Client::builder()
            .cookie_store(true)
            .user_agent(concat!("DramaTracker/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(Duration::from_secs(u64::from(config.request_timeout_seconds)))
            .danger_accept_invalid_certs(config.self_signed)
            .build()?;

        let fallback_cookies = session_path.as_deref().and_then(load_session);
        if fallback_cookies.is_some() {
            debug!("Restored persisted session");
        }

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            session_path,
            fallback_cookies: RwLock::new(fallback_cookies),
        })
    }

    fn url(&self, path: &str) -> Result<Url, StoreError> {
        Url::parse(&format!("{}{path}", self.endpoint))
            .map_err(|e| StoreError::Transport(format!("invalid URL {path}: {e}")))
    }

    fn documents_path(database_id: &str, collection_id: &str) -> String {
        format!(
            "/databases/{}/collections/{}/documents",
            urlencoding::encode(database_id),
            urlencoding::encode(collection_id)
        )
    }

    fn document_path(database_id: &str, collection_id: &str, document_id: &str) -> String {
        format!(
            "{}/{}",
            Self::documents_path(database_id, collection_id),
            urlencoding::encode(document_id)
        )
    }

    async fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match self.fallback_cookies.read().await.as_deref() {
            Some(cookies) => builder.header(FALLBACK_COOKIES_HEADER, cookies),
            None => builder,
        }
    }

    /// Sends the request, remembering any fallback cookies the server hands out.
    async fn send(&self, builder: RequestBuilder) -> Result<Response, StoreError> {
        let response = builder.send().await?;

        if let Some(cookies) = response
            .headers()
            .get(FALLBACK_COOKIES_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty() && *v != "[]")
        {
            self.remember_session(Some(cookies.to_string())).await;
        }

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(map_error(status, &body))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<T, StoreError> {
        let response = self.send(builder).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            let truncated: String = text.chars().take(500).collect();
            debug!(error = %e, response = %truncated, "Failed to parse Appwrite response");
            StoreError::Decode(e.to_string())
        })
    }

    async fn remember_session(&self, cookies: Option<String>) {
        let mut current = self.fallback_cookies.write().await;
        if *current == cookies {
            return;
        }
        current.clone_from(&cookies);
        drop(current);

        if let Some(path) = &self.session_path
            && let Err(e) = save_session(path, cookies).await
        {
            warn!(path = %path.display(), error = %e, "Failed to persist session");
        }
    }
}

fn load_session(path: &Path) -> Option<String> {
    let content = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str::<PersistedSession>(&content) {
        Ok(session) => session.fallback_cookies,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring unreadable session file");
            None
        }
    }
}

async fn save_session(path: &Path, fallback_cookies: Option<String>) -> std::io::Result<()> {
    if fallback_cookies.is_none() {
        return match tokio::fs::remove_file(path).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        };
    }

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }
    let content = serde_json::to_string(&PersistedSession { fallback_cookies })?;
    tokio::fs::write(path, content).await
}

/// Maps an Appwrite error response onto [`StoreError`].
fn map_error(status: StatusCode, body: &str) -> StoreError {
    let parsed: Option<ErrorBody> = serde_json::from_str(body).ok();
    let message = match parsed {
        Some(ErrorBody { message, kind }) if !kind.is_empty() => format!("{message} ({kind})"),
        Some(ErrorBody { message, .. }) if !message.is_empty() => message,
        _ => body.chars().take(200).collect(),
    };

    match status {
        StatusCode::NOT_FOUND => StoreError::NotFound(message),
        StatusCode::CONFLICT => StoreError::Conflict(message),
        StatusCode::UNAUTHORIZED => StoreError::Unauthorized(message),
        _ => StoreError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

/// Splits a raw Appwrite document into its id and user fields.
fn parse_document(mut raw: Fields) -> Result<Document, StoreError> {
    let id = match raw.remove("$id") {
        Some(Value::String(id)) => id,
        _ => return Err(StoreError::Decode("document without $id".to_string())),
    };
    raw.retain(|key, _| !key.starts_with('$'));
    Ok(Document { id, data: raw })
}

#[async_trait::async_trait]
impl DocumentStore for AppwriteClient {
    async fn list_documents(
        &self,
        database_id: &str,
        collection_id: &str,
        queries: &[Query],
    ) -> Result<Vec<Document>, StoreError> {
        let mut url = self.url(&Self::documents_path(database_id, collection_id))?;
        {
            let mut pairs = url.query_pairs_mut();
            for query in queries {
                pairs.append_pair("queries[]", &query.to_json().to_string());
            }
        }

        debug!(collection = collection_id, queries = queries.len(), "Listing documents");
        let list: DocumentList = self.send_json(self.request(Method::GET, url).await).await?;
        list.documents.into_iter().map(parse_document).collect()
    }

    async fn create_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: &str,
        data: Fields,
    ) -> Result<Document, StoreError> {
        let url = self.url(&Self::documents_path(database_id, collection_id))?;
        let body = json!({ "documentId": document_id, "data": data });

        debug!(collection = collection_id, id = document_id, "Creating document");
        let raw: Fields = self
            .send_json(self.request(Method::POST, url).await.json(&body))
            .await?;
        parse_document(raw)
    }

    async fn update_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: &str,
        data: Fields,
    ) -> Result<Document, StoreError> {
        let url = self.url(&Self::document_path(database_id, collection_id, document_id))?;
        let body = json!({ "data": data });

        debug!(collection = collection_id, id = document_id, "Updating document");
        let raw: Fields = self
            .send_json(self.request(Method::PATCH, url).await.json(&body))
            .await?;
        parse_document(raw)
    }

    async fn delete_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: &str,
    ) -> Result<(), StoreError> {
        let url = self.url(&Self::document_path(database_id, collection_id, document_id))?;

        debug!(collection = collection_id, id = document_id, "Deleting document");
        self.send(self.request(Method::DELETE, url).await).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl AccountApi for AppwriteClient {
    async fn create_account(
        &self,
        user_id: &str,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<Account, StoreError> {
        let url = self.url("/account")?;
        let body = json!({
            "userId": user_id,
            "email": email,
            "password": password,
            "name": name,
        });
        self.send_json(self.request(Method::POST, url).await.json(&body))
            .await
    }

    async fn create_email_session(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, StoreError> {
        let url = self.url("/account/sessions/email")?;
        let body = json!({ "email": email, "password": password });
        self.send_json(self.request(Method::POST, url).await.json(&body))
            .await
    }

    async fn delete_current_session(&self) -> Result<(), StoreError> {
        let url = self.url("/account/sessions/current")?;
        let result = self.send(self.request(Method::DELETE, url).await).await;

        // The stored cookie is useless after either outcome.
        self.remember_session(None).await;
        result.map(|_| ())
    }

    async fn current_account(&self) -> Result<Option<Account>, StoreError> {
        let url = self.url("/account")?;
        match self.send_json(self.request(Method::GET, url).await).await {
            Ok(account) => Ok(Some(account)),
            Err(StoreError::Unauthorized(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
