use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::services::retry::RetryPolicy;
use crate::store::StoreLayout;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub appwrite: AppwriteConfig,

    pub sync: SyncConfig,

    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: String,

    /// Emit log lines as JSON objects instead of plain text.
    pub log_json: bool,

    /// File holding the persisted session cookie between CLI invocations.
    pub session_path: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_json: false,
            session_path: "session.json".to_string(),
            worker_threads: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppwriteConfig {
    pub endpoint: String,

    pub project_id: String,

    pub database_id: String,

    /// Accept self-signed TLS certificates (self-hosted instances).
    pub self_signed: bool,

    /// Request timeout in seconds (default: 30)
    pub request_timeout_seconds: u32,

    pub collections: CollectionIdsConfig,
}

impl Default for AppwriteConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://cloud.appwrite.io/v1".to_string(),
            project_id: String::new(),
            database_id: String::new(),
            self_signed: false,
            request_timeout_seconds: 30,
            collections: CollectionIdsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionIdsConfig {
    pub users: String,

    pub media: String,

    pub media_source: String,

    pub collections: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Attempts made when creating the user document at registration.
    pub user_document_attempts: u32,

    /// Fixed delay between those attempts, in milliseconds.
    pub user_document_retry_delay_ms: u64,

    /// Page size used when the reconciler walks whole collections.
    pub reconcile_page_size: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            user_document_attempts: 3,
            user_document_retry_delay_ms: 1000,
            reconcile_page_size: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub enabled: bool,

    pub reconcile_interval_minutes: u32,

    pub cron_expression: Option<String>,

    /// Report what reconciliation would delete without deleting it.
    pub dry_run: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            reconcile_interval_minutes: 60,
            cron_expression: None,
            dry_run: false,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        let mut config = None;
        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                config = Some(Self::load_from_path(path)?);
                break;
            }
        }

        let mut config = config.unwrap_or_else(|| {
            info!("No config file found, using defaults");
            Self::default()
        });
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Applies `APPWRITE_*` variables from the process environment or a `.env` file.
    pub fn apply_env_overrides(&mut self) {
        if let Err(e) = dotenvy::dotenv()
            && !e.not_found()
        {
            tracing::warn!(error = %e, "Failed to read .env file");
        }

        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let appwrite = &mut self.appwrite;
        let targets: [(&str, &mut String); 7] = [
            ("APPWRITE_ENDPOINT", &mut appwrite.endpoint),
            ("APPWRITE_PROJECT_ID", &mut appwrite.project_id),
            ("APPWRITE_DATABASE_ID", &mut appwrite.database_id),
            ("APPWRITE_COLLECTION_USERS_ID", &mut appwrite.collections.users),
            ("APPWRITE_COLLECTION_MEDIA_ID", &mut appwrite.collections.media),
            (
                "APPWRITE_COLLECTION_MEDIA_SOURCE_ID",
                &mut appwrite.collections.media_source,
            ),
            (
                "APPWRITE_COLLECTION_COLLECTIONS_ID",
                &mut appwrite.collections.collections,
            ),
        ];

        for (key, target) in targets {
            if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
                *target = value;
            }
        }
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        paths.push(PathBuf::from("config.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("dramatracker").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".dramatracker").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    /// Every Appwrite identifier must be present before any store call is made.
    pub fn validate(&self) -> Result<()> {
        let appwrite = &self.appwrite;
        let required = [
            ("appwrite.endpoint", &appwrite.endpoint),
            ("appwrite.project_id", &appwrite.project_id),
            ("appwrite.database_id", &appwrite.database_id),
            ("appwrite.collections.users", &appwrite.collections.users),
            ("appwrite.collections.media", &appwrite.collections.media),
            (
                "appwrite.collections.media_source",
                &appwrite.collections.media_source,
            ),
            (
                "appwrite.collections.collections",
                &appwrite.collections.collections,
            ),
        ];

        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(key, _)| *key)
            .collect();

        if !missing.is_empty() {
            anyhow::bail!("Missing required configuration: {}", missing.join(", "));
        }

        url::Url::parse(&appwrite.endpoint)
            .with_context(|| format!("Invalid Appwrite endpoint: {}", appwrite.endpoint))?;

        if self.sync.user_document_attempts == 0 {
            anyhow::bail!("sync.user_document_attempts must be at least 1");
        }

        if self.scheduler.enabled
            && self.scheduler.reconcile_interval_minutes == 0
            && self.scheduler.cron_expression.is_none()
        {
            anyhow::bail!("Scheduler interval must be > 0 or cron expression must be set");
        }

        Ok(())
    }

    #[must_use]
    pub fn store_layout(&self) -> StoreLayout {
        let collections = &self.appwrite.collections;
        StoreLayout {
            database_id: self.appwrite.database_id.clone(),
            users: collections.users.clone(),
            media: collections.media.clone(),
            media_source: collections.media_source.clone(),
            collections: collections.collections.clone(),
        }
    }

    #[must_use]
    pub const fn user_document_retry(&self) -> RetryPolicy {
        RetryPolicy::fixed(
            self.sync.user_document_attempts,
            Duration::from_millis(self.sync.user_document_retry_delay_ms),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn populated() -> Config {
        let mut config = Config::default();
        config.appwrite.project_id = "project".to_string();
        config.appwrite.database_id = "db".to_string();
        config.appwrite.collections = CollectionIdsConfig {
            users: "users".to_string(),
            media: "media".to_string(),
            media_source: "media_source".to_string(),
            collections: "collections".to_string(),
        };
        config
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.appwrite.endpoint, "https://cloud.appwrite.io/v1");
        assert_eq!(config.sync.user_document_attempts, 3);
        assert_eq!(config.sync.user_document_retry_delay_ms, 1000);
        assert_eq!(config.scheduler.reconcile_interval_minutes, 60);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[appwrite]"));
        assert!(toml_str.contains("[appwrite.collections]"));
        assert!(toml_str.contains("[scheduler]"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [general]
            log_level = "debug"

            [appwrite]
            project_id = "dramatracker"

            [appwrite.collections]
            media = "media-col"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.appwrite.project_id, "dramatracker");
        assert_eq!(config.appwrite.collections.media, "media-col");

        assert_eq!(config.appwrite.endpoint, "https://cloud.appwrite.io/v1");
    }

    #[test]
    fn validate_reports_every_missing_key() {
        let err = Config::default().validate().unwrap_err().to_string();
        assert!(err.contains("appwrite.project_id"));
        assert!(err.contains("appwrite.database_id"));
        assert!(err.contains("appwrite.collections.media_source"));
    }

    #[test]
    fn validate_accepts_populated_config() {
        assert!(populated().validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_endpoint() {
        let mut config = populated();
        config.appwrite.endpoint = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn env_overrides_replace_non_empty_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("APPWRITE_PROJECT_ID", "from-env"),
            ("APPWRITE_COLLECTION_MEDIA_SOURCE_ID", "sources"),
            ("APPWRITE_DATABASE_ID", "  "),
        ]);

        let mut config = populated();
        config.apply_overrides(|key| env.get(key).map(ToString::to_string));

        assert_eq!(config.appwrite.project_id, "from-env");
        assert_eq!(config.appwrite.collections.media_source, "sources");
        assert_eq!(config.appwrite.database_id, "db");
    }

    #[test]
    fn store_layout_mirrors_collection_ids() {
        let layout = populated().store_layout();
        assert_eq!(layout.database_id, "db");
        assert_eq!(layout.media_source, "media_source");
        assert_eq!(layout.collections, "collections");
    }
}
