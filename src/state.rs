use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use crate::clients::AppwriteClient;
use crate::config::Config;
use crate::domain::UserId;
use crate::services::{
    AuthService, CollectionService, Reconciler, StoreAuthService, StoreCollectionService,
};
use crate::store::{AccountApi, DocumentStore};

/// Services wired to one backend, shared by the CLI commands and the daemon.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,

    pub auth: Arc<dyn AuthService>,

    pub collections: Arc<dyn CollectionService>,

    pub reconciler: Arc<Reconciler>,
}

impl AppState {
    /// Validates `config` and connects the services to Appwrite.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        config.validate()?;

        let session_path = Some(PathBuf::from(&config.general.session_path));
        let client = Arc::new(
            AppwriteClient::new(&config.appwrite, session_path)
                .context("Failed to build Appwrite client")?,
        );

        Ok(Self::with_backend(config, client.clone(), client))
    }

    /// Wires the services to an arbitrary store and account backend.
    #[must_use]
    pub fn with_backend(
        config: Config,
        store: Arc<dyn DocumentStore>,
        accounts: Arc<dyn AccountApi>,
    ) -> Self {
        let layout = config.store_layout();

        let auth = Arc::new(StoreAuthService::new(
            Arc::clone(&store),
            Arc::clone(&accounts),
            layout.clone(),
            config.user_document_retry(),
        ));
        let collections = Arc::new(StoreCollectionService::new(
            Arc::clone(&store),
            accounts,
            layout.clone(),
        ));
        let reconciler = Arc::new(Reconciler::new(
            store,
            layout,
            config.sync.reconcile_page_size,
        ));

        Self {
            config: Arc::new(config),
            auth,
            collections,
            reconciler,
        }
    }

    /// The signed-in user, or an error telling the caller to log in.
    pub async fn require_user(&self) -> anyhow::Result<UserId> {
        self.auth
            .current_user_id()
            .await?
            .context("Not signed in. Run `dramatracker login` first.")
    }
}
