pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{AuthError, AuthService};
pub use auth_service_impl::StoreAuthService;

pub mod collection_service;
pub mod collection_service_impl;
pub use collection_service::{AddOutcome, CollectionService, SyncError};
pub use collection_service_impl::StoreCollectionService;

pub mod dispatch;
pub use dispatch::TaskScope;

pub mod reconcile;
pub use reconcile::{ReconcileReport, Reconciler};

pub mod retry;
pub use retry::{RetryPolicy, retry_fixed};
