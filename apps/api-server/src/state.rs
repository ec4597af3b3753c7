//! Application state - shared across all handlers.

use std::sync::Arc;

use inkwell_core::error::StorageError;
use inkwell_core::ports::{BlogStore, FileStorage, PasswordService, TokenService};
use inkwell_core::services::{PolicyTable, PostService, UserService, ValidationPipeline};
use inkwell_infra::{
    Argon2PasswordService, DatabaseConfig, InMemoryStore, JwtTokenService, LocalFileStorage,
};

use crate::config::AppConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn BlogStore>,
    pub storage: Arc<dyn FileStorage>,
    pub tokens: Arc<dyn TokenService>,
    pub posts: Arc<PostService>,
    pub users: Arc<UserService>,
    /// Which store backs this instance, for the health report.
    pub store_kind: &'static str,
}

impl AppState {
    /// Build the application state with appropriate implementations.
    pub async fn new(config: &AppConfig) -> Result<Self, StorageError> {
        let (store, store_kind) = connect_store(config.database.as_ref()).await;
        let storage: Arc<dyn FileStorage> = Arc::new(LocalFileStorage::new(&config.upload_dir).await?);
        let tokens: Arc<dyn TokenService> =
            Arc::new(JwtTokenService::from_config(config.jwt.clone()));

        let state = Self::assemble(
            store,
            storage,
            tokens,
            Arc::new(Argon2PasswordService::new()),
        )
        .with_store_kind(store_kind);

        tracing::info!(store = store_kind, "Application state initialized");
        Ok(state)
    }

    /// Wire the services on top of already built adapters.
    pub fn assemble(
        store: Arc<dyn BlogStore>,
        storage: Arc<dyn FileStorage>,
        tokens: Arc<dyn TokenService>,
        passwords: Arc<dyn PasswordService>,
    ) -> Self {
        let validation = Arc::new(ValidationPipeline::new(
            store.clone(),
            PolicyTable::default(),
        ));

        Self {
            posts: Arc::new(PostService::new(
                store.clone(),
                storage.clone(),
                validation.clone(),
            )),
            users: Arc::new(UserService::new(store.clone(), passwords, validation)),
            store,
            storage,
            tokens,
            store_kind: "memory",
        }
    }

    fn with_store_kind(mut self, kind: &'static str) -> Self {
        self.store_kind = kind;
        self
    }
}

#[cfg(feature = "postgres")]
async fn connect_store(config: Option<&DatabaseConfig>) -> (Arc<dyn BlogStore>, &'static str) {
    use inkwell_infra::PostgresStore;
    use inkwell_infra::database::connect;

    let Some(config) = config else {
        tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
        return (Arc::new(InMemoryStore::new()), "memory");
    };

    match connect(config).await {
        Ok(db) => (Arc::new(PostgresStore::new(db)), "postgres"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to connect to database. Using in-memory fallback.");
            (Arc::new(InMemoryStore::new()), "memory")
        }
    }
}

#[cfg(not(feature = "postgres"))]
async fn connect_store(config: Option<&DatabaseConfig>) -> (Arc<dyn BlogStore>, &'static str) {
    if config.is_some() {
        tracing::warn!("DATABASE_URL ignored: built without the postgres feature");
    }
    tracing::info!("Running without postgres feature - using in-memory store");
    (Arc::new(InMemoryStore::new()), "memory")
}
