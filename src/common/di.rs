use std::sync::Arc;

use crate::application::ports::trash_ports::TrashUseCase;
use crate::application::services::trash_service::TrashService;
use crate::common::config::AppConfig;
use crate::common::db::create_database_pool;
use crate::domain::repositories::document_store::DocumentStore;
use crate::infrastructure::repositories::memory_document_store::MemoryDocumentStore;
use crate::infrastructure::repositories::pg::DocumentPgRepository;

/// Builds the document store and the services on top of it
pub struct AppServiceFactory {
    config: AppConfig,
}

impl AppServiceFactory {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// PostgreSQL when a connection string is configured, in-memory otherwise
    pub async fn create_document_store(&self) -> anyhow::Result<Arc<dyn DocumentStore>> {
        if self.config.database.connection_string.is_none() {
            tracing::warn!("PORTAL_DB_URL not set, using the in-memory document store");
            return Ok(Arc::new(MemoryDocumentStore::new()));
        }

        let pool = Arc::new(create_database_pool(&self.config).await?);
        let store = DocumentPgRepository::connect(pool).await?;
        tracing::info!("PostgreSQL document store initialized");
        Ok(Arc::new(store))
    }

    pub fn create_trash_service(&self, store: Arc<dyn DocumentStore>) -> Arc<dyn TrashUseCase> {
        Arc::new(TrashService::new(store))
    }
}

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub trash_service: Arc<dyn TrashUseCase>,
}

impl AppState {
    pub fn new(trash_service: Arc<dyn TrashUseCase>) -> Self {
        Self { trash_service }
    }
}
