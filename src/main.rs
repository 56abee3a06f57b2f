//! Department portal recycle bin service
//!
//! Every deletion in the admin console moves the record into a shared
//! `trash` collection instead of removing it. Entries keep a full copy of
//! the record, where it came from, when it was deleted and by whom, so
//! they can be restored to the same collection under the same id or
//! purged for good.
//!
//! The architecture follows the Clean/Hexagonal pattern:
//!
//! - Domain Layer: records, trash entries and the document store port (domain/*)
//! - Application Layer: the trash use cases (application/*)
//! - Infrastructure Layer: in-memory and PostgreSQL stores, scheduled cleanup (infrastructure/*)
//! - Interface Layer: HTTP endpoints and the live SSE listing (interfaces/*)

use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dept_portal::common::config::AppConfig;
use dept_portal::common::di::{AppServiceFactory, AppState};
use dept_portal::infrastructure::services::trash_cleanup_service::TrashCleanupService;
use dept_portal::interfaces::create_api_routes;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment variables
    let config = AppConfig::from_env();
    let factory = AppServiceFactory::new(config.clone());

    let store = factory.create_document_store().await?;
    let trash_service = factory.create_trash_service(store);

    // Start the retention job if enabled
    let cleanup_handle = if config.trash.cleanup_enabled() {
        let cleanup = TrashCleanupService::new(
            trash_service.clone(),
            config.trash.retention_days,
            config.trash.cleanup_interval(),
        );
        Some(cleanup.start_cleanup_job())
    } else {
        tracing::info!("Trash retention disabled, entries are kept until purged");
        None
    };

    let app_state = AppState::new(trash_service);

    let app = Router::new()
        .nest("/api", create_api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(app_state);

    let addr = config.server.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Starting portal trash service on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = cleanup_handle {
        handle.abort();
    }
    tracing::info!("Server shutdown completed");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
