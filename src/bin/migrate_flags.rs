use std::sync::Arc;

use dept_portal::application::ports::trash_ports::TrashUseCase;
use dept_portal::common::config::AppConfig;
use dept_portal::common::db::create_database_pool;
use dept_portal::domain::entities::collection::Collection;
use dept_portal::infrastructure::repositories::pg::DocumentPgRepository;
use dept_portal::TrashService;

const MIGRATION_ACTOR: &str = "migrate_flags";

/// One-off conversion of records still soft-deleted with a `deleted: true`
/// flag into trash entries, collection by collection.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .init();

    let config = AppConfig::from_env();
    if config.database.connection_string.is_none() {
        anyhow::bail!("PORTAL_DB_URL must be set");
    }

    println!("Starting flagged record migration...");

    let pool = Arc::new(create_database_pool(&config).await?);
    let store = DocumentPgRepository::connect(pool).await?;
    let service = TrashService::new(Arc::new(store));

    let mut total = 0;
    for collection in Collection::ALL {
        let outcome = service
            .absorb_flagged_records(collection, Some(MIGRATION_ACTOR))
            .await
            .map_err(|e| anyhow::anyhow!("Migration of {} failed: {}", collection, e))?;

        println!("{}: moved {} record(s) to trash", collection, outcome.processed.len());
        if !outcome.skipped.is_empty() {
            println!("{}: skipped {:?}", collection, outcome.skipped);
        }
        total += outcome.processed.len();
    }

    println!("Migration completed, {} record(s) moved.", total);
    Ok(())
}
