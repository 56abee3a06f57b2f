use sqlx::{postgres::PgPoolOptions, PgPool};
use anyhow::Result;
use std::time::Duration;
use crate::common::config::AppConfig;

const SCHEMA: [&str; 2] = [
    r#"
    CREATE TABLE IF NOT EXISTS portal_documents (
        collection VARCHAR(64) NOT NULL,
        id VARCHAR(128) NOT NULL,
        data JSONB NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        PRIMARY KEY (collection, id)
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_portal_documents_trash_deleted_at
        ON portal_documents ((data -> 'deletedAt'))
        WHERE collection = 'trash'
    "#,
];

/// Creates the connection pool, retrying a few times, and makes sure the schema exists
pub async fn create_database_pool(config: &AppConfig) -> Result<PgPool> {
    let connection_string = config.database.connection_string.as_deref()
        .ok_or_else(|| anyhow::anyhow!("PORTAL_DB_URL is not set"))?;

    tracing::info!("Connecting to PostgreSQL at {}", redact(connection_string));

    let mut attempt = 0;
    const MAX_ATTEMPTS: usize = 3;

    while attempt < MAX_ATTEMPTS {
        attempt += 1;
        tracing::info!("PostgreSQL connection attempt #{}", attempt);

        match PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .min_connections(config.database.min_connections)
            .acquire_timeout(Duration::from_secs(config.database.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.database.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.database.max_lifetime_secs))
            .connect(connection_string)
            .await {
                Ok(pool) => {
                    ensure_schema(&pool).await?;
                    tracing::info!("PostgreSQL connection established");
                    return Ok(pool);
                },
                Err(e) => {
                    tracing::error!("Failed to connect to PostgreSQL: {}", e);
                    if attempt >= MAX_ATTEMPTS {
                        return Err(anyhow::anyhow!("PostgreSQL connection failed: {}", e));
                    }
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
    }

    Err(anyhow::anyhow!("Could not connect to PostgreSQL after {} attempts", MAX_ATTEMPTS))
}

async fn ensure_schema(pool: &PgPool) -> Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await
            .map_err(|e| anyhow::anyhow!("Failed to create schema: {}", e))?;
    }
    Ok(())
}

/// Hides credentials in a connection string before logging it
fn redact(connection_string: &str) -> String {
    match (connection_string.find("://"), connection_string.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => format!(
            "{}[user]:[pass]{}",
            &connection_string[..scheme_end + 3],
            &connection_string[at..]
        ),
        _ => connection_string.to_string(),
    }
}
