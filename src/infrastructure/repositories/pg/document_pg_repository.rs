use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgListener;
use sqlx::{PgPool, Row};
use tokio::sync::broadcast;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::domain::entities::collection::Document;
use crate::domain::repositories::document_store::{
    BatchOperation, ChangeEvent, DocumentStore, OrderBy, SortDirection, StoreError, StoreResult,
    StoredDocument, WriteBatch,
};

/// Channel used with LISTEN/NOTIFY to fan out document changes
pub const CHANGE_CHANNEL: &str = "portal_document_changes";

const CHANGE_FEED_CAPACITY: usize = 256;

/// Document store backed by a single JSONB table; a batch is one SQL transaction
pub struct DocumentPgRepository {
    pool: Arc<PgPool>,
    changes: broadcast::Sender<ChangeEvent>,
}

impl DocumentPgRepository {
    /// Connects the change listener and returns the repository
    pub async fn connect(pool: Arc<PgPool>) -> StoreResult<Self> {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);

        let mut listener = PgListener::connect_with(&pool)
            .await
            .map_err(Self::map_sqlx_error)?;
        listener
            .listen(CHANGE_CHANNEL)
            .await
            .map_err(Self::map_sqlx_error)?;

        let sender = changes.clone();
        tokio::spawn(async move {
            info!("Listening for document changes on channel {}", CHANGE_CHANNEL);
            loop {
                match listener.recv().await {
                    Ok(notification) => match Self::parse_payload(notification.payload()) {
                        Some(event) => {
                            let _ = sender.send(event);
                        }
                        None => warn!("Ignoring malformed change payload: {}", notification.payload()),
                    },
                    Err(e) => {
                        // PgListener reconnects on the next recv
                        error!("Change listener error: {}", e);
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        });

        Ok(Self { pool, changes })
    }

    fn map_sqlx_error(err: sqlx::Error) -> StoreError {
        StoreError::Unavailable(format!("Database error: {}", err))
    }

    fn payload_for(collection: &str, id: &str) -> String {
        format!("{}/{}", collection, id)
    }

    fn parse_payload(payload: &str) -> Option<ChangeEvent> {
        let (collection, id) = payload.split_once('/')?;
        Some(ChangeEvent {
            collection: collection.to_string(),
            id: id.to_string(),
        })
    }

    fn decode(collection: &str, id: &str, value: Value) -> StoreResult<Document> {
        match value {
            Value::Object(map) => Ok(map),
            other => Err(StoreError::Corrupt {
                collection: collection.to_string(),
                id: id.to_string(),
                reason: format!("expected a JSON object, found {}", other),
            }),
        }
    }

    fn order_clause(order_by: Option<&OrderBy>) -> &'static str {
        match order_by.map(|o| o.direction) {
            Some(SortDirection::Ascending) => "ORDER BY data -> $2 ASC, id ASC",
            Some(SortDirection::Descending) => "ORDER BY data -> $2 DESC, id ASC",
            None => "ORDER BY id ASC",
        }
    }
}

#[async_trait]
impl DocumentStore for DocumentPgRepository {
    #[instrument(skip(self))]
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        let row = sqlx::query(
            r#"
            SELECT data
            FROM portal_documents
            WHERE collection = $1 AND id = $2
            "#
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(Self::map_sqlx_error)?;

        match row {
            Some(row) => {
                let value: Value = row.try_get("data").map_err(Self::map_sqlx_error)?;
                Ok(Some(Self::decode(collection, id, value)?))
            }
            None => Ok(None),
        }
    }

    async fn put(&self, collection: &str, id: &str, data: Document) -> StoreResult<()> {
        let mut batch = WriteBatch::new();
        batch.put(collection, id, data);
        self.commit(batch).await
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        let mut batch = WriteBatch::new();
        batch.delete(collection, id);
        self.commit(batch).await
    }

    fn new_id(&self, _collection: &str) -> String {
        Uuid::new_v4().simple().to_string()
    }

    #[instrument(skip(self))]
    async fn query(
        &self,
        collection: &str,
        order_by: Option<&OrderBy>,
    ) -> StoreResult<Vec<StoredDocument>> {
        let sql = format!(
            "SELECT id, data FROM portal_documents WHERE collection = $1 {}",
            Self::order_clause(order_by)
        );

        let mut query = sqlx::query(&sql).bind(collection);
        if let Some(order) = order_by {
            query = query.bind(order.field.as_str());
        }

        let rows = query
            .fetch_all(&*self.pool)
            .await
            .map_err(Self::map_sqlx_error)?;

        rows.into_iter()
            .map(|row| {
                let id: String = row.try_get("id").map_err(Self::map_sqlx_error)?;
                let value: Value = row.try_get("data").map_err(Self::map_sqlx_error)?;
                let data = Self::decode(collection, &id, value)?;
                Ok(StoredDocument { id, data })
            })
            .collect()
    }

    #[instrument(skip(self, batch), fields(operations = batch.len()))]
    async fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(Self::map_sqlx_error)?;
        let mut payloads = Vec::with_capacity(batch.len());

        for operation in batch.into_operations() {
            let (collection, id) = operation.target();
            payloads.push(Self::payload_for(collection, id));

            match &operation {
                BatchOperation::Put { collection, id, data } => {
                    sqlx::query(
                        r#"
                        INSERT INTO portal_documents (collection, id, data, updated_at)
                        VALUES ($1, $2, $3, NOW())
                        ON CONFLICT (collection, id)
                        DO UPDATE SET data = EXCLUDED.data, updated_at = NOW()
                        "#
                    )
                    .bind(collection)
                    .bind(id)
                    .bind(Value::Object(data.clone()))
                    .execute(&mut *tx)
                    .await
                    .map_err(Self::map_sqlx_error)?;
                }
                BatchOperation::Delete { collection, id } => {
                    sqlx::query("DELETE FROM portal_documents WHERE collection = $1 AND id = $2")
                        .bind(collection)
                        .bind(id)
                        .execute(&mut *tx)
                        .await
                        .map_err(Self::map_sqlx_error)?;
                }
            }
        }

        // Notifications are delivered only if the transaction commits
        for payload in &payloads {
            sqlx::query("SELECT pg_notify($1, $2)")
                .bind(CHANGE_CHANNEL)
                .bind(payload)
                .execute(&mut *tx)
                .await
                .map_err(Self::map_sqlx_error)?;
        }

        tx.commit().await.map_err(Self::map_sqlx_error)?;
        debug!("Committed batch with {} operations", payloads.len());
        Ok(())
    }

    fn watch(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }
}
