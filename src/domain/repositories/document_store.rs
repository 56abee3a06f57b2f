use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::common::errors::DomainError;
use crate::domain::entities::collection::Document;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Document store unavailable: {0}")]
    Unavailable(String),

    #[error("Corrupt document {collection}/{id}: {reason}")]
    Corrupt {
        collection: String,
        id: String,
        reason: String,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => DomainError::store_unavailable("DocumentStore", msg),
            StoreError::Corrupt { collection, id, reason } => DomainError::internal_error(
                "DocumentStore",
                format!("Corrupt document {}/{}: {}", collection, id, reason),
            )
            .with_id(id),
        }
    }
}

/// Document as returned by a query
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub data: Document,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Ordering of query results by a top-level field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: SortDirection,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self { field: field.into(), direction: SortDirection::Ascending }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self { field: field.into(), direction: SortDirection::Descending }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BatchOperation {
    /// Full overwrite of the document at (collection, id)
    Put { collection: String, id: String, data: Document },
    /// Removal; absent documents are ignored
    Delete { collection: String, id: String },
}

impl BatchOperation {
    pub fn target(&self) -> (&str, &str) {
        match self {
            BatchOperation::Put { collection, id, .. } => (collection, id),
            BatchOperation::Delete { collection, id } => (collection, id),
        }
    }
}

/// Writes staged in memory and applied all-or-nothing by `DocumentStore::commit`
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    operations: Vec<BatchOperation>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, collection: &str, id: &str, data: Document) -> &mut Self {
        self.operations.push(BatchOperation::Put {
            collection: collection.to_string(),
            id: id.to_string(),
            data,
        });
        self
    }

    pub fn delete(&mut self, collection: &str, id: &str) -> &mut Self {
        self.operations.push(BatchOperation::Delete {
            collection: collection.to_string(),
            id: id.to_string(),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn operations(&self) -> &[BatchOperation] {
        &self.operations
    }

    pub fn into_operations(self) -> Vec<BatchOperation> {
        self.operations
    }
}

/// Emitted after a committed write touches (collection, id)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub collection: String,
    pub id: String,
}

/// Hosted document database holding every portal collection
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>>;

    async fn put(&self, collection: &str, id: &str, data: Document) -> StoreResult<()>;

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()>;

    /// Allocates a fresh document id
    fn new_id(&self, collection: &str) -> String;

    async fn query(
        &self,
        collection: &str,
        order_by: Option<&OrderBy>,
    ) -> StoreResult<Vec<StoredDocument>>;

    fn batch(&self) -> WriteBatch {
        WriteBatch::new()
    }

    /// Applies every staged operation or none of them
    async fn commit(&self, batch: WriteBatch) -> StoreResult<()>;

    /// Change feed covering writes made by any client of the store
    fn watch(&self) -> broadcast::Receiver<ChangeEvent>;
}
