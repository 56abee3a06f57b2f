use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, instrument, trace};
use uuid::Uuid;

use crate::domain::entities::collection::Document;
use crate::domain::repositories::document_store::{
    BatchOperation, ChangeEvent, DocumentStore, OrderBy, SortDirection, StoreResult,
    StoredDocument, WriteBatch,
};

const CHANGE_FEED_CAPACITY: usize = 256;

/// In-process document store; a batch is applied under a single write lock
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, BTreeMap<String, Document>>>,
    changes: broadcast::Sender<ChangeEvent>,
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            collections: RwLock::new(HashMap::new()),
            changes,
        }
    }

    /// Number of documents currently in `collection`
    pub async fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map(|docs| docs.len())
            .unwrap_or(0)
    }

    fn publish(&self, touched: Vec<ChangeEvent>) {
        for event in touched {
            // Sin suscriptores no es un error
            let _ = self.changes.send(event);
        }
    }
}

/// Orders missing < null < bool < number < string < everything else
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(value: Option<&Value>) -> u8 {
        match value {
            None => 0,
            Some(Value::Null) => 1,
            Some(Value::Bool(_)) => 2,
            Some(Value::Number(_)) => 3,
            Some(Value::String(_)) => 4,
            Some(_) => 5,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(x), Some(y)) if rank(a) == 5 && rank(b) == 5 => x.to_string().cmp(&y.to_string()),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        let collections = self.collections.read().await;
        Ok(collections.get(collection).and_then(|docs| docs.get(id)).cloned())
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
        let collections = self.collections.read().await;

        let mut documents: Vec<StoredDocument> = collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, data)| StoredDocument { id: id.clone(), data: data.clone() })
                    .collect()
            })
            .unwrap_or_default();

        // BTreeMap iteration already yields id order, the sort below is stable
        if let Some(order) = order_by {
            documents.sort_by(|a, b| {
                let ordering = compare_values(a.data.get(&order.field), b.data.get(&order.field));
                match order.direction {
                    SortDirection::Ascending => ordering,
                    SortDirection::Descending => ordering.reverse(),
                }
            });
        }

        trace!("Query on {} returned {} documents", collection, documents.len());
        Ok(documents)
    }

    #[instrument(skip(self, batch), fields(operations = batch.len()))]
    async fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut touched = Vec::with_capacity(batch.len());
        {
            let mut collections = self.collections.write().await;
            for operation in batch.into_operations() {
                match operation {
                    BatchOperation::Put { collection, id, data } => {
                        collections
                            .entry(collection.clone())
                            .or_default()
                            .insert(id.clone(), data);
                        touched.push(ChangeEvent { collection, id });
                    }
                    BatchOperation::Delete { collection, id } => {
                        if let Some(docs) = collections.get_mut(&collection) {
                            docs.remove(&id);
                        }
                        touched.push(ChangeEvent { collection, id });
                    }
                }
            }
        }

        debug!("Committed batch touching {} documents", touched.len());
        self.publish(touched);
        Ok(())
    }

    fn watch(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }
}
