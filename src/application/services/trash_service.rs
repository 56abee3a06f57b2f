use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use futures::stream::BoxStream;
use serde_json::Value;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::{debug, error, info, instrument, warn};

use crate::application::dtos::trash_dto::{BatchOutcome, PurgeSummary, TrashEntryDto};
use crate::application::ports::trash_ports::TrashUseCase;
use crate::common::errors::{DomainError, Result};
use crate::domain::entities::collection::{Collection, Document, TRASH_COLLECTION};
use crate::domain::entities::trash_entry::TrashEntry;
use crate::domain::repositories::document_store::{DocumentStore, OrderBy, WriteBatch};

/// Field marking records soft-deleted in place by older portal versions
const LEGACY_DELETED_FLAG: &str = "deleted";
const DELETED_AT_FIELD: &str = "deletedAt";

/// Application service moving records between their collections and the trash
pub struct TrashService {
    store: Arc<dyn DocumentStore>,
}

impl TrashService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    fn validate_id(entity_type: &'static str, id: &str) -> Result<()> {
        if id.trim().is_empty() || id.contains('/') {
            return Err(DomainError::validation_error(
                entity_type,
                format!("Invalid id: {:?}", id),
            ));
        }
        Ok(())
    }

    /// Validates and deduplicates ids, keeping first occurrences in order
    fn normalize_ids(entity_type: &'static str, ids: &[String]) -> Result<Vec<String>> {
        let mut seen = HashSet::new();
        let mut unique = Vec::with_capacity(ids.len());
        for id in ids {
            Self::validate_id(entity_type, id)?;
            if seen.insert(id.as_str()) {
                unique.push(id.clone());
            }
        }
        Ok(unique)
    }

    /// Stages the trash entry write and the origin delete in `batch`
    fn stage_move(
        &self,
        batch: &mut WriteBatch,
        collection: Collection,
        id: &str,
        data: Document,
        actor: Option<&str>,
    ) -> Result<TrashEntry> {
        let entry = TrashEntry::new(
            self.store.new_id(TRASH_COLLECTION),
            collection,
            id.to_string(),
            data,
            actor.map(str::to_string),
        );

        batch.put(TRASH_COLLECTION, &entry.trash_id, entry.to_document()?);
        batch.delete(collection.as_str(), id);
        Ok(entry)
    }

    fn stage_restore(batch: &mut WriteBatch, entry: &TrashEntry) {
        batch.put(entry.original_collection.as_str(), &entry.original_id, entry.data.clone());
        batch.delete(TRASH_COLLECTION, &entry.trash_id);
    }

    async fn read_entry(&self, trash_id: &str) -> Result<Option<TrashEntry>> {
        match self.store.get(TRASH_COLLECTION, trash_id).await? {
            Some(document) => Ok(Some(TrashEntry::from_document(trash_id, document)?)),
            None => Ok(None),
        }
    }
}

/// Reads every decodable trash entry, most recent first
async fn load_entries(store: &dyn DocumentStore) -> Result<Vec<TrashEntry>> {
    let documents = store
        .query(TRASH_COLLECTION, Some(&OrderBy::desc(DELETED_AT_FIELD)))
        .await?;

    let mut entries = Vec::with_capacity(documents.len());
    for document in documents {
        match TrashEntry::from_document(&document.id, document.data) {
            Ok(entry) => entries.push(entry),
            Err(e) => error!("Skipping malformed trash entry {}: {}", document.id, e),
        }
    }
    Ok(entries)
}

async fn snapshot(store: &dyn DocumentStore) -> Result<Vec<TrashEntryDto>> {
    let entries = load_entries(store).await?;
    Ok(entries.into_iter().map(TrashEntryDto::from).collect())
}

#[async_trait]
impl TrashUseCase for TrashService {
    #[instrument(skip(self))]
    async fn move_to_trash(
        &self,
        collection: Collection,
        id: &str,
        actor: Option<&str>,
    ) -> Result<TrashEntryDto> {
        info!("Moving {}/{} to trash", collection, id);
        Self::validate_id("Record", id)?;

        let data = self.store.get(collection.as_str(), id).await?
            .ok_or_else(|| DomainError::not_found("Record", format!("{}/{}", collection, id)))?;

        let mut batch = self.store.batch();
        let entry = self.stage_move(&mut batch, collection, id, data, actor)?;
        self.store.commit(batch).await?;

        debug!("Record {}/{} moved to trash as {}", collection, id, entry.trash_id);
        Ok(entry.into())
    }

    #[instrument(skip(self))]
    async fn move_many_to_trash(
        &self,
        collection: Collection,
        ids: &[String],
        actor: Option<&str>,
    ) -> Result<BatchOutcome> {
        let ids = Self::normalize_ids("Record", ids)?;
        info!("Moving {} records from {} to trash", ids.len(), collection);

        let snapshots = try_join_all(
            ids.iter().map(|id| self.store.get(collection.as_str(), id))
        ).await?;

        let mut batch = self.store.batch();
        let mut outcome = BatchOutcome::default();
        for (id, snapshot) in ids.into_iter().zip(snapshots) {
            match snapshot {
                Some(data) => {
                    self.stage_move(&mut batch, collection, &id, data, actor)?;
                    outcome.processed.push(id);
                }
                None => {
                    debug!("Record {}/{} no longer exists, skipping", collection, id);
                    outcome.skipped.push(id);
                }
            }
        }

        self.store.commit(batch).await?;
        Ok(outcome)
    }

    #[instrument(skip(self))]
    async fn restore(&self, trash_id: &str) -> Result<()> {
        info!("Restoring trash entry {}", trash_id);
        Self::validate_id("TrashEntry", trash_id)?;

        let entry = self.read_entry(trash_id).await?
            .ok_or_else(|| DomainError::not_found("TrashEntry", trash_id))?;

        let mut batch = self.store.batch();
        Self::stage_restore(&mut batch, &entry);
        self.store.commit(batch).await?;

        debug!(
            "Trash entry {} restored to {}/{}",
            trash_id, entry.original_collection, entry.original_id
        );
        Ok(())
    }

    #[instrument(skip(self))]
    async fn restore_many(&self, trash_ids: &[String]) -> Result<BatchOutcome> {
        let trash_ids = Self::normalize_ids("TrashEntry", trash_ids)?;
        info!("Restoring {} trash entries", trash_ids.len());

        let entries = try_join_all(trash_ids.iter().map(|id| self.read_entry(id))).await?;

        let mut batch = self.store.batch();
        let mut outcome = BatchOutcome::default();
        for (trash_id, entry) in trash_ids.into_iter().zip(entries) {
            match entry {
                Some(entry) => {
                    Self::stage_restore(&mut batch, &entry);
                    outcome.processed.push(trash_id);
                }
                None => {
                    debug!("Trash entry {} no longer exists, skipping", trash_id);
                    outcome.skipped.push(trash_id);
                }
            }
        }

        self.store.commit(batch).await?;
        Ok(outcome)
    }

    #[instrument(skip(self))]
    async fn permanently_delete(&self, trash_id: &str) -> Result<()> {
        info!("Permanently deleting trash entry {}", trash_id);
        Self::validate_id("TrashEntry", trash_id)?;

        let mut batch = self.store.batch();
        batch.delete(TRASH_COLLECTION, trash_id);
        self.store.commit(batch).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn permanently_delete_many(&self, trash_ids: &[String]) -> Result<()> {
        let trash_ids = Self::normalize_ids("TrashEntry", trash_ids)?;
        info!("Permanently deleting {} trash entries", trash_ids.len());

        let mut batch = self.store.batch();
        for trash_id in &trash_ids {
            batch.delete(TRASH_COLLECTION, trash_id);
        }
        self.store.commit(batch).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn fetch_trash(&self) -> Result<Vec<TrashEntryDto>> {
        let items = snapshot(self.store.as_ref()).await?;
        debug!("Found {} entries in trash", items.len());
        Ok(items)
    }

    fn watch_trash(&self) -> BoxStream<'static, Result<Vec<TrashEntryDto>>> {
        let store = self.store.clone();

        let stream = async_stream::stream! {
            // Subscribe before the first read so no change slips between them
            let mut changes = store.watch();
            yield snapshot(store.as_ref()).await;

            loop {
                match changes.recv().await {
                    Ok(event) if event.collection != TRASH_COLLECTION => continue,
                    Ok(_) => {}
                    Err(RecvError::Lagged(missed)) => {
                        warn!("Trash watcher lagged behind by {} changes", missed);
                    }
                    Err(RecvError::Closed) => break,
                }

                // A batch emits one event per document; collapse them into one refresh
                loop {
                    match changes.try_recv() {
                        Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
                        Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
                    }
                }

                yield snapshot(store.as_ref()).await;
            }
        };

        Box::pin(stream)
    }

    #[instrument(skip(self))]
    async fn empty_trash(&self) -> Result<PurgeSummary> {
        info!("Emptying trash");

        let documents = self.store.query(TRASH_COLLECTION, None).await?;
        let mut batch = self.store.batch();
        for document in &documents {
            batch.delete(TRASH_COLLECTION, &document.id);
        }
        self.store.commit(batch).await?;

        info!("Trash emptied, {} entries removed", documents.len());
        Ok(PurgeSummary { removed: documents.len() })
    }

    #[instrument(skip(self))]
    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<PurgeSummary> {
        let expired: Vec<TrashEntry> = load_entries(self.store.as_ref())
            .await?
            .into_iter()
            .filter(|entry| entry.deleted_at < cutoff)
            .collect();

        if expired.is_empty() {
            debug!("No trash entries older than {}", cutoff);
            return Ok(PurgeSummary { removed: 0 });
        }

        let mut batch = self.store.batch();
        for entry in &expired {
            batch.delete(TRASH_COLLECTION, &entry.trash_id);
        }
        self.store.commit(batch).await?;

        info!("Purged {} trash entries older than {}", expired.len(), cutoff);
        Ok(PurgeSummary { removed: expired.len() })
    }

    #[instrument(skip(self))]
    async fn absorb_flagged_records(
        &self,
        collection: Collection,
        actor: Option<&str>,
    ) -> Result<BatchOutcome> {
        let documents = self.store.query(collection.as_str(), None).await?;

        let mut batch = self.store.batch();
        let mut outcome = BatchOutcome::default();
        for document in documents {
            if document.data.get(LEGACY_DELETED_FLAG) != Some(&Value::Bool(true)) {
                continue;
            }

            let mut data = document.data;
            data.remove(LEGACY_DELETED_FLAG);
            self.stage_move(&mut batch, collection, &document.id, data, actor)?;
            outcome.processed.push(document.id);
        }

        self.store.commit(batch).await?;

        if !outcome.processed.is_empty() {
            info!(
                "Moved {} flagged records from {} to trash",
                outcome.processed.len(),
                collection
            );
        }
        Ok(outcome)
    }
}
