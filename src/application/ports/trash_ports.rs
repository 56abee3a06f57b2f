use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;

use crate::application::dtos::trash_dto::{BatchOutcome, PurgeSummary, TrashEntryDto};
use crate::common::errors::Result;
use crate::domain::entities::collection::Collection;

/// Port for recycle bin use cases
#[async_trait]
pub trait TrashUseCase: Send + Sync {
    /// Moves one record to the trash; fails with NotFound when it does not exist
    async fn move_to_trash(
        &self,
        collection: Collection,
        id: &str,
        actor: Option<&str>,
    ) -> Result<TrashEntryDto>;

    /// Moves every existing record among `ids` in one atomic batch, skipping missing ones
    async fn move_many_to_trash(
        &self,
        collection: Collection,
        ids: &[String],
        actor: Option<&str>,
    ) -> Result<BatchOutcome>;

    /// Writes the snapshot back to its origin (overwriting) and drops the entry
    async fn restore(&self, trash_id: &str) -> Result<()>;

    async fn restore_many(&self, trash_ids: &[String]) -> Result<BatchOutcome>;

    /// Drops the entry; absent entries are not an error
    async fn permanently_delete(&self, trash_id: &str) -> Result<()>;

    async fn permanently_delete_many(&self, trash_ids: &[String]) -> Result<()>;

    /// Current entries, most recently deleted first
    async fn fetch_trash(&self) -> Result<Vec<TrashEntryDto>>;

    /// Live view: current entries first, then a fresh list after every trash change
    fn watch_trash(&self) -> BoxStream<'static, Result<Vec<TrashEntryDto>>>;

    async fn empty_trash(&self) -> Result<PurgeSummary>;

    /// Drops entries deleted strictly before `cutoff`
    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<PurgeSummary>;

    /// Moves records still carrying the legacy `deleted: true` flag into the trash
    async fn absorb_flagged_records(
        &self,
        collection: Collection,
        actor: Option<&str>,
    ) -> Result<BatchOutcome>;
}
