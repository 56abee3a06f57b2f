use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::collection::{Collection, Document};
use crate::domain::entities::trash_entry::TrashEntry;

/// DTO representing an entry in the trash
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrashEntryDto {
    pub trash_id: String,
    pub original_collection: Collection,
    pub original_id: String,
    pub deleted_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_by: Option<String>,
    pub data: Document,
}

impl From<TrashEntry> for TrashEntryDto {
    fn from(entry: TrashEntry) -> Self {
        Self {
            trash_id: entry.trash_id,
            original_collection: entry.original_collection,
            original_id: entry.original_id,
            deleted_at: entry.deleted_at,
            deleted_by: entry.deleted_by,
            data: entry.data,
        }
    }
}

/// Request to move several records of one collection to the trash
#[derive(Debug, Deserialize)]
pub struct MoveManyToTrashRequest {
    pub ids: Vec<String>,
}

/// Request naming several trash entries (restore or permanent delete)
#[derive(Debug, Deserialize)]
pub struct TrashIdsRequest {
    pub trash_ids: Vec<String>,
}

/// Result of a batch operation: ids acted on and ids skipped as missing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub processed: Vec<String>,
    pub skipped: Vec<String>,
}

/// Count of trash entries removed by a bulk purge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeSummary {
    pub removed: usize,
}
