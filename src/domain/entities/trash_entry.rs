use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::common::errors::{DomainError, ErrorContext, ErrorKind, Result};
use crate::domain::entities::collection::{Collection, Document};

/// Stored shape of a trash entry inside the trash collection
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrashEntryRecord {
    original_collection: String,
    original_id: String,
    deleted_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    deleted_by: Option<String>,
    data: Document,
}

/// Snapshot of a soft-deleted record together with its origin
#[derive(Debug, Clone, PartialEq)]
pub struct TrashEntry {
    pub trash_id: String,
    pub original_collection: Collection,
    pub original_id: String,
    pub deleted_at: DateTime<Utc>,
    pub deleted_by: Option<String>,
    pub data: Document,
}

impl TrashEntry {
    pub fn new(
        trash_id: String,
        original_collection: Collection,
        original_id: String,
        data: Document,
        deleted_by: Option<String>,
    ) -> Self {
        Self {
            trash_id,
            original_collection,
            original_id,
            // Stored timestamps keep microseconds only
            deleted_at: Utc::now().trunc_subsecs(6),
            deleted_by,
            data,
        }
    }

    pub fn with_deleted_at(mut self, deleted_at: DateTime<Utc>) -> Self {
        self.deleted_at = deleted_at.trunc_subsecs(6);
        self
    }

    /// Fixed-width RFC 3339 form; lexical order matches chronological order
    pub fn format_timestamp(at: &DateTime<Utc>) -> String {
        at.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    pub fn to_document(&self) -> Result<Document> {
        let record = TrashEntryRecord {
            original_collection: self.original_collection.as_str().to_string(),
            original_id: self.original_id.clone(),
            deleted_at: Self::format_timestamp(&self.deleted_at),
            deleted_by: self.deleted_by.clone(),
            data: self.data.clone(),
        };

        match serde_json::to_value(record)? {
            Value::Object(map) => Ok(map),
            other => Err(DomainError::internal_error(
                "TrashEntry",
                format!("Trash entry serialized to a non-object value: {}", other),
            )),
        }
    }

    pub fn from_document(trash_id: &str, document: Document) -> Result<Self> {
        let record: TrashEntryRecord = serde_json::from_value(Value::Object(document))
            .with_error_kind(ErrorKind::InvalidInput, "TrashEntry")
            .map_err(|e| e.with_id(trash_id))?;

        let original_collection = record.original_collection.parse::<Collection>()
            .map_err(|e| e.with_id(trash_id))?;

        let deleted_at = DateTime::parse_from_rfc3339(&record.deleted_at)
            .with_error_kind(ErrorKind::InvalidInput, "TrashEntry")
            .map_err(|e| e.with_id(trash_id))?
            .with_timezone(&Utc);

        Ok(Self {
            trash_id: trash_id.to_string(),
            original_collection,
            original_id: record.original_id,
            deleted_at,
            deleted_by: record.deleted_by,
            data: record.data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn sample_data() -> Document {
        match json!({ "title": "Printer toner", "qty": 4, "tags": ["it", "q3"] }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn stored_form_uses_camel_case_fields() {
        let entry = TrashEntry::new(
            "t1".to_string(),
            Collection::ProcuredItems,
            "item-9".to_string(),
            sample_data(),
            Some("admin".to_string()),
        )
        .with_deleted_at(Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap());

        let document = entry.to_document().unwrap();
        assert_eq!(document["originalCollection"], json!("procuredItems"));
        assert_eq!(document["originalId"], json!("item-9"));
        assert_eq!(document["deletedAt"], json!("2024-03-01T08:30:00.000000Z"));
        assert_eq!(document["deletedBy"], json!("admin"));

        let decoded = TrashEntry::from_document("t1", document).unwrap();
        assert_eq!(decoded, entry);
    }

    #[test]
    fn fresh_entries_survive_storage_unchanged() {
        let entry = TrashEntry::new(
            "t2".to_string(),
            Collection::Contacts,
            "c1".to_string(),
            sample_data(),
            None,
        );
        let decoded = TrashEntry::from_document("t2", entry.to_document().unwrap()).unwrap();
        assert_eq!(decoded.deleted_at, entry.deleted_at);
        assert!(decoded.deleted_by.is_none());
    }

    #[test]
    fn timestamps_sort_lexically() {
        let early = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let late = early + chrono::Duration::milliseconds(500);
        assert!(TrashEntry::format_timestamp(&early) < TrashEntry::format_timestamp(&late));
    }

    #[test]
    fn rejects_unknown_origin_collection() {
        let document = match json!({
            "originalCollection": "trash",
            "originalId": "x",
            "deletedAt": "2024-01-01T00:00:00.000000Z",
            "data": {}
        }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };

        let err = TrashEntry::from_document("t3", document).unwrap_err();
        assert_eq!(err.entity_id.as_deref(), Some("t3"));
    }
}
