use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::common::errors::DomainError;

/// Schema-opaque field map of a stored record
pub type Document = Map<String, Value>;

/// Name of the shared collection holding soft-deleted records
pub const TRASH_COLLECTION: &str = "trash";

/// Collections whose records can be moved to the trash
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Collection {
    ProcuredItems,
    Requirements,
    ScheduledEvents,
    Sops,
    Contacts,
    Users,
}

impl Collection {
    pub const ALL: [Collection; 6] = [
        Collection::ProcuredItems,
        Collection::Requirements,
        Collection::ScheduledEvents,
        Collection::Sops,
        Collection::Contacts,
        Collection::Users,
    ];

    /// Name used by the document store
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::ProcuredItems => "procuredItems",
            Collection::Requirements => "requirements",
            Collection::ScheduledEvents => "scheduledEvents",
            Collection::Sops => "sops",
            Collection::Contacts => "contacts",
            Collection::Users => "users",
        }
    }
}

impl Display for Collection {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Collection::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| {
                DomainError::validation_error("Collection", format!("Unknown collection: {}", s))
            })
    }
}
