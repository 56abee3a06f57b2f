use std::fmt::{Display, Formatter, Result as FmtResult};
use std::error::Error as StdError;
use thiserror::Error;

/// Error categories shared by every layer of the portal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Referenced record or trash entry does not exist
    NotFound,
    /// Input rejected (unknown collection, malformed id or payload)
    InvalidInput,
    /// The document store could not be reached or refused the operation
    StoreUnavailable,
    /// Anything else
    InternalError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ErrorKind::NotFound => write!(f, "Not Found"),
            ErrorKind::InvalidInput => write!(f, "Invalid Input"),
            ErrorKind::StoreUnavailable => write!(f, "Store Unavailable"),
            ErrorKind::InternalError => write!(f, "Internal Error"),
        }
    }
}

/// Domain error carrying the affected entity and an optional cause
#[derive(Error, Debug)]
#[error("{kind}: {message}")]
pub struct DomainError {
    pub kind: ErrorKind,
    /// Affected entity type (e.g. "TrashEntry", "Record")
    pub entity_type: &'static str,
    pub entity_id: Option<String>,
    pub message: String,
    #[source]
    pub source: Option<Box<dyn StdError + Send + Sync>>,
}

impl DomainError {
    pub fn new<S: Into<String>>(
        kind: ErrorKind,
        entity_type: &'static str,
        message: S,
    ) -> Self {
        Self {
            kind,
            entity_type,
            entity_id: None,
            message: message.into(),
            source: None,
        }
    }

    pub fn not_found<S: Into<String>>(entity_type: &'static str, entity_id: S) -> Self {
        let id = entity_id.into();
        Self {
            kind: ErrorKind::NotFound,
            entity_type,
            entity_id: Some(id.clone()),
            message: format!("{} not found: {}", entity_type, id),
            source: None,
        }
    }

    pub fn store_unavailable<S: Into<String>>(entity_type: &'static str, message: S) -> Self {
        Self::new(ErrorKind::StoreUnavailable, entity_type, message)
    }

    pub fn internal_error<S: Into<String>>(entity_type: &'static str, message: S) -> Self {
        Self::new(ErrorKind::InternalError, entity_type, message)
    }

    pub fn validation_error<S: Into<String>>(entity_type: &'static str, message: S) -> Self {
        Self::new(ErrorKind::InvalidInput, entity_type, message)
    }

    pub fn with_id<S: Into<String>>(mut self, entity_id: S) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }
}

/// Adds context to foreign errors while turning them into `DomainError`
pub trait ErrorContext<T, E> {
    fn with_error_kind(self, kind: ErrorKind, entity_type: &'static str) -> std::result::Result<T, DomainError>;
}

impl<T, E: StdError + Send + Sync + 'static> ErrorContext<T, E> for std::result::Result<T, E> {
    fn with_error_kind(self, kind: ErrorKind, entity_type: &'static str) -> std::result::Result<T, DomainError> {
        self.map_err(|e| DomainError {
            kind,
            entity_type,
            entity_id: None,
            message: format!("{}", e),
            source: Some(Box::new(e)),
        })
    }
}

/// Converts a foreign error type into an internal `DomainError`
#[macro_export]
macro_rules! impl_from_error {
    ($error_type:ty, $entity_type:expr) => {
        impl From<$error_type> for DomainError {
            fn from(err: $error_type) -> Self {
                DomainError {
                    kind: ErrorKind::InternalError,
                    entity_type: $entity_type,
                    entity_id: None,
                    message: format!("{}", err),
                    source: Some(Box::new(err)),
                }
            }
        }
    };
}

impl_from_error!(serde_json::Error, "Serialization");

pub type Result<T> = std::result::Result<T, DomainError>;
