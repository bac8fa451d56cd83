//! Errors surfaced by the book and game services.

use docstore::DocStoreError;

use crate::books::BookValidationError;
use crate::persistence::PersistenceError;

/// Coarse classification used by the controllers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    Infrastructure,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Invalid(#[from] BookValidationError),
    #[error("Un tableau de livres non vide est requis")]
    EmptyBatch,
    #[error("{0}")]
    MalformedJson(#[source] serde_json::Error),
    /// Rejected by the collection's schema validator.
    #[error("{0}")]
    SchemaRejected(String),
    #[error("{0}")]
    InvalidId(String),
    /// Unique index violation.
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Invalid(_)
            | ServiceError::EmptyBatch
            | ServiceError::MalformedJson(_)
            | ServiceError::SchemaRejected(_)
            | ServiceError::InvalidId(_) => ErrorKind::Validation,
            ServiceError::Conflict(_) => ErrorKind::Conflict,
            ServiceError::NotFound(_) => ErrorKind::NotFound,
            ServiceError::Persistence(_) => ErrorKind::Infrastructure,
        }
    }
}

impl From<DocStoreError> for ServiceError {
    fn from(err: DocStoreError) -> Self {
        match err {
            DocStoreError::DuplicateKey { .. } => ServiceError::Conflict(err.to_string()),
            DocStoreError::ValidationFailed(_) => ServiceError::SchemaRejected(err.to_string()),
            DocStoreError::InvalidId(_) => ServiceError::InvalidId(err.to_string()),
            other => ServiceError::Persistence(PersistenceError::Store(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::books::BookProblem;

    #[test]
    fn test_store_errors_are_classified() {
        let dup: ServiceError = DocStoreError::DuplicateKey {
            collection: "livre".to_string(),
            detail: "UNIQUE constraint failed".to_string(),
        }
        .into();
        assert_eq!(dup.kind(), ErrorKind::Conflict);
        assert!(dup.to_string().starts_with("E11000"));

        let rejected: ServiceError = DocStoreError::ValidationFailed("$.year".to_string()).into();
        assert!(matches!(rejected, ServiceError::SchemaRejected(_)));
        assert_eq!(rejected.kind(), ErrorKind::Validation);

        let bad_id: ServiceError = "zzz".parse::<docstore::DocumentId>().unwrap_err().into();
        assert!(matches!(bad_id, ServiceError::InvalidId(_)));

        let io: ServiceError = DocStoreError::NotAnObject.into();
        assert_eq!(io.kind(), ErrorKind::Infrastructure);
    }

    #[test]
    fn test_not_connected_keeps_raw_message() {
        let err: ServiceError = PersistenceError::NotConnected.into();
        assert_eq!(err.kind(), ErrorKind::Infrastructure);
        assert_eq!(err.to_string(), "Database not connected. Call connect() first.");
    }

    #[test]
    fn test_validation_error_message_passes_through() {
        let err: ServiceError = BookValidationError::new(BookProblem::MissingTitle).into();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.to_string(), "Le titre est requis");
    }
}
