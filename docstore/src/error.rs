/// Code reported by [`DocStoreError::code`] for unique-index violations.
pub const DUPLICATE_KEY_CODE: i32 = 11000;

/// Errors from the document store.
#[derive(Debug, thiserror::Error)]
pub enum DocStoreError {
    #[error("E11000 duplicate key error collection: {collection} ({detail})")]
    DuplicateKey { collection: String, detail: String },
    #[error("Document failed validation: {0}")]
    ValidationFailed(String),
    #[error("Index with name: {0} already exists with different options")]
    IndexConflict(String),
    #[error("Collection already exists. NS: {0}")]
    CollectionExists(String),
    #[error("input must be a 32 character hex string: {0:?}")]
    InvalidId(String),
    #[error("document must be a JSON object")]
    NotAnObject,
    #[error("SQLite error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DocStoreError {
    /// Numeric error code, when the error has one.
    pub fn code(&self) -> Option<i32> {
        match self {
            DocStoreError::DuplicateKey { .. } => Some(DUPLICATE_KEY_CODE),
            _ => None,
        }
    }

    /// Map a sqlx error raised while writing into `collection`, turning
    /// unique-constraint failures into [`DocStoreError::DuplicateKey`].
    pub(crate) fn from_write(collection: &str, err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                DocStoreError::DuplicateKey {
                    collection: collection.to_string(),
                    detail: db_err.message().to_string(),
                }
            }
            _ => DocStoreError::Sqlx(err),
        }
    }
}
