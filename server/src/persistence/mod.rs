//! Lifecycle of the shared document-database connection.
//!
//! [`PersistenceHandle`] is created once in `main.rs` and injected into the
//! services. `connect` and `disconnect` are idempotent; `database` fails with
//! [`PersistenceError::NotConnected`] until `connect` has succeeded.

mod bootstrap;

pub use bootstrap::ensure_book_collection;

use docstore::{ConnectOptions, Database, DocStoreError};
use std::path::PathBuf;
use tokio::sync::RwLock;

/// Errors from the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("Database not connected. Call connect() first.")]
    NotConnected,
    #[error(transparent)]
    Store(#[from] DocStoreError),
}

/// Where the document database lives.
#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseLocation {
    File(PathBuf),
    /// Private in-memory database; its contents are lost on disconnect.
    Memory,
}

/// Owned, lazily connected handle to the document database.
pub struct PersistenceHandle {
    location: DatabaseLocation,
    options: ConnectOptions,
    db: RwLock<Option<Database>>,
}

impl PersistenceHandle {
    pub fn new(location: DatabaseLocation, options: ConnectOptions) -> Self {
        Self {
            location,
            options,
            db: RwLock::new(None),
        }
    }

    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self::new(DatabaseLocation::Memory, ConnectOptions::default())
    }

    /// Connect if not already connected and make sure the book collection is
    /// initialised. Returns the existing database when already connected.
    pub async fn connect(&self) -> Result<Database, PersistenceError> {
        if let Some(db) = self.db.read().await.as_ref() {
            return Ok(db.clone());
        }

        let mut guard = self.db.write().await;
        if let Some(db) = guard.as_ref() {
            return Ok(db.clone());
        }

        let db = match &self.location {
            DatabaseLocation::File(path) => Database::open(path, &self.options).await?,
            DatabaseLocation::Memory => {
                Database::connect("sqlite::memory:", &self.options).await?
            }
        };

        if let Err(e) = ensure_book_collection(&db).await {
            db.close().await;
            return Err(e);
        }

        tracing::info!(location = ?self.location, "Connected to document database");
        *guard = Some(db.clone());
        Ok(db)
    }

    /// Close the connection and forget it. Does nothing when not connected.
    pub async fn disconnect(&self) {
        if let Some(db) = self.db.write().await.take() {
            db.close().await;
            tracing::info!("Disconnected from document database");
        }
    }

    /// The connected database, or [`PersistenceError::NotConnected`].
    pub async fn database(&self) -> Result<Database, PersistenceError> {
        self.db
            .read()
            .await
            .clone()
            .ok_or(PersistenceError::NotConnected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::books::fields;

    #[tokio::test]
    async fn test_database_before_connect_fails() {
        let handle = PersistenceHandle::in_memory();
        let err = handle.database().await.unwrap_err();
        assert!(matches!(err, PersistenceError::NotConnected));
        assert_eq!(
            err.to_string(),
            "Database not connected. Call connect() first."
        );
    }

    #[tokio::test]
    async fn test_connect_is_idempotent() {
        let handle = PersistenceHandle::in_memory();
        let first = handle.connect().await.unwrap();
        first
            .collection("consolegame")
            .insert_one(docstore::to_document(&serde_json::json!({"Name": "Tetris"})).unwrap())
            .await
            .unwrap();

        // a second connect must hand back the same database, not a fresh one
        let second = handle.connect().await.unwrap();
        let count = second
            .collection("consolegame")
            .count(&docstore::Filter::new())
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_connect_creates_book_collection() {
        let handle = PersistenceHandle::in_memory();
        let db = handle.connect().await.unwrap();
        assert!(db.collection_exists(fields::COLLECTION).await.unwrap());
    }

    #[tokio::test]
    async fn test_disconnect_and_reconnect() {
        let handle = PersistenceHandle::in_memory();
        handle.connect().await.unwrap();
        assert!(handle.database().await.is_ok());

        handle.disconnect().await;
        assert!(matches!(
            handle.database().await,
            Err(PersistenceError::NotConnected)
        ));

        // disconnecting twice is harmless
        handle.disconnect().await;

        handle.connect().await.unwrap();
        assert!(handle.database().await.is_ok());
    }

    #[tokio::test]
    async fn test_file_database_survives_reconnect() {
        let dir = tempfile::tempdir().unwrap();
        let handle = PersistenceHandle::new(
            DatabaseLocation::File(dir.path().join("data").join("consolegame.db")),
            ConnectOptions::default(),
        );
        let db = handle.connect().await.unwrap();
        db.collection("consolegame")
            .insert_one(docstore::to_document(&serde_json::json!({"Name": "Tetris"})).unwrap())
            .await
            .unwrap();
        handle.disconnect().await;

        // the existing collection path runs on the second connect
        let db = handle.connect().await.unwrap();
        let count = db
            .collection("consolegame")
            .count(&docstore::Filter::new())
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
