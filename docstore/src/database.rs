//! Connection pool, migrations and collection catalog.

use std::path::Path;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;

use crate::{Collection, DocStoreError, JsonSchema};

/// Pool tuning for [`Database::connect`].
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub max_connections: u32,
    /// How long to wait for a pooled connection before failing.
    pub acquire_timeout: Duration,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            max_connections: 5,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CreateCollectionOptions {
    pub validator: Option<JsonSchema>,
}

/// Holds a connection pool to the document database.
#[derive(Clone, Debug)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect to a SQLite URL (`sqlite:path` or `sqlite::memory:`), run
    /// migrations, and return a ready-to-use `Database`.
    pub async fn connect(url: &str, options: &ConnectOptions) -> Result<Self, DocStoreError> {
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");

        let mut connect_options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .synchronous(SqliteSynchronous::Normal);
        if !in_memory {
            connect_options = connect_options.journal_mode(SqliteJournalMode::Wal);
        }

        // Every connection to `:memory:` is its own database, so keep exactly
        // one alive for the pool's lifetime.
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(options.max_connections)
        };

        let pool = pool_options
            .acquire_timeout(options.acquire_timeout)
            .connect_with(connect_options)
            .await?;

        let db = Self { pool };
        db.run_migrations().await?;
        tracing::debug!(url, "document database opened");
        Ok(db)
    }

    /// Open (or create) the database file at `path`.
    pub async fn open(path: &Path, options: &ConnectOptions) -> Result<Self, DocStoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::connect(&format!("sqlite:{}", path.display()), options).await
    }

    /// Create a private in-memory database.
    pub async fn open_in_memory() -> Result<Self, DocStoreError> {
        Self::connect("sqlite::memory:", &ConnectOptions::default()).await
    }

    async fn run_migrations(&self) -> Result<(), DocStoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Close every pooled connection. Further operations fail.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }

    /// Get a reference to the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Handle to a collection. Collections without a catalog entry are
    /// registered implicitly on first insert.
    pub fn collection(&self, name: &str) -> Collection {
        Collection::new(self.pool.clone(), name)
    }

    pub async fn collection_exists(&self, name: &str) -> Result<bool, DocStoreError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT name FROM collections WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    pub async fn list_collection_names(&self) -> Result<Vec<String>, DocStoreError> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT name FROM collections ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    /// Create a collection explicitly, optionally with a validator. Fails with
    /// [`DocStoreError::CollectionExists`] if it is already registered.
    pub async fn create_collection(
        &self,
        name: &str,
        options: CreateCollectionOptions,
    ) -> Result<Collection, DocStoreError> {
        let validator = options
            .validator
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let result = sqlx::query(
            "INSERT OR IGNORE INTO collections (name, validator, created_at) VALUES (?, ?, ?)",
        )
        .bind(name)
        .bind(validator)
        .bind(now_timestamp())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DocStoreError::CollectionExists(name.to_string()));
        }

        tracing::info!(collection = name, validated = options.validator.is_some(), "collection created");
        Ok(self.collection(name))
    }
}

pub(crate) fn now_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}
