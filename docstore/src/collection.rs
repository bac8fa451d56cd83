//! Collection handle: inserts, queries, `$set` updates, deletes and indexes.

use serde_json::Value;
use sqlx::query::QueryAs;
use sqlx::sqlite::{Sqlite, SqliteArguments};
use sqlx::{Executor, SqlitePool};

use crate::database::now_timestamp;
use crate::document::{with_id, ID_FIELD};
use crate::query::{json_path, Bind};
use crate::{DocStoreError, Document, DocumentId, Filter, FindOptions, JsonSchema};

type DocumentRow = (String, String);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexOptions {
    pub unique: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateResult {
    pub matched_count: u64,
    pub modified_count: u64,
}

/// Handle to one named collection. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Collection {
    pool: SqlitePool,
    name: String,
}

fn bind_all<'q, O>(
    mut query: QueryAs<'q, Sqlite, O, SqliteArguments<'q>>,
    binds: Vec<Bind>,
) -> QueryAs<'q, Sqlite, O, SqliteArguments<'q>> {
    for bind in binds {
        query = match bind {
            Bind::Text(s) => query.bind(s),
            Bind::Int(i) => query.bind(i),
            Bind::Real(f) => query.bind(f),
        };
    }
    query
}

fn parse_row((id, body): DocumentRow) -> Result<Document, DocStoreError> {
    let body: Document = serde_json::from_str(&body)?;
    Ok(with_id(&id, body))
}

/// Escape a string for use inside a single-quoted SQL literal.
fn sql_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

impl Collection {
    pub(crate) fn new(pool: SqlitePool, name: &str) -> Self {
        Self {
            pool,
            name: name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    async fn validator(&self) -> Result<Option<JsonSchema>, DocStoreError> {
        let row: Option<(Option<String>,)> =
            sqlx::query_as("SELECT validator FROM collections WHERE name = ?")
                .bind(&self.name)
                .fetch_optional(&self.pool)
                .await?;
        match row.and_then(|(v,)| v) {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn check(validator: Option<&JsonSchema>, body: &Document) -> Result<(), DocStoreError> {
        match validator {
            Some(schema) => schema
                .validate(&Value::Object(body.clone()))
                .map_err(DocStoreError::ValidationFailed),
            None => Ok(()),
        }
    }

    /// Split off `_id` (parsing a caller-supplied one) and return the body.
    fn prepare(mut doc: Document) -> Result<(DocumentId, Document), DocStoreError> {
        let id = match doc.shift_remove(ID_FIELD) {
            Some(Value::String(s)) => s.parse()?,
            Some(other) => return Err(DocStoreError::InvalidId(other.to_string())),
            None => DocumentId::new(),
        };
        Ok((id, doc))
    }

    async fn register<'e, E>(&self, executor: E) -> Result<(), DocStoreError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query("INSERT OR IGNORE INTO collections (name, validator, created_at) VALUES (?, NULL, ?)")
            .bind(&self.name)
            .bind(now_timestamp())
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Insert one document and return its id.
    pub async fn insert_one(&self, doc: Document) -> Result<DocumentId, DocStoreError> {
        let (id, body) = Self::prepare(doc)?;
        Self::check(self.validator().await?.as_ref(), &body)?;

        self.register(&self.pool).await?;
        sqlx::query("INSERT INTO documents (collection, id, body) VALUES (?, ?, ?)")
            .bind(&self.name)
            .bind(id.to_string())
            .bind(serde_json::to_string(&body)?)
            .execute(&self.pool)
            .await
            .map_err(|e| DocStoreError::from_write(&self.name, e))?;

        tracing::debug!(collection = %self.name, %id, "inserted document");
        Ok(id)
    }

    /// Insert every document or none: all are validated first, then written
    /// in a single transaction.
    pub async fn insert_many(&self, docs: Vec<Document>) -> Result<Vec<DocumentId>, DocStoreError> {
        let validator = self.validator().await?;
        let prepared = docs
            .into_iter()
            .map(|doc| {
                let (id, body) = Self::prepare(doc)?;
                Self::check(validator.as_ref(), &body)?;
                Ok((id, serde_json::to_string(&body)?))
            })
            .collect::<Result<Vec<_>, DocStoreError>>()?;

        let mut tx = self.pool.begin().await?;
        self.register(&mut *tx).await?;
        for (id, body) in &prepared {
            sqlx::query("INSERT INTO documents (collection, id, body) VALUES (?, ?, ?)")
                .bind(&self.name)
                .bind(id.to_string())
                .bind(body)
                .execute(&mut *tx)
                .await
                .map_err(|e| DocStoreError::from_write(&self.name, e))?;
        }
        tx.commit().await?;

        tracing::debug!(collection = %self.name, count = prepared.len(), "inserted documents");
        Ok(prepared.into_iter().map(|(id, _)| id).collect())
    }

    /// Find documents matching `filter`, in natural order unless sorted.
    pub async fn find(&self, filter: &Filter, options: &FindOptions) -> Result<Vec<Document>, DocStoreError> {
        let mut sql = String::from("SELECT id, body FROM documents WHERE collection = ?");
        let mut binds = vec![Bind::Text(self.name.clone())];
        filter.push_sql(&mut sql, &mut binds);
        options.push_sql(&mut sql, &mut binds);

        let rows: Vec<DocumentRow> = bind_all(sqlx::query_as(&sql), binds)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| {
                let doc = parse_row(row)?;
                Ok(match &options.projection {
                    Some(projection) => projection.apply(doc),
                    None => doc,
                })
            })
            .collect()
    }

    pub async fn find_one(&self, filter: &Filter) -> Result<Option<Document>, DocStoreError> {
        let mut docs = self.find(filter, &FindOptions::new().limit(1)).await?;
        Ok(docs.pop())
    }

    pub async fn count(&self, filter: &Filter) -> Result<u64, DocStoreError> {
        let mut sql = String::from("SELECT COUNT(*) FROM documents WHERE collection = ?");
        let mut binds = vec![Bind::Text(self.name.clone())];
        filter.push_sql(&mut sql, &mut binds);

        let (count,): (i64,) = bind_all(sqlx::query_as(&sql), binds)
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    /// Apply `$set` semantics to the first matching document: listed fields
    /// are overwritten, all others are left untouched.
    pub async fn update_one(&self, filter: &Filter, set: Document) -> Result<UpdateResult, DocStoreError> {
        if set.contains_key(ID_FIELD) {
            return Err(DocStoreError::InvalidId(
                "the _id field is immutable".to_string(),
            ));
        }
        let validator = self.validator().await?;

        let mut sql = String::from("SELECT seq, body FROM documents WHERE collection = ?");
        let mut binds = vec![Bind::Text(self.name.clone())];
        filter.push_sql(&mut sql, &mut binds);
        sql.push_str(" ORDER BY seq ASC LIMIT 1");

        // Write lock up front: a deferred read lock can't be upgraded under contention.
        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;
        let row: Option<(i64, String)> = bind_all(sqlx::query_as(&sql), binds)
            .fetch_optional(&mut *tx)
            .await?;

        let Some((seq, body)) = row else {
            return Ok(UpdateResult::default());
        };

        let current: Document = serde_json::from_str(&body)?;
        let mut updated = current.clone();
        for (key, value) in set {
            updated.insert(key, value);
        }

        if updated == current {
            return Ok(UpdateResult {
                matched_count: 1,
                modified_count: 0,
            });
        }

        Self::check(validator.as_ref(), &updated)?;
        sqlx::query("UPDATE documents SET body = ? WHERE seq = ?")
            .bind(serde_json::to_string(&updated)?)
            .bind(seq)
            .execute(&mut *tx)
            .await
            .map_err(|e| DocStoreError::from_write(&self.name, e))?;
        tx.commit().await?;

        Ok(UpdateResult {
            matched_count: 1,
            modified_count: 1,
        })
    }

    /// Delete the first matching document. Returns the number deleted (0 or 1).
    pub async fn delete_one(&self, filter: &Filter) -> Result<u64, DocStoreError> {
        let mut sql = String::from(
            "DELETE FROM documents WHERE seq = (SELECT seq FROM documents WHERE collection = ?",
        );
        let mut binds = vec![Bind::Text(self.name.clone())];
        filter.push_sql(&mut sql, &mut binds);
        sql.push_str(" ORDER BY seq ASC LIMIT 1)");

        self.execute_delete(&sql, binds).await
    }

    /// Delete every matching document. Returns the number deleted.
    pub async fn delete_many(&self, filter: &Filter) -> Result<u64, DocStoreError> {
        let mut sql = String::from("DELETE FROM documents WHERE collection = ?");
        let mut binds = vec![Bind::Text(self.name.clone())];
        filter.push_sql(&mut sql, &mut binds);

        self.execute_delete(&sql, binds).await
    }

    async fn execute_delete(&self, sql: &str, binds: Vec<Bind>) -> Result<u64, DocStoreError> {
        let mut query = sqlx::query::<Sqlite>(sql);
        for bind in binds {
            query = match bind {
                Bind::Text(s) => query.bind(s),
                Bind::Int(i) => query.bind(i),
                Bind::Real(f) => query.bind(f),
            };
        }
        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    /// Create an ascending index on `field`, named `<field>_1`. Re-creating an
    /// identical index is a no-op; the same name with different options fails
    /// with [`DocStoreError::IndexConflict`]. A unique index over existing
    /// duplicate values fails with [`DocStoreError::DuplicateKey`].
    pub async fn create_index(&self, field: &str, options: IndexOptions) -> Result<String, DocStoreError> {
        let name = format!("{field}_1");

        let existing: Option<(i64,)> =
            sqlx::query_as("SELECT is_unique FROM indexes WHERE collection = ? AND name = ?")
                .bind(&self.name)
                .bind(&name)
                .fetch_optional(&self.pool)
                .await?;
        if let Some((is_unique,)) = existing {
            if (is_unique != 0) == options.unique {
                return Ok(name);
            }
            return Err(DocStoreError::IndexConflict(name));
        }

        let sqlite_name = format!("ix_{}_{}", self.name, name).replace('"', "");
        let ddl = format!(
            "CREATE {unique}INDEX IF NOT EXISTS \"{sqlite_name}\" ON documents (json_extract(body, {path})) WHERE collection = {collection}",
            unique = if options.unique { "UNIQUE " } else { "" },
            path = sql_literal(&json_path(field)),
            collection = sql_literal(&self.name),
        );

        let mut tx = self.pool.begin().await?;
        self.register(&mut *tx).await?;
        sqlx::query(&ddl)
            .execute(&mut *tx)
            .await
            .map_err(|e| DocStoreError::from_write(&self.name, e))?;
        sqlx::query("INSERT INTO indexes (collection, name, field, is_unique) VALUES (?, ?, ?, ?)")
            .bind(&self.name)
            .bind(&name)
            .bind(field)
            .bind(options.unique as i64)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(collection = %self.name, index = %name, unique = options.unique, "index created");
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{to_document, BsonType, CreateCollectionOptions, Database, Projection, SortOrder};
    use serde_json::json;

    fn doc(value: Value) -> Document {
        to_document(&value).unwrap()
    }

    async fn games() -> (Database, Collection) {
        let db = Database::open_in_memory().await.unwrap();
        let coll = db.collection("consolegame");
        coll.insert_many(vec![
            doc(json!({"Name": "Mario Kart 7", "Platform": "3DS", "Year": "2011", "Global_Sales": 12.2})),
            doc(json!({"Name": "Super Mario 3D Land", "Platform": "3DS", "Year": "2011", "Global_Sales": 10.8})),
            doc(json!({"Name": "Zelda OoT 3D", "Platform": "3DS", "Year": "2011", "Global_Sales": 3.8})),
            doc(json!({"Name": "Pokemon X/Y", "Platform": "3DS", "Year": "2013", "Global_Sales": 14.4})),
            doc(json!({"Name": "Nintendogs", "Platform": "DS", "Year": "2005", "Global_Sales": 24.7})),
            doc(json!({"Name": "Tiny 3DS game", "Platform": "3DS", "Year": "2011", "Global_Sales": 0.1})),
        ])
        .await
        .unwrap();
        (db, coll)
    }

    #[tokio::test]
    async fn test_insert_and_find_by_id() {
        let db = Database::open_in_memory().await.unwrap();
        let coll = db.collection("livre");
        let id = coll.insert_one(doc(json!({"title": "Dune", "year": 1965}))).await.unwrap();

        let found = coll.find_one(&Filter::by_id(id)).await.unwrap().unwrap();
        assert_eq!(found["_id"], id.to_string());
        assert_eq!(found["title"], "Dune");
        assert_eq!(found["year"], 1965);

        let missing = coll.find_one(&Filter::by_id(DocumentId::new())).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_find_with_equality_filters() {
        let (_db, coll) = games().await;
        let all_3ds = coll.find(&Filter::new().eq("Platform", "3DS"), &FindOptions::new()).await.unwrap();
        assert_eq!(all_3ds.len(), 5);

        let in_2011 = coll
            .find(&Filter::new().eq("Platform", "3DS").eq("Year", "2011"), &FindOptions::new())
            .await
            .unwrap();
        assert_eq!(in_2011.len(), 4);

        // numbers and strings never compare equal
        let numeric = coll
            .find(&Filter::new().eq("Year", 2011), &FindOptions::new())
            .await
            .unwrap();
        assert!(numeric.is_empty());
    }

    #[tokio::test]
    async fn test_sort_limit_and_projection() {
        let (_db, coll) = games().await;
        let top = coll
            .find(
                &Filter::new().eq("Platform", "3DS").eq("Year", "2011"),
                &FindOptions::new()
                    .sort("Global_Sales", SortOrder::Descending)
                    .limit(3)
                    .projection(Projection::include(["Name", "Global_Sales"]).without_id()),
            )
            .await
            .unwrap();

        let names: Vec<&str> = top.iter().map(|d| d["Name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["Mario Kart 7", "Super Mario 3D Land", "Zelda OoT 3D"]);
        assert!(top.iter().all(|d| d.len() == 2));
    }

    #[tokio::test]
    async fn test_sort_by_id_descending_is_reverse_insertion() {
        let (_db, coll) = games().await;
        let recent = coll
            .find(&Filter::new(), &FindOptions::new().sort(ID_FIELD, SortOrder::Descending).limit(2))
            .await
            .unwrap();
        assert_eq!(recent[0]["Name"], "Tiny 3DS game");
        assert_eq!(recent[1]["Name"], "Nintendogs");
    }

    #[tokio::test]
    async fn test_update_one_sets_fields() {
        let (_db, coll) = games().await;
        let filter = Filter::new().eq("Name", "Nintendogs");

        let result = coll.update_one(&filter, doc(json!({"Genre": "Simulation"}))).await.unwrap();
        assert_eq!(result, UpdateResult { matched_count: 1, modified_count: 1 });

        let same = coll.update_one(&filter, doc(json!({"Genre": "Simulation"}))).await.unwrap();
        assert_eq!(same, UpdateResult { matched_count: 1, modified_count: 0 });

        let updated = coll.find_one(&filter).await.unwrap().unwrap();
        assert_eq!(updated["Genre"], "Simulation");
        assert_eq!(updated["Platform"], "DS");

        let none = coll
            .update_one(&Filter::by_id(DocumentId::new()), doc(json!({"Genre": "x"})))
            .await
            .unwrap();
        assert_eq!(none, UpdateResult::default());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_updates_on_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("games.db"), &crate::ConnectOptions::default())
            .await
            .unwrap();
        let coll = db.collection("consolegame");
        let id = coll.insert_one(doc(json!({"Name": "Tetris"}))).await.unwrap();

        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let coll = coll.clone();
                tokio::spawn(async move {
                    let mut set = Document::new();
                    set.insert(format!("field_{i}"), json!(i));
                    coll.update_one(&Filter::by_id(id), set).await
                })
            })
            .collect();
        for task in tasks {
            let result = task.await.unwrap().unwrap();
            assert_eq!(result.modified_count, 1);
        }

        let stored = coll.find_one(&Filter::by_id(id)).await.unwrap().unwrap();
        for i in 0..8 {
            assert_eq!(stored[&format!("field_{i}")], i);
        }
        db.close().await;
    }

    #[tokio::test]
    async fn test_delete_one_and_many() {
        let (_db, coll) = games().await;
        assert_eq!(coll.delete_one(&Filter::new().eq("Platform", "3DS")).await.unwrap(), 1);
        assert_eq!(coll.count(&Filter::new().eq("Platform", "3DS")).await.unwrap(), 4);
        assert_eq!(coll.delete_many(&Filter::new().eq("Platform", "3DS")).await.unwrap(), 4);
        assert_eq!(coll.delete_many(&Filter::new().eq("Platform", "3DS")).await.unwrap(), 0);
        assert_eq!(coll.count(&Filter::new()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unique_index_rejects_duplicates() {
        let db = Database::open_in_memory().await.unwrap();
        let coll = db.collection("livre");
        coll.create_index("title", IndexOptions { unique: true }).await.unwrap();
        coll.insert_one(doc(json!({"title": "Dune"}))).await.unwrap();

        let err = coll.insert_one(doc(json!({"title": "Dune"}))).await.unwrap_err();
        assert_eq!(err.code(), Some(11000));

        // other collections are not constrained by the partial index
        db.collection("other").insert_one(doc(json!({"title": "Dune"}))).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_into_duplicate_fails() {
        let db = Database::open_in_memory().await.unwrap();
        let coll = db.collection("livre");
        coll.create_index("title", IndexOptions { unique: true }).await.unwrap();
        coll.insert_one(doc(json!({"title": "Dune"}))).await.unwrap();
        let id = coll.insert_one(doc(json!({"title": "Emma"}))).await.unwrap();

        let err = coll
            .update_one(&Filter::by_id(id), doc(json!({"title": "Dune"})))
            .await
            .unwrap_err();
        assert!(matches!(err, DocStoreError::DuplicateKey { .. }));
    }

    #[tokio::test]
    async fn test_insert_many_is_all_or_nothing() {
        let db = Database::open_in_memory().await.unwrap();
        let coll = db.collection("livre");
        coll.create_index("title", IndexOptions { unique: true }).await.unwrap();

        let err = coll
            .insert_many(vec![doc(json!({"title": "A"})), doc(json!({"title": "A"}))])
            .await
            .unwrap_err();
        assert!(matches!(err, DocStoreError::DuplicateKey { .. }));
        assert_eq!(coll.count(&Filter::new()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_create_index_is_idempotent_and_detects_conflicts() {
        let db = Database::open_in_memory().await.unwrap();
        let coll = db.collection("livre");
        let name = coll.create_index("title", IndexOptions { unique: true }).await.unwrap();
        assert_eq!(name, "title_1");
        assert_eq!(
            coll.create_index("title", IndexOptions { unique: true }).await.unwrap(),
            "title_1"
        );
        let err = coll.create_index("title", IndexOptions { unique: false }).await.unwrap_err();
        assert!(matches!(err, DocStoreError::IndexConflict(_)));
    }

    #[tokio::test]
    async fn test_unique_index_over_existing_duplicates_fails() {
        let db = Database::open_in_memory().await.unwrap();
        let coll = db.collection("livre");
        coll.insert_one(doc(json!({"title": "Dune"}))).await.unwrap();
        coll.insert_one(doc(json!({"title": "Dune"}))).await.unwrap();

        let err = coll.create_index("title", IndexOptions { unique: true }).await.unwrap_err();
        assert_eq!(err.code(), Some(11000));
    }

    #[tokio::test]
    async fn test_validator_rejects_invalid_writes() {
        let db = Database::open_in_memory().await.unwrap();
        let schema = JsonSchema::object()
            .required(["year"])
            .property("year", JsonSchema::of(BsonType::Int).minimum(1901.0));
        let coll = db
            .create_collection("livre", CreateCollectionOptions { validator: Some(schema) })
            .await
            .unwrap();

        let err = coll.insert_one(doc(json!({"year": 1800}))).await.unwrap_err();
        assert!(matches!(err, DocStoreError::ValidationFailed(_)));
        assert!(err.to_string().contains("validation"));

        let id = coll.insert_one(doc(json!({"year": 1999}))).await.unwrap();
        let err = coll
            .update_one(&Filter::by_id(id), doc(json!({"year": "soon"})))
            .await
            .unwrap_err();
        assert!(matches!(err, DocStoreError::ValidationFailed(_)));
    }

    #[tokio::test]
    async fn test_caller_supplied_id_is_kept() {
        let db = Database::open_in_memory().await.unwrap();
        let coll = db.collection("consolegame");
        let id = DocumentId::new();
        let stored = coll
            .insert_one(doc(json!({"_id": id.to_string(), "Name": "Tetris"})))
            .await
            .unwrap();
        assert_eq!(stored, id);

        let err = coll.insert_one(doc(json!({"_id": 42}))).await.unwrap_err();
        assert!(matches!(err, DocStoreError::InvalidId(_)));
    }
}
