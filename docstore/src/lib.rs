//! Schema-flexible document collections on top of SQLite.
//!
//! ## Storage layout
//!
//! [`Database`] wraps a `sqlx::SqlitePool`. Every document of every collection
//! lives in one `documents` table as a JSON object, keyed by a [`DocumentId`]
//! and ordered by an auto-increment sequence (natural order = insertion order).
//! Embedded migrations create the schema when the database is opened.
//!
//! ## Capabilities
//!
//! | Operation | Entry point |
//! |-----------|-------------|
//! | Create / list collections | [`Database::create_collection`], [`Database::collection_exists`] |
//! | Insert | [`Collection::insert_one`], [`Collection::insert_many`] |
//! | Query | [`Collection::find`], [`Collection::find_one`] with [`Filter`] and [`FindOptions`] |
//! | Update (`$set` semantics) | [`Collection::update_one`] |
//! | Delete | [`Collection::delete_one`], [`Collection::delete_many`] |
//! | Unique / plain indexes | [`Collection::create_index`] |
//!
//! Filters are conjunctions of exact field equalities. Writes to a collection
//! created with a [`JsonSchema`] validator are checked against it before they
//! reach SQLite; unique indexes are SQLite partial expression indexes, so
//! duplicate values surface as [`DocStoreError::DuplicateKey`].

mod collection;
mod database;
mod document;
mod error;
mod query;
mod schema;

pub use collection::{Collection, IndexOptions, UpdateResult};
pub use database::{ConnectOptions, CreateCollectionOptions, Database};
pub use document::{from_document, to_document, Document, DocumentId, ID_FIELD};
pub use error::{DocStoreError, DUPLICATE_KEY_CODE};
pub use query::{Filter, FindOptions, Projection, SortOrder};
pub use schema::{BsonType, JsonSchema};
