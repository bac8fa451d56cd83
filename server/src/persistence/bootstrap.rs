//! One-time setup of the book collection on connect.

use docstore::{
    BsonType, CreateCollectionOptions, Database, DocStoreError, IndexOptions, JsonSchema,
    DUPLICATE_KEY_CODE,
};

use super::PersistenceError;
use crate::books::fields;

/// Validator enforced by the store on every book write.
pub fn book_schema() -> JsonSchema {
    JsonSchema::object()
        .required([fields::TITLE, fields::AUTHOR, fields::YEAR])
        .property(
            fields::TITLE,
            JsonSchema::of(BsonType::String).description("titre doit être une chaîne de caractères et est requis"),
        )
        .property(
            fields::AUTHOR,
            JsonSchema::of(BsonType::String)
                .min_length(1)
                .description("auteur doit être une chaîne non vide et est requis"),
        )
        .property(
            fields::YEAR,
            JsonSchema::of(BsonType::Int)
                .minimum(1901.0)
                .description("année doit être un entier supérieur à 1900 et est requis"),
        )
        .property(
            fields::GENRE,
            JsonSchema::of(BsonType::String)
                .description("genre est optionnel mais doit être une chaîne si présent"),
        )
}

/// Create the book collection with its validator and unique title index, or,
/// when it already exists, make sure the index is there.
pub async fn ensure_book_collection(db: &Database) -> Result<(), PersistenceError> {
    let unique = IndexOptions { unique: true };

    if !db.collection_exists(fields::COLLECTION).await? {
        let books = db
            .create_collection(
                fields::COLLECTION,
                CreateCollectionOptions {
                    validator: Some(book_schema()),
                },
            )
            .await?;
        books.create_index(fields::TITLE, unique).await?;
        return Ok(());
    }

    match db
        .collection(fields::COLLECTION)
        .create_index(fields::TITLE, unique)
        .await
    {
        Ok(_) | Err(DocStoreError::IndexConflict(_)) => Ok(()),
        Err(e) if e.code() == Some(DUPLICATE_KEY_CODE) => {
            tracing::warn!(
                collection = fields::COLLECTION,
                "Cannot create unique index on title because duplicate values exist; clean the collection"
            );
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
