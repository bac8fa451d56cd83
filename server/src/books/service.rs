use docstore::{from_document, to_document, Collection, DocumentId, Filter, FindOptions};
use serde_json::Value;
use std::sync::Arc;

use super::fields;
use super::model::{non_blank, Book, BookInput, BookProblem, BookValidationError, NewBook};
use crate::error::ServiceError;
use crate::persistence::PersistenceHandle;

/// Book operations over the `livre` collection.
pub struct BookService {
    persistence: Arc<PersistenceHandle>,
}

impl BookService {
    pub fn new(persistence: Arc<PersistenceHandle>) -> Self {
        Self { persistence }
    }

    async fn books(&self) -> Result<Collection, ServiceError> {
        Ok(self.persistence.database().await?.collection(fields::COLLECTION))
    }

    /// Every book, in insertion order. A stored document that cannot be read
    /// as a book is logged and left out rather than failing the whole list.
    pub async fn get_all(&self) -> Result<Vec<Book>, ServiceError> {
        let docs = self.books().await?.find(&Filter::new(), &FindOptions::new()).await?;
        Ok(docs
            .into_iter()
            .filter_map(|doc| {
                let id = doc.get(docstore::ID_FIELD).cloned();
                from_document::<Book>(doc)
                    .map_err(|e| tracing::warn!(?id, error = %e, "skipping unreadable book"))
                    .ok()
            })
            .collect())
    }

    pub async fn create(&self, input: &BookInput) -> Result<DocumentId, ServiceError> {
        let book = input.validate(None)?;
        let id = self.books().await?.insert_one(to_document(&book)?).await?;
        tracing::debug!(%id, title = %book.title, "book created");
        Ok(id)
    }

    /// Validate every element first; nothing is inserted unless all pass.
    /// Returns the number of books inserted.
    pub async fn create_many(&self, inputs: &[BookInput]) -> Result<usize, ServiceError> {
        if inputs.is_empty() {
            return Err(ServiceError::EmptyBatch);
        }

        let docs = inputs
            .iter()
            .enumerate()
            .map(|(index, input)| Ok(to_document(&input.validate(Some(index))?)?))
            .collect::<Result<Vec<_>, ServiceError>>()?;

        let ids = self.books().await?.insert_many(docs).await?;
        Ok(ids.len())
    }

    /// Decode the bulk-add payload: a JSON array of book objects. Elements
    /// that are not objects come back empty and fail validation with their
    /// index; mistyped fields are handled by [`BookInput`] itself.
    pub fn parse_batch(raw: &str) -> Result<Vec<BookInput>, ServiceError> {
        let value: Value = serde_json::from_str(raw).map_err(ServiceError::MalformedJson)?;
        match value {
            Value::Array(items) if !items.is_empty() => Ok(items
                .into_iter()
                .map(|item| serde_json::from_value(item).unwrap_or_default())
                .collect()),
            _ => Err(ServiceError::EmptyBatch),
        }
    }

    /// Overwrite title, author and year (and genre when given) of the book.
    /// Returns the number of documents modified; an unknown id gives 0.
    pub async fn update(&self, id: &str, input: &BookInput) -> Result<u64, ServiceError> {
        let NewBook {
            title,
            author,
            year,
            genre,
        } = input.validate(None)?;
        let id: DocumentId = id.parse()?;

        let mut set = docstore::Document::new();
        set.insert(fields::TITLE.to_string(), title.into());
        set.insert(fields::AUTHOR.to_string(), author.into());
        set.insert(fields::YEAR.to_string(), year.into());
        if let Some(genre) = genre {
            set.insert(fields::GENRE.to_string(), genre.into());
        }

        let result = self.books().await?.update_one(&Filter::by_id(id), set).await?;
        Ok(result.modified_count)
    }

    pub async fn delete(&self, id: &str) -> Result<u64, ServiceError> {
        let id: DocumentId = id.parse()?;
        Ok(self.books().await?.delete_one(&Filter::by_id(id)).await?)
    }

    /// Delete the first book whose title matches exactly (after trimming).
    pub async fn delete_by_title(&self, title: Option<&str>) -> Result<u64, ServiceError> {
        let title = non_blank(title)
            .ok_or_else(|| BookValidationError::new(BookProblem::MissingTitleForDeletion))?;
        Ok(self
            .books()
            .await?
            .delete_one(&Filter::new().eq(fields::TITLE, title))
            .await?)
    }

    /// Delete every book by this author (exact match after trimming).
    pub async fn delete_by_author(&self, author: Option<&str>) -> Result<u64, ServiceError> {
        let author = non_blank(author)
            .ok_or_else(|| BookValidationError::new(BookProblem::MissingAuthorForDeletion))?;
        Ok(self
            .books()
            .await?
            .delete_many(&Filter::new().eq(fields::AUTHOR, author))
            .await?)
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<Book>, ServiceError> {
        let id: DocumentId = id.parse()?;
        match self.books().await?.find_one(&Filter::by_id(id)).await? {
            Some(doc) => Ok(Some(from_document(doc)?)),
            None => Ok(None),
        }
    }
}
