//! Books: validated CRUD over the `livre` collection.

mod model;
mod service;

pub use model::{Book, BookInput, BookProblem, BookValidationError};
pub use service::BookService;

/// Collection and stored field names.
pub mod fields {
    pub const COLLECTION: &str = "livre";
    pub const TITLE: &str = "title";
    pub const AUTHOR: &str = "author";
    pub const YEAR: &str = "year";
    pub const GENRE: &str = "genre";
}
