//! Endpoint handlers organized by domain

pub mod books;
pub mod games;

pub use books::{BookEndpoints, BookPage};
pub use games::GameEndpoints;
