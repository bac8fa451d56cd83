//! Games: queries and administrative writes over the `consolegame` collection.

mod model;
mod service;

pub use model::Game;
pub use service::GameService;

pub const COLLECTION: &str = "consolegame";

/// Number of games returned by [`GameService::get_all`] when no limit is given.
pub const DEFAULT_LIMIT: u64 = 100;

/// Fields kept in the top-3 ranking.
pub const TOP3_FIELDS: [&str; 7] = [
    "Name",
    "Global_Sales",
    "Platform",
    "Year",
    "Genre",
    "Publisher",
    "_id",
];
