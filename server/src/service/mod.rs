//! HTTP surface: HTML book pages and the JSON game API.

pub mod endpoints;
pub mod views;

use axum::{
    http::{header::CONTENT_TYPE, Method},
    response::Redirect,
    routing::get,
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;

use crate::books::BookService;
use crate::games::GameService;
use endpoints::{BookEndpoints, GameEndpoints};

/// Build the application router.
pub fn router(books: Arc<BookService>, games: Arc<GameService>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    let books = endpoints::books::routes(Arc::new(BookEndpoints::new(books)));
    let games = endpoints::games::routes(Arc::new(GameEndpoints::new(games))).layer(cors);

    Router::new()
        .route("/", get(|| async { Redirect::to("/books") }))
        .merge(books)
        .merge(games)
}
