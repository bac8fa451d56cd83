//! Book page endpoints
//!
//! Every action re-renders the full list so the page never loses it, even
//! when the action failed.

use axum::{
    extract::{Path, State},
    response::Html,
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::books::{Book, BookInput, BookService};
use crate::error::ServiceError;
use crate::service::views;

pub const DUPLICATE_TITLE: &str = "Un livre avec ce titre existe déjà.";
pub const SCHEMA_REJECTED: &str =
    "Validation échouée: Vérifiez que tous les champs requis sont remplis correctement (année > 1900).";
pub const MALFORMED_JSON: &str = "Format JSON invalide. Vérifiez la syntaxe.";

/// What the book page template receives.
#[derive(Debug, Clone, PartialEq)]
pub struct BookPage {
    pub books: Vec<Book>,
    pub error: Option<String>,
    pub success: Option<String>,
}

enum Banner {
    Success(String),
    Error(String),
}

/// User-facing text for a failed book action.
pub fn user_message(err: &ServiceError) -> String {
    match err {
        ServiceError::Conflict(_) => DUPLICATE_TITLE.to_string(),
        ServiceError::SchemaRejected(_) => SCHEMA_REJECTED.to_string(),
        ServiceError::MalformedJson(_) => MALFORMED_JSON.to_string(),
        other => other.to_string(),
    }
}

/// Empty page carrying the error that prevented listing.
fn listing_failed(action: &'static str, err: &ServiceError) -> BookPage {
    tracing::error!(action, error = %err, "failed to list books");
    BookPage {
        books: Vec::new(),
        error: Some(user_message(err)),
        success: None,
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BulkForm {
    pub books: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TitleForm {
    #[serde(alias = "titre")]
    pub title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AuthorForm {
    #[serde(alias = "auteur")]
    pub author: Option<String>,
}

pub struct BookEndpoints {
    service: Arc<BookService>,
}

impl BookEndpoints {
    pub fn new(service: Arc<BookService>) -> Self {
        Self { service }
    }

    async fn render(&self, action: &'static str, outcome: Result<Banner, ServiceError>) -> BookPage {
        let banner = outcome.unwrap_or_else(|e| {
            tracing::error!(action, error = %e, "book action failed");
            Banner::Error(user_message(&e))
        });

        match self.service.get_all().await {
            Ok(books) => match banner {
                Banner::Success(msg) => BookPage {
                    books,
                    error: None,
                    success: Some(msg),
                },
                Banner::Error(msg) => BookPage {
                    books,
                    error: Some(msg),
                    success: None,
                },
            },
            Err(e) => listing_failed(action, &e),
        }
    }

    pub async fn list(&self) -> BookPage {
        tracing::info!("HTTP list_books");
        match self.service.get_all().await {
            Ok(books) => BookPage {
                books,
                error: None,
                success: None,
            },
            Err(e) => listing_failed("list", &e),
        }
    }

    pub async fn add(&self, input: BookInput) -> BookPage {
        tracing::info!(title = ?input.title, "HTTP add_book");
        let outcome = self
            .service
            .create(&input)
            .await
            .map(|_| Banner::Success("Livre ajouté avec succès!".to_string()));
        self.render("add_book", outcome).await
    }

    pub async fn add_many(&self, raw: &str) -> BookPage {
        tracing::info!(bytes = raw.len(), "HTTP add_many_books");
        let outcome = async {
            let inputs = BookService::parse_batch(raw)?;
            let count = self.service.create_many(&inputs).await?;
            Ok::<_, ServiceError>(Banner::Success(format!(
                "{count} livre(s) ajouté(s) avec succès!"
            )))
        }
        .await;
        self.render("add_many_books", outcome).await
    }

    pub async fn update(&self, id: &str, input: BookInput) -> BookPage {
        tracing::info!(%id, "HTTP update_book");
        let outcome = self
            .service
            .update(id, &input)
            .await
            .map(|_| Banner::Success("Livre mis à jour avec succès!".to_string()));
        self.render("update_book", outcome).await
    }

    pub async fn delete(&self, id: &str) -> BookPage {
        tracing::info!(%id, "HTTP delete_book");
        let outcome = self
            .service
            .delete(id)
            .await
            .map(|_| Banner::Success("Livre supprimé avec succès!".to_string()));
        self.render("delete_book", outcome).await
    }

    pub async fn delete_by_title(&self, title: Option<&str>) -> BookPage {
        tracing::info!(?title, "HTTP delete_book_by_title");
        let outcome = self.service.delete_by_title(title).await.map(|deleted| {
            if deleted == 0 {
                Banner::Error("Aucun livre trouvé avec ce titre".to_string())
            } else {
                Banner::Success("Livre supprimé avec succès!".to_string())
            }
        });
        self.render("delete_book_by_title", outcome).await
    }

    pub async fn delete_by_author(&self, author: Option<&str>) -> BookPage {
        tracing::info!(?author, "HTTP delete_books_by_author");
        let outcome = self.service.delete_by_author(author).await.map(|deleted| {
            if deleted == 0 {
                Banner::Error("Aucun livre trouvé pour cet auteur".to_string())
            } else {
                Banner::Success(format!("{deleted} livre(s) supprimé(s) avec succès!"))
            }
        });
        self.render("delete_books_by_author", outcome).await
    }
}

pub fn routes(endpoints: Arc<BookEndpoints>) -> Router {
    Router::new()
        .route("/books", get(list_books))
        .route("/books/add", post(add_book))
        .route("/books/add-many", post(add_many_books))
        .route("/books/update/:id", post(update_book))
        .route("/books/delete/:id", post(delete_book))
        .route("/books/delete-by-title", post(delete_book_by_title))
        .route("/books/delete-by-author", post(delete_books_by_author))
        .with_state(endpoints)
}

type Books = State<Arc<BookEndpoints>>;

fn html(page: BookPage) -> Html<String> {
    Html(views::book_page(&page))
}

async fn list_books(State(books): Books) -> Html<String> {
    html(books.list().await)
}

async fn add_book(State(books): Books, Form(input): Form<BookInput>) -> Html<String> {
    html(books.add(input).await)
}

async fn add_many_books(State(books): Books, Form(form): Form<BulkForm>) -> Html<String> {
    html(books.add_many(&form.books).await)
}

async fn update_book(
    State(books): Books,
    Path(id): Path<String>,
    Form(input): Form<BookInput>,
) -> Html<String> {
    html(books.update(&id, input).await)
}

async fn delete_book(State(books): Books, Path(id): Path<String>) -> Html<String> {
    html(books.delete(&id).await)
}

async fn delete_book_by_title(State(books): Books, Form(form): Form<TitleForm>) -> Html<String> {
    html(books.delete_by_title(form.title.as_deref()).await)
}

async fn delete_books_by_author(State(books): Books, Form(form): Form<AuthorForm>) -> Html<String> {
    html(books.delete_by_author(form.author.as_deref()).await)
}
