//! Game JSON endpoints
//!
//! Read routes answer `{success, count, data}`; every failure answers
//! `{success: false, error}`.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use docstore::Document;
use serde_json::json;
use std::sync::Arc;

use crate::error::{ErrorKind, ServiceError};
use crate::games::{Game, GameService, DEFAULT_LIMIT};

/// A failed game request, rendered as the JSON error envelope.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        let status = match err.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Infrastructure => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({ "success": false, "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

fn list(games: Vec<Document>) -> Json<serde_json::Value> {
    Json(json!({ "success": true, "count": games.len(), "data": games }))
}

pub struct GameEndpoints {
    service: Arc<GameService>,
}

impl GameEndpoints {
    pub fn new(service: Arc<GameService>) -> Self {
        Self { service }
    }

    fn logged(&self, action: &'static str, err: ServiceError) -> ApiError {
        tracing::error!(action, error = %err, "game request failed");
        err.into()
    }
}

pub fn routes(endpoints: Arc<GameEndpoints>) -> Router {
    Router::new()
        .route("/games", get(list_games))
        .route("/games/:platform", get(games_by_platform))
        .route("/games/:platform/:year", get(games_by_platform_and_year))
        .route("/games/:platform/:year/top3", get(top3_games))
        .route("/admin/games", post(create_game))
        .route(
            "/admin/games/:id",
            get(get_game).put(update_game).delete(delete_game),
        )
        .with_state(endpoints)
}

type Games = State<Arc<GameEndpoints>>;

async fn list_games(State(games): Games) -> Result<Json<serde_json::Value>, ApiError> {
    tracing::info!("HTTP list_games");
    let docs = games
        .service
        .get_all(DEFAULT_LIMIT)
        .await
        .map_err(|e| games.logged("list_games", e))?;
    Ok(list(docs))
}

async fn games_by_platform(
    State(games): Games,
    Path(platform): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    tracing::info!(%platform, "HTTP games_by_platform");
    let docs = games
        .service
        .get_by_platform(&platform)
        .await
        .map_err(|e| games.logged("games_by_platform", e))?;
    Ok(list(docs))
}

async fn games_by_platform_and_year(
    State(games): Games,
    Path((platform, year)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    tracing::info!(%platform, %year, "HTTP games_by_platform_and_year");
    let docs = games
        .service
        .get_by_platform_and_year(&platform, &year)
        .await
        .map_err(|e| games.logged("games_by_platform_and_year", e))?;
    Ok(list(docs))
}

async fn top3_games(
    State(games): Games,
    Path((platform, year)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    tracing::info!(%platform, %year, "HTTP top3_games");
    let docs = games
        .service
        .get_top3_by_platform_and_year(&platform, &year)
        .await
        .map_err(|e| games.logged("top3_games", e))?;
    Ok(list(docs))
}

async fn create_game(
    State(games): Games,
    body: Result<Json<Game>, JsonRejection>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let Json(game) = body?;
    tracing::info!(name = ?game.name, "HTTP create_game");
    let id = games
        .service
        .create(&game)
        .await
        .map_err(|e| games.logged("create_game", e))?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": { "id": id } })),
    ))
}

async fn get_game(
    State(games): Games,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    tracing::info!(%id, "HTTP get_game");
    let game = games
        .service
        .get_by_id(&id)
        .await
        .map_err(|e| games.logged("get_game", e))?
        .ok_or_else(|| ServiceError::NotFound("Jeu non trouvé".to_string()))?;
    Ok(Json(json!({ "success": true, "data": game })))
}

async fn update_game(
    State(games): Games,
    Path(id): Path<String>,
    body: Result<Json<Game>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(game) = body?;
    tracing::info!(%id, "HTTP update_game");
    let modified = games
        .service
        .update(&id, &game)
        .await
        .map_err(|e| games.logged("update_game", e))?;
    Ok(Json(json!({ "success": true, "modified": modified })))
}

async fn delete_game(
    State(games): Games,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    tracing::info!(%id, "HTTP delete_game");
    let deleted = games
        .service
        .delete(&id)
        .await
        .map_err(|e| games.logged("delete_game", e))?;
    Ok(Json(json!({ "success": true, "deleted": deleted })))
}
