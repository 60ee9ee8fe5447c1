// handlers/books.rs - /books and /books/:id

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use serde_json::Value;

use super::collection;
use crate::auth::Claims;
use crate::error::ApiError;
use crate::state::AppState;
use crate::storage::{Collection, Entity};

/// GET /books - List every book
pub async fn list(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Entity>>, ApiError> {
    collection::list(&state, Collection::Books, &claims).await
}

/// POST /books - Store the body as a new book
pub async fn create(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<Entity>, JsonRejection>,
) -> Result<Json<Entity>, ApiError> {
    collection::create(&state, Collection::Books, &claims, payload).await
}

/// PUT /books/:id - Replace a book
pub async fn update(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    payload: Result<Json<Entity>, JsonRejection>,
) -> Result<Json<Entity>, ApiError> {
    collection::update(&state, Collection::Books, &claims, &id, payload).await
}

/// DELETE /books/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    collection::delete(&state, Collection::Books, &claims, &id).await
}
