// handlers/bingo.rs - /bingo and /bingo/:id

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

/// GET /bingo - List every bingo item
pub async fn list(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Entity>>, ApiError> {
    collection::list(&state, Collection::Bingo, &claims).await
}

/// POST /bingo - Store the body as a new bingo item
pub async fn create(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<Entity>, JsonRejection>,
) -> Result<Json<Entity>, ApiError> {
    collection::create(&state, Collection::Bingo, &claims, payload).await
}

/// PUT /bingo/:id - Replace a bingo item
pub async fn update(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    payload: Result<Json<Entity>, JsonRejection>,
) -> Result<Json<Entity>, ApiError> {
    collection::update(&state, Collection::Bingo, &claims, &id, payload).await
}

/// DELETE /bingo/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    collection::delete(&state, Collection::Bingo, &claims, &id).await
}
