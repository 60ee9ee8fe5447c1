// Shared list/create/update/delete logic behind every resource handler

use axum::{extract::rejection::JsonRejection, Json};
use serde_json::{json, Value};
use tracing::debug;

use crate::auth::Claims;
use crate::error::ApiError;
use crate::state::AppState;
use crate::storage::{Collection, Entity};

/// Turn a body rejection into a JSON 400 instead of axum's plain-text reply
fn body(payload: Result<Json<Entity>, JsonRejection>) -> Result<Entity, ApiError> {
    payload
        .map(|Json(entity)| entity)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

pub(crate) async fn list(
    state: &AppState,
    collection: Collection,
    claims: &Claims,
) -> Result<Json<Vec<Entity>>, ApiError> {
    let entities = state.store.list_all(collection).await?;
    debug!(user = %claims.sub, count = entities.len(), "Listed {}", collection);
    Ok(Json(entities))
}

pub(crate) async fn create(
    state: &AppState,
    collection: Collection,
    claims: &Claims,
    payload: Result<Json<Entity>, JsonRejection>,
) -> Result<Json<Entity>, ApiError> {
    let stored = state.store.insert(collection, body(payload)?).await?;
    debug!(user = %claims.sub, "Created entry in {}", collection);
    Ok(Json(stored))
}

pub(crate) async fn update(
    state: &AppState,
    collection: Collection,
    claims: &Claims,
    id: &str,
    payload: Result<Json<Entity>, JsonRejection>,
) -> Result<Json<Entity>, ApiError> {
    let updated = state.store.update_by_id(collection, id, body(payload)?).await?;
    debug!(user = %claims.sub, id, "Updated entry in {}", collection);
    Ok(Json(updated))
}

pub(crate) async fn delete(
    state: &AppState,
    collection: Collection,
    claims: &Claims,
    id: &str,
) -> Result<Json<Value>, ApiError> {
    state.store.delete_by_id(collection, id).await?;
    debug!(user = %claims.sub, id, "Deleted entry from {}", collection);
    Ok(Json(json!({ "message": format!("{} deleted", collection.label()) })))
}
