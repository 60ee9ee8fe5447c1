// handlers/filters.rs - /filters is read-only over HTTP

use axum::{extract::State, Extension, Json};

use super::collection;
use crate::auth::Claims;
use crate::error::ApiError;
use crate::state::AppState;
use crate::storage::{Collection, Entity};

/// GET /filters - List every filter
pub async fn list(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Entity>>, ApiError> {
    collection::list(&state, Collection::Filters, &claims).await
}
