use std::sync::Arc;

use crate::auth::JwtSettings;
use crate::storage::Persistence;

/// Shared application state, built once at startup and cloned per request
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Persistence>,
    pub jwt: JwtSettings,
}

impl AppState {
    pub fn new(store: Arc<dyn Persistence>, jwt: JwtSettings) -> Self {
        Self { store, jwt }
    }
}
