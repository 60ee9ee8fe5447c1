pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod state;
pub mod storage;

use std::any::Any;
use std::sync::Arc;

use axum::{
    response::{IntoResponse, Response},
    routing::{get, put},
    Router,
};
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::ApiError;
use crate::storage::{DocumentStore, FileStore, Persistence};

pub use crate::state::AppState;

/// Install the fmt subscriber for both binaries, honouring `RUST_LOG` (default `info`)
pub fn init_tracing() {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(directives.as_deref()))
        .init();
}

fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

/// Build the full router: public routes plus the token-protected resources
pub fn app(state: AppState) -> Router {
    Router::new()
        // Public
        .route("/", get(handlers::home::root))
        .route("/health", get(handlers::home::health))
        // Protected
        .merge(protected_routes(state.clone()))
        // Global middleware
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn protected_routes(state: AppState) -> Router<AppState> {
    use handlers::{bingo, books, filters};

    Router::new()
        .route("/books", get(books::list).post(books::create))
        .route("/books/:id", put(books::update).delete(books::delete))
        .route("/bingo", get(bingo::list).post(bingo::create))
        .route("/bingo/:id", put(bingo::update).delete(bingo::delete))
        // Filters are read-only
        .route("/filters", get(filters::list))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::jwt_auth_middleware,
        ))
}

/// Render a handler panic as the generic 500 body
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");

    tracing::error!("Request handler panicked: {}", detail);
    ApiError::internal().into_response()
}

/// Open the configured backing store
pub async fn open_store(config: &StorageConfig) -> anyhow::Result<Arc<dyn Persistence>> {
    let store: Arc<dyn Persistence> = match config.backend {
        StorageBackend::File => Arc::new(FileStore::open(&config.data_file).await?),
        StorageBackend::MongoDb => {
            let uri = config
                .mongo_uri
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("MONGODB_URI is not configured"))?;
            Arc::new(DocumentStore::connect(uri, &config.mongo_database).await?)
        }
    };

    tracing::info!("Using {} storage backend", store.backend());
    Ok(store)
}
