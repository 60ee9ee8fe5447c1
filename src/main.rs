use anyhow::Context;
use clap::Parser;
use tower_http::cors::CorsLayer;

use book_bingo_api::auth::JwtSettings;
use book_bingo_api::{app, config, open_store, AppState};

#[derive(Parser)]
#[command(name = "book-bingo-api")]
#[command(about = "Book Bingo API server")]
#[command(version)]
struct Args {
    #[arg(long, help = "Address to bind (overrides HOST)")]
    host: Option<String>,

    #[arg(long, help = "Port to listen on (overrides PORT)")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up JWT_SECRET, DATA_FILE, etc.
    let _ = dotenvy::dotenv();

    book_bingo_api::init_tracing();

    let args = Args::parse();

    let mut config = config::config().clone();
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    config.validate()?;

    tracing::info!("Starting Book Bingo API in {:?} mode", config.environment);

    let store = open_store(&config.storage).await?;
    let state = AppState::new(store, JwtSettings::new(&config.security.jwt_secret));

    let mut router = app(state);
    if config.security.enable_cors {
        router = router.layer(CorsLayer::permissive());
    }

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Server is running at http://{}/books", bind_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
