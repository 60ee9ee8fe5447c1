#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use book_bingo_api::auth::{Claims, JwtSettings};
use book_bingo_api::storage::FileStore;
use book_bingo_api::{app, AppState};

pub const SECRET: &str = "integration-test-secret";

pub struct TestApp {
    pub router: Router,
    // Keeps the data directory alive for the duration of the test
    pub dir: TempDir,
}

impl TestApp {
    pub fn data_file(&self) -> std::path::PathBuf {
        self.dir.path().join("books.json")
    }
}

/// Router backed by a fresh, empty data file
pub async fn spawn_app() -> Result<TestApp> {
    spawn_app_with(None).await
}

/// Router backed by a data file pre-populated with `seed`
pub async fn spawn_app_with(seed: Option<Value>) -> Result<TestApp> {
    let dir = tempfile::tempdir().context("failed to create temp dir")?;
    let path = dir.path().join("books.json");

    if let Some(seed) = seed {
        std::fs::write(&path, serde_json::to_vec(&seed)?)?;
    }

    let store = FileStore::open(&path).await?;
    let state = AppState::new(Arc::new(store), JwtSettings::new(SECRET));

    Ok(TestApp {
        router: app(state),
        dir,
    })
}

/// A valid token signed with the test secret
pub fn token() -> String {
    JwtSettings::new(SECRET)
        .generate(&Claims::new("tester", 1))
        .expect("failed to sign test token")
}

pub fn bearer() -> String {
    format!("Bearer {}", token())
}

/// Send one request through the router; JSON bodies are parsed, anything else
/// comes back as a string value
pub async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    authorization: Option<&str>,
    body: Option<Value>,
) -> Result<(StatusCode, Value)> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(auth) = authorization {
        builder = builder.header(header::AUTHORIZATION, auth);
    }

    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&json)?))?,
        None => builder.body(Body::empty())?,
    };

    let response = router.clone().oneshot(request).await?;
    let status = response.status();

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let value = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));

    Ok((status, value))
}

pub async fn get_authed(router: &Router, uri: &str) -> Result<(StatusCode, Value)> {
    send(router, Method::GET, uri, Some(&bearer()), None).await
}
