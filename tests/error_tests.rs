// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Error bodies, development details and response headers.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use std::sync::Arc;
use tower::ServiceExt;
use tuneverse_api::config::{Config, Environment};
use tuneverse_api::db::{MemoryDb, MusicRepository, Stores};
use tuneverse_api::error::AppError;
use tuneverse_api::models::Music;
use tuneverse_api::routes::create_router;
use tuneverse_api::AppState;

mod common;

struct OfflineMusic;

#[async_trait]
impl MusicRepository for OfflineMusic {
    async fn create_music(&self, _music: &Music) -> Result<(), AppError> {
        Err(AppError::Database("backend offline".to_string()))
    }
    async fn get_music(&self, _music_id: &str) -> Result<Option<Music>, AppError> {
        Err(AppError::Database("backend offline".to_string()))
    }
    async fn update_music(&self, _music: &Music) -> Result<(), AppError> {
        Err(AppError::Database("backend offline".to_string()))
    }
    async fn delete_music(&self, _music_id: &str) -> Result<(), AppError> {
        Err(AppError::Database("backend offline".to_string()))
    }
    async fn list_music(&self, _limit: u32) -> Result<Vec<Music>, AppError> {
        Err(AppError::Database("backend offline".to_string()))
    }
    async fn list_music_by_owner(&self, _owner_id: &str) -> Result<Vec<Music>, AppError> {
        Err(AppError::Database("backend offline".to_string()))
    }
}

fn offline_router(environment: Environment) -> axum::Router {
    let db = Arc::new(MemoryDb::new());
    let stores = Stores {
        users: db.clone(),
        notes: db,
        music: Arc::new(OfflineMusic),
    };
    let config = Config {
        environment,
        ..Config::test_default()
    };
    let state = Arc::new(AppState::new(
        config,
        stores,
        Arc::new(common::FakeIdentity::default()),
        Arc::new(common::FakeMedia::default()),
    ));
    create_router(state)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_server_error_hides_details_in_production() {
    let router = offline_router(Environment::Production);

    let response = router
        .oneshot(common::get("/api/music", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["status"], 500);
    assert_eq!(body["error"], "database_error");
    assert_eq!(body["message"], "Something went wrong on the server.");
    assert!(body.get("details").is_none());
}

#[tokio::test]
async fn test_server_error_shows_details_in_development() {
    let router = offline_router(Environment::Development);

    let response = router
        .oneshot(common::get("/api/music/m1", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response
        .headers()
        .contains_key(header::X_CONTENT_TYPE_OPTIONS));

    let body = body_json(response).await;
    assert_eq!(body["message"], "Something went wrong on the server.");
    assert!(body["details"].as_str().unwrap().contains("backend offline"));
}

#[tokio::test]
async fn test_client_errors_keep_their_message() {
    let app = common::create_test_app();

    let (status, body) = app.send(common::get("/api/notes/missing", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
    assert_eq!(body["message"], "Note not found.");
    assert!(body.get("errors").is_none());
}

#[tokio::test]
async fn test_health_and_welcome() {
    let app = common::create_test_app();

    let (status, body) = app.send(common::get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = app.send(common::get("/api", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_security_headers() {
    let app = common::create_test_app();

    let response = app
        .router
        .clone()
        .oneshot(common::get("/health", None))
        .await
        .unwrap();
    let headers = response.headers();
    assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    assert_eq!(headers[header::X_FRAME_OPTIONS], "DENY");
    assert!(headers.contains_key(header::STRICT_TRANSPORT_SECURITY));

    let dev = common::create_test_app_with_config(Config {
        environment: Environment::Development,
        ..Config::test_default()
    });
    let response = dev
        .router
        .clone()
        .oneshot(common::get("/health", None))
        .await
        .unwrap();
    assert!(!response
        .headers()
        .contains_key(header::STRICT_TRANSPORT_SECURITY));
}

#[tokio::test]
async fn test_cors_allows_configured_origin_only() {
    let app = common::create_test_app();

    let preflight = |origin: &str| {
        Request::builder()
            .method("OPTIONS")
            .uri("/api/notes")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap()
    };

    let response = app
        .router
        .clone()
        .oneshot(preflight("http://localhost:4200"))
        .await
        .unwrap();
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:4200"
    );

    let response = app
        .router
        .clone()
        .oneshot(preflight("https://evil.example"))
        .await
        .unwrap();
    assert!(!response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
}
