// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Tuneverse API Server
//!
//! Serves user profiles, notes, the public note feed and uploaded music.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tuneverse_api::{
    config::{Config, DatabaseBackend, Environment},
    db::{FirestoreDb, MemoryDb, Stores},
    services::{CloudinaryMedia, FirebaseIdentity},
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration from environment
    let config = Config::from_env()?;

    init_logging(config.environment);
    tracing::info!(
        port = config.port,
        environment = ?config.environment,
        "Starting Tuneverse API"
    );

    let stores = match config.database_backend {
        DatabaseBackend::Firestore => {
            Stores::from_backend(FirestoreDb::new(&config.firebase_project_id).await?)
        }
        DatabaseBackend::Memory => {
            tracing::warn!("Using in-memory database; data is lost on restart");
            Stores::from_backend(MemoryDb::new())
        }
    };

    let identity = Arc::new(FirebaseIdentity::new(&config)?);
    tracing::info!(project = %config.firebase_project_id, "Identity provider initialized");

    let media = Arc::new(CloudinaryMedia::new(&config)?);
    tracing::info!(cloud = %config.cloudinary_cloud_name, "Media host initialized");

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), stores, identity, media));

    // Build router
    let app = tuneverse_api::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Structured JSON logs in production, compact human-readable logs in development.
fn init_logging(environment: Environment) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("tuneverse_api=debug,info"));

    let registry = tracing_subscriber::registry().with(filter);

    match environment {
        Environment::Production => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(false)
                    .with_current_span(true)
                    .flatten_event(true),
            )
            .init(),
        Environment::Development => registry
            .with(tracing_subscriber::fmt::layer().compact())
            .init(),
    }
}
