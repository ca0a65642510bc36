// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Recompute every user's `numberOfPosts` from the notes they own.
//!
//! Run out of band (e.g. as a scheduled job) to repair drift left by
//! counter updates that failed after a note write.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tuneverse_api::{db::FirestoreDb, services::PostCountMaintainer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().compact())
        .init();

    let project_id = std::env::var("FIREBASE_PROJECT_ID")
        .map_err(|_| "FIREBASE_PROJECT_ID must be set")?;

    let db = std::sync::Arc::new(FirestoreDb::new(&project_id).await?);
    let maintainer = PostCountMaintainer::new(db.clone(), db);

    let results = maintainer.reconcile_all().await?;
    let corrected = results.iter().filter(|r| r.previous != r.actual).count();

    tracing::info!(
        users = results.len(),
        corrected,
        "Post count reconciliation finished"
    );
    Ok(())
}
