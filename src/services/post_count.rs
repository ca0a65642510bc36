// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Keeps `numberOfPosts` on the user document in step with the notes the
//! user owns.
//!
//! Callers invoke the maintainer only after the note write or delete has
//! been confirmed. A failed counter update never fails the note operation:
//! it is logged and handed back as a [`CountDrift`] so the response can
//! carry a warning. Drift is repaired out of band by [`PostCountMaintainer::reconcile_all`].

use crate::db::{NoteRepository, UserRepository};
use crate::error::AppError;
use std::fmt;
use std::sync::Arc;

/// A counter update that did not land.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountDrift {
    pub user_id: String,
    pub delta: i64,
    pub reason: String,
}

impl CountDrift {
    /// Message shown to API clients.
    pub fn warning(&self) -> String {
        "Post count could not be updated; it will be corrected by the next reconciliation."
            .to_string()
    }
}

impl fmt::Display for CountDrift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "post count for {} not adjusted by {}: {}",
            self.user_id, self.delta, self.reason
        )
    }
}

/// Result of reconciling one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    pub user_id: String,
    pub previous: i64,
    pub actual: i64,
}

/// Denormalized post count maintainer.
#[derive(Clone)]
pub struct PostCountMaintainer {
    users: Arc<dyn UserRepository>,
    notes: Arc<dyn NoteRepository>,
}

impl PostCountMaintainer {
    pub fn new(users: Arc<dyn UserRepository>, notes: Arc<dyn NoteRepository>) -> Self {
        Self { users, notes }
    }

    /// Record a note that has been written.
    pub async fn note_created(&self, user_id: &str) -> Option<CountDrift> {
        self.adjust(user_id, 1).await
    }

    /// Record a note that has been deleted.
    pub async fn note_deleted(&self, user_id: &str) -> Option<CountDrift> {
        self.adjust(user_id, -1).await
    }

    async fn adjust(&self, user_id: &str, delta: i64) -> Option<CountDrift> {
        let reason = match self.users.increment_post_count(user_id, delta).await {
            Ok(true) => return None,
            Ok(false) => "user profile does not exist".to_string(),
            Err(e) => e.to_string(),
        };

        let drift = CountDrift {
            user_id: user_id.to_string(),
            delta,
            reason,
        };
        tracing::error!(
            user_id,
            delta,
            reason = %drift.reason,
            "Post count drift: counter not updated after note change"
        );
        Some(drift)
    }

    /// Live number of notes owned by `user_id`.
    pub async fn live_count(&self, user_id: &str) -> Result<i64, AppError> {
        self.notes.count_notes_by_owner(user_id).await
    }

    /// Recompute one user's count from a live query and store it.
    pub async fn reconcile(&self, user_id: &str) -> Result<Reconciled, AppError> {
        let user = self
            .users
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

        let actual = self.live_count(user_id).await?;
        if actual != user.number_of_posts {
            self.users.set_post_count(user_id, actual).await?;
            tracing::info!(
                user_id,
                previous = user.number_of_posts,
                actual,
                "Post count reconciled"
            );
        }

        Ok(Reconciled {
            user_id: user_id.to_string(),
            previous: user.number_of_posts,
            actual,
        })
    }

    /// Reconcile every user. Per-user failures are logged and skipped.
    pub async fn reconcile_all(&self) -> Result<Vec<Reconciled>, AppError> {
        let users = self.users.list_users().await?;
        let mut results = Vec::with_capacity(users.len());

        for user in users {
            match self.reconcile(&user.user_id).await {
                Ok(r) => results.push(r),
                Err(e) => {
                    tracing::warn!(user_id = %user.user_id, error = %e, "Failed to reconcile user");
                }
            }
        }

        Ok(results)
    }
}
