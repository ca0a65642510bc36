// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profile documents and the denormalized post count)
//! - Notes (keyset-paginated public feed)
//! - Music (uploaded track metadata)

use crate::db::{collections, MusicRepository, NoteRepository, UserRepository};
use crate::error::AppError;
use crate::models::{Music, Note, User};
use async_trait::async_trait;
use firestore::errors::FirestoreError;
use firestore::{FirestoreQueryCursor, FirestoreQueryDirection, FirestoreWritePrecondition};
use serde::{Deserialize, Serialize};

/// Profile fields written by `update_user_profile` (everything but the counter).
const PROFILE_FIELDS: [&str; 8] = [
    "userId",
    "email",
    "username",
    "displayName",
    "role",
    "createdAt",
    "updatedAt",
    "otherAccountDetails",
];

/// Partial user document carrying only the counter.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostCountDoc {
    number_of_posts: i64,
}

/// Result row of the per-owner count aggregation.
#[derive(Deserialize)]
struct NoteCount {
    count: i64,
}

/// Firestore-backed store for users, notes and music.
#[derive(Clone)]
pub struct FirestoreDb {
    client: firestore::FirestoreDb,
}

impl FirestoreDb {
    /// Connect to Firestore, or to the emulator when `FIRESTORE_EMULATOR_HOST`
    /// is set.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        let emulator = std::env::var("FIRESTORE_EMULATOR_HOST").ok();

        let client = match &emulator {
            // No credentials are sent to the emulator.
            Some(_) => firestore::FirestoreDb::with_options_token_source(
                firestore::FirestoreDbOptions::new(project_id.to_string()),
                gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
                gcloud_sdk::TokenSourceType::ExternalSource(Box::new(
                    gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
                        Ok(gcloud_sdk::Token {
                            token_type: "Bearer".to_string(),
                            token: gcloud_sdk::SecretValue::new(
                                "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                                    .to_string()
                                    .into(),
                            ),
                            expiry: chrono::Utc::now() + chrono::Duration::hours(1),
                        })
                    }),
                )),
            )
            .await,
            None => firestore::FirestoreDb::new(project_id).await,
        }
        .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {e}")))?;

        tracing::info!(project = project_id, emulator = ?emulator, "Connected to Firestore");
        Ok(Self { client })
    }
}

// ─── User Operations ─────────────────────────────────────────

#[async_trait]
impl UserRepository for FirestoreDb {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn create_user(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.user_id)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn update_user_profile(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .client
            .fluent()
            .update()
            .fields(PROFILE_FIELDS)
            .in_col(collections::USERS)
            .document_id(&user.user_id)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn find_users_by_username(&self, username: &str) -> Result<Vec<User>, AppError> {
        self.client
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(|q| q.for_all([q.field("username").eq(username)]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn increment_post_count(&self, user_id: &str, delta: i64) -> Result<bool, AppError> {
        let client = &self.client;
        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        client
            .fluent()
            .update()
            .in_col(collections::USERS)
            // Without it the transform would create a counter-only document.
            .precondition(FirestoreWritePrecondition::Exists(true))
            .document_id(user_id)
            .transforms(|t| t.fields([t.field("numberOfPosts").increment(delta)]))
            .only_transform()
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add increment to transaction: {}", e))
            })?;

        match transaction.commit().await {
            Ok(_) => Ok(true),
            Err(FirestoreError::DataNotFoundError(_)) => {
                tracing::warn!(user_id, delta, "User not found, skipping post count update");
                Ok(false)
            }
            Err(e) => Err(AppError::Database(format!("Transaction commit failed: {}", e))),
        }
    }

    async fn set_post_count(&self, user_id: &str, count: i64) -> Result<(), AppError> {
        let written: Result<(), FirestoreError> = self
            .client
            .fluent()
            .update()
            .fields(["numberOfPosts"])
            .in_col(collections::USERS)
            .precondition(FirestoreWritePrecondition::Exists(true))
            .document_id(user_id)
            .object(&PostCountDoc {
                number_of_posts: count,
            })
            .execute()
            .await;
        match written {
            Ok(()) => Ok(()),
            Err(FirestoreError::DataNotFoundError(_)) => {
                Err(AppError::NotFound(format!("User {} not found", user_id)))
            }
            Err(e) => Err(AppError::Database(e.to_string())),
        }
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        self.client
            .fluent()
            .select()
            .from(collections::USERS)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

// ─── Note Operations ─────────────────────────────────────────

#[async_trait]
impl NoteRepository for FirestoreDb {
    async fn create_note(&self, note: &Note) -> Result<(), AppError> {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::NOTES)
            .document_id(&note.note_id)
            .object(note)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn get_note(&self, note_id: &str) -> Result<Option<Note>, AppError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::NOTES)
            .obj()
            .one(note_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn update_note(&self, note: &Note) -> Result<(), AppError> {
        self.create_note(note).await
    }

    async fn delete_note(&self, note_id: &str) -> Result<(), AppError> {
        self.client
            .fluent()
            .delete()
            .from(collections::NOTES)
            .document_id(note_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn list_notes_by_owner(&self, owner_id: &str) -> Result<Vec<Note>, AppError> {
        self.client
            .fluent()
            .select()
            .from(collections::NOTES)
            .filter(|q| q.for_all([q.field("creatorUserId").eq(owner_id)]))
            .order_by([
                ("createdAt", FirestoreQueryDirection::Descending),
                ("noteId", FirestoreQueryDirection::Descending),
            ])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn list_notes_page(
        &self,
        limit: u32,
        after: Option<&Note>,
    ) -> Result<Vec<Note>, AppError> {
        let query = self
            .client
            .fluent()
            .select()
            .from(collections::NOTES)
            .order_by([
                ("createdAt", FirestoreQueryDirection::Descending),
                ("noteId", FirestoreQueryDirection::Descending),
            ]);

        // Cursor values must follow the order_by fields.
        let query = match after {
            Some(cursor) => query.start_at(FirestoreQueryCursor::AfterValue(vec![
                (&cursor.created_at).into(),
                (&cursor.note_id).into(),
            ])),
            None => query,
        };

        query
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn count_notes_by_owner(&self, owner_id: &str) -> Result<i64, AppError> {
        let counts: Vec<NoteCount> = self
            .client
            .fluent()
            .select()
            .from(collections::NOTES)
            .filter(|q| q.for_all([q.field("creatorUserId").eq(owner_id)]))
            .aggregate(|a| a.fields([a.field("count").count()]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(counts.first().map_or(0, |c| c.count))
    }
}

// ─── Music Operations ────────────────────────────────────────

#[async_trait]
impl MusicRepository for FirestoreDb {
    async fn create_music(&self, music: &Music) -> Result<(), AppError> {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::MUSIC)
            .document_id(&music.music_id)
            .object(music)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn get_music(&self, music_id: &str) -> Result<Option<Music>, AppError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::MUSIC)
            .obj()
            .one(music_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn update_music(&self, music: &Music) -> Result<(), AppError> {
        self.create_music(music).await
    }

    async fn delete_music(&self, music_id: &str) -> Result<(), AppError> {
        self.client
            .fluent()
            .delete()
            .from(collections::MUSIC)
            .document_id(music_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn list_music(&self, limit: u32) -> Result<Vec<Music>, AppError> {
        self.client
            .fluent()
            .select()
            .from(collections::MUSIC)
            .order_by([("createdAt", FirestoreQueryDirection::Descending)])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn list_music_by_owner(&self, owner_id: &str) -> Result<Vec<Music>, AppError> {
        self.client
            .fluent()
            .select()
            .from(collections::MUSIC)
            .filter(|q| q.for_all([q.field("ownerId").eq(owner_id)]))
            .order_by([("createdAt", FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
