//! Database layer (Firestore, with an in-memory backend for tests and local runs).
//!
//! Components never see a concrete backend: they receive the repository
//! traits below as `Arc<dyn …>`.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryDb;

use crate::error::AppError;
use crate::models::{Music, Note, User};
use async_trait::async_trait;
use std::sync::Arc;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const NOTES: &str = "notes";
    pub const MUSIC: &str = "music";
}

/// User profile documents.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError>;

    async fn create_user(&self, user: &User) -> Result<(), AppError>;

    /// Write every profile field except `numberOfPosts`.
    ///
    /// The post count is only ever touched through `increment_post_count`
    /// and `set_post_count`, so a profile edit cannot clobber a concurrent
    /// increment.
    async fn update_user_profile(&self, user: &User) -> Result<(), AppError>;

    /// All users whose handle is exactly `username`.
    async fn find_users_by_username(&self, username: &str) -> Result<Vec<User>, AppError>;

    /// Atomically add `delta` to the user's post count.
    ///
    /// Returns `false` without writing when the user document does not exist.
    async fn increment_post_count(&self, user_id: &str, delta: i64) -> Result<bool, AppError>;

    /// Overwrite the post count (reconciliation only).
    async fn set_post_count(&self, user_id: &str, count: i64) -> Result<(), AppError>;

    async fn list_users(&self) -> Result<Vec<User>, AppError>;
}

/// Note documents.
#[async_trait]
pub trait NoteRepository: Send + Sync {
    async fn create_note(&self, note: &Note) -> Result<(), AppError>;

    async fn get_note(&self, note_id: &str) -> Result<Option<Note>, AppError>;

    async fn update_note(&self, note: &Note) -> Result<(), AppError>;

    async fn delete_note(&self, note_id: &str) -> Result<(), AppError>;

    /// Notes owned by `owner_id`, newest first.
    async fn list_notes_by_owner(&self, owner_id: &str) -> Result<Vec<Note>, AppError>;

    /// Up to `limit` notes ordered by `createdAt DESC, noteId DESC`,
    /// starting strictly after `after` when given.
    async fn list_notes_page(
        &self,
        limit: u32,
        after: Option<&Note>,
    ) -> Result<Vec<Note>, AppError>;

    async fn count_notes_by_owner(&self, owner_id: &str) -> Result<i64, AppError>;
}

/// Track metadata documents.
#[async_trait]
pub trait MusicRepository: Send + Sync {
    async fn create_music(&self, music: &Music) -> Result<(), AppError>;

    async fn get_music(&self, music_id: &str) -> Result<Option<Music>, AppError>;

    async fn update_music(&self, music: &Music) -> Result<(), AppError>;

    async fn delete_music(&self, music_id: &str) -> Result<(), AppError>;

    /// Newest tracks first.
    async fn list_music(&self, limit: u32) -> Result<Vec<Music>, AppError>;

    async fn list_music_by_owner(&self, owner_id: &str) -> Result<Vec<Music>, AppError>;
}

/// The three repositories, usually backed by one store.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserRepository>,
    pub notes: Arc<dyn NoteRepository>,
    pub music: Arc<dyn MusicRepository>,
}

impl Stores {
    /// Share one backend across all three repositories.
    pub fn from_backend<B>(backend: B) -> Self
    where
        B: UserRepository + NoteRepository + MusicRepository + 'static,
    {
        let backend = Arc::new(backend);
        Self {
            users: backend.clone(),
            notes: backend.clone(),
            music: backend,
        }
    }
}
