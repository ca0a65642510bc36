// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory document store.
//!
//! Mirrors the Firestore backend's ordering and increment semantics so the
//! services can be exercised without the emulator. Selected at runtime with
//! `DATABASE_BACKEND=memory`.

use crate::db::{MusicRepository, NoteRepository, UserRepository};
use crate::error::AppError;
use crate::models::{Music, Note, User};
use async_trait::async_trait;
use dashmap::DashMap;
use std::cmp::Reverse;
use std::sync::Arc;

/// `DashMap`-backed store. Clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryDb {
    users: Arc<DashMap<String, User>>,
    notes: Arc<DashMap<String, Note>>,
    music: Arc<DashMap<String, Music>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Feed ordering key: newest first, ties broken by ID.
fn feed_key(note: &Note) -> Reverse<(String, String)> {
    Reverse((note.created_at.clone(), note.note_id.clone()))
}

#[async_trait]
impl UserRepository for MemoryDb {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.get(user_id).map(|u| u.value().clone()))
    }

    async fn create_user(&self, user: &User) -> Result<(), AppError> {
        self.users.insert(user.user_id.clone(), user.clone());
        Ok(())
    }

    async fn update_user_profile(&self, user: &User) -> Result<(), AppError> {
        match self.users.get_mut(&user.user_id) {
            Some(mut existing) => {
                let number_of_posts = existing.number_of_posts;
                *existing = User {
                    number_of_posts,
                    ..user.clone()
                };
            }
            None => {
                self.users.insert(user.user_id.clone(), user.clone());
            }
        }
        Ok(())
    }

    async fn find_users_by_username(&self, username: &str) -> Result<Vec<User>, AppError> {
        Ok(self
            .users
            .iter()
            .filter(|u| u.username == username)
            .map(|u| u.value().clone())
            .collect())
    }

    async fn increment_post_count(&self, user_id: &str, delta: i64) -> Result<bool, AppError> {
        match self.users.get_mut(user_id) {
            Some(mut user) => {
                user.number_of_posts += delta;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_post_count(&self, user_id: &str, count: i64) -> Result<(), AppError> {
        let mut user = self
            .users
            .get_mut(user_id)
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;
        user.number_of_posts = count;
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        Ok(self.users.iter().map(|u| u.value().clone()).collect())
    }
}

#[async_trait]
impl NoteRepository for MemoryDb {
    async fn create_note(&self, note: &Note) -> Result<(), AppError> {
        self.notes.insert(note.note_id.clone(), note.clone());
        Ok(())
    }

    async fn get_note(&self, note_id: &str) -> Result<Option<Note>, AppError> {
        Ok(self.notes.get(note_id).map(|n| n.value().clone()))
    }

    async fn update_note(&self, note: &Note) -> Result<(), AppError> {
        self.notes.insert(note.note_id.clone(), note.clone());
        Ok(())
    }

    async fn delete_note(&self, note_id: &str) -> Result<(), AppError> {
        self.notes.remove(note_id);
        Ok(())
    }

    async fn list_notes_by_owner(&self, owner_id: &str) -> Result<Vec<Note>, AppError> {
        let mut notes: Vec<Note> = self
            .notes
            .iter()
            .filter(|n| n.creator_user_id == owner_id)
            .map(|n| n.value().clone())
            .collect();
        notes.sort_by_key(feed_key);
        Ok(notes)
    }

    async fn list_notes_page(
        &self,
        limit: u32,
        after: Option<&Note>,
    ) -> Result<Vec<Note>, AppError> {
        let mut notes: Vec<Note> = self.notes.iter().map(|n| n.value().clone()).collect();
        notes.sort_by_key(feed_key);

        let start = match after {
            Some(cursor) => {
                let cursor_key = feed_key(cursor);
                notes.partition_point(|n| feed_key(n) <= cursor_key)
            }
            None => 0,
        };

        Ok(notes
            .into_iter()
            .skip(start)
            .take(limit as usize)
            .collect())
    }

    async fn count_notes_by_owner(&self, owner_id: &str) -> Result<i64, AppError> {
        Ok(self
            .notes
            .iter()
            .filter(|n| n.creator_user_id == owner_id)
            .count() as i64)
    }
}

#[async_trait]
impl MusicRepository for MemoryDb {
    async fn create_music(&self, music: &Music) -> Result<(), AppError> {
        self.music.insert(music.music_id.clone(), music.clone());
        Ok(())
    }

    async fn get_music(&self, music_id: &str) -> Result<Option<Music>, AppError> {
        Ok(self.music.get(music_id).map(|m| m.value().clone()))
    }

    async fn update_music(&self, music: &Music) -> Result<(), AppError> {
        self.music.insert(music.music_id.clone(), music.clone());
        Ok(())
    }

    async fn delete_music(&self, music_id: &str) -> Result<(), AppError> {
        self.music.remove(music_id);
        Ok(())
    }

    async fn list_music(&self, limit: u32) -> Result<Vec<Music>, AppError> {
        let mut tracks: Vec<Music> = self.music.iter().map(|m| m.value().clone()).collect();
        tracks.sort_by_key(|m| Reverse(m.created_at.clone()));
        tracks.truncate(limit as usize);
        Ok(tracks)
    }

    async fn list_music_by_owner(&self, owner_id: &str) -> Result<Vec<Music>, AppError> {
        let mut tracks: Vec<Music> = self
            .music
            .iter()
            .filter(|m| m.owner_id == owner_id)
            .map(|m| m.value().clone())
            .collect();
        tracks.sort_by_key(|m| Reverse(m.created_at.clone()));
        Ok(tracks)
    }
}
