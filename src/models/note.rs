// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Note model for storage and API.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Note stored in Firestore (document ID = `note_id`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub note_id: String,
    /// Message body (never empty)
    pub message: String,
    /// Recipient label
    pub recipient: String,
    /// Sender label (defaults to the creator's UID)
    pub sender: String,
    /// Optional image URL
    pub image: Option<String>,
    /// Optional reference into the `music` collection
    #[serde(rename = "idMusic")]
    pub id_music: Option<String>,
    /// Owner UID, immutable after creation
    pub creator_user_id: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Note as returned by the API, joined with its referenced track.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct NoteView {
    pub id: String,
    pub message: String,
    pub recipient: String,
    pub sender: String,
    pub image: Option<String>,
    #[serde(rename = "idMusic")]
    pub id_music: Option<String>,
    pub creator_user_id: String,
    pub created_at: String,
    pub updated_at: String,
    pub song_title: Option<String>,
    pub song_artist: Option<String>,
    pub song_url: Option<String>,
    pub song_cover_url: Option<String>,
    pub song_duration: Option<f64>,
}

impl NoteView {
    /// View with every track field empty.
    pub fn bare(note: Note) -> Self {
        Self {
            id: note.note_id,
            message: note.message,
            recipient: note.recipient,
            sender: note.sender,
            image: note.image,
            id_music: note.id_music,
            creator_user_id: note.creator_user_id,
            created_at: note.created_at,
            updated_at: note.updated_at,
            song_title: None,
            song_artist: None,
            song_url: None,
            song_cover_url: None,
            song_duration: None,
        }
    }
}
