// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Note create / update / delete with ownership checks.

use crate::db::NoteRepository;
use crate::error::{AppError, FieldError};
use crate::models::Note;
use crate::services::post_count::{CountDrift, PostCountMaintainer};
use crate::time_utils::now_rfc3339;
use serde::{Deserialize, Deserializer};
use std::sync::Arc;

/// The authenticated caller, as far as note permissions are concerned.
#[derive(Debug, Clone)]
pub struct Requester {
    pub user_id: String,
    /// Custom `admin` claim on the verified token.
    pub is_admin: bool,
}

impl Requester {
    fn may_modify(&self, note: &Note) -> bool {
        self.is_admin || note.creator_user_id == self.user_id
    }
}

/// Body of a create request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteDraft {
    pub message: Option<String>,
    pub recipient: Option<String>,
    pub sender: Option<String>,
    pub image: Option<String>,
    #[serde(rename = "idMusic")]
    pub id_music: Option<String>,
}

/// Body of an update request.
///
/// `image` and `idMusic` distinguish "absent" (`None`) from an explicit
/// `null` (`Some(None)`), which clears the field.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotePatch {
    pub message: Option<String>,
    pub recipient: Option<String>,
    pub sender: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub image: Option<Option<String>>,
    #[serde(default, rename = "idMusic", deserialize_with = "nullable")]
    pub id_music: Option<Option<String>>,
}

impl NotePatch {
    fn is_empty(&self) -> bool {
        self.message.is_none()
            && self.recipient.is_none()
            && self.sender.is_none()
            && self.image.is_none()
            && self.id_music.is_none()
    }
}

fn nullable<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// Blank strings are stored as absent.
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// A note change plus any post count drift it caused.
#[derive(Debug)]
pub struct NoteChange {
    pub note: Note,
    pub drift: Option<CountDrift>,
}

impl NoteChange {
    pub fn warning(&self) -> Option<String> {
        self.drift.as_ref().map(CountDrift::warning)
    }
}

#[derive(Clone)]
pub struct NoteService {
    notes: Arc<dyn NoteRepository>,
    post_counts: PostCountMaintainer,
}

impl NoteService {
    pub fn new(notes: Arc<dyn NoteRepository>, post_counts: PostCountMaintainer) -> Self {
        Self { notes, post_counts }
    }

    pub async fn create(&self, owner: &Requester, draft: NoteDraft) -> Result<NoteChange, AppError> {
        let message = non_blank(draft.message);
        let recipient = non_blank(draft.recipient);

        let mut missing = Vec::new();
        if message.is_none() {
            missing.push(FieldError::new("message", "Message is required."));
        }
        if recipient.is_none() {
            missing.push(FieldError::new("recipient", "Recipient is required."));
        }
        let (Some(message), Some(recipient)) = (message, recipient) else {
            return Err(AppError::Validation(missing));
        };

        let now = now_rfc3339();
        let note = Note {
            note_id: uuid::Uuid::new_v4().simple().to_string(),
            message,
            recipient,
            sender: non_blank(draft.sender).unwrap_or_else(|| owner.user_id.clone()),
            image: non_blank(draft.image),
            id_music: non_blank(draft.id_music),
            creator_user_id: owner.user_id.clone(),
            created_at: now.clone(),
            updated_at: now,
        };

        self.notes.create_note(&note).await?;
        tracing::info!(note_id = %note.note_id, owner = %owner.user_id, "Note created");

        let drift = self.post_counts.note_created(&note.creator_user_id).await;
        Ok(NoteChange { note, drift })
    }

    pub async fn update(
        &self,
        requester: &Requester,
        note_id: &str,
        patch: NotePatch,
    ) -> Result<Note, AppError> {
        if patch.is_empty() {
            return Err(AppError::BadRequest(
                "No updatable fields were provided.".to_string(),
            ));
        }

        let mut note = self.load_for_change(requester, note_id).await?;

        if let Some(message) = patch.message {
            note.message = non_blank(Some(message))
                .ok_or_else(|| AppError::field("message", "Message cannot be empty."))?;
        }
        if let Some(recipient) = patch.recipient {
            note.recipient = non_blank(Some(recipient))
                .ok_or_else(|| AppError::field("recipient", "Recipient cannot be empty."))?;
        }
        if let Some(sender) = patch.sender {
            note.sender = non_blank(Some(sender)).unwrap_or_else(|| note.creator_user_id.clone());
        }
        if let Some(image) = patch.image {
            note.image = non_blank(image);
        }
        if let Some(id_music) = patch.id_music {
            note.id_music = non_blank(id_music);
        }
        note.updated_at = now_rfc3339();

        self.notes.update_note(&note).await?;
        tracing::info!(note_id, user = %requester.user_id, "Note updated");
        Ok(note)
    }

    pub async fn delete(&self, requester: &Requester, note_id: &str) -> Result<NoteChange, AppError> {
        let note = self.load_for_change(requester, note_id).await?;

        self.notes.delete_note(note_id).await?;
        tracing::info!(note_id, user = %requester.user_id, "Note deleted");

        // The owner's count goes down, even when an admin deleted the note.
        let drift = self.post_counts.note_deleted(&note.creator_user_id).await;
        Ok(NoteChange { note, drift })
    }

    async fn load_for_change(&self, requester: &Requester, note_id: &str) -> Result<Note, AppError> {
        let note = self
            .notes
            .get_note(note_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Note not found.".to_string()))?;

        if !requester.may_modify(&note) {
            tracing::warn!(
                note_id,
                user = %requester.user_id,
                owner = %note.creator_user_id,
                "Rejected change to another user's note"
            );
            return Err(AppError::Forbidden(
                "You can only modify your own notes.".to_string(),
            ));
        }

        Ok(note)
    }
}
