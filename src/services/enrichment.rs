// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Read-time join of notes with the track they reference.

use crate::db::MusicRepository;
use crate::models::{Note, NoteView};
use futures_util::{stream, StreamExt};
use std::sync::Arc;

const MAX_CONCURRENT_LOOKUPS: usize = 16;

/// Attaches track details to notes. Lookup failures leave the track fields empty.
#[derive(Clone)]
pub struct NoteEnricher {
    music: Arc<dyn MusicRepository>,
}

impl NoteEnricher {
    pub fn new(music: Arc<dyn MusicRepository>) -> Self {
        Self { music }
    }

    pub async fn enrich(&self, note: Note) -> NoteView {
        let music_id = note.id_music.clone().filter(|id| !id.is_empty());
        let mut view = NoteView::bare(note);

        let Some(music_id) = music_id else {
            return view;
        };

        match self.music.get_music(&music_id).await {
            Ok(Some(track)) => {
                view.song_title = Some(track.title);
                view.song_artist = Some(track.artist);
                view.song_url = Some(track.music_url);
                view.song_cover_url = Some(track.image_url);
                view.song_duration = track.duration;
            }
            Ok(None) => {
                tracing::debug!(note_id = %view.id, music_id = %music_id, "Referenced track no longer exists");
            }
            Err(e) => {
                tracing::warn!(
                    note_id = %view.id,
                    music_id = %music_id,
                    error = %e,
                    "Track lookup failed, returning note without track"
                );
            }
        }

        view
    }

    /// Enrich a page of notes concurrently, preserving order.
    pub async fn enrich_all(&self, notes: Vec<Note>) -> Vec<NoteView> {
        stream::iter(notes)
            .map(|note| self.enrich(note))
            .buffered(MAX_CONCURRENT_LOOKUPS)
            .collect()
            .await
    }
}
