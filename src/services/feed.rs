// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Public note feed with keyset pagination.
//!
//! Notes are ordered newest first (`createdAt DESC`, ties by `noteId DESC`).
//! The cursor is the ID of the last note of the previous page. A cursor
//! whose note has since been deleted restarts the feed from the top instead
//! of failing.
//!
//! `next_cursor` is only set when a page comes back full, so a feed whose
//! size is a multiple of the page size ends with one empty page.

use crate::db::NoteRepository;
use crate::error::AppError;
use crate::models::Note;
use std::sync::Arc;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Parse a client-supplied page size.
///
/// Missing, unparsable or non-positive values give [`DEFAULT_PAGE_SIZE`];
/// anything above [`MAX_PAGE_SIZE`] is clamped.
pub fn normalize_page_size(raw: Option<&str>) -> u32 {
    match raw.and_then(|r| r.trim().parse::<i64>().ok()) {
        Some(n) if n > 0 => n.min(MAX_PAGE_SIZE as i64) as u32,
        _ => DEFAULT_PAGE_SIZE,
    }
}

/// One page of the feed.
#[derive(Debug, Clone)]
pub struct FeedPage {
    pub items: Vec<Note>,
    pub next_cursor: Option<String>,
}

/// Public feed over the notes collection.
#[derive(Clone)]
pub struct PublicFeed {
    notes: Arc<dyn NoteRepository>,
}

impl PublicFeed {
    pub fn new(notes: Arc<dyn NoteRepository>) -> Self {
        Self { notes }
    }

    /// Fetch `page_size` notes following `cursor`.
    pub async fn list(&self, page_size: u32, cursor: Option<&str>) -> Result<FeedPage, AppError> {
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        let cursor = cursor.map(str::trim).filter(|c| !c.is_empty());

        let after = match cursor {
            Some(id) => {
                let note = self.notes.get_note(id).await?;
                if note.is_none() {
                    tracing::info!(cursor = id, "Feed cursor no longer exists, restarting from first page");
                }
                note
            }
            None => None,
        };

        let items = self.notes.list_notes_page(page_size, after.as_ref()).await?;

        let next_cursor = if items.len() == page_size as usize {
            items.last().map(|n| n.note_id.clone())
        } else {
            None
        };

        tracing::debug!(
            page_size,
            cursor = ?cursor,
            returned = items.len(),
            has_next = next_cursor.is_some(),
            "Fetched public feed page"
        );

        Ok(FeedPage { items, next_cursor })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_page_size() {
        assert_eq!(normalize_page_size(None), DEFAULT_PAGE_SIZE);
        assert_eq!(normalize_page_size(Some("")), DEFAULT_PAGE_SIZE);
        assert_eq!(normalize_page_size(Some("abc")), DEFAULT_PAGE_SIZE);
        assert_eq!(normalize_page_size(Some("0")), DEFAULT_PAGE_SIZE);
        assert_eq!(normalize_page_size(Some("-5")), DEFAULT_PAGE_SIZE);
        assert_eq!(normalize_page_size(Some("25")), 25);
        assert_eq!(normalize_page_size(Some(" 7 ")), 7);
        assert_eq!(normalize_page_size(Some("100000")), MAX_PAGE_SIZE);
    }
}
