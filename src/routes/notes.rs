// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Note routes: the public feed and owner-scoped CRUD.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::NoteView;
use crate::routes::json_body;
use crate::services::feed::normalize_page_size;
use crate::services::notes::{NoteDraft, NotePatch};
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/notes/public", get(public_feed))
        .route("/api/notes/{id}", get(get_note))
}

/// Auth middleware is applied in routes/mod.rs for these routes.
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/notes", get(list_my_notes).post(create_note))
        .route("/api/notes/{id}", axum::routing::put(update_note).delete(delete_note))
}

// ─── Public feed ─────────────────────────────────────────────

/// Feed query parameters. Everything arrives as text so bad values fall
/// back to defaults instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedQuery {
    limit: Option<String>,
    cursor: Option<String>,
    /// Older clients send the cursor under this name.
    last_visible: Option<String>,
    page: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Pagination {
    pub current_page: u32,
    pub limit: u32,
    pub retrieved_count: usize,
    pub next_cursor: Option<String>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct FeedResponse {
    pub message: String,
    pub data: Vec<NoteView>,
    pub pagination: Pagination,
}

/// `page` is only echoed back; the cursor alone decides where the page starts.
async fn public_feed(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FeedQuery>,
) -> Result<Json<FeedResponse>> {
    let limit = normalize_page_size(params.limit.as_deref());
    let current_page = params
        .page
        .as_deref()
        .and_then(|p| p.trim().parse::<u32>().ok())
        .filter(|p| *p > 0)
        .unwrap_or(1);
    let cursor = params
        .cursor
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .or(params.last_visible.as_deref());

    let page = state.feed.list(limit, cursor).await?;
    let data = state.enricher.enrich_all(page.items).await;

    Ok(Json(FeedResponse {
        message: "Public notes retrieved successfully.".to_string(),
        pagination: Pagination {
            current_page,
            limit,
            retrieved_count: data.len(),
            next_cursor: page.next_cursor,
        },
        data,
    }))
}

async fn get_note(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<NoteView>> {
    let note = state
        .stores
        .notes
        .get_note(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Note not found.".to_string()))?;

    Ok(Json(state.enricher.enrich(note).await))
}

// ─── Owner operations ────────────────────────────────────────

#[derive(Serialize)]
pub struct NotesResponse {
    pub message: String,
    pub data: Vec<NoteView>,
}

async fn list_my_notes(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<NotesResponse>> {
    let notes = state.stores.notes.list_notes_by_owner(&user.user_id).await?;
    let data = state.enricher.enrich_all(notes).await;

    Ok(Json(NotesResponse {
        message: "Notes retrieved successfully.".to_string(),
        data,
    }))
}

#[derive(Serialize)]
pub struct NoteResponse {
    pub message: String,
    pub note: NoteView,
    /// Set when the note change succeeded but the post count did not follow.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

async fn create_note(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    payload: std::result::Result<Json<NoteDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<NoteResponse>)> {
    let draft = json_body(payload)?;
    let change = state.notes.create(&user.requester(), draft).await?;
    let warning = change.warning();

    Ok((
        StatusCode::CREATED,
        Json(NoteResponse {
            message: "Note created successfully.".to_string(),
            note: state.enricher.enrich(change.note).await,
            warning,
        }),
    ))
}

async fn update_note(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<NotePatch>, JsonRejection>,
) -> Result<Json<NoteResponse>> {
    let patch = json_body(payload)?;
    let note = state.notes.update(&user.requester(), &id, patch).await?;

    Ok(Json(NoteResponse {
        message: "Note updated successfully.".to_string(),
        note: state.enricher.enrich(note).await,
        warning: None,
    }))
}

#[derive(Serialize)]
pub struct DeleteNoteResponse {
    pub message: String,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

async fn delete_note(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<DeleteNoteResponse>> {
    let change = state.notes.delete(&user.requester(), &id).await?;

    Ok(Json(DeleteNoteResponse {
        message: "Note deleted successfully.".to_string(),
        warning: change.warning(),
        id: change.note.note_id,
    }))
}
