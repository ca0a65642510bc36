// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Music routes: uploads, listings and owner-scoped edits.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::Music;
use crate::services::media::{MediaKind, MediaUpload, StoredMedia};
use crate::time_utils::now_rfc3339;
use crate::AppState;
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

const DEFAULT_LIST_LIMIT: u32 = 20;
const MAX_LIST_LIMIT: u32 = 100;
const DEFAULT_EXPLORE_LIMIT: u32 = 10;
const EXPLORE_POOL: u32 = 100;
const DEFAULT_TOP_ARTISTS: u32 = 10;
const TOP_ARTISTS_POOL: u32 = 500;

pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/music", get(list_music))
        .route("/api/music/explore", get(explore))
        .route("/api/music/top-artists", get(top_artists))
        .route("/api/music/{id}", get(get_music))
}

/// Auth middleware is applied in routes/mod.rs for these routes.
pub fn protected_routes(max_upload_bytes: usize) -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/music", axum::routing::post(upload_music))
        .route("/api/music/user", get(list_my_music))
        .route(
            "/api/music/{id}",
            axum::routing::put(update_music).delete(delete_music),
        )
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    limit: Option<String>,
}

impl LimitQuery {
    fn limit_or(&self, default: u32) -> u32 {
        match self.limit.as_deref().and_then(|l| l.trim().parse::<i64>().ok()) {
            Some(n) if n > 0 => n.min(MAX_LIST_LIMIT as i64) as u32,
            _ => default,
        }
    }
}

#[derive(Serialize)]
pub struct MusicListResponse {
    pub message: String,
    pub data: Vec<Music>,
}

// ─── Listings ────────────────────────────────────────────────

async fn list_music(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<MusicListResponse>> {
    let data = state
        .stores
        .music
        .list_music(query.limit_or(DEFAULT_LIST_LIMIT))
        .await?;

    Ok(Json(MusicListResponse {
        message: "Music retrieved successfully.".to_string(),
        data,
    }))
}

async fn list_my_music(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<MusicListResponse>> {
    let data = state.stores.music.list_music_by_owner(&user.user_id).await?;

    Ok(Json(MusicListResponse {
        message: "Your music retrieved successfully.".to_string(),
        data,
    }))
}

/// Random sample of the newest tracks.
async fn explore(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<MusicListResponse>> {
    let pool = state.stores.music.list_music(EXPLORE_POOL).await?;
    let count = query.limit_or(DEFAULT_EXPLORE_LIMIT) as usize;

    let data: Vec<Music> = pool
        .choose_multiple(&mut rand::thread_rng(), count)
        .cloned()
        .collect();

    Ok(Json(MusicListResponse {
        message: "Explore music retrieved successfully.".to_string(),
        data,
    }))
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ArtistRank {
    pub artist: String,
    pub track_count: usize,
}

#[derive(Serialize)]
pub struct TopArtistsResponse {
    pub message: String,
    pub data: Vec<ArtistRank>,
}

/// Rank artists by track count; ties broken by name.
fn rank_artists(tracks: &[Music], limit: usize) -> Vec<ArtistRank> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for track in tracks {
        let artist = track.artist.trim();
        if !artist.is_empty() {
            *counts.entry(artist).or_default() += 1;
        }
    }

    let mut ranked: Vec<ArtistRank> = counts
        .into_iter()
        .map(|(artist, track_count)| ArtistRank {
            artist: artist.to_string(),
            track_count,
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.track_count
            .cmp(&a.track_count)
            .then_with(|| a.artist.cmp(&b.artist))
    });
    ranked.truncate(limit);
    ranked
}

async fn top_artists(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<TopArtistsResponse>> {
    let tracks = state.stores.music.list_music(TOP_ARTISTS_POOL).await?;
    let data = rank_artists(&tracks, query.limit_or(DEFAULT_TOP_ARTISTS) as usize);

    Ok(Json(TopArtistsResponse {
        message: "Top artists retrieved successfully.".to_string(),
        data,
    }))
}

async fn get_music(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Music>> {
    state
        .stores
        .music
        .get_music(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Music not found.".to_string()))
}

// ─── Multipart parsing ───────────────────────────────────────

/// Fields of an upload or edit form. All optional at this stage.
#[derive(Debug, Default)]
struct MusicForm {
    title: Option<String>,
    artist: Option<String>,
    music: Option<MediaUpload>,
    cover: Option<MediaUpload>,
}

impl MusicForm {
    fn is_empty(&self) -> bool {
        self.title.is_none() && self.artist.is_none() && self.music.is_none() && self.cover.is_none()
    }
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> AppError {
    AppError::BadRequest(format!("Invalid multipart body: {}", e.body_text()))
}

async fn read_form(mut multipart: Multipart) -> Result<MusicForm> {
    let mut form = MusicForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        let kind = match name.as_str() {
            "title" | "artist" => {
                let text = field.text().await.map_err(multipart_error)?;
                let text = Some(text.trim().to_string()).filter(|t| !t.is_empty());
                if name == "title" {
                    form.title = text;
                } else {
                    form.artist = text;
                }
                continue;
            }
            "music" => MediaKind::Audio,
            "cover" => MediaKind::Image,
            other => {
                tracing::debug!(field = other, "Ignoring unknown multipart field");
                continue;
            }
        };

        let file_name = field.file_name().unwrap_or(&name).to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        if !kind.accepts(&content_type) {
            return Err(AppError::field(
                &name,
                &format!("Unsupported file type: {content_type}"),
            ));
        }

        let bytes = field.bytes().await.map_err(multipart_error)?;
        if bytes.is_empty() {
            return Err(AppError::field(&name, "File is empty."));
        }

        let upload = MediaUpload {
            kind,
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        };
        match kind {
            MediaKind::Audio => form.music = Some(upload),
            MediaKind::Image => form.cover = Some(upload),
        }
    }

    Ok(form)
}

/// Release media that are no longer referenced. Failures only leave orphans.
async fn release_all(state: &AppState, media: &[(MediaKind, String)]) {
    for (kind, public_id) in media {
        if let Err(e) = state.media.release(*kind, public_id).await {
            tracing::warn!(kind = ?kind, public_id = %public_id, error = %e, "Failed to release media");
        }
    }
}

async fn upload_optional(state: &AppState, upload: Option<MediaUpload>) -> Result<Option<StoredMedia>> {
    match upload {
        Some(upload) => Ok(Some(state.media.upload(upload).await?)),
        None => Ok(None),
    }
}

// ─── Create / update / delete ────────────────────────────────

#[derive(Serialize)]
pub struct MusicResponse {
    pub id: String,
    pub message: String,
    pub music: Music,
}

async fn upload_music(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<MusicResponse>)> {
    let form = read_form(multipart).await?;

    let mut missing = Vec::new();
    for (field, present) in [
        ("title", form.title.is_some()),
        ("artist", form.artist.is_some()),
        ("music", form.music.is_some()),
        ("cover", form.cover.is_some()),
    ] {
        if !present {
            missing.push(crate::error::FieldError::new(field, format!("{field} is required.")));
        }
    }
    let (Some(title), Some(artist), Some(music_file), Some(cover_file)) =
        (form.title, form.artist, form.music, form.cover)
    else {
        return Err(AppError::Validation(missing));
    };

    let audio = state.media.upload(music_file).await?;
    let cover = match state.media.upload(cover_file).await {
        Ok(cover) => cover,
        Err(e) => {
            release_all(&state, &[(MediaKind::Audio, audio.public_id)]).await;
            return Err(e);
        }
    };

    let now = now_rfc3339();
    let music = Music {
        music_id: uuid::Uuid::new_v4().simple().to_string(),
        title,
        artist,
        music_url: audio.url,
        music_public_id: audio.public_id,
        image_url: cover.url,
        image_public_id: cover.public_id,
        duration: audio.duration,
        owner_id: user.user_id.clone(),
        created_at: now.clone(),
        updated_at: now,
    };

    if let Err(e) = state.stores.music.create_music(&music).await {
        release_all(
            &state,
            &[
                (MediaKind::Audio, music.music_public_id.clone()),
                (MediaKind::Image, music.image_public_id.clone()),
            ],
        )
        .await;
        return Err(e);
    }

    tracing::info!(music_id = %music.music_id, owner = %user.user_id, "Music uploaded");

    Ok((
        StatusCode::CREATED,
        Json(MusicResponse {
            id: music.music_id.clone(),
            message: "Music uploaded successfully.".to_string(),
            music,
        }),
    ))
}

async fn load_owned(state: &AppState, user: &AuthUser, id: &str) -> Result<Music> {
    let music = state
        .stores
        .music
        .get_music(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Music not found.".to_string()))?;

    if music.owner_id != user.user_id && !user.admin {
        return Err(AppError::Forbidden(
            "You can only modify your own music.".to_string(),
        ));
    }
    Ok(music)
}

async fn update_music(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<MusicResponse>> {
    let form = read_form(multipart).await?;
    if form.is_empty() {
        return Err(AppError::BadRequest(
            "No updatable fields were provided.".to_string(),
        ));
    }

    let mut music = load_owned(&state, &user, &id).await?;

    let new_audio = upload_optional(&state, form.music).await?;
    let new_cover = match upload_optional(&state, form.cover).await {
        Ok(cover) => cover,
        Err(e) => {
            if let Some(audio) = new_audio {
                release_all(&state, &[(MediaKind::Audio, audio.public_id)]).await;
            }
            return Err(e);
        }
    };

    let mut replaced = Vec::new();
    let mut fresh = Vec::new();
    if let Some(title) = form.title {
        music.title = title;
    }
    if let Some(artist) = form.artist {
        music.artist = artist;
    }
    if let Some(audio) = new_audio {
        replaced.push((MediaKind::Audio, std::mem::take(&mut music.music_public_id)));
        fresh.push((MediaKind::Audio, audio.public_id.clone()));
        music.music_url = audio.url;
        music.music_public_id = audio.public_id;
        music.duration = audio.duration;
    }
    if let Some(cover) = new_cover {
        replaced.push((MediaKind::Image, std::mem::take(&mut music.image_public_id)));
        fresh.push((MediaKind::Image, cover.public_id.clone()));
        music.image_url = cover.url;
        music.image_public_id = cover.public_id;
    }
    music.updated_at = now_rfc3339();

    if let Err(e) = state.stores.music.update_music(&music).await {
        release_all(&state, &fresh).await;
        return Err(e);
    }

    // Old media go only once the record points at the new ones.
    release_all(&state, &replaced).await;

    tracing::info!(music_id = %id, user = %user.user_id, "Music updated");
    Ok(Json(MusicResponse {
        id,
        message: "Music updated successfully.".to_string(),
        music,
    }))
}

#[derive(Serialize)]
pub struct DeleteMusicResponse {
    pub id: String,
    pub message: String,
}

async fn delete_music(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<DeleteMusicResponse>> {
    let music = load_owned(&state, &user, &id).await?;

    state.stores.music.delete_music(&id).await?;
    release_all(
        &state,
        &[
            (MediaKind::Audio, music.music_public_id),
            (MediaKind::Image, music.image_public_id),
        ],
    )
    .await;

    tracing::info!(music_id = %id, user = %user.user_id, "Music deleted");
    Ok(Json(DeleteMusicResponse {
        id,
        message: "Music deleted successfully.".to_string(),
    }))
}
