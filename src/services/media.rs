// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Media host abstraction for track audio and cover art.

use crate::error::AppError;
use async_trait::async_trait;

/// What is being stored. Decides the host resource type and folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Image,
}

impl MediaKind {
    /// Host resource type. Audio is stored as `video`, which is how the host
    /// reports duration.
    pub fn resource_type(self) -> &'static str {
        match self {
            MediaKind::Audio => "video",
            MediaKind::Image => "image",
        }
    }

    pub fn folder(self) -> &'static str {
        match self {
            MediaKind::Audio => "tuneverse/music",
            MediaKind::Image => "tuneverse/cover",
        }
    }

    /// Whether an uploaded file's content type fits this kind.
    pub fn accepts(self, content_type: &str) -> bool {
        match self {
            MediaKind::Audio => content_type.starts_with("audio/"),
            MediaKind::Image => content_type.starts_with("image/"),
        }
    }
}

/// File received from a client.
#[derive(Debug, Clone)]
pub struct MediaUpload {
    pub kind: MediaKind,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Where an upload ended up.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredMedia {
    pub url: String,
    pub public_id: String,
    /// Seconds, for audio.
    pub duration: Option<f64>,
}

#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn upload(&self, upload: MediaUpload) -> Result<StoredMedia, AppError>;

    /// Delete a stored file. Releasing a file that is already gone is not an error.
    async fn release(&self, kind: MediaKind, public_id: &str) -> Result<(), AppError>;
}
