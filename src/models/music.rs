// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Uploaded track model for storage and API.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Track metadata stored in Firestore (document ID = `music_id`).
///
/// The media itself lives on the media host; `*_public_id` fields are the
/// handles used to release it when a file is replaced or the track deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Music {
    pub music_id: String,
    pub title: String,
    pub artist: String,
    pub music_url: String,
    pub music_public_id: String,
    pub image_url: String,
    pub image_public_id: String,
    /// Length in seconds, as reported by the media host
    pub duration: Option<f64>,
    pub owner_id: String,
    pub created_at: String,
    pub updated_at: String,
}
