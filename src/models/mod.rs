// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod music;
pub mod note;
pub mod user;

pub use music::Music;
pub use note::{Note, NoteView};
pub use user::{AccountDetails, User};
