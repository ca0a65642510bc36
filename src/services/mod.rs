// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod cloudinary;
pub mod enrichment;
pub mod feed;
pub mod firebase_auth;
pub mod firebase_token;
pub mod identity;
pub mod media;
pub mod notes;
pub mod post_count;
pub mod username;

pub use cloudinary::CloudinaryMedia;
pub use enrichment::NoteEnricher;
pub use feed::{FeedPage, PublicFeed};
pub use firebase_auth::FirebaseIdentity;
pub use firebase_token::{FirebaseTokenVerifier, TokenError};
pub use identity::{
    Account, IdentityProvider, NewAccount, ProfileChanges, SessionTokens, VerifiedIdentity,
};
pub use media::{MediaKind, MediaStore, MediaUpload, StoredMedia};
pub use notes::{NoteService, Requester};
pub use post_count::{CountDrift, PostCountMaintainer};
pub use username::{AllocationError, UsernameAllocator};
