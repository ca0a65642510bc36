// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Tuneverse: short notes addressed to someone, optionally carrying a track.
//!
//! This crate provides the backend API: user profiles with unique handles,
//! notes with a denormalized per-user post count, a cursor-paginated public
//! feed, and uploaded music.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::Stores;
use services::{
    IdentityProvider, MediaStore, NoteEnricher, NoteService, PostCountMaintainer, PublicFeed,
    UsernameAllocator,
};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub stores: Stores,
    pub identity: Arc<dyn IdentityProvider>,
    pub media: Arc<dyn MediaStore>,
    pub usernames: UsernameAllocator,
    pub post_counts: PostCountMaintainer,
    pub notes: NoteService,
    pub feed: PublicFeed,
    pub enricher: NoteEnricher,
}

impl AppState {
    /// Wire the components over the given clients.
    pub fn new(
        config: Config,
        stores: Stores,
        identity: Arc<dyn IdentityProvider>,
        media: Arc<dyn MediaStore>,
    ) -> Self {
        let post_counts = PostCountMaintainer::new(stores.users.clone(), stores.notes.clone());

        Self {
            usernames: UsernameAllocator::new(stores.users.clone()),
            notes: NoteService::new(stores.notes.clone(), post_counts.clone()),
            feed: PublicFeed::new(stores.notes.clone()),
            enricher: NoteEnricher::new(stores.music.clone()),
            post_counts,
            config,
            stores,
            identity,
            media,
        }
    }
}
