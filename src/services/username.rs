// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Unique handle allocation.
//!
//! Handles are derived from a desired base (display name or email local
//! part). Numbered candidates `base`, `base_1`, `base_2`, … are tried in
//! order; after [`MAX_NUMBERED_ATTEMPTS`] collisions a single candidate with
//! an owner-ID suffix is tried before giving up.
//!
//! Uniqueness is checked with a read, not enforced by the store: two
//! concurrent allocations for the same base can both succeed with the same
//! handle.

use crate::db::UserRepository;
use crate::error::AppError;
use std::sync::Arc;

/// Longest sanitized base kept from the desired name.
pub const MAX_BASE_LEN: usize = 20;
/// Longest handle ever produced.
pub const MAX_HANDLE_LEN: usize = 30;
/// Numbered candidates (`base`, `base_1` … `base_99`) tried before the fallback.
pub const MAX_NUMBERED_ATTEMPTS: u32 = 100;
/// Base used when nothing survives sanitizing.
pub const FALLBACK_BASE: &str = "user";
/// Owner-ID characters appended in the fallback candidate.
const OWNER_SUFFIX_LEN: usize = 8;

/// Handle allocation errors.
#[derive(Debug, thiserror::Error)]
pub enum AllocationError {
    #[error("Could not allocate a unique username for base '{base}'")]
    Exhausted { base: String },

    #[error(transparent)]
    Store(#[from] AppError),
}

impl From<AllocationError> for AppError {
    fn from(err: AllocationError) -> Self {
        match err {
            AllocationError::Exhausted { .. } => AppError::Internal(anyhow::anyhow!(err)),
            AllocationError::Store(e) => e,
        }
    }
}

/// Keep `[A-Za-z0-9_]`, cap at [`MAX_BASE_LEN`] characters, fall back to `"user"`.
pub fn sanitize_base(desired: &str) -> String {
    let base: String = desired
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .take(MAX_BASE_LEN)
        .collect();

    if base.is_empty() {
        FALLBACK_BASE.to_string()
    } else {
        base
    }
}

/// Join `base` and `suffix` with `_`, shortening the base so the result
/// fits in [`MAX_HANDLE_LEN`].
fn with_suffix(base: &str, suffix: &str) -> String {
    let room = MAX_HANDLE_LEN.saturating_sub(suffix.len() + 1);
    let base: String = base.chars().take(room).collect();
    format!("{}_{}", base, suffix)
}

/// Candidate handle for a given attempt number (0 is the bare base).
pub fn candidate(base: &str, attempt: u32) -> String {
    if attempt == 0 {
        base.chars().take(MAX_HANDLE_LEN).collect()
    } else {
        with_suffix(base, &attempt.to_string())
    }
}

/// Last-resort candidate: base plus the first characters of the owner ID.
pub fn owner_candidate(base: &str, owner_id: &str) -> String {
    let suffix: String = owner_id.chars().take(OWNER_SUFFIX_LEN).collect();
    with_suffix(base, &suffix)
}

/// Allocates handles and checks handle ownership.
#[derive(Clone)]
pub struct UsernameAllocator {
    users: Arc<dyn UserRepository>,
}

impl UsernameAllocator {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    /// Derive a handle from `desired` that no user currently holds.
    pub async fn allocate(&self, desired: &str, owner_id: &str) -> Result<String, AllocationError> {
        let base = sanitize_base(desired);

        for attempt in 0..MAX_NUMBERED_ATTEMPTS {
            let handle = candidate(&base, attempt);
            if !self.is_held(&handle).await? {
                tracing::debug!(handle = %handle, attempt, "Allocated username");
                return Ok(handle);
            }
        }

        let handle = owner_candidate(&base, owner_id);
        tracing::info!(
            base = %base,
            handle = %handle,
            "Numbered usernames exhausted, trying owner suffix"
        );

        if self.is_held(&handle).await? {
            tracing::error!(base = %base, owner_id, "Username allocation exhausted");
            return Err(AllocationError::Exhausted { base });
        }

        Ok(handle)
    }

    /// Whether an owner other than `excluding_owner` holds `handle`.
    pub async fn is_taken(&self, handle: &str, excluding_owner: &str) -> Result<bool, AppError> {
        let holders = self.users.find_users_by_username(handle).await?;
        Ok(holders.iter().any(|u| u.user_id != excluding_owner))
    }

    /// Whether anyone at all holds `handle`.
    pub async fn is_held(&self, handle: &str) -> Result<bool, AppError> {
        Ok(!self.users.find_users_by_username(handle).await?.is_empty())
    }
}
