// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity provider abstraction.
//!
//! The API never stores credentials. Accounts, passwords and ID tokens live
//! with the provider; this trait is the only way handlers reach it.

use crate::error::AppError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Claims extracted from a verified ID token.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedIdentity {
    pub uid: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
    /// Custom `admin` claim.
    pub admin: bool,
}

/// Account to create.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub photo_url: String,
}

/// Account as created by the provider.
#[derive(Debug, Clone)]
pub struct Account {
    pub uid: String,
    pub email: String,
}

/// Session returned by a sign-in.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTokens {
    pub id_token: String,
    pub refresh_token: String,
    pub expires_in: String,
    pub local_id: String,
}

/// Profile fields mirrored to the provider. `Some("")` clears a field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileChanges {
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

impl ProfileChanges {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.photo_url.is_none()
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Verify a bearer ID token.
    async fn verify_id_token(&self, token: &str) -> Result<VerifiedIdentity, AppError>;

    async fn sign_up(&self, account: &NewAccount) -> Result<Account, AppError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<SessionTokens, AppError>;

    /// Update provider-side profile fields for the account behind `id_token`.
    async fn update_profile(&self, id_token: &str, changes: &ProfileChanges)
        -> Result<(), AppError>;

    /// Change the password and return a fresh session.
    async fn change_password(
        &self,
        id_token: &str,
        new_password: &str,
    ) -> Result<SessionTokens, AppError>;
}
