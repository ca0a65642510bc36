// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account and profile routes.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::{Validate, ValidationError};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::middleware::auth::{AuthUser, SESSION_COOKIE};
use crate::models::user::{default_avatar_url, DEFAULT_ROLE};
use crate::models::{AccountDetails, User};
use crate::routes::json_body;
use crate::services::{NewAccount, ProfileChanges};
use crate::time_utils::now_rfc3339;
use crate::AppState;

pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
}

/// Auth middleware is applied in routes/mod.rs for these routes.
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/profile", get(get_profile).put(update_profile))
        .route("/api/auth/change-password", post(change_password))
}

// ─── Validation helpers ──────────────────────────────────────

fn handle_chars(value: &str) -> std::result::Result<(), ValidationError> {
    if value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(ValidationError::new("handle_chars").with_message(
            "Username may only contain letters, numbers, and underscores.".into(),
        ))
    }
}

/// At least one lowercase, uppercase, digit and symbol.
fn strong_password(value: &str) -> std::result::Result<(), ValidationError> {
    let lower = value.chars().any(|c| c.is_ascii_lowercase());
    let upper = value.chars().any(|c| c.is_ascii_uppercase());
    let digit = value.chars().any(|c| c.is_ascii_digit());
    let symbol = value.chars().any(|c| !c.is_alphanumeric() && !c.is_whitespace());

    if lower && upper && digit && symbol {
        Ok(())
    } else {
        Err(ValidationError::new("weak_password").with_message(
            "Password must include uppercase and lowercase letters, a number, and a symbol."
                .into(),
        ))
    }
}

/// Empty string is allowed (it clears the photo).
fn valid_photo_url(value: &str) -> std::result::Result<(), ValidationError> {
    if value.is_empty() || value.starts_with("https://") || value.starts_with("http://") {
        Ok(())
    } else {
        Err(ValidationError::new("url").with_message("photoURL must be a valid URL.".into()))
    }
}

// ─── Register / Login ────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(email(message = "A valid email address is required."))]
    pub email: String,
    #[serde(default)]
    #[validate(
        length(min = 8, message = "Password must be at least 8 characters long."),
        custom(function = "strong_password")
    )]
    pub password: String,
    #[serde(default)]
    #[validate(
        length(min = 3, message = "Username must be at least 3 characters long."),
        custom(function = "handle_chars")
    )]
    pub username: String,
    #[serde(rename = "displayName")]
    #[validate(length(min = 3, message = "Display name must be at least 3 characters long."))]
    pub display_name: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RegisterResponse {
    pub message: String,
    pub user_id: String,
    pub email: String,
}

/// Create an identity account and its profile document.
async fn register(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterResponse>)> {
    let req = json_body(payload)?;
    req.validate()?;

    let email = req.email.trim().to_lowercase();
    let username = req.username.trim().to_string();

    if state.usernames.is_held(&username).await? {
        return Err(AppError::field("username", "This username is already taken."));
    }

    let display_name = req
        .display_name
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| username.clone());
    let photo_url = default_avatar_url(&display_name);

    let account = state
        .identity
        .sign_up(&NewAccount {
            email: email.clone(),
            password: req.password,
            display_name: display_name.clone(),
            photo_url: photo_url.clone(),
        })
        .await?;

    let now = now_rfc3339();
    let user = User {
        user_id: account.uid.clone(),
        email: Some(account.email.clone()),
        username,
        display_name,
        role: DEFAULT_ROLE.to_string(),
        created_at: now.clone(),
        updated_at: now,
        number_of_posts: 0,
        other_account_details: AccountDetails {
            photo_url: Some(photo_url),
            ..Default::default()
        },
    };

    if let Err(e) = state.stores.users.create_user(&user).await {
        // The profile is recreated lazily on the next profile fetch.
        tracing::error!(uid = %account.uid, error = %e, "Account created but profile write failed");
        return Err(e);
    }

    tracing::info!(uid = %account.uid, username = %user.username, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully.".to_string(),
            user_id: account.uid,
            email: account.email,
        }),
    ))
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(email(message = "A valid email address is required."))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required."))]
    pub password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SessionResponse {
    pub message: String,
    pub id_token: String,
    pub refresh_token: String,
    pub local_id: String,
    pub expires_in: String,
}

/// Browser-session cookie; the token inside expires on its own.
fn session_cookie(id_token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, id_token))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Sign in with email and password.
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    payload: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let req = json_body(payload)?;
    req.validate()?;

    let session = state
        .identity
        .sign_in(req.email.trim(), &req.password)
        .await?;

    tracing::info!(uid = %session.local_id, "User signed in");

    let jar = jar.add(session_cookie(session.id_token.clone()));
    Ok((
        jar,
        Json(SessionResponse {
            message: "Login successful.".to_string(),
            id_token: session.id_token,
            refresh_token: session.refresh_token,
            local_id: session.local_id,
            expires_in: session.expires_in,
        }),
    ))
}

// ─── Profile ─────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub message: String,
    pub user_profile: User,
}

/// Handle base for a profile created on first fetch: the first word of the
/// token's name, else the email local part.
fn lazy_handle_base(user: &AuthUser) -> String {
    user.name
        .as_deref()
        .and_then(|n| n.split_whitespace().next())
        .or_else(|| user.email.as_deref().and_then(|e| e.split('@').next()))
        .unwrap_or_default()
        .to_string()
}

/// Create the profile of an authenticated user who has none yet.
async fn create_missing_profile(state: &AppState, user: &AuthUser) -> Result<User> {
    let handle = state
        .usernames
        .allocate(&lazy_handle_base(user), &user.user_id)
        .await?;

    // Notes may predate the profile.
    let number_of_posts = state.post_counts.live_count(&user.user_id).await?;

    let display_name = user
        .name
        .clone()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| handle.clone());
    let photo_url = user
        .picture
        .clone()
        .unwrap_or_else(|| default_avatar_url(&display_name));

    let now = now_rfc3339();
    let profile = User {
        user_id: user.user_id.clone(),
        email: user.email.clone(),
        username: handle,
        display_name,
        role: DEFAULT_ROLE.to_string(),
        created_at: now.clone(),
        updated_at: now,
        number_of_posts,
        other_account_details: AccountDetails {
            photo_url: Some(photo_url),
            ..Default::default()
        },
    };

    state.stores.users.create_user(&profile).await?;
    tracing::info!(
        uid = %profile.user_id,
        username = %profile.username,
        number_of_posts,
        "Created missing user profile"
    );
    Ok(profile)
}

/// Fetch the caller's profile, creating it on first access.
async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ProfileResponse>> {
    let profile = match state.stores.users.get_user(&user.user_id).await? {
        Some(profile) => profile,
        None => create_missing_profile(&state, &user).await?,
    };

    Ok(Json(ProfileResponse {
        message: "Profile retrieved successfully.".to_string(),
        user_profile: profile,
    }))
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(
        length(min = 3, message = "Username must be at least 3 characters long."),
        custom(function = "handle_chars")
    )]
    pub username: Option<String>,
    #[serde(rename = "displayName")]
    #[validate(length(min = 3, message = "Display name must be at least 3 characters long."))]
    pub display_name: Option<String>,
    #[serde(rename = "photoURL")]
    #[validate(custom(function = "valid_photo_url"))]
    pub photo_url: Option<String>,
    pub user_description: Option<String>,
    pub user_location: Option<String>,
}

/// Apply the request to `profile`; returns the provider-side changes and
/// whether anything changed at all.
fn apply_profile_changes(
    profile: &mut User,
    req: UpdateProfileRequest,
) -> (ProfileChanges, bool) {
    let mut provider = ProfileChanges::default();
    let mut changed = false;

    if let Some(username) = req.username.map(|u| u.trim().to_string()) {
        if username != profile.username {
            profile.username = username;
            changed = true;
        }
    }
    if let Some(display_name) = req.display_name.map(|d| d.trim().to_string()) {
        if display_name != profile.display_name {
            provider.display_name = Some(display_name.clone());
            profile.display_name = display_name;
            changed = true;
        }
    }
    if let Some(photo) = req.photo_url.map(|p| p.trim().to_string()) {
        let new_photo = Some(photo.clone()).filter(|p| !p.is_empty());
        if new_photo != profile.other_account_details.photo_url {
            provider.photo_url = Some(photo);
            profile.other_account_details.photo_url = new_photo;
            changed = true;
        }
    }
    if let Some(description) = req.user_description {
        if description != profile.other_account_details.user_description {
            profile.other_account_details.user_description = description;
            changed = true;
        }
    }
    if let Some(location) = req.user_location {
        if location != profile.other_account_details.user_location {
            profile.other_account_details.user_location = location;
            changed = true;
        }
    }

    (provider, changed)
}

/// Update the caller's profile.
async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    payload: std::result::Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> Result<Json<ProfileResponse>> {
    let req = json_body(payload)?;
    req.validate()?;

    let mut profile = state
        .stores
        .users
        .get_user(&user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User profile not found.".to_string()))?;

    if let Some(username) = req.username.as_deref().map(str::trim) {
        if username != profile.username && state.usernames.is_taken(username, &user.user_id).await? {
            return Err(AppError::field("username", "This username is already taken."));
        }
    }

    let (provider_changes, changed) = apply_profile_changes(&mut profile, req);
    if !changed {
        return Ok(Json(ProfileResponse {
            message: "No changes to update.".to_string(),
            user_profile: profile,
        }));
    }

    profile.updated_at = now_rfc3339();
    state.stores.users.update_user_profile(&profile).await?;

    if !provider_changes.is_empty() {
        if let Err(e) = state
            .identity
            .update_profile(&user.token, &provider_changes)
            .await
        {
            tracing::warn!(uid = %user.user_id, error = %e, "Failed to mirror profile to identity provider");
        }
    }

    tracing::info!(uid = %user.user_id, "Profile updated");
    Ok(Json(ProfileResponse {
        message: "Profile updated successfully.".to_string(),
        user_profile: profile,
    }))
}

// ─── Password ────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[serde(default, rename = "newPassword")]
    #[validate(
        length(min = 8, message = "Password must be at least 8 characters long."),
        custom(function = "strong_password")
    )]
    pub new_password: String,
}

/// Change the caller's password and hand back a fresh session.
async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    jar: CookieJar,
    payload: std::result::Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let req = json_body(payload)?;
    req.validate()?;

    let session = state
        .identity
        .change_password(&user.token, &req.new_password)
        .await?;

    tracing::info!(uid = %user.user_id, "Password changed");

    let jar = jar.add(session_cookie(session.id_token.clone()));
    Ok((
        jar,
        Json(SessionResponse {
            message: "Password updated successfully.".to_string(),
            id_token: session.id_token,
            refresh_token: session.refresh_token,
            local_id: session.local_id,
            expires_in: session.expires_in,
        }),
    ))
}
