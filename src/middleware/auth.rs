// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! ID token authentication middleware.

use crate::error::AppError;
use crate::services::notes::Requester;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

/// Session cookie set at login, accepted when no Authorization header is sent.
pub const SESSION_COOKIE: &str = "tuneverse_token";

/// Authenticated user extracted from a verified ID token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
    pub admin: bool,
    /// The raw ID token, forwarded on provider-side profile updates.
    pub token: String,
}

impl AuthUser {
    pub fn requester(&self) -> Requester {
        Requester {
            user_id: self.user_id.clone(),
            is_admin: self.admin,
        }
    }
}

fn bearer_token(request: &Request) -> Option<Result<String, AppError>> {
    let value = request.headers().get(header::AUTHORIZATION)?;

    let token = value
        .to_str()
        .ok()
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .ok_or(AppError::Unauthorized);

    Some(token)
}

/// Middleware that requires a valid ID token.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    // Header first, then cookie
    let token = match bearer_token(&request) {
        Some(token) => token?,
        None => jar
            .get(SESSION_COOKIE)
            .map(|c| c.value().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(AppError::Unauthorized)?,
    };

    let identity = state.identity.verify_id_token(&token).await?;

    request.extensions_mut().insert(AuthUser {
        user_id: identity.uid,
        email: identity.email,
        name: identity.name,
        picture: identity.picture,
        admin: identity.admin,
        token,
    });

    Ok(next.run(request).await)
}
