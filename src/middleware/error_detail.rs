// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Development-only error details.

use crate::error::{ErrorDetail, ErrorResponse};
use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

/// Re-render error bodies with their internal `details` when the
/// environment allows it.
pub async fn expose_error_details(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let response = next.run(req).await;

    if !state.config.environment.exposes_error_details() {
        return response;
    }

    let (Some(body), Some(detail)) = (
        response.extensions().get::<ErrorResponse>().cloned(),
        response.extensions().get::<ErrorDetail>().cloned(),
    ) else {
        return response;
    };

    let status = response.status();
    let mut rendered = (
        status,
        Json(ErrorResponse {
            details: Some(detail.0),
            ..body
        }),
    )
        .into_response();

    // Keep headers such as CORS that were set by inner layers.
    for (name, value) in response.headers() {
        if name != axum::http::header::CONTENT_LENGTH {
            rendered.headers_mut().insert(name.clone(), value.clone());
        }
    }
    rendered
}
