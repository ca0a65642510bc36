// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error("Identity provider error ({status}): {message}")]
    Identity { status: u16, message: String },

    #[error("Upstream timeout: {0}")]
    UpstreamTimeout(String),

    #[error("Media host error: {0}")]
    Media(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Shorthand for a validation error on a single field.
    pub fn field(field: &str, message: &str) -> Self {
        AppError::Validation(vec![FieldError::new(field, message)])
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized
            | AppError::InvalidToken
            | AppError::TokenExpired
            | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Identity { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            AppError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Media(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<FieldError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                let field = wire_field_name(&field);
                errs.iter().map(move |e| {
                    let message = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string());
                    FieldError::new(field.clone(), message)
                })
            })
            .collect();
        fields.sort_by(|a, b| a.field.cmp(&b.field));
        AppError::Validation(fields)
    }
}

/// Map a Rust field name to the name clients send it under.
fn wire_field_name(field: &str) -> String {
    if field == "photo_url" {
        return "photoURL".to_string();
    }
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// JSON error response body.
///
/// Also attached to the response as an extension so the error-detail
/// middleware can re-render it with `details` in development.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub status: u16,
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Internal error text, hidden from clients outside development.
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub String);

const GENERIC_SERVER_ERROR: &str = "Something went wrong on the server.";

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error, message, errors) = match &self {
            AppError::Unauthorized => (
                "unauthorized",
                "Unauthorized: missing or malformed bearer token.".to_string(),
                None,
            ),
            AppError::InvalidToken => (
                "invalid_token",
                "Unauthorized: invalid token.".to_string(),
                None,
            ),
            AppError::TokenExpired => (
                "token_expired",
                "Unauthorized: token has expired.".to_string(),
                None,
            ),
            AppError::InvalidCredentials => (
                "invalid_credentials",
                "Incorrect email or password.".to_string(),
                None,
            ),
            AppError::Forbidden(msg) => ("forbidden", msg.clone(), None),
            AppError::NotFound(msg) => ("not_found", msg.clone(), None),
            AppError::BadRequest(msg) => ("bad_request", msg.clone(), None),
            AppError::Validation(fields) => (
                "validation_error",
                "Request validation failed.".to_string(),
                Some(fields.clone()),
            ),
            AppError::Identity { status, message } => {
                tracing::warn!(status, error = %message, "Identity provider error");
                let message = if *status >= 500 {
                    GENERIC_SERVER_ERROR.to_string()
                } else {
                    message.clone()
                };
                ("identity_error", message, None)
            }
            AppError::UpstreamTimeout(msg) => {
                tracing::error!(error = %msg, "Upstream timeout");
                (
                    "upstream_timeout",
                    "An upstream service did not respond in time.".to_string(),
                    None,
                )
            }
            AppError::Media(msg) => {
                tracing::error!(error = %msg, "Media host error");
                ("media_error", GENERIC_SERVER_ERROR.to_string(), None)
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                ("database_error", GENERIC_SERVER_ERROR.to_string(), None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                ("internal_error", GENERIC_SERVER_ERROR.to_string(), None)
            }
        };

        let body = ErrorResponse {
            success: false,
            status: status.as_u16(),
            error: error.to_string(),
            message,
            errors,
            details: None,
        };

        let mut response = (status, Json(body.clone())).into_response();
        response.extensions_mut().insert(body);
        response
            .extensions_mut()
            .insert(ErrorDetail(self.to_string()));
        response
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
