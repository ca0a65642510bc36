// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Middleware modules (authentication, security, error details).

pub mod auth;
pub mod error_detail;
pub mod security;

pub use auth::{require_auth, AuthUser};
pub use error_detail::expose_error_details;
