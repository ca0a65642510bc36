// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firebase Authentication via the Identity Toolkit REST API.

use crate::config::Config;
use crate::error::AppError;
use crate::services::firebase_token::{FirebaseTokenVerifier, TokenError};
use crate::services::identity::{
    Account, IdentityProvider, NewAccount, ProfileChanges, SessionTokens, VerifiedIdentity,
};
use anyhow::Context;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Firebase-backed [`IdentityProvider`].
pub struct FirebaseIdentity {
    http_client: reqwest::Client,
    api_key: String,
    base_url: String,
    verifier: FirebaseTokenVerifier,
}

impl FirebaseIdentity {
    /// Create a client for the configured project.
    ///
    /// `FIREBASE_AUTH_EMULATOR_HOST` redirects REST calls to the emulator.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let verifier = FirebaseTokenVerifier::new(&config.firebase_project_id)?;
        Self::with_verifier(config, verifier)
    }

    pub fn with_verifier(config: &Config, verifier: FirebaseTokenVerifier) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed building Identity Toolkit HTTP client")?;

        let base_url = match std::env::var("FIREBASE_AUTH_EMULATOR_HOST") {
            Ok(host) if !host.trim().is_empty() => {
                tracing::info!(host = %host, "Using Firebase Auth emulator");
                format!("http://{}/identitytoolkit.googleapis.com/v1", host.trim())
            }
            _ => IDENTITY_TOOLKIT_URL.to_string(),
        };

        Ok(Self {
            http_client,
            api_key: config.firebase_web_api_key.clone(),
            base_url,
            verifier,
        })
    }

    async fn call<B, R>(&self, method: &str, body: &B) -> Result<R, AppError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}/accounts:{}", self.base_url, method);

        let response = self
            .http_client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::UpstreamTimeout(format!("identity provider {method}"))
                } else {
                    AppError::Identity {
                        status: 502,
                        message: format!("{method} request failed: {e}"),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body: ProviderErrorBody = response.json().await.unwrap_or_default();
            return Err(map_provider_error(status.as_u16(), &body.error.message));
        }

        response.json().await.map_err(|e| AppError::Identity {
            status: 502,
            message: format!("invalid {method} response: {e}"),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
struct ProviderErrorBody {
    #[serde(default)]
    error: ProviderError,
}

#[derive(Debug, Default, Deserialize)]
struct ProviderError {
    #[serde(default)]
    message: String,
}

/// Map an Identity Toolkit error message (e.g. `"WEAK_PASSWORD : Password
/// should be at least 6 characters"`) to an application error.
fn map_provider_error(status: u16, message: &str) -> AppError {
    let code = message
        .split([' ', ':'])
        .next()
        .unwrap_or_default()
        .trim();

    match code {
        "EMAIL_EXISTS" => AppError::field("email", "The email address is already in use."),
        "INVALID_EMAIL" => AppError::field("email", "The email address is invalid."),
        "WEAK_PASSWORD" => AppError::field("password", "The password is too weak."),
        "INVALID_PASSWORD" | "EMAIL_NOT_FOUND" | "INVALID_LOGIN_CREDENTIALS" => {
            AppError::InvalidCredentials
        }
        "TOKEN_EXPIRED" | "CREDENTIAL_TOO_OLD_LOGIN_AGAIN" => AppError::TokenExpired,
        "INVALID_ID_TOKEN" => AppError::InvalidToken,
        "USER_NOT_FOUND" => AppError::NotFound("User not found.".to_string()),
        "USER_DISABLED" => AppError::Forbidden("This account has been disabled.".to_string()),
        _ => AppError::Identity {
            status,
            message: if message.is_empty() {
                "Identity provider request failed.".to_string()
            } else {
                message.to_string()
            },
        },
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignUpRequest<'a> {
    email: &'a str,
    password: &'a str,
    display_name: &'a str,
    photo_url: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignUpResponse {
    local_id: String,
    email: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRequest<'a> {
    id_token: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    photo_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    delete_attribute: Vec<&'static str>,
    return_secure_token: bool,
}

impl<'a> UpdateRequest<'a> {
    fn new(id_token: &'a str) -> Self {
        Self {
            id_token,
            display_name: None,
            photo_url: None,
            password: None,
            delete_attribute: Vec::new(),
            return_secure_token: false,
        }
    }
}

#[derive(Deserialize)]
struct Ignored {}

#[async_trait]
impl IdentityProvider for FirebaseIdentity {
    async fn verify_id_token(&self, token: &str) -> Result<VerifiedIdentity, AppError> {
        let claims = self.verifier.verify(token).await.map_err(|e| match e {
            TokenError::Expired => AppError::TokenExpired,
            TokenError::Invalid(reason) => {
                tracing::debug!(reason = %reason, "Rejected ID token");
                AppError::InvalidToken
            }
            TokenError::Transient(reason) => AppError::Identity {
                status: 503,
                message: reason,
            },
        })?;

        Ok(VerifiedIdentity {
            uid: claims.sub,
            email: claims.email,
            name: claims.name,
            picture: claims.picture,
            admin: claims.admin,
        })
    }

    async fn sign_up(&self, account: &NewAccount) -> Result<Account, AppError> {
        let created: SignUpResponse = self
            .call(
                "signUp",
                &SignUpRequest {
                    email: &account.email,
                    password: &account.password,
                    display_name: &account.display_name,
                    photo_url: &account.photo_url,
                    return_secure_token: false,
                },
            )
            .await?;

        tracing::info!(uid = %created.local_id, "Identity account created");
        Ok(Account {
            uid: created.local_id,
            email: created.email,
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<SessionTokens, AppError> {
        self.call(
            "signInWithPassword",
            &SignInRequest {
                email,
                password,
                return_secure_token: true,
            },
        )
        .await
    }

    async fn update_profile(
        &self,
        id_token: &str,
        changes: &ProfileChanges,
    ) -> Result<(), AppError> {
        let mut request = UpdateRequest::new(id_token);

        match changes.display_name.as_deref() {
            Some("") => request.delete_attribute.push("DISPLAY_NAME"),
            other => request.display_name = other,
        }
        match changes.photo_url.as_deref() {
            Some("") => request.delete_attribute.push("PHOTO_URL"),
            other => request.photo_url = other,
        }

        let _: Ignored = self.call("update", &request).await?;
        Ok(())
    }

    async fn change_password(
        &self,
        id_token: &str,
        new_password: &str,
    ) -> Result<SessionTokens, AppError> {
        let mut request = UpdateRequest::new(id_token);
        request.password = Some(new_password);
        request.return_secure_token = true;

        self.call("update", &request).await.map_err(|e| match e {
            AppError::Validation(mut fields) => {
                for f in fields.iter_mut().filter(|f| f.field == "password") {
                    f.field = "newPassword".to_string();
                }
                AppError::Validation(fields)
            }
            other => other,
        })
    }
}
