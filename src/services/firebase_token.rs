// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firebase ID token verification.
//!
//! Tokens are RS256 JWTs signed by `securetoken@system.gserviceaccount.com`.
//! Signing keys are fetched from Google's JWKS endpoint and cached for the
//! `max-age` the endpoint advertises.

use anyhow::Context;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};

const SECURETOKEN_JWKS: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";
const ISSUER_PREFIX: &str = "https://securetoken.google.com/";
const KEY_FETCH_TIMEOUT: Duration = Duration::from_secs(5);
/// Used when the JWKS response carries no usable `max-age`.
const FALLBACK_KEY_LIFETIME: Duration = Duration::from_secs(300);
const ALLOWED_SKEW_SECS: u64 = 60;

/// Claims of a verified Firebase ID token.
#[derive(Debug, Clone, Deserialize)]
pub struct FirebaseClaims {
    pub iss: String,
    pub aud: String,
    /// Firebase UID
    pub sub: String,
    pub exp: usize,
    pub iat: Option<usize>,
    pub auth_time: Option<usize>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
    /// Custom claim set on moderator accounts.
    #[serde(default)]
    pub admin: bool,
}

/// Token verification error categories.
#[derive(Debug, Clone)]
pub enum TokenError {
    /// Malformed, badly signed, or with claims that do not match.
    Invalid(String),
    /// Well-formed but past its `exp`.
    Expired,
    /// Key material could not be fetched.
    Transient(String),
}

/// Signing keys by `kid`, usable until `fresh_until`.
struct KeySet {
    keys: HashMap<String, Arc<DecodingKey>>,
    fresh_until: Instant,
}

impl KeySet {
    fn is_fresh(&self) -> bool {
        self.fresh_until > Instant::now()
    }
}

/// Google's published keys with a refresh-once cache.
struct RemoteKeys {
    client: reqwest::Client,
    current: RwLock<Option<KeySet>>,
    fetching: Mutex<()>,
}

impl RemoteKeys {
    async fn cached(&self, kid: &str) -> Option<Arc<DecodingKey>> {
        self.current
            .read()
            .await
            .as_ref()
            .filter(|set| set.is_fresh())
            .and_then(|set| set.keys.get(kid).cloned())
    }

    async fn key(&self, kid: &str) -> Result<Arc<DecodingKey>, TokenError> {
        if let Some(key) = self.cached(kid).await {
            return Ok(key);
        }

        // First pass fetches only if stale; keys rotate, so a miss on a
        // fresh set forces one more fetch.
        for force in [false, true] {
            self.fetch(force).await?;
            if let Some(key) = self.cached(kid).await {
                return Ok(key);
            }
        }

        Err(TokenError::Invalid(format!("no signing key with kid {kid}")))
    }

    async fn fetch(&self, force: bool) -> Result<(), TokenError> {
        let _fetching = self.fetching.lock().await;

        // Another request may have refreshed while we waited for the lock.
        if !force && self.current.read().await.as_ref().is_some_and(KeySet::is_fresh) {
            return Ok(());
        }

        let response = self
            .client
            .get(SECURETOKEN_JWKS)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| TokenError::Transient(format!("fetching signing keys: {e}")))?;

        let lifetime = response
            .headers()
            .get(reqwest::header::CACHE_CONTROL)
            .and_then(|v| v.to_str().ok())
            .and_then(max_age)
            .unwrap_or(FALLBACK_KEY_LIFETIME);

        let document: JwkDocument = response
            .json()
            .await
            .map_err(|e| TokenError::Transient(format!("decoding signing keys: {e}")))?;

        let keys = rs256_signing_keys(document);
        if keys.is_empty() {
            return Err(TokenError::Transient(
                "signing key document has no RS256 keys".to_string(),
            ));
        }

        tracing::debug!(
            keys = keys.len(),
            lifetime_secs = lifetime.as_secs(),
            "Refreshed Firebase signing keys"
        );
        *self.current.write().await = Some(KeySet {
            keys,
            fresh_until: Instant::now() + lifetime,
        });
        Ok(())
    }
}

enum KeySource {
    Remote(RemoteKeys),
    /// One fixed key, for tests.
    Fixed { kid: String, key: Arc<DecodingKey> },
}

/// Verifier for Firebase-issued ID tokens.
pub struct FirebaseTokenVerifier {
    project_id: String,
    keys: KeySource,
}

impl FirebaseTokenVerifier {
    /// Verifier that fetches and caches Google's signing keys.
    pub fn new(project_id: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(KEY_FETCH_TIMEOUT)
            .build()
            .context("building signing key client")?;

        tracing::info!(project = project_id, "Firebase ID token verifier ready");
        Ok(Self {
            project_id: project_id.to_string(),
            keys: KeySource::Remote(RemoteKeys {
                client,
                current: RwLock::new(None),
                fetching: Mutex::new(()),
            }),
        })
    }

    /// Verifier that trusts exactly one key.
    pub fn new_with_static_key(
        project_id: &str,
        kid: impl Into<String>,
        key: DecodingKey,
    ) -> anyhow::Result<Self> {
        let kid = kid.into();
        anyhow::ensure!(!kid.trim().is_empty(), "static key needs a kid");

        Ok(Self {
            project_id: project_id.to_string(),
            keys: KeySource::Fixed {
                kid,
                key: Arc::new(key),
            },
        })
    }

    async fn signing_key(&self, kid: &str) -> Result<Arc<DecodingKey>, TokenError> {
        match &self.keys {
            KeySource::Remote(remote) => remote.key(kid).await,
            KeySource::Fixed { kid: fixed, key } if fixed == kid => Ok(key.clone()),
            KeySource::Fixed { .. } => {
                Err(TokenError::Invalid(format!("no signing key with kid {kid}")))
            }
        }
    }

    pub async fn verify(&self, token: &str) -> Result<FirebaseClaims, TokenError> {
        let header = decode_header(token)
            .map_err(|e| TokenError::Invalid(format!("unreadable token header: {e}")))?;
        if header.alg != Algorithm::RS256 {
            return Err(TokenError::Invalid(format!(
                "token signed with {:?}, expected RS256",
                header.alg
            )));
        }
        let kid = header
            .kid
            .ok_or_else(|| TokenError::Invalid("token header has no kid".to_string()))?;

        let key = self.signing_key(&kid).await?;

        let issuer = format!("{ISSUER_PREFIX}{}", self.project_id);
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.set_issuer(&[issuer.as_str()]);
        validation.set_audience(&[self.project_id.as_str()]);
        validation.leeway = ALLOWED_SKEW_SECS;

        let claims = match decode::<FirebaseClaims>(token, &key, &validation) {
            Ok(data) => data.claims,
            Err(e) if matches!(e.kind(), ErrorKind::ExpiredSignature) => {
                return Err(TokenError::Expired)
            }
            Err(e) => return Err(TokenError::Invalid(format!("token rejected: {e}"))),
        };

        if claims.sub.trim().is_empty() {
            return Err(TokenError::Invalid("token has an empty subject".to_string()));
        }
        let now = chrono::Utc::now().timestamp().max(0) as u64;
        for (claim, value) in [("iat", claims.iat), ("auth_time", claims.auth_time)] {
            issued_by_now(claim, value, now)?;
        }

        tracing::debug!(uid = %claims.sub, "Verified Firebase ID token");
        Ok(claims)
    }
}

#[derive(Debug, Deserialize)]
struct JwkDocument {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: String,
    kty: String,
    alg: Option<String>,
    #[serde(rename = "use")]
    key_use: Option<String>,
    n: String,
    e: String,
}

impl Jwk {
    fn is_rs256_signing_key(&self) -> bool {
        self.kty == "RSA"
            && !self.kid.trim().is_empty()
            && self.alg.as_deref().unwrap_or("RS256") == "RS256"
            && self.key_use.as_deref().unwrap_or("sig") == "sig"
    }
}

fn rs256_signing_keys(document: JwkDocument) -> HashMap<String, Arc<DecodingKey>> {
    document
        .keys
        .into_iter()
        .filter(Jwk::is_rs256_signing_key)
        .filter_map(|jwk| match DecodingKey::from_rsa_components(&jwk.n, &jwk.e) {
            Ok(key) => Some((jwk.kid, Arc::new(key))),
            Err(e) => {
                tracing::warn!(kid = %jwk.kid, error = %e, "Ignoring malformed signing key");
                None
            }
        })
        .collect()
}

/// `iat` and `auth_time` may not lie in the future beyond the allowed skew.
fn issued_by_now(claim: &str, value: Option<usize>, now: u64) -> Result<(), TokenError> {
    match value {
        Some(t) if t as u64 > now + ALLOWED_SKEW_SECS => Err(TokenError::Invalid(format!(
            "{claim} is in the future"
        ))),
        _ => Ok(()),
    }
}

/// `max-age` directive of a `Cache-Control` header value.
fn max_age(cache_control: &str) -> Option<Duration> {
    cache_control
        .split(',')
        .filter_map(|directive| directive.trim().split_once('='))
        .find(|(name, _)| name.eq_ignore_ascii_case("max-age"))
        .and_then(|(_, secs)| secs.trim_matches('"').parse::<u64>().ok())
        .map(Duration::from_secs)
}
