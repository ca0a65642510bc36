// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use dashmap::DashMap;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use tuneverse_api::config::Config;
use tuneverse_api::db::{FirestoreDb, MemoryDb, Stores, UserRepository};
use tuneverse_api::error::AppError;
use tuneverse_api::models::{AccountDetails, Music, Note, User};
use tuneverse_api::routes::create_router;
use tuneverse_api::services::{
    Account, IdentityProvider, MediaKind, MediaStore, MediaUpload, NewAccount, ProfileChanges,
    SessionTokens, StoredMedia, VerifiedIdentity,
};
use tuneverse_api::AppState;

/// Check if emulator is available via environment variable.
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

// ─── Fake identity provider ──────────────────────────────────

/// Token accepted by [`FakeIdentity`] for `uid`.
pub fn token_for(uid: &str) -> String {
    format!("token-{uid}")
}

/// Bearer token whose holder carries the `admin` claim.
pub fn admin_token_for(uid: &str) -> String {
    format!("admin-token-{uid}")
}

pub const EXPIRED_TOKEN: &str = "expired-token";

#[derive(Clone)]
struct FakeAccount {
    uid: String,
    password: String,
    display_name: String,
}

/// Identity provider that accepts `token-<uid>` and keeps accounts in memory.
#[derive(Default)]
pub struct FakeIdentity {
    accounts: DashMap<String, FakeAccount>,
    next_uid: AtomicUsize,
    /// Profile changes pushed to the provider, in order.
    pub profile_updates: Mutex<Vec<(String, ProfileChanges)>>,
    /// Names handed out in verified tokens, keyed by uid.
    pub names: DashMap<String, String>,
    pub fail_profile_updates: AtomicBool,
}

impl FakeIdentity {
    fn uid_for_token(token: &str) -> Option<(String, bool)> {
        if let Some(uid) = token.strip_prefix("admin-token-") {
            return Some((uid.to_string(), true));
        }
        token
            .strip_prefix("token-")
            .filter(|uid| !uid.is_empty())
            .map(|uid| (uid.to_string(), false))
    }

    fn email_of(&self, uid: &str) -> Option<String> {
        self.accounts
            .iter()
            .find(|a| a.uid == uid)
            .map(|a| a.key().clone())
    }

    fn session(uid: &str) -> SessionTokens {
        SessionTokens {
            id_token: token_for(uid),
            refresh_token: format!("refresh-{uid}"),
            expires_in: "3600".to_string(),
            local_id: uid.to_string(),
        }
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn verify_id_token(&self, token: &str) -> Result<VerifiedIdentity, AppError> {
        if token == EXPIRED_TOKEN {
            return Err(AppError::TokenExpired);
        }
        let (uid, admin) = Self::uid_for_token(token).ok_or(AppError::InvalidToken)?;

        Ok(VerifiedIdentity {
            email: self
                .email_of(&uid)
                .or_else(|| Some(format!("{uid}@example.com"))),
            name: self.names.get(&uid).map(|n| n.value().clone()),
            picture: None,
            admin,
            uid,
        })
    }

    async fn sign_up(&self, account: &NewAccount) -> Result<Account, AppError> {
        if self.accounts.contains_key(&account.email) {
            return Err(AppError::field("email", "The email address is already in use."));
        }
        let uid = format!("uid{}", self.next_uid.fetch_add(1, Ordering::SeqCst) + 1);
        self.accounts.insert(
            account.email.clone(),
            FakeAccount {
                uid: uid.clone(),
                password: account.password.clone(),
                display_name: account.display_name.clone(),
            },
        );
        Ok(Account {
            uid,
            email: account.email.clone(),
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<SessionTokens, AppError> {
        match self.accounts.get(email) {
            Some(a) if a.password == password => Ok(Self::session(&a.uid)),
            _ => Err(AppError::InvalidCredentials),
        }
    }

    async fn update_profile(
        &self,
        id_token: &str,
        changes: &ProfileChanges,
    ) -> Result<(), AppError> {
        let (uid, _) = Self::uid_for_token(id_token).ok_or(AppError::InvalidToken)?;
        if self.fail_profile_updates.load(Ordering::SeqCst) {
            return Err(AppError::Identity {
                status: 503,
                message: "unavailable".to_string(),
            });
        }
        self.profile_updates
            .lock()
            .unwrap()
            .push((uid, changes.clone()));
        Ok(())
    }

    async fn change_password(
        &self,
        id_token: &str,
        new_password: &str,
    ) -> Result<SessionTokens, AppError> {
        let (uid, _) = Self::uid_for_token(id_token).ok_or(AppError::InvalidToken)?;
        for mut account in self.accounts.iter_mut() {
            if account.uid == uid {
                account.password = new_password.to_string();
            }
        }
        Ok(Self::session(&uid))
    }
}

// ─── Fake media store ────────────────────────────────────────

/// Media store that keeps uploads in memory.
#[derive(Default)]
pub struct FakeMedia {
    pub stored: DashMap<String, MediaKind>,
    pub released: Mutex<Vec<String>>,
    counter: AtomicUsize,
    pub fail_uploads: AtomicBool,
}

#[async_trait]
impl MediaStore for FakeMedia {
    async fn upload(&self, upload: MediaUpload) -> Result<StoredMedia, AppError> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(AppError::Media("upload refused".to_string()));
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let public_id = format!("{}/file{}", upload.kind.folder(), n);
        self.stored.insert(public_id.clone(), upload.kind);

        Ok(StoredMedia {
            url: format!("https://media.test/{public_id}"),
            public_id,
            duration: match upload.kind {
                MediaKind::Audio => Some(183.5),
                MediaKind::Image => None,
            },
        })
    }

    async fn release(&self, _kind: MediaKind, public_id: &str) -> Result<(), AppError> {
        self.stored.remove(public_id);
        self.released.lock().unwrap().push(public_id.to_string());
        Ok(())
    }
}

// ─── Failure-injecting user store ────────────────────────────

/// Wraps [`MemoryDb`] and fails post count increments on demand.
#[derive(Clone)]
pub struct FlakyUsers {
    pub inner: MemoryDb,
    pub fail_increments: Arc<AtomicBool>,
}

impl FlakyUsers {
    pub fn new(inner: MemoryDb) -> Self {
        Self {
            inner,
            fail_increments: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[async_trait]
impl UserRepository for FlakyUsers {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.inner.get_user(user_id).await
    }

    async fn create_user(&self, user: &User) -> Result<(), AppError> {
        self.inner.create_user(user).await
    }

    async fn update_user_profile(&self, user: &User) -> Result<(), AppError> {
        self.inner.update_user_profile(user).await
    }

    async fn find_users_by_username(&self, username: &str) -> Result<Vec<User>, AppError> {
        self.inner.find_users_by_username(username).await
    }

    async fn increment_post_count(&self, user_id: &str, delta: i64) -> Result<bool, AppError> {
        if self.fail_increments.load(Ordering::SeqCst) {
            return Err(AppError::Database("injected increment failure".to_string()));
        }
        self.inner.increment_post_count(user_id, delta).await
    }

    async fn set_post_count(&self, user_id: &str, count: i64) -> Result<(), AppError> {
        self.inner.set_post_count(user_id, count).await
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        self.inner.list_users().await
    }
}

// ─── Test app ────────────────────────────────────────────────

pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub db: MemoryDb,
    pub identity: Arc<FakeIdentity>,
    pub media: Arc<FakeMedia>,
}

impl TestApp {
    /// Send a request and decode the JSON body (`Value::Null` when empty).
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }
}

fn build_app(config: Config, db: MemoryDb, stores: Stores) -> TestApp {
    let identity = Arc::new(FakeIdentity::default());
    let media = Arc::new(FakeMedia::default());
    let state = Arc::new(AppState::new(
        config,
        stores,
        identity.clone(),
        media.clone(),
    ));

    TestApp {
        router: create_router(state.clone()),
        state,
        db,
        identity,
        media,
    }
}

/// Create a test app over an empty in-memory store.
pub fn create_test_app() -> TestApp {
    create_test_app_with_config(Config::test_default())
}

pub fn create_test_app_with_config(config: Config) -> TestApp {
    let db = MemoryDb::new();
    build_app(config, db.clone(), Stores::from_backend(db))
}

/// Create a test app whose user store can be told to fail increments.
pub fn create_flaky_test_app() -> (TestApp, FlakyUsers) {
    let db = MemoryDb::new();
    let users = FlakyUsers::new(db.clone());
    let db_arc = Arc::new(db.clone());
    let stores = Stores {
        users: Arc::new(users.clone()),
        notes: db_arc.clone(),
        music: db_arc,
    };
    (build_app(Config::test_default(), db, stores), users)
}

// ─── Requests ────────────────────────────────────────────────

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn delete(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("DELETE").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn json(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// One multipart part: field name, optional (file name, content type), bytes.
pub struct Part<'a> {
    pub name: &'a str,
    pub file: Option<(&'a str, &'a str)>,
    pub data: &'a [u8],
}

pub fn text_part<'a>(name: &'a str, value: &'a str) -> Part<'a> {
    Part {
        name,
        file: None,
        data: value.as_bytes(),
    }
}

pub fn file_part<'a>(name: &'a str, file_name: &'a str, content_type: &'a str, data: &'a [u8]) -> Part<'a> {
    Part {
        name,
        file: Some((file_name, content_type)),
        data,
    }
}

pub fn multipart(method: &str, uri: &str, token: Option<&str>, parts: &[Part<'_>]) -> Request<Body> {
    const BOUNDARY: &str = "tuneverse-test-boundary";

    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part.file {
            Some((file_name, content_type)) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                        part.name, file_name, content_type
                    )
                    .as_bytes(),
                );
            }
            None => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", part.name)
                        .as_bytes(),
                );
            }
        }
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    let mut builder = Request::builder().method(method).uri(uri).header(
        header::CONTENT_TYPE,
        format!("multipart/form-data; boundary={BOUNDARY}"),
    );
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body)).unwrap()
}

// ─── Fixtures ────────────────────────────────────────────────

/// Fixed-width timestamp `secs` seconds after 2024-01-01T00:00:00Z.
pub fn ts(secs: i64) -> String {
    let base = chrono::DateTime::from_timestamp(1_704_067_200 + secs, 0).unwrap();
    tuneverse_api::time_utils::format_utc_rfc3339(base)
}

pub fn test_user(uid: &str, username: &str) -> User {
    User {
        user_id: uid.to_string(),
        email: Some(format!("{uid}@example.com")),
        username: username.to_string(),
        display_name: username.to_string(),
        role: "user".to_string(),
        created_at: ts(0),
        updated_at: ts(0),
        number_of_posts: 0,
        other_account_details: AccountDetails::default(),
    }
}

pub fn test_note(id: &str, owner: &str, created_at: &str) -> Note {
    Note {
        note_id: id.to_string(),
        message: format!("message {id}"),
        recipient: "someone".to_string(),
        sender: owner.to_string(),
        image: None,
        id_music: None,
        creator_user_id: owner.to_string(),
        created_at: created_at.to_string(),
        updated_at: created_at.to_string(),
    }
}

pub fn test_music(id: &str, owner: &str, artist: &str, created_at: &str) -> Music {
    Music {
        music_id: id.to_string(),
        title: format!("title {id}"),
        artist: artist.to_string(),
        music_url: format!("https://media.test/{id}.mp3"),
        music_public_id: format!("tuneverse/music/{id}"),
        image_url: format!("https://media.test/{id}.jpg"),
        image_public_id: format!("tuneverse/cover/{id}"),
        duration: Some(200.0),
        owner_id: owner.to_string(),
        created_at: created_at.to_string(),
        updated_at: created_at.to_string(),
    }
}
