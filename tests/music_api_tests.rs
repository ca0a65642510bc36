// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Music uploads, listings and owner-scoped edits.

use axum::http::StatusCode;
use std::collections::HashSet;
use std::sync::atomic::Ordering;
use tuneverse_api::db::MusicRepository;

mod common;
use common::{admin_token_for, file_part, test_music, text_part, token_for, ts};

const MP3: &[u8] = b"ID3\x03\x00fake-audio-frames";
const PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake-image";

fn full_upload(token: &str) -> axum::http::Request<axum::body::Body> {
    common::multipart(
        "POST",
        "/api/music",
        Some(token),
        &[
            text_part("title", "Blue Hour"),
            text_part("artist", "Nina"),
            file_part("music", "blue.mp3", "audio/mpeg", MP3),
            file_part("cover", "blue.png", "image/png", PNG),
        ],
    )
}

#[tokio::test]
async fn test_upload_music() {
    let app = common::create_test_app();

    let (status, body) = app.send(full_upload(&token_for("u1"))).await;

    assert_eq!(status, StatusCode::CREATED);
    let id = body["id"].as_str().unwrap();
    let music = &body["music"];
    assert_eq!(music["title"], "Blue Hour");
    assert_eq!(music["artist"], "Nina");
    assert_eq!(music["ownerId"], "u1");
    assert_eq!(music["musicPublicId"], "tuneverse/music/file1");
    assert_eq!(music["imagePublicId"], "tuneverse/cover/file2");
    assert_eq!(music["duration"], 183.5);

    let stored = app.db.get_music(id).await.unwrap().unwrap();
    assert_eq!(stored.music_url, "https://media.test/tuneverse/music/file1");
    assert_eq!(app.media.stored.len(), 2);
}

#[tokio::test]
async fn test_upload_requires_every_field() {
    let app = common::create_test_app();

    let (status, body) = app
        .send(common::multipart(
            "POST",
            "/api/music",
            Some(&token_for("u1")),
            &[
                text_part("title", "  "),
                file_part("music", "a.mp3", "audio/mpeg", MP3),
            ],
        ))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let fields: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["title", "artist", "cover"]);
    assert!(app.media.stored.is_empty());
}

#[tokio::test]
async fn test_upload_rejects_wrong_file_type() {
    let app = common::create_test_app();

    let (status, body) = app
        .send(common::multipart(
            "POST",
            "/api/music",
            Some(&token_for("u1")),
            &[
                text_part("title", "t"),
                text_part("artist", "a"),
                file_part("music", "song.txt", "text/plain", b"la la la"),
                file_part("cover", "c.png", "image/png", PNG),
            ],
        ))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "music");
}

#[tokio::test]
async fn test_upload_needs_auth_and_reports_media_failure() {
    let app = common::create_test_app();

    let (status, _) = app
        .send(common::multipart("POST", "/api/music", None, &[]))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    app.media.fail_uploads.store(true, Ordering::SeqCst);
    let (status, body) = app.send(full_upload(&token_for("u1"))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "media_error");
    assert!(app.db.list_music(100).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_replacing_audio_releases_old_file() {
    let app = common::create_test_app();
    let token = token_for("u1");
    let (_, body) = app.send(full_upload(&token)).await;
    let id = body["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .send(common::multipart(
            "PUT",
            &format!("/api/music/{id}"),
            Some(&token),
            &[
                text_part("title", "Blue Hour (Live)"),
                file_part("music", "live.mp3", "audio/mpeg", MP3),
            ],
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["music"]["title"], "Blue Hour (Live)");
    assert_eq!(body["music"]["artist"], "Nina");
    assert_eq!(body["music"]["musicPublicId"], "tuneverse/music/file3");
    // Cover untouched.
    assert_eq!(body["music"]["imagePublicId"], "tuneverse/cover/file2");

    let released = app.media.released.lock().unwrap().clone();
    assert_eq!(released, vec!["tuneverse/music/file1".to_string()]);
}

#[tokio::test]
async fn test_empty_edit_is_rejected() {
    let app = common::create_test_app();
    app.db
        .create_music(&test_music("m1", "u1", "Nina", &ts(0)))
        .await
        .unwrap();

    let (status, _) = app
        .send(common::multipart("PUT", "/api/music/m1", Some(&token_for("u1")), &[]))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_only_owner_or_admin_may_change_music() {
    let app = common::create_test_app();
    app.db
        .create_music(&test_music("m1", "u1", "Nina", &ts(0)))
        .await
        .unwrap();

    let (status, _) = app
        .send(common::multipart(
            "PUT",
            "/api/music/m1",
            Some(&token_for("u2")),
            &[text_part("title", "mine now")],
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send(common::delete("/api/music/m1", Some(&token_for("u2"))))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send(common::delete("/api/music/missing", Some(&token_for("u1"))))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .send(common::delete("/api/music/m1", Some(&admin_token_for("mod"))))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "m1");
    assert!(app.db.get_music("m1").await.unwrap().is_none());

    let released = app.media.released.lock().unwrap().clone();
    assert_eq!(
        released,
        vec![
            "tuneverse/music/m1".to_string(),
            "tuneverse/cover/m1".to_string()
        ]
    );
}

#[tokio::test]
async fn test_listings() {
    let app = common::create_test_app();
    for i in 0..30 {
        let owner = if i % 2 == 0 { "u1" } else { "u2" };
        app.db
            .create_music(&test_music(&format!("m{i:02}"), owner, "A", &ts(i)))
            .await
            .unwrap();
    }

    let (status, body) = app.send(common::get("/api/music", None)).await;
    assert_eq!(status, StatusCode::OK);
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 20);
    assert_eq!(data[0]["musicId"], "m29");

    let (_, body) = app.send(common::get("/api/music?limit=5", None)).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 5);

    let (_, body) = app.send(common::get("/api/music/m03", None)).await;
    assert_eq!(body["ownerId"], "u2");

    let (status, _) = app.send(common::get("/api/music/zzz", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .send(common::get("/api/music/user", Some(&token_for("u1"))))
        .await;
    assert_eq!(status, StatusCode::OK);
    let mine = body["data"].as_array().unwrap();
    assert_eq!(mine.len(), 15);
    assert!(mine.iter().all(|m| m["ownerId"] == "u1"));
}

#[tokio::test]
async fn test_explore_returns_distinct_tracks() {
    let app = common::create_test_app();
    for i in 0..25 {
        app.db
            .create_music(&test_music(&format!("m{i:02}"), "u1", "A", &ts(i)))
            .await
            .unwrap();
    }

    let (status, body) = app.send(common::get("/api/music/explore", None)).await;
    assert_eq!(status, StatusCode::OK);
    let ids: HashSet<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["musicId"].as_str().unwrap())
        .collect();
    assert_eq!(ids.len(), 10);

    let (_, body) = app
        .send(common::get("/api/music/explore?limit=50", None))
        .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 25);
}

#[tokio::test]
async fn test_top_artists() {
    let app = common::create_test_app();
    let artists = ["Nina", "Miles", "Nina", "Ella", "Miles", "Nina"];
    for (i, artist) in artists.iter().enumerate() {
        app.db
            .create_music(&test_music(&format!("m{i}"), "u1", artist, &ts(i as i64)))
            .await
            .unwrap();
    }

    let (status, body) = app
        .send(common::get("/api/music/top-artists?limit=2", None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"],
        serde_json::json!([
            {"artist": "Nina", "trackCount": 3},
            {"artist": "Miles", "trackCount": 2}
        ])
    );
}
