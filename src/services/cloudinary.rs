// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cloudinary media host client (signed uploads and deletes).

use crate::config::Config;
use crate::error::AppError;
use crate::services::media::{MediaKind, MediaStore, MediaUpload, StoredMedia};
use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const API_BASE: &str = "https://api.cloudinary.com/v1_1";
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(120);

pub struct CloudinaryMedia {
    http_client: reqwest::Client,
    cloud_name: String,
    api_key: String,
    api_secret: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
    duration: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

/// Sign request parameters: sorted `k=v` pairs joined by `&`, followed by
/// the API secret, hashed with SHA-256.
fn sign(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let to_sign = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

fn unix_timestamp() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
        .to_string()
}

impl CloudinaryMedia {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(UPLOAD_TIMEOUT)
            .build()
            .context("failed building Cloudinary HTTP client")?;

        Ok(Self {
            http_client,
            cloud_name: config.cloudinary_cloud_name.clone(),
            api_key: config.cloudinary_api_key.clone(),
            api_secret: config.cloudinary_api_secret.clone(),
        })
    }

    fn endpoint(&self, kind: MediaKind, action: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            API_BASE,
            self.cloud_name,
            kind.resource_type(),
            action
        )
    }

    fn request_error(e: reqwest::Error) -> AppError {
        if e.is_timeout() {
            AppError::UpstreamTimeout("media host".to_string())
        } else {
            AppError::Media(e.to_string())
        }
    }
}

#[async_trait]
impl MediaStore for CloudinaryMedia {
    async fn upload(&self, upload: MediaUpload) -> Result<StoredMedia, AppError> {
        let timestamp = unix_timestamp();
        let folder = upload.kind.folder();
        let signature = sign(
            &[("folder", folder), ("timestamp", timestamp.as_str())],
            &self.api_secret,
        );

        let size = upload.bytes.len();
        let file_part = reqwest::multipart::Part::bytes(upload.bytes)
            .file_name(upload.file_name)
            .mime_str(&upload.content_type)
            .map_err(|e| AppError::BadRequest(format!("Invalid content type: {e}")))?;

        let form = reqwest::multipart::Form::new()
            .part("file", file_part)
            .text("api_key", self.api_key.clone())
            .text("folder", folder)
            .text("timestamp", timestamp)
            .text("signature_algorithm", "sha256")
            .text("signature", signature);

        let response = self
            .http_client
            .post(self.endpoint(upload.kind, "upload"))
            .multipart(form)
            .send()
            .await
            .map_err(Self::request_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Media(format!(
                "upload returned {}: {}",
                status, body
            )));
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| AppError::Media(format!("invalid upload response: {e}")))?;

        tracing::info!(
            kind = ?upload.kind,
            public_id = %uploaded.public_id,
            bytes = size,
            duration = ?uploaded.duration,
            "Media uploaded"
        );

        Ok(StoredMedia {
            url: uploaded.secure_url,
            public_id: uploaded.public_id,
            duration: uploaded.duration,
        })
    }

    async fn release(&self, kind: MediaKind, public_id: &str) -> Result<(), AppError> {
        let timestamp = unix_timestamp();
        let signature = sign(
            &[("public_id", public_id), ("timestamp", timestamp.as_str())],
            &self.api_secret,
        );

        let params = [
            ("public_id", public_id),
            ("timestamp", timestamp.as_str()),
            ("api_key", self.api_key.as_str()),
            ("signature_algorithm", "sha256"),
            ("signature", signature.as_str()),
        ];

        let response = self
            .http_client
            .post(self.endpoint(kind, "destroy"))
            .form(&params)
            .send()
            .await
            .map_err(Self::request_error)?;

        if !response.status().is_success() {
            return Err(AppError::Media(format!(
                "destroy returned {}",
                response.status()
            )));
        }

        let destroyed: DestroyResponse = response
            .json()
            .await
            .map_err(|e| AppError::Media(format!("invalid destroy response: {e}")))?;

        match destroyed.result.as_str() {
            "ok" | "not found" => {
                tracing::info!(kind = ?kind, public_id, result = %destroyed.result, "Media released");
                Ok(())
            }
            other => Err(AppError::Media(format!("destroy result: {other}"))),
        }
    }
}
