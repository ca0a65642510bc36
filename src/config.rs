//! Application configuration loaded from environment variables.
//!
//! A `.env` file is honored for local development. Everything is read once
//! at startup and shared through `AppState`.

use std::env;

/// Default upload limit for music and cover files (25 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

const DEFAULT_CORS_ORIGINS: &[&str] = &[
    "http://localhost:8000",
    "http://127.0.0.1:8000",
    "http://localhost:4200",
    "http://127.0.0.1:4200",
];

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" | "local" => Environment::Development,
            _ => Environment::Production,
        }
    }

    /// Whether error responses may carry internal details.
    pub fn exposes_error_details(self) -> bool {
        self == Environment::Development
    }
}

/// Which document store backs the repositories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseBackend {
    Firestore,
    Memory,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Server port
    pub port: u16,
    /// Development or production
    pub environment: Environment,
    /// Origins allowed by CORS
    pub cors_origins: Vec<String>,
    /// Document store backend
    pub database_backend: DatabaseBackend,
    /// Firebase / GCP project ID (also the ID token audience)
    pub firebase_project_id: String,
    /// Cloudinary cloud name
    pub cloudinary_cloud_name: String,
    /// Maximum accepted request body for uploads
    pub max_upload_bytes: usize,

    // --- Secrets ---
    /// Firebase web API key for Identity Toolkit REST calls
    pub firebase_web_api_key: String,
    /// Cloudinary API key
    pub cloudinary_api_key: String,
    /// Cloudinary API secret (used to sign uploads)
    pub cloudinary_api_secret: String,
}

impl Config {
    /// Config for tests only.
    pub fn test_default() -> Self {
        Self {
            port: 8080,
            environment: Environment::Production,
            cors_origins: DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect(),
            database_backend: DatabaseBackend::Memory,
            firebase_project_id: "test-project".to_string(),
            cloudinary_cloud_name: "test-cloud".to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            firebase_web_api_key: "test_api_key".to_string(),
            cloudinary_api_key: "test_cloudinary_key".to_string(),
            cloudinary_api_secret: "test_cloudinary_secret".to_string(),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let database_backend = match env::var("DATABASE_BACKEND")
            .unwrap_or_else(|_| "firestore".to_string())
            .trim()
            .to_ascii_lowercase()
            .as_str()
        {
            "firestore" => DatabaseBackend::Firestore,
            "memory" => DatabaseBackend::Memory,
            other => return Err(ConfigError::Invalid("DATABASE_BACKEND", other.to_string())),
        };

        let max_upload_bytes = match env::var("MAX_UPLOAD_BYTES") {
            Ok(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid("MAX_UPLOAD_BYTES", raw))?,
            Err(_) => DEFAULT_MAX_UPLOAD_BYTES,
        };

        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            environment: Environment::parse(
                &env::var("APP_ENV").unwrap_or_else(|_| "production".to_string()),
            ),
            cors_origins: env::var("CORS_ORIGINS")
                .map(|raw| parse_origins(&raw))
                .unwrap_or_else(|_| DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect()),
            database_backend,
            firebase_project_id: required("FIREBASE_PROJECT_ID")?,
            cloudinary_cloud_name: required("CLOUDINARY_CLOUD_NAME")?,
            max_upload_bytes,
            firebase_web_api_key: required("FIREBASE_WEB_API_KEY")?,
            cloudinary_api_key: required("CLOUDINARY_API_KEY")?,
            cloudinary_api_secret: required("CLOUDINARY_API_SECRET")?,
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .map(|v| v.trim().to_string())
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(name))
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().trim_end_matches('/').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        // Set required env vars for test
        env::set_var("FIREBASE_PROJECT_ID", "tuneverse-test");
        env::set_var("FIREBASE_WEB_API_KEY", "test_key");
        env::set_var("CLOUDINARY_CLOUD_NAME", "cloud");
        env::set_var("CLOUDINARY_API_KEY", "key");
        env::set_var("CLOUDINARY_API_SECRET", "secret");
        env::set_var("CORS_ORIGINS", "https://app.example.com/, http://localhost:4200");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.firebase_project_id, "tuneverse-test");
        assert_eq!(config.cloudinary_api_secret, "secret");
        assert_eq!(
            config.cors_origins,
            vec!["https://app.example.com", "http://localhost:4200"]
        );
        assert_eq!(config.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
    }

    #[test]
    fn test_environment_parse() {
        assert_eq!(Environment::parse("development"), Environment::Development);
        assert_eq!(Environment::parse(" Dev "), Environment::Development);
        assert_eq!(Environment::parse("production"), Environment::Production);
        assert_eq!(Environment::parse("staging"), Environment::Production);
        assert!(Environment::Development.exposes_error_details());
        assert!(!Environment::Production.exposes_error_details());
    }
}
