// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Provider credentials are optional. A provider without credentials simply
//! has nothing to show, which keeps local development possible with only a
//! subset of accounts configured.

use std::env;
use std::time::Duration;

/// Default upstream request timeout.
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 3;

/// Which key-value backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Firestore,
}

/// OAuth client credentials plus a long-lived refresh token.
#[derive(Debug, Clone)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

/// Literal (reading tracker) credentials.
#[derive(Debug, Clone)]
pub struct LiteralCredentials {
    pub token: String,
    pub profile_id: String,
}

/// GitHub account whose contributions are shown.
#[derive(Debug, Clone)]
pub struct GitHubSettings {
    pub token: Option<String>,
    pub username: String,
    /// Repository (owned by `username`) whose latest commit is shown
    pub repo: String,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// Key-value backend
    pub store_backend: StoreBackend,
    /// GCP project ID (Firestore backend)
    pub gcp_project_id: String,
    /// Bearer token guarding the admin (POST) endpoints
    pub admin_token: String,
    /// Per-request timeout for third-party APIs
    pub upstream_timeout: Duration,

    pub strava: Option<OAuthCredentials>,
    pub spotify: Option<OAuthCredentials>,
    pub literal: Option<LiteralCredentials>,
    pub github: Option<GitHubSettings>,
}

impl Config {
    /// Config for tests: memory store, no upstream credentials.
    pub fn test_default() -> Self {
        Self {
            port: 8080,
            frontend_url: "http://localhost:3000".to_string(),
            store_backend: StoreBackend::Memory,
            gcp_project_id: "test-project".to_string(),
            admin_token: "test_admin_token".to_string(),
            upstream_timeout: Duration::from_secs(DEFAULT_UPSTREAM_TIMEOUT_SECS),
            strava: None,
            spotify: None,
            literal: None,
            github: None,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let store_backend = match env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "memory".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "memory" => StoreBackend::Memory,
            "firestore" => StoreBackend::Firestore,
            other => {
                return Err(ConfigError::Invalid {
                    key: "STORE_BACKEND",
                    value: other.to_string(),
                })
            }
        };

        let gcp_project_id = match store_backend {
            StoreBackend::Firestore => {
                env::var("GCP_PROJECT_ID").map_err(|_| ConfigError::Missing("GCP_PROJECT_ID"))?
            }
            StoreBackend::Memory => {
                env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string())
            }
        };

        let upstream_timeout_secs = match env::var("UPSTREAM_TIMEOUT_SECS") {
            Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "UPSTREAM_TIMEOUT_SECS",
                value: raw,
            })?,
            Err(_) => DEFAULT_UPSTREAM_TIMEOUT_SECS,
        };

        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            store_backend,
            gcp_project_id,
            admin_token: env::var("ADMIN_TOKEN")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("ADMIN_TOKEN"))?,
            upstream_timeout: Duration::from_secs(upstream_timeout_secs),

            strava: oauth_from_env(
                "STRAVA_CLIENT_ID",
                "STRAVA_CLIENT_SECRET",
                "STRAVA_REFRESH_TOKEN",
            ),
            spotify: oauth_from_env(
                "SPOTIFY_CLIENT_ID",
                "SPOTIFY_CLIENT_SECRET",
                "SPOTIFY_REFRESH_TOKEN",
            ),
            literal: match (optional("LITERAL_TOKEN"), optional("LITERAL_PROFILE_ID")) {
                (Some(token), Some(profile_id)) => Some(LiteralCredentials { token, profile_id }),
                _ => None,
            },
            github: optional("GITHUB_USERNAME").map(|username| GitHubSettings {
                token: optional("GITHUB_TOKEN"),
                repo: optional("GITHUB_REPO").unwrap_or_else(|| "personal-site".to_string()),
                username,
            }),
        })
    }
}

/// Read a non-empty, trimmed environment variable.
fn optional(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn oauth_from_env(id_key: &str, secret_key: &str, refresh_key: &str) -> Option<OAuthCredentials> {
    let credentials = OAuthCredentials {
        client_id: optional(id_key)?,
        client_secret: optional(secret_key)?,
        refresh_token: optional(refresh_key)?,
    };
    Some(credentials)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}
