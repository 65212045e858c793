// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared plumbing for third-party API clients.

use crate::error::AppError;
use serde::{de::DeserializeOwned, Deserialize};
use std::time::Duration;

/// Build the HTTP client shared by all providers.
///
/// The client-wide timeout bounds every request; a timeout surfaces as an
/// ordinary upstream error.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, AppError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("currently/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to build HTTP client: {}", e)))
}

/// Map a transport failure to an upstream error tagged with the provider.
pub fn transport_error(provider: &str, err: reqwest::Error) -> AppError {
    if err.is_timeout() {
        AppError::Upstream(format!("{} request timed out", provider))
    } else {
        AppError::Upstream(format!("{} request failed: {}", provider, err))
    }
}

/// Check response status and return error if not successful.
pub async fn check_response(
    provider: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, AppError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    if status.as_u16() == 429 {
        tracing::warn!(provider, "Upstream rate limit hit (429)");
        return Err(AppError::Upstream(AppError::UPSTREAM_RATE_LIMIT.to_string()));
    }

    if status.as_u16() == 401 {
        return Err(AppError::Upstream(AppError::UPSTREAM_TOKEN_ERROR.to_string()));
    }

    Err(AppError::Upstream(format!(
        "{} HTTP {}: {}",
        provider, status, body
    )))
}

/// Check response and parse JSON body.
pub async fn check_response_json<T: DeserializeOwned>(
    provider: &str,
    response: reqwest::Response,
) -> Result<T, AppError> {
    check_response(provider, response)
        .await?
        .json()
        .await
        .map_err(|e| AppError::Upstream(format!("{} JSON parse error: {}", provider, e)))
}

/// GraphQL envelope. An `errors` array fails the whole request.
#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlError {
    message: String,
}

impl<T> GraphQlResponse<T> {
    pub fn into_data(self) -> Result<T, AppError> {
        if let Some(first) = self.errors.into_iter().next() {
            return Err(AppError::Upstream(format!("GraphQL error: {}", first.message)));
        }
        self.data
            .ok_or_else(|| AppError::Upstream("GraphQL response missing data".to_string()))
    }
}
