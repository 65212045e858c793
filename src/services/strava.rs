// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava API client.
//!
//! Handles:
//! - Access token refresh from the configured refresh token
//! - In-memory token caching with a 5-minute expiry margin
//! - Latest-activity lookup for the front page
//! - Paginated activity listing for the persisted history

use crate::config::OAuthCredentials;
use crate::error::{AppError, Result};
use crate::format::{format_distance, format_duration};
use crate::models::{ActivityRecord, LatestActivity};
use crate::services::sync::ActivitySource;
use crate::services::upstream::{check_response_json, transport_error};
use crate::time_utils::format_time_ago;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;

const PROVIDER: &str = "Strava";
const API_BASE: &str = "https://www.strava.com/api/v3";
const TOKEN_URL: &str = "https://www.strava.com/oauth/token";

/// Margin before token expiration when we proactively refresh (5 minutes).
const TOKEN_REFRESH_MARGIN_SECS: i64 = 5 * 60;

/// Cached access token with expiry information.
#[derive(Clone)]
struct CachedToken {
    access_token: String,
    /// Strava may rotate the refresh token; the newest one is used next time.
    refresh_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_usable(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(TOKEN_REFRESH_MARGIN_SECS) < self.expires_at
    }
}

/// Strava API client for the site owner's account.
///
/// Without credentials every call reports "nothing to show" instead of
/// failing.
#[derive(Clone)]
pub struct StravaClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Option<OAuthCredentials>,
    token: Arc<Mutex<Option<CachedToken>>>,
}

impl StravaClient {
    pub fn new(http: reqwest::Client, credentials: Option<OAuthCredentials>) -> Self {
        Self {
            http,
            base_url: API_BASE.to_string(),
            credentials,
            token: Arc::new(Mutex::new(None)),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    /// The most recent activity, formatted for display.
    pub async fn get_latest(&self) -> Result<Option<LatestActivity>> {
        let Some(credentials) = &self.credentials else {
            return Ok(None);
        };

        let activities = self.list_activities(credentials, None, 1, 1).await?;
        Ok(activities
            .into_iter()
            .next()
            .map(|a| a.into_latest(Utc::now())))
    }

    /// List activities (paginated), optionally only after a Unix timestamp.
    ///
    /// A rejected token is refreshed and the request retried once.
    async fn list_activities(
        &self,
        credentials: &OAuthCredentials,
        after: Option<i64>,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<StravaSummaryActivity>> {
        let access_token = self.get_valid_access_token(credentials).await?;

        match self
            .request_activities(&access_token, after, page, per_page)
            .await
        {
            Err(e) if e.is_token_error() => {
                tracing::warn!(error = %e, "Strava rejected cached token, refreshing");
                self.token.lock().await.take();
                let access_token = self.get_valid_access_token(credentials).await?;
                self.request_activities(&access_token, after, page, per_page)
                    .await
            }
            other => other,
        }
    }

    async fn request_activities(
        &self,
        access_token: &str,
        after: Option<i64>,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<StravaSummaryActivity>> {
        let url = format!("{}/athlete/activities", self.base_url);

        let mut query = vec![
            ("page", page.to_string()),
            ("per_page", per_page.to_string()),
        ];
        if let Some(after) = after {
            query.push(("after", after.to_string()));
        }

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(&query)
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;

        check_response_json(PROVIDER, response).await
    }

    /// Get a valid (non-expired) access token, refreshing if needed.
    ///
    /// The lock is held across the refresh so concurrent callers wait for
    /// one exchange instead of each starting their own.
    async fn get_valid_access_token(&self, credentials: &OAuthCredentials) -> Result<String> {
        let mut cached = self.token.lock().await;

        if let Some(token) = cached.as_ref() {
            if token.is_usable(Utc::now()) {
                return Ok(token.access_token.clone());
            }
        }

        let refresh_token = cached
            .as_ref()
            .map(|t| t.refresh_token.clone())
            .unwrap_or_else(|| credentials.refresh_token.clone());

        let refreshed = self.refresh_token(credentials, &refresh_token).await?;
        let expires_at = DateTime::from_timestamp(refreshed.expires_at, 0)
            .ok_or_else(|| AppError::Upstream("Strava token expiry out of range".to_string()))?;

        tracing::debug!(%expires_at, "Refreshed Strava access token");

        let access_token = refreshed.access_token.clone();
        *cached = Some(CachedToken {
            access_token: refreshed.access_token,
            refresh_token: refreshed.refresh_token,
            expires_at,
        });
        Ok(access_token)
    }

    async fn refresh_token(
        &self,
        credentials: &OAuthCredentials,
        refresh_token: &str,
    ) -> Result<TokenRefreshResponse> {
        let response = self
            .http
            .post(TOKEN_URL)
            .form(&[
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;

        check_response_json(PROVIDER, response).await
    }
}

#[async_trait]
impl ActivitySource for StravaClient {
    async fn fetch_latest(&self) -> Result<Option<LatestActivity>> {
        self.get_latest().await
    }

    async fn fetch_page(
        &self,
        after: Option<i64>,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<ActivityRecord>> {
        let Some(credentials) = &self.credentials else {
            return Ok(Vec::new());
        };

        let activities = self
            .list_activities(credentials, after, page, per_page)
            .await?;
        Ok(activities
            .into_iter()
            .map(StravaSummaryActivity::into_record)
            .collect())
    }
}

/// Token refresh response from Strava.
#[derive(Debug, Clone, Deserialize)]
struct TokenRefreshResponse {
    access_token: String,
    refresh_token: String,
    expires_at: i64,
}

/// Summary activity as returned by `/athlete/activities`.
#[derive(Debug, Clone, Deserialize)]
pub struct StravaSummaryActivity {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub activity_type: String,
    /// UTC, ISO 8601
    pub start_date: String,
    /// Athlete-local wall clock, ISO 8601 with a bogus "Z"
    pub start_date_local: String,
    #[serde(default)]
    pub distance: Option<f64>,
    #[serde(default)]
    pub moving_time: Option<u64>,
    #[serde(default)]
    pub elapsed_time: Option<u64>,
    #[serde(default)]
    pub total_elevation_gain: Option<f64>,
    #[serde(default)]
    pub average_speed: Option<f64>,
    #[serde(default)]
    pub max_speed: Option<f64>,
    #[serde(default)]
    pub has_heartrate: bool,
    #[serde(default)]
    pub average_heartrate: Option<f64>,
    #[serde(default)]
    pub max_heartrate: Option<f64>,
    #[serde(default)]
    pub average_cadence: Option<f64>,
    #[serde(default)]
    pub average_watts: Option<f64>,
    #[serde(default)]
    pub max_watts: Option<f64>,
    #[serde(default)]
    pub kilojoules: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub suffer_score: Option<f64>,
}

impl StravaSummaryActivity {
    /// Convert to a history record. Zero metrics are treated as missing.
    pub fn into_record(self) -> ActivityRecord {
        let (date, start_time) = split_local_start(&self.start_date_local);
        let (average_heartrate, max_heartrate) = if self.has_heartrate {
            (self.average_heartrate, self.max_heartrate)
        } else {
            (None, None)
        };

        ActivityRecord {
            id: self.id,
            name: self.name.unwrap_or_default(),
            activity_type: self.activity_type,
            date,
            start_time,
            distance: self.distance.unwrap_or(0.0),
            moving_duration: self.moving_time.unwrap_or(0),
            elapsed_duration: self.elapsed_time.unwrap_or(0),
            total_elevation_gain: self.total_elevation_gain.unwrap_or(0.0),
            average_speed: self.average_speed.unwrap_or(0.0),
            max_speed: self.max_speed.unwrap_or(0.0),
            average_heartrate,
            max_heartrate,
            average_cadence: nonzero(self.average_cadence),
            average_watts: nonzero(self.average_watts),
            max_watts: nonzero(self.max_watts),
            kilojoules: nonzero(self.kilojoules),
            description: self.description.filter(|d| !d.is_empty()),
            suffer_score: nonzero(self.suffer_score),
        }
    }

    /// Convert to the front-page summary, formatting relative to `now`.
    pub fn into_latest(self, now: DateTime<Utc>) -> LatestActivity {
        let distance = self.distance.unwrap_or(0.0);
        let elapsed_time = self.elapsed_time.unwrap_or(0);

        LatestActivity {
            id: self.id,
            name: self.name.unwrap_or_default(),
            activity_type: self.activity_type,
            distance,
            moving_time: self.moving_time.unwrap_or(0),
            elapsed_time,
            formatted_distance: format_distance(distance),
            // Wall-clock time, stops included
            formatted_duration: format_duration(elapsed_time),
            formatted_time_ago: format_time_ago(&self.start_date, now),
            start_date: self.start_date,
        }
    }
}

/// Split "2025-06-01T07:30:00Z" into ("2025-06-01", "07:30").
fn split_local_start(start_date_local: &str) -> (String, String) {
    match start_date_local.split_once('T') {
        Some((date, time)) => {
            let hhmm = time.get(..5).unwrap_or("00:00");
            (date.to_string(), hhmm.to_string())
        }
        None => (start_date_local.to_string(), "00:00".to_string()),
    }
}

fn nonzero(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v != 0.0)
}
