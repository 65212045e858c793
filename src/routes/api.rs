// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Public read-only API routes.
//!
//! Provider endpoints answer `null` when the provider has nothing to show,
//! otherwise the payload's fields plus `fetchedAt`/`previousFetchedAt`.

use crate::error::Result;
use crate::models::{
    ActivityStore, CacheRead, CallCounts, CodeActivity, LatestActivity, LiteralBook,
    SpotifyTrack,
};
use crate::services::CacheResource;
use crate::AppState;
use axum::{extract::State, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Public API routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/spotify", get(get_spotify))
        .route("/api/strava", get(get_strava))
        .route("/api/literal", get(get_literal))
        .route("/api/github", get(get_github))
        .route("/api/stats", get(get_stats))
        .route("/api/strava/activities", get(get_activities))
}

/// A cached payload with its cache timestamps (Unix ms) alongside.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedResponse<T> {
    #[serde(flatten)]
    pub data: T,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub fetched_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds_option")]
    pub previous_fetched_at: Option<DateTime<Utc>>,
}

impl<T> CachedResponse<T> {
    /// `None` when the provider had nothing to show.
    fn from_read(read: CacheRead<Option<T>>) -> Option<Self> {
        let CacheRead {
            data,
            fetched_at,
            previous_fetched_at,
        } = read;

        data.map(|data| Self {
            data,
            fetched_at,
            previous_fetched_at,
        })
    }
}

type CachedJson<T> = Json<Option<CachedResponse<T>>>;

// ─── Providers ───────────────────────────────────────────────

async fn get_spotify(State(state): State<Arc<AppState>>) -> Result<CachedJson<SpotifyTrack>> {
    let read = state
        .cache
        .get_cached_data(CacheResource::Spotify, || state.spotify.get_now_playing())
        .await?;
    Ok(Json(CachedResponse::from_read(read)))
}

/// Latest activity. Also checks, without waiting, whether the persisted
/// history has fallen behind it.
async fn get_strava(State(state): State<Arc<AppState>>) -> Result<CachedJson<LatestActivity>> {
    let read = state
        .cache
        .get_cached_data(CacheResource::Strava, || state.activities.fetch_latest())
        .await?;

    if let Some(latest) = &read.data {
        // Detached: the handle is dropped and the response does not wait.
        // Skipped while an earlier sync is still running.
        drop(state.sync.spawn_sync_if_behind(latest.id));
    }

    Ok(Json(CachedResponse::from_read(read)))
}

async fn get_literal(State(state): State<Arc<AppState>>) -> Result<CachedJson<LiteralBook>> {
    let read = state
        .cache
        .get_cached_data(CacheResource::Literal, || {
            state.literal.get_currently_reading()
        })
        .await?;
    Ok(Json(CachedResponse::from_read(read)))
}

async fn get_github(State(state): State<Arc<AppState>>) -> Result<CachedJson<CodeActivity>> {
    let read = state
        .cache
        .get_cached_data(CacheResource::GitHub, || state.github.get_code_activity())
        .await?;
    Ok(Json(CachedResponse::from_read(read)))
}

// ─── Stats ───────────────────────────────────────────────────

/// Bump and return the API call counter. Never fails.
async fn get_stats(State(state): State<Arc<AppState>>) -> Json<CallCounts> {
    Json(state.counter.increment_and_get_counts().await)
}

// ─── Activity History ────────────────────────────────────────

async fn get_activities(State(state): State<Arc<AppState>>) -> Result<Json<ActivityStore>> {
    Ok(Json(state.sync.load().await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cached_response_flattens_payload() {
        let fetched_at = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
        let read = CacheRead::refreshed(
            Some(json!({"title": "Song", "isPlaying": true})),
            fetched_at,
            None,
        );

        let body = serde_json::to_value(CachedResponse::from_read(read)).unwrap();
        assert_eq!(
            body,
            json!({
                "title": "Song",
                "isPlaying": true,
                "fetchedAt": 1_700_000_000_000_i64,
                "previousFetchedAt": null
            })
        );
    }

    #[test]
    fn test_nothing_to_show_is_null() {
        let read: CacheRead<Option<SpotifyTrack>> = CacheRead::refreshed(None, Utc::now(), None);
        let body = serde_json::to_value(CachedResponse::from_read(read)).unwrap();
        assert!(body.is_null());
    }
}
