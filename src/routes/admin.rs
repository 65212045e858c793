// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Admin routes for manual sync and cache maintenance.
//! The bearer-token middleware is applied in routes/mod.rs.

use crate::error::{AppError, Result};
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Admin routes (require `Authorization: Bearer <ADMIN_TOKEN>`).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/strava/activities", post(sync_activities))
        .route("/api/strava/refresh", post(refresh_activities))
        .route("/api/cache/clear", post(clear_cache))
}

// ─── Activity Sync ───────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SyncResponse {
    pub success: bool,
    /// Records in the store after the sync
    pub count: usize,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub last_synced_at: DateTime<Utc>,
}

/// Run an incremental sync now and wait for it.
async fn sync_activities(State(state): State<Arc<AppState>>) -> Result<Json<SyncResponse>> {
    let outcome = state.sync.sync().await?;

    tracing::info!(
        added = outcome.added,
        total = outcome.total,
        "Manual activity sync complete"
    );

    Ok(Json(SyncResponse {
        success: true,
        count: outcome.total,
        last_synced_at: outcome.last_synced_at,
    }))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RefreshResponse {
    pub success: bool,
    pub count: usize,
}

/// Discard the stored history and refetch all of it.
async fn refresh_activities(State(state): State<Arc<AppState>>) -> Result<Json<RefreshResponse>> {
    let outcome = state.sync.full_resync().await?;

    Ok(Json(RefreshResponse {
        success: true,
        count: outcome.total,
    }))
}

// ─── Cache Maintenance ───────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct ClearCacheRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 128, message = "key must be 1 to 128 characters"))]
    pub key: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ClearCacheResponse {
    pub success: bool,
    pub deleted: String,
}

/// Delete one store key so the next read refetches it.
async fn clear_cache(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<ClearCacheRequest>, JsonRejection>,
) -> Result<Json<ClearCacheResponse>> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    request
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    state.cache.invalidate(&request.key).await?;

    Ok(Json(ClearCacheResponse {
        success: true,
        deleted: request.key,
    }))
}
