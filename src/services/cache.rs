// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Freshness cache in front of the third-party APIs.
//!
//! Each resource has its own freshness window. A fresh entry is served with
//! no network call and no store write. A stale or missing entry is refetched
//! synchronously, written back, and the previous timestamp is surfaced so
//! the UI can animate "was X, now Y".
//!
//! The store is never a single point of failure: if it cannot be read or
//! written, the fetch result is served directly.

use crate::db::{KvStore, KvStoreExt, StoreError};
use crate::error::Result;
use crate::models::{CacheEntry, CacheRead};
use crate::time_utils::now_millis;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Storage-layer expiry for cache entries, independent of freshness.
pub const BACKSTOP_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Cached upstream resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheResource {
    Spotify,
    Strava,
    Literal,
    GitHub,
}

impl CacheResource {
    pub const ALL: [CacheResource; 4] = [
        CacheResource::Spotify,
        CacheResource::Strava,
        CacheResource::Literal,
        CacheResource::GitHub,
    ];

    /// Store key for this resource's entry.
    pub fn key(self) -> &'static str {
        match self {
            CacheResource::Spotify => "spotify",
            CacheResource::Strava => "strava",
            CacheResource::Literal => "literal",
            CacheResource::GitHub => "github",
        }
    }

    /// How long an entry stays fresh.
    pub fn default_ttl(self) -> Duration {
        match self {
            CacheResource::Spotify => Duration::from_secs(60),
            CacheResource::Strava => Duration::from_secs(5 * 60),
            CacheResource::Literal => Duration::from_secs(60 * 60),
            CacheResource::GitHub => Duration::from_secs(60 * 60),
        }
    }
}

/// Get-or-refresh cache over a shared key-value store.
#[derive(Clone)]
pub struct FreshnessCache {
    store: Arc<dyn KvStore>,
    ttls: HashMap<CacheResource, Duration>,
}

impl FreshnessCache {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        let ttls = CacheResource::ALL
            .iter()
            .map(|r| (*r, r.default_ttl()))
            .collect();
        Self { store, ttls }
    }

    /// Override the freshness window of one resource.
    pub fn with_ttl(mut self, resource: CacheResource, ttl: Duration) -> Self {
        self.ttls.insert(resource, ttl);
        self
    }

    pub fn ttl(&self, resource: CacheResource) -> Duration {
        self.ttls
            .get(&resource)
            .copied()
            .unwrap_or_else(|| resource.default_ttl())
    }

    /// Serve `resource` from the cache, refreshing it with `fetch_fn` when
    /// stale or missing.
    ///
    /// Errors from `fetch_fn` propagate; stale data is never served in their
    /// place. Store failures are logged and bypassed.
    pub async fn get_cached_data<T, F, Fut>(
        &self,
        resource: CacheResource,
        fetch_fn: F,
    ) -> Result<CacheRead<T>>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let key = resource.key();

        let cached = match self.store.get_json::<CacheEntry<T>>(key).await {
            Ok(entry) => entry,
            Err(e @ StoreError::Malformed { .. }) => {
                tracing::warn!(key, error = %e, "Discarding unreadable cache entry");
                None
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "Cache store unavailable, fetching directly");
                return fetch_direct(fetch_fn).await;
            }
        };

        let previous_fetched_at = match cached {
            Some(entry) if is_fresh(entry.fetched_at, Utc::now(), self.ttl(resource)) => {
                tracing::debug!(key, "Cache hit");
                return Ok(CacheRead::hit(entry));
            }
            Some(entry) => Some(entry.fetched_at),
            None => None,
        };

        tracing::debug!(key, stale = previous_fetched_at.is_some(), "Cache miss, refreshing");
        let data = fetch_fn().await?;

        // Keep fetched_at non-decreasing even if the clock stepped backwards.
        let now = now_millis();
        let fetched_at = previous_fetched_at.map_or(now, |prev| now.max(prev));

        let entry = CacheEntry { data, fetched_at };
        if let Err(e) = self.store.set_json(key, &entry, Some(BACKSTOP_TTL)).await {
            tracing::warn!(key, error = %e, "Failed to write cache entry");
            return Ok(CacheRead::refreshed(entry.data, fetched_at, None));
        }

        Ok(CacheRead::refreshed(
            entry.data,
            fetched_at,
            previous_fetched_at,
        ))
    }

    /// Drop a stored key so the next read refetches.
    pub async fn invalidate(&self, key: &str) -> std::result::Result<(), StoreError> {
        self.store.delete(key).await?;
        tracing::info!(key, "Cache key invalidated");
        Ok(())
    }
}

/// Bypass the store entirely.
async fn fetch_direct<T, F, Fut>(fetch_fn: F) -> Result<CacheRead<T>>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let data = fetch_fn().await?;
    Ok(CacheRead::refreshed(data, now_millis(), None))
}

fn is_fresh(fetched_at: DateTime<Utc>, now: DateTime<Utc>, ttl: Duration) -> bool {
    match chrono::Duration::from_std(ttl) {
        Ok(ttl) => now.signed_duration_since(fetched_at) < ttl,
        Err(_) => true,
    }
}
