// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Incremental activity sync.
//!
//! The persisted activity history is brought up to date only when the
//! latest activity reported upstream is not the newest stored record. An
//! incremental sync fetches activities from one day before the newest stored
//! date onwards and merges them in; an empty store gets the full history.
//!
//! Sync runs detached from the request that noticed the mismatch. Failures
//! are logged and leave the stored history untouched; the next mismatch
//! acts as the retry.

use crate::db::{keys, KvStore, KvStoreExt};
use crate::error::Result;
use crate::models::{ActivityRecord, ActivityStore, LatestActivity};
use crate::time_utils::now_millis;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Activities requested per page.
pub const PAGE_SIZE: u32 = 200;

/// Upper bound on pages per sync, in case upstream never returns a short page.
const MAX_PAGES: u32 = 500;

/// Upstream source of activities.
#[async_trait]
pub trait ActivitySource: Send + Sync {
    /// The single most recent activity, `None` if there are none (or the
    /// source is not configured).
    async fn fetch_latest(&self) -> Result<Option<LatestActivity>>;

    /// One page (1-indexed) of activities, optionally only those starting
    /// after `after` (Unix seconds).
    async fn fetch_page(
        &self,
        after: Option<i64>,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<ActivityRecord>>;
}

/// Result of a completed sync.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOutcome {
    /// Records added by this sync
    pub added: usize,
    /// Records in the store afterwards
    pub total: usize,
    pub last_synced_at: DateTime<Utc>,
}

/// Whether the stored history is behind the latest upstream activity.
pub fn needs_sync(latest_id: u64, store: &ActivityStore) -> bool {
    !matches!(store.newest(), Some(newest) if newest.id == latest_id)
}

/// Owns the persisted activity history.
pub struct ActivitySync {
    store: Arc<dyn KvStore>,
    source: Arc<dyn ActivitySource>,
    page_size: u32,
    /// Set while a detached sync is running.
    in_flight: Arc<AtomicBool>,
}

/// Clears the in-flight flag when the detached task ends, even on panic.
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ActivitySync {
    pub fn new(store: Arc<dyn KvStore>, source: Arc<dyn ActivitySource>) -> Self {
        Self {
            store,
            source,
            page_size: PAGE_SIZE,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Override the page size (tests use small pages to exercise paging).
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Load the persisted history; absent means empty.
    pub async fn load(&self) -> Result<ActivityStore> {
        Ok(self
            .store
            .get_json::<ActivityStore>(keys::STRAVA_ACTIVITIES)
            .await?
            .unwrap_or_default())
    }

    /// Sync only if `latest_id` is not the newest stored record.
    pub async fn sync_if_behind(&self, latest_id: u64) -> Result<Option<SyncOutcome>> {
        let current = self.load().await?;
        if !needs_sync(latest_id, &current) {
            tracing::debug!(latest_id, "Activity store up to date");
            return Ok(None);
        }

        tracing::info!(
            latest_id,
            newest_stored = current.newest().map(|r| r.id),
            "Activity store behind latest activity, syncing"
        );
        self.merge_and_persist(current).await.map(Some)
    }

    /// Fetch whatever is missing and merge it in, regardless of the latest
    /// activity.
    pub async fn sync(&self) -> Result<SyncOutcome> {
        let current = self.load().await?;
        self.merge_and_persist(current).await
    }

    /// Throw away the stored history and fetch everything again.
    pub async fn full_resync(&self) -> Result<SyncOutcome> {
        tracing::info!("Full activity resync requested");
        self.store.delete(keys::STRAVA_ACTIVITIES).await?;
        self.merge_and_persist(ActivityStore::default()).await
    }

    /// Run [`Self::sync_if_behind`] on a detached task.
    ///
    /// Returns `None` without spawning while an earlier detached sync is
    /// still running. The caller may drop the handle; errors are logged and
    /// discarded.
    pub fn spawn_sync_if_behind(self: &Arc<Self>, latest_id: u64) -> Option<JoinHandle<()>> {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            tracing::debug!(latest_id, "Activity sync already running, skipping");
            return None;
        }

        let guard = InFlightGuard(Arc::clone(&self.in_flight));
        let sync = Arc::clone(self);
        Some(tokio::spawn(async move {
            let _guard = guard;
            match sync.sync_if_behind(latest_id).await {
                Ok(Some(outcome)) => tracing::info!(
                    latest_id,
                    added = outcome.added,
                    total = outcome.total,
                    "Background activity sync complete"
                ),
                Ok(None) => {}
                Err(e) if e.is_rate_limited() => tracing::warn!(
                    latest_id,
                    "Background activity sync deferred by rate limit"
                ),
                Err(e) => tracing::error!(
                    latest_id,
                    error = %e,
                    "Background activity sync failed"
                ),
            }
        }))
    }

    async fn merge_and_persist(&self, mut current: ActivityStore) -> Result<SyncOutcome> {
        let after = current.incremental_after();
        let fetched = self.fetch_all(after).await?;
        let fetched_count = fetched.len();

        let added = current.merge(fetched);
        let now = now_millis();
        current.last_synced_at = Some(now);

        self.store
            .set_json(keys::STRAVA_ACTIVITIES, &current, None)
            .await?;

        tracing::info!(
            after,
            fetched = fetched_count,
            added,
            total = current.records.len(),
            "Activity store persisted"
        );

        Ok(SyncOutcome {
            added,
            total: current.records.len(),
            last_synced_at: now,
        })
    }

    /// Page through upstream until a short page.
    async fn fetch_all(&self, after: Option<i64>) -> Result<Vec<ActivityRecord>> {
        let mut all = Vec::new();

        for page in 1..=MAX_PAGES {
            let batch = self.source.fetch_page(after, page, self.page_size).await?;
            let count = batch.len();
            all.extend(batch);

            tracing::debug!(page, count, after, "Fetched activity page");

            if count < self.page_size as usize {
                return Ok(all);
            }
        }

        tracing::warn!(
            pages = MAX_PAGES,
            fetched = all.len(),
            "Stopped paging activities at page limit"
        );
        Ok(all)
    }
}
