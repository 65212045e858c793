// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Total API calls served. A vanity metric: failures are logged and
//! reported as zero, never surfaced.

use crate::db::{keys, KvStore, KvStoreExt, StoreError};
use crate::models::CallCounts;
use std::sync::Arc;

#[derive(Clone)]
pub struct CallCounter {
    store: Arc<dyn KvStore>,
}

impl CallCounter {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Bump the counter and return the values before and after.
    pub async fn increment_and_get_counts(&self) -> CallCounts {
        match self.try_increment().await {
            Ok(counts) => counts,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to increment API call counter");
                CallCounts::default()
            }
        }
    }

    async fn try_increment(&self) -> Result<CallCounts, StoreError> {
        let previous = self
            .store
            .get_json::<i64>(keys::API_CALLS)
            .await?
            .unwrap_or(0);
        let current = self.store.increment(keys::API_CALLS).await?;
        Ok(CallCounts { previous, current })
    }
}
