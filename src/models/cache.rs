// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cache entry shapes stored by the freshness cache.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored cache value: the payload plus when it was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<T> {
    pub data: T,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub fetched_at: DateTime<Utc>,
}

/// Result of a cache read.
///
/// `previous_fetched_at` is only set when this read refreshed the entry, so
/// the UI can show the old timestamp before animating to the new one.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheRead<T> {
    pub data: T,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub fetched_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds_option")]
    pub previous_fetched_at: Option<DateTime<Utc>>,
}

impl<T> CacheRead<T> {
    /// A read served from a fresh entry.
    pub fn hit(entry: CacheEntry<T>) -> Self {
        Self {
            data: entry.data,
            fetched_at: entry.fetched_at,
            previous_fetched_at: None,
        }
    }

    /// A read that produced new data.
    pub fn refreshed(
        data: T,
        fetched_at: DateTime<Utc>,
        previous_fetched_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            data,
            fetched_at,
            previous_fetched_at,
        }
    }
}
