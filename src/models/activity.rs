// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Activity models: persisted history records and the latest-activity
//! summary shown on the front page.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// One recorded workout in the persisted history.
///
/// Records are immutable once stored; a later fetch of the same `id` never
/// overwrites the stored copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ActivityRecord {
    /// Strava activity ID
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub id: u64,
    pub name: String,
    /// Activity type (Run, Ride, Swim, ...)
    #[serde(rename = "type")]
    pub activity_type: String,
    /// Local calendar day, "YYYY-MM-DD"
    pub date: String,
    /// Local start time, "HH:MM"
    pub start_time: String,
    /// Meters
    pub distance: f64,
    /// Moving time in seconds
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub moving_duration: u64,
    /// Elapsed time in seconds
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub elapsed_duration: u64,
    /// Meters
    #[serde(default)]
    pub total_elevation_gain: f64,
    /// Meters per second
    #[serde(default)]
    pub average_speed: f64,
    /// Meters per second
    #[serde(default)]
    pub max_speed: f64,
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

/// The persisted activity history.
///
/// `records` are kept newest-first by `date` and never contain the same `id`
/// twice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ActivityStore {
    #[serde(default)]
    pub records: Vec<ActivityRecord>,
    /// When the store was last written by a sync (Unix ms)
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    #[cfg_attr(feature = "binding-generation", ts(type = "number | null"))]
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl ActivityStore {
    /// Most recent record, if any.
    pub fn newest(&self) -> Option<&ActivityRecord> {
        self.records.first()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Merge a freshly fetched batch into the store.
    ///
    /// Returns the number of records that were actually added.
    pub fn merge(&mut self, batch: Vec<ActivityRecord>) -> usize {
        let existing = std::mem::take(&mut self.records);
        let (merged, added) = merge_records(existing, batch);
        self.records = merged;
        added
    }

    /// Lower bound (Unix seconds) for an incremental fetch.
    ///
    /// This is midnight UTC of the day before the newest record's date, so
    /// activities logged late in a timezone ahead of UTC are still covered.
    /// `None` means a full historical fetch is required.
    pub fn incremental_after(&self) -> Option<i64> {
        let newest = self.newest()?;
        let date = match NaiveDate::parse_from_str(&newest.date, "%Y-%m-%d") {
            Ok(date) => date,
            Err(e) => {
                tracing::warn!(
                    activity_id = newest.id,
                    date = %newest.date,
                    error = %e,
                    "Unparseable newest record date, falling back to full fetch"
                );
                return None;
            }
        };

        let boundary = date.pred_opt()?.and_hms_opt(0, 0, 0)?;
        Some(boundary.and_utc().timestamp())
    }
}

/// Merge `batch` into `existing`.
///
/// Batch records whose `id` is already stored are dropped, as are repeated
/// ids within the batch (first occurrence wins). The result is sorted newest
/// first by `date`; the sort is stable so same-day records keep their
/// relative order with new ones ahead of stored ones.
pub fn merge_records(
    existing: Vec<ActivityRecord>,
    batch: Vec<ActivityRecord>,
) -> (Vec<ActivityRecord>, usize) {
    let mut seen: HashSet<u64> = existing.iter().map(|r| r.id).collect();

    let fresh: Vec<ActivityRecord> = batch
        .into_iter()
        .filter(|r| seen.insert(r.id))
        .collect();
    let added = fresh.len();

    let mut merged = fresh;
    merged.extend(existing);
    sort_newest_first(&mut merged);

    (merged, added)
}

/// Sort descending by `date`. Dates are fixed-width "YYYY-MM-DD" strings so
/// lexicographic order matches calendar order.
pub fn sort_newest_first(records: &mut [ActivityRecord]) {
    records.sort_by(|a, b| b.date.cmp(&a.date));
}

/// The single most recent activity, as shown in the "currently" section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LatestActivity {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub id: u64,
    pub name: String,
    #[serde(rename = "type")]
    pub activity_type: String,
    /// Meters
    pub distance: f64,
    /// Seconds
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub moving_time: u64,
    /// UTC start, ISO 8601
    pub start_date: String,
    /// Seconds
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub elapsed_time: u64,
    pub formatted_distance: String,
    pub formatted_duration: String,
    pub formatted_time_ago: String,
}
