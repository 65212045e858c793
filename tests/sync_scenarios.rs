// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! End-to-end activity sync behavior, driven through `GET /api/strava`.

use axum::http::StatusCode;
use chrono::NaiveDate;
use currently::db::MemoryKv;
use std::time::Duration;

mod common;
use common::{create_test_app, create_test_app_with_store, record};

fn ids(records: &[currently::models::ActivityRecord]) -> Vec<u64> {
    records.iter().map(|r| r.id).collect()
}

fn midnight_utc(date: &str) -> i64 {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc()
        .timestamp()
}

#[tokio::test]
async fn test_empty_store_triggers_full_fetch() {
    let app = create_test_app();
    app.source.set_history(vec![record(42, "2025-06-01")]);

    let (status, body) = app.get("/api/strava").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], 42);

    let stored = app.wait_for_activities(|s| !s.is_empty()).await;
    assert_eq!(ids(&stored.records), vec![42]);
    assert!(stored.last_synced_at.is_some());
    assert_eq!(app.source.page_requests(), vec![(None, 1)]);
}

#[tokio::test]
async fn test_matching_latest_does_not_sync() {
    let app = create_test_app();
    app.seed_activities(vec![record(42, "2025-06-01")]).await;
    app.source.set_history(vec![record(42, "2025-06-01")]);
    let writes_before = app.store.write_count();

    let (status, _) = app.get("/api/strava").await;
    assert_eq!(status, StatusCode::OK);

    // Give a (wrongly) spawned sync time to run
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(app.source.page_requests().is_empty());
    let stored = app.stored_activities().await.unwrap();
    assert_eq!(ids(&stored.records), vec![42]);
    assert!(stored.last_synced_at.is_none());
    // Only the cache entry for the latest activity was written
    assert_eq!(app.store.write_count(), writes_before + 1);
}

#[tokio::test]
async fn test_new_latest_merges_incrementally() {
    let app = create_test_app();
    app.seed_activities(vec![record(42, "2025-06-01")]).await;
    app.source
        .set_history(vec![record(43, "2025-06-03"), record(42, "2025-06-01")]);

    let (status, body) = app.get("/api/strava").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], 43);

    let stored = app.wait_for_activities(|s| s.records.len() == 2).await;
    assert_eq!(ids(&stored.records), vec![43, 42]);
    assert_eq!(
        app.source.page_requests(),
        vec![(Some(midnight_utc("2025-05-31")), 1)]
    );
}

#[tokio::test]
async fn test_failed_sync_leaves_store_and_response_intact() {
    let app = create_test_app();
    app.seed_activities(vec![record(42, "2025-06-01")]).await;
    app.source
        .set_history(vec![record(43, "2025-06-03"), record(42, "2025-06-01")]);
    app.source.set_failing(true);

    let (status, body) = app.get("/api/strava").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], 43);

    for _ in 0..100 {
        if !app.source.page_requests().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(app.source.page_requests().len(), 1);
    let stored = app.stored_activities().await.unwrap();
    assert_eq!(ids(&stored.records), vec![42]);
    assert!(stored.last_synced_at.is_none());
}

#[tokio::test]
async fn test_unreachable_store_still_serves_latest() {
    let app = create_test_app_with_store(MemoryKv::unavailable());
    app.source.set_history(vec![record(42, "2025-06-01")]);

    let (status, body) = app.get("/api/strava").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], 42);
    assert!(body["fetchedAt"].is_i64());
    assert!(body["previousFetchedAt"].is_null());
}

#[tokio::test]
async fn test_no_activities_returns_null_and_skips_sync() {
    let app = create_test_app();

    let (status, body) = app.get("/api/strava").await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.is_null());
    assert!(app.source.page_requests().is_empty());
}
