// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use currently::config::Config;
use currently::db::{keys, FirestoreKv, KvStore, KvStoreExt, MemoryKv};
use currently::error::{AppError, Result};
use currently::models::{ActivityRecord, ActivityStore, LatestActivity};
use currently::routes::create_router;
use currently::services::ActivitySource;
use currently::AppState;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt; // for oneshot

/// Admin token configured by `Config::test_default()`.
#[allow(dead_code)]
pub const ADMIN_TOKEN: &str = "test_admin_token";

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a Firestore store connected to the emulator.
#[allow(dead_code)]
pub async fn test_firestore() -> FirestoreKv {
    FirestoreKv::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// A history record with plausible defaults.
#[allow(dead_code)]
pub fn record(id: u64, date: &str) -> ActivityRecord {
    ActivityRecord {
        id,
        name: format!("Activity {}", id),
        activity_type: "Run".to_string(),
        date: date.to_string(),
        start_time: "07:30".to_string(),
        distance: 8046.72,
        moving_duration: 2400,
        elapsed_duration: 2520,
        total_elevation_gain: 35.0,
        average_speed: 3.35,
        max_speed: 4.4,
        average_heartrate: Some(148.0),
        max_heartrate: Some(169.0),
        average_cadence: None,
        average_watts: None,
        max_watts: None,
        kilojoules: None,
        description: None,
        suffer_score: None,
    }
}

/// In-memory upstream activity feed.
///
/// `fetch_latest` reports the first history record. Pages ignore `after`
/// so tests control exactly what an incremental fetch returns.
#[derive(Default)]
pub struct FakeActivitySource {
    history: Mutex<Vec<ActivityRecord>>,
    failing: AtomicBool,
    page_requests: Mutex<Vec<(Option<i64>, u32)>>,
}

#[allow(dead_code)]
impl FakeActivitySource {
    pub fn set_history(&self, records: Vec<ActivityRecord>) {
        *self.history.lock().unwrap() = records;
    }

    /// Make page fetches fail (the latest-activity lookup keeps working).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn page_requests(&self) -> Vec<(Option<i64>, u32)> {
        self.page_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ActivitySource for FakeActivitySource {
    async fn fetch_latest(&self) -> Result<Option<LatestActivity>> {
        Ok(self.history.lock().unwrap().first().map(|r| LatestActivity {
            id: r.id,
            name: r.name.clone(),
            activity_type: r.activity_type.clone(),
            distance: r.distance,
            moving_time: r.moving_duration,
            start_date: format!("{}T{}:00Z", r.date, r.start_time),
            elapsed_time: r.elapsed_duration,
            formatted_distance: "5.0 mi".to_string(),
            formatted_duration: "42 min".to_string(),
            formatted_time_ago: "yesterday".to_string(),
        }))
    }

    async fn fetch_page(
        &self,
        after: Option<i64>,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<ActivityRecord>> {
        self.page_requests.lock().unwrap().push((after, page));
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::Upstream("Strava HTTP 503: unavailable".to_string()));
        }

        let start = ((page - 1) * per_page) as usize;
        Ok(self
            .history
            .lock()
            .unwrap()
            .iter()
            .skip(start)
            .take(per_page as usize)
            .cloned()
            .collect())
    }
}

/// An in-process app over a memory store and a fake activity feed.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub store: MemoryKv,
    pub source: Arc<FakeActivitySource>,
}

#[allow(dead_code)]
impl TestApp {
    /// Send a request and decode the JSON body (`Null` if empty).
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, serde_json::Value) {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    /// POST with the admin token and an optional JSON body.
    pub async fn admin_post(
        &self,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("Authorization", format!("Bearer {}", ADMIN_TOKEN));
        let request = match body {
            Some(json) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    pub async fn seed_activities(&self, records: Vec<ActivityRecord>) {
        let store = ActivityStore {
            records,
            last_synced_at: None,
        };
        self.store
            .set_json(keys::STRAVA_ACTIVITIES, &store, None)
            .await
            .unwrap();
    }

    pub async fn stored_activities(&self) -> Option<ActivityStore> {
        self.store
            .get_json::<ActivityStore>(keys::STRAVA_ACTIVITIES)
            .await
            .unwrap()
    }

    /// Poll until the stored history satisfies `done`, for detached syncs.
    pub async fn wait_for_activities(
        &self,
        done: impl Fn(&ActivityStore) -> bool,
    ) -> ActivityStore {
        for _ in 0..200 {
            if let Some(store) = self.stored_activities().await {
                if done(&store) {
                    return store;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("activity store never reached the expected state");
    }
}

/// Create a test app backed by a fresh memory store.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    create_test_app_with_store(MemoryKv::new())
}

/// Create a test app over the given store (e.g. `MemoryKv::unavailable()`).
#[allow(dead_code)]
pub fn create_test_app_with_store(store: MemoryKv) -> TestApp {
    let source = Arc::new(FakeActivitySource::default());
    let shared: Arc<dyn KvStore> = Arc::new(store.clone());

    let state = Arc::new(AppState::new(
        Config::test_default(),
        shared,
        source.clone(),
        reqwest::Client::new(),
    ));

    TestApp {
        router: create_router(state.clone()),
        state,
        store,
        source,
    }
}
