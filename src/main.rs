// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Currently API Server
//!
//! Serves now-playing, reading, workout and coding activity for a personal
//! site, caching each upstream and syncing the Strava history in the
//! background.

use currently::{
    config::{Config, StoreBackend},
    db::{FirestoreKv, KvStore, MemoryKv},
    services::{upstream::http_client, StravaClient},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Currently API");

    let store: Arc<dyn KvStore> = match config.store_backend {
        StoreBackend::Firestore => {
            let store = FirestoreKv::new(&config.gcp_project_id).await?;
            tracing::info!(project = %config.gcp_project_id, "Using Firestore store");
            Arc::new(store)
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; cached data and history are lost on restart");
            Arc::new(MemoryKv::new())
        }
    };

    let http = http_client(config.upstream_timeout)?;

    let strava = StravaClient::new(http.clone(), config.strava.clone());
    tracing::info!(
        strava = strava.is_configured(),
        spotify = config.spotify.is_some(),
        literal = config.literal.is_some(),
        github = config.github.is_some(),
        timeout_secs = config.upstream_timeout.as_secs(),
        "Upstream providers configured"
    );

    // Build shared state
    let state = Arc::new(AppState::new(
        config.clone(),
        store,
        Arc::new(strava),
        http,
    ));

    // Build router
    let app = currently::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("currently=debug,info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(format)
        .init();
}
