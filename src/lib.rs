// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Currently: the "what I'm up to" backend for a personal site.
//!
//! This crate serves what is playing, being read, run and committed, with
//! each third-party API behind a freshness cache, plus a persisted Strava
//! activity history kept current by an incremental background sync.

pub mod config;
pub mod db;
pub mod error;
pub mod format;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::KvStore;
use services::{
    ActivitySource, ActivitySync, CallCounter, FreshnessCache, GitHubService, LiteralService,
    SpotifyService,
};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub cache: FreshnessCache,
    pub counter: CallCounter,
    pub activities: Arc<dyn ActivitySource>,
    pub sync: Arc<ActivitySync>,
    pub spotify: SpotifyService,
    pub literal: LiteralService,
    pub github: GitHubService,
}

impl AppState {
    /// Wire every service to one store and one HTTP client.
    pub fn new(
        config: Config,
        store: Arc<dyn KvStore>,
        activities: Arc<dyn ActivitySource>,
        http: reqwest::Client,
    ) -> Self {
        Self {
            cache: FreshnessCache::new(store.clone()),
            counter: CallCounter::new(store.clone()),
            sync: Arc::new(ActivitySync::new(store, activities.clone())),
            activities,
            spotify: SpotifyService::new(http.clone(), config.spotify.clone()),
            literal: LiteralService::new(http.clone(), config.literal.clone()),
            github: GitHubService::new(http, config.github.clone()),
            config,
        }
    }
}
