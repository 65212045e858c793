// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - caching, sync and third-party API clients.

pub mod cache;
pub mod counter;
pub mod github;
pub mod literal;
pub mod spotify;
pub mod strava;
pub mod sync;
pub mod upstream;

pub use cache::{CacheResource, FreshnessCache};
pub use counter::CallCounter;
pub use github::GitHubService;
pub use literal::LiteralService;
pub use spotify::SpotifyService;
pub use strava::StravaClient;
pub use sync::{ActivitySource, ActivitySync, SyncOutcome};
