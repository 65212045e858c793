// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod activity;
pub mod cache;
pub mod code;
pub mod music;
pub mod reading;
pub mod stats;

pub use activity::{ActivityRecord, ActivityStore, LatestActivity};
pub use cache::{CacheEntry, CacheRead};
pub use code::{CodeActivity, CommitInfo, ContributionDay, ContributionWeek};
pub use music::SpotifyTrack;
pub use reading::{BookAuthor, LiteralBook};
pub use stats::CallCounts;
