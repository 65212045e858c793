// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! API call counter values.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Counter values before and after one increment.
///
/// Both are zero when the store could not be reached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CallCounts {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub previous: i64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub current: i64,
}
