// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting.

use chrono::{DateTime, SubsecRound, Utc};

/// The current time at the millisecond precision stored timestamps keep.
///
/// Values handed back to callers must match what a later read of the stored
/// copy returns.
pub fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Describe how long ago `date` (RFC 3339) was, relative to `now`.
///
/// Unparseable input is returned unchanged.
pub fn format_time_ago(date: &str, now: DateTime<Utc>) -> String {
    let Ok(then) = DateTime::parse_from_rfc3339(date) else {
        return date.to_string();
    };
    let then = then.with_timezone(&Utc);

    let diff_hours = now
        .signed_duration_since(then)
        .num_milliseconds()
        .div_euclid(3_600_000);
    let diff_days = diff_hours.div_euclid(24);

    if diff_hours < 1 {
        "just now".to_string()
    } else if diff_hours < 24 {
        format!("{}h ago", diff_hours)
    } else if diff_days == 1 {
        "yesterday".to_string()
    } else if diff_days < 7 {
        format!("{}d ago", diff_days)
    } else {
        then.format("%b %-d").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_time_ago_buckets() {
        let now = at("2025-06-10T12:00:00Z");
        assert_eq!(format_time_ago("2025-06-10T11:30:00Z", now), "just now");
        assert_eq!(format_time_ago("2025-06-10T07:00:00Z", now), "5h ago");
        assert_eq!(format_time_ago("2025-06-09T06:00:00Z", now), "yesterday");
        assert_eq!(format_time_ago("2025-06-06T12:00:00Z", now), "4d ago");
        assert_eq!(format_time_ago("2025-06-01T12:00:00Z", now), "Jun 1");
    }

    #[test]
    fn test_now_millis_survives_millisecond_round_trip() {
        let now = now_millis();
        assert_eq!(now.timestamp_subsec_nanos() % 1_000_000, 0);
        assert_eq!(DateTime::from_timestamp_millis(now.timestamp_millis()), Some(now));
    }

    #[test]
    fn test_time_ago_passes_through_garbage() {
        let now = at("2025-06-10T12:00:00Z");
        assert_eq!(format_time_ago("yesterday-ish", now), "yesterday-ish");
    }
}
