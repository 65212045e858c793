// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Human-readable workout units (imperial, as shown on the site).

const METERS_PER_MILE: f64 = 1609.344;
const FEET_PER_METER: f64 = 3.28084;
const MPH_PER_METER_PER_SECOND: f64 = 2.23694;

/// "3.1 mi"
pub fn format_distance(meters: f64) -> String {
    format!("{:.1} mi", meters / METERS_PER_MILE)
}

/// "1 hr 5 min" or "42 min"
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;

    if hours > 0 {
        format!("{} hr {} min", hours, minutes)
    } else {
        format!("{} min", minutes)
    }
}

/// Running pace, "8:03/mi"
pub fn format_pace(meters_per_second: f64) -> String {
    if meters_per_second <= 0.0 {
        return "--:--".to_string();
    }
    let seconds_per_mile = METERS_PER_MILE / meters_per_second;
    let mut minutes = (seconds_per_mile / 60.0).floor() as u64;
    let mut seconds = (seconds_per_mile % 60.0).round() as u64;
    if seconds == 60 {
        minutes += 1;
        seconds = 0;
    }
    format!("{}:{:02}/mi", minutes, seconds)
}

/// Cycling speed, "17.9 mph"
pub fn format_speed(meters_per_second: f64) -> String {
    if meters_per_second <= 0.0 {
        return "0 mph".to_string();
    }
    format!("{:.1} mph", meters_per_second * MPH_PER_METER_PER_SECOND)
}

/// "1234 ft"
pub fn format_elevation(meters: f64) -> String {
    format!("{} ft", (meters * FEET_PER_METER).round() as i64)
}

/// "152 bpm"
pub fn format_heartrate(bpm: f64) -> String {
    format!("{} bpm", bpm.round() as i64)
}
