// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Trip metrics derived from a walk's accepted trajectory.
//!
//! Points are taken as stored: the outlier and timestamp filters ran once
//! at ingestion time and are not re-applied here.

use crate::models::{WalkMetrics, WalkPoint};
use crate::services::distance::distance;
use chrono::{DateTime, Utc};

/// Sum of great-circle distances between consecutive points, in meters.
pub fn total_distance(points: &[WalkPoint]) -> f64 {
    points.windows(2).map(|w| distance(&w[0], &w[1])).sum()
}

/// Whole seconds elapsed between server start and stop times.
///
/// A stop time earlier than the start time yields zero.
pub fn duration_seconds(started_at: DateTime<Utc>, finished_at: DateTime<Utc>) -> i64 {
    let elapsed = finished_at.signed_duration_since(started_at);
    // num_seconds truncates toward zero, which is floor for non-negative spans
    elapsed.num_seconds().max(0)
}

/// Average speed in km/h, rounded half-up to two decimals.
pub fn average_speed_kmh(distance_meters: f64, duration_seconds: i64) -> f64 {
    if duration_seconds == 0 {
        return 0.0;
    }
    let speed = (distance_meters / 1000.0) / (duration_seconds as f64 / 3600.0);
    round_half_up(speed, 2)
}

/// Round to `scale` decimal places, ties away from zero.
///
/// Rounding is done on the shortest decimal representation of `value`, so
/// `5.655` (stored as 5.65499999...) rounds to `5.66` as written.
pub fn round_half_up(value: f64, scale: usize) -> f64 {
    if !value.is_finite() {
        return value;
    }

    let repr = value.abs().to_string();
    let (int_part, frac_part) = repr.split_once('.').unwrap_or((repr.as_str(), ""));
    if frac_part.len() <= scale {
        return value;
    }

    let kept = format!("{}{}", int_part, &frac_part[..scale]);
    let Ok(mut digits) = kept.parse::<u128>() else {
        // Far beyond f64's fractional precision already.
        return value;
    };
    if frac_part.as_bytes()[scale] >= b'5' {
        digits += 1;
    }

    let digits = digits.to_string();
    let padded = format!("{:0>width$}", digits, width = scale + 1);
    let split = padded.len() - scale;
    let rounded: f64 = format!("{}.{}", &padded[..split], &padded[split..])
        .parse()
        .unwrap_or(value.abs());

    rounded.copysign(value)
}

/// Compute the metrics written when a walk stops.
pub fn compute(
    points: &[WalkPoint],
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
) -> WalkMetrics {
    let distance_meters = total_distance(points);
    let duration_seconds = duration_seconds(started_at, finished_at);
    WalkMetrics {
        distance_meters,
        duration_seconds,
        avg_speed_kmh: average_speed_kmh(distance_meters, duration_seconds),
    }
}
