// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! GPS samples: raw client input and accepted, stored points.

use crate::time_utils::deserialize_point_timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// One GPS sample as submitted by a client (WGS84 degrees).
#[derive(Debug, Clone, PartialEq, Deserialize, Validate)]
pub struct RawPoint {
    #[serde(rename = "lat", alias = "latitude")]
    #[validate(range(min = -90.0, max = 90.0, message = "Latitude must be between -90 and 90 degrees"))]
    pub latitude: f64,
    #[serde(rename = "lon", alias = "longitude")]
    #[validate(range(min = -180.0, max = 180.0, message = "Longitude must be between -180 and 180 degrees"))]
    pub longitude: f64,
    #[serde(
        rename = "ts",
        alias = "timestamp",
        deserialize_with = "deserialize_point_timestamp"
    )]
    pub timestamp: DateTime<Utc>,
    /// Meters above sea level
    #[serde(default, rename = "elev", alias = "elevation")]
    pub elevation: Option<f64>,
}

impl RawPoint {
    pub fn new(latitude: f64, longitude: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            latitude,
            longitude,
            timestamp,
            elevation: None,
        }
    }

    pub fn with_elevation(mut self, elevation: f64) -> Self {
        self.elevation = Some(elevation);
        self
    }
}

/// An accepted GPS sample belonging to a walk. Never mutated once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkPoint {
    pub id: Uuid,
    pub walk_id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub elevation: Option<f64>,
    /// Server receipt time
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub stored_at: DateTime<Utc>,
}

impl WalkPoint {
    pub fn accept(walk_id: Uuid, raw: &RawPoint, stored_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            walk_id,
            latitude: raw.latitude,
            longitude: raw.longitude,
            timestamp: raw.timestamp,
            elevation: raw.elevation,
            stored_at,
        }
    }
}

/// Anything with a WGS84 position.
pub trait Position {
    fn latitude(&self) -> f64;
    fn longitude(&self) -> f64;
}

impl Position for RawPoint {
    fn latitude(&self) -> f64 {
        self.latitude
    }
    fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl Position for WalkPoint {
    fn latitude(&self) -> f64 {
        self.latitude
    }
    fn longitude(&self) -> f64 {
        self.longitude
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_raw_point_deserializes_short_and_long_names() {
        let short: RawPoint = serde_json::from_str(
            r#"{"lat": -23.5505, "lon": -46.6333, "ts": "2025-08-14T22:00:00Z", "elev": 760.2}"#,
        )
        .unwrap();
        let long: RawPoint = serde_json::from_str(
            r#"{"latitude": -23.5505, "longitude": -46.6333, "timestamp": "2025-08-14T22:00:00"}"#,
        )
        .unwrap();

        let ts = Utc.with_ymd_and_hms(2025, 8, 14, 22, 0, 0).unwrap();
        assert_eq!(short, RawPoint::new(-23.5505, -46.6333, ts).with_elevation(760.2));
        assert_eq!(long, RawPoint::new(-23.5505, -46.6333, ts));
    }

    #[test]
    fn test_raw_point_range_validation() {
        let ts = Utc.with_ymd_and_hms(2025, 8, 14, 22, 0, 0).unwrap();
        assert!(RawPoint::new(90.0, 180.0, ts).validate().is_ok());
        assert!(RawPoint::new(-90.0, -180.0, ts).validate().is_ok());
        assert!(RawPoint::new(90.5, 0.0, ts).validate().is_err());
        assert!(RawPoint::new(0.0, -180.1, ts).validate().is_err());
    }

    #[test]
    fn test_raw_point_missing_timestamp_rejected() {
        let result: Result<RawPoint, _> = serde_json::from_str(r#"{"lat": 1.0, "lon": 2.0}"#);
        assert!(result.is_err());
    }
}
