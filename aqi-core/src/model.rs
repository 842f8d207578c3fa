use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::classify::AqiTier;

pub const NO_DATA_CATEGORY: &str = "No Data";
pub const NO_DATA_EMOJI: &str = "📊";
pub const NO_DATA_MESSAGE: &str = "No recent data available for this station.";

/// Slack for comparing coordinate deltas against a tolerance in degrees.
const DEGREE_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Finite and away from the `0.0` sentinel on both axes.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite() && self.lat != 0.0 && self.lng != 0.0
    }

    /// True when both axes are within `tolerance` degrees of `other`.
    pub fn is_near(&self, other: &Coordinates, tolerance: f64) -> bool {
        let limit = tolerance + DEGREE_EPSILON;
        (self.lat - other.lat).abs() <= limit && (self.lng - other.lng).abs() <= limit
    }
}

/// Rectangle given by two opposite corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub south_west: Coordinates,
    pub north_east: Coordinates,
}

impl BoundingBox {
    pub const fn new(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> Self {
        Self {
            south_west: Coordinates { lat: lat1, lng: lng1 },
            north_east: Coordinates { lat: lat2, lng: lng2 },
        }
    }

    /// `lat1,lng1,lat2,lng2`, the order the map-bounds endpoint expects.
    pub fn to_query(&self) -> String {
        format!(
            "{},{},{},{}",
            self.south_west.lat, self.south_west.lng, self.north_east.lat, self.north_east.lng
        )
    }
}

/// Whether the source reported a usable index.
///
/// A measured `0` and a missing reading both expose `aqi() == 0`; only this
/// tag tells them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AqiReading {
    NoData,
    Measured(i32),
}

impl AqiReading {
    pub fn value(&self) -> i32 {
        match self {
            AqiReading::NoData => 0,
            AqiReading::Measured(v) => *v,
        }
    }

    pub fn tier(&self) -> Option<AqiTier> {
        match self {
            AqiReading::NoData => None,
            AqiReading::Measured(v) => Some(AqiTier::from_aqi(*v)),
        }
    }

    pub fn is_measured(&self) -> bool {
        matches!(self, AqiReading::Measured(_))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationRecord {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub reading: AqiReading,
    pub timestamp: DateTime<Utc>,
    pub pm25: f64,
    pub pm10: f64,
    #[serde(rename = "rawData")]
    pub raw: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<DateTime<Utc>>,
}

impl StationRecord {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.lat, self.lng)
    }

    pub fn aqi(&self) -> i32 {
        self.reading.value()
    }

    pub fn category(&self) -> &'static str {
        self.reading.tier().map_or(NO_DATA_CATEGORY, |t| t.category())
    }

    pub fn emoji(&self) -> &'static str {
        self.reading.tier().map_or(NO_DATA_EMOJI, |t| t.emoji())
    }

    pub fn message(&self) -> &'static str {
        self.reading.tier().map_or(NO_DATA_MESSAGE, |t| t.message())
    }
}
