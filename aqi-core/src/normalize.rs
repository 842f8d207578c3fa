//! Turns the provider's loosely-shaped station JSON into [`StationRecord`]s.
//!
//! The map-bounds endpoint, the feed endpoints and older cached payloads all
//! describe a station differently. Coordinates in particular show up in four
//! places; see [`CoordinateShape`] for the order they are tried in.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use tracing::debug;

use crate::model::{AqiReading, Coordinates, StationRecord};

pub const UNKNOWN_STATION: &str = "Unknown Station";

const NO_DATA_SENTINELS: &[&str] = &["-", "", "N/A"];
const IDENTIFIER_FIELDS: &[&str] = &["uid", "idx", "id"];
const NESTED_GEO_PARENTS: &[&str] = &["city", "station"];
const NAME_POINTERS: &[&str] = &["/station/name", "/city/name", "/name"];
const TIME_POINTERS: &[&str] = &["/station/time", "/time/iso"];

/// How to read a bare two-element `[a, b]` coordinate array.
///
/// The provider is not consistent about `[lat, lng]` vs `[lng, lat]`. The
/// default guesses by magnitude, which only works where longitude exceeds the
/// threshold and latitude never does (South Asia, for the default of 80).
/// Deployments elsewhere should pick their own threshold or use `LatLng`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AxisOrderPolicy {
    /// Always `[lat, lng]`.
    LatLng,
    /// If exactly one element exceeds the threshold it is the longitude.
    LongitudeAbove(f64),
}

impl Default for AxisOrderPolicy {
    fn default() -> Self {
        AxisOrderPolicy::LongitudeAbove(80.0)
    }
}

impl AxisOrderPolicy {
    pub fn order(&self, pair: [f64; 2]) -> Coordinates {
        let [a, b] = pair;
        match *self {
            AxisOrderPolicy::LatLng => Coordinates::new(a, b),
            AxisOrderPolicy::LongitudeAbove(threshold) => {
                if a > threshold && b <= threshold {
                    Coordinates::new(b, a)
                } else {
                    Coordinates::new(a, b)
                }
            }
        }
    }
}

/// Places a raw record may carry its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinateShape {
    /// `lat` plus `lon` or `lng`.
    Direct,
    /// Top-level `geo: [a, b]`.
    GeoArray,
    /// A `uid`/`idx`/`id` string containing `geo:<lat>;<lng>`.
    Identifier,
    /// `city.geo` or `station.geo`.
    Nested,
}

impl CoordinateShape {
    pub const PRIORITY: [CoordinateShape; 4] = [
        CoordinateShape::Direct,
        CoordinateShape::GeoArray,
        CoordinateShape::Identifier,
        CoordinateShape::Nested,
    ];

    /// Read this shape from `raw`. `None` when the shape is absent or does not
    /// hold two numbers; validity is checked by the caller.
    pub fn parse(&self, raw: &Value, policy: AxisOrderPolicy) -> Option<Coordinates> {
        match self {
            CoordinateShape::Direct => {
                let lat = raw.get("lat").and_then(as_number)?;
                let lng = raw
                    .get("lon")
                    .and_then(as_number)
                    .or_else(|| raw.get("lng").and_then(as_number))?;
                Some(Coordinates::new(lat, lng))
            }
            CoordinateShape::GeoArray => raw.get("geo").and_then(as_pair).map(|p| policy.order(p)),
            CoordinateShape::Identifier => IDENTIFIER_FIELDS
                .iter()
                .filter_map(|field| raw.get(*field).and_then(Value::as_str))
                .find_map(parse_geo_identifier),
            CoordinateShape::Nested => NESTED_GEO_PARENTS
                .iter()
                .filter_map(|parent| raw.get(*parent).and_then(|p| p.get("geo")))
                .find_map(as_pair)
                .map(|p| policy.order(p)),
        }
    }
}

/// First shape, in priority order, that yields usable coordinates.
pub fn extract_coordinates(raw: &Value, policy: AxisOrderPolicy) -> Option<Coordinates> {
    CoordinateShape::PRIORITY
        .iter()
        .find_map(|shape| shape.parse(raw, policy).filter(Coordinates::is_valid))
}

/// `"geo:27.7;85.3"`, possibly embedded in a longer identifier.
pub fn parse_geo_identifier(s: &str) -> Option<Coordinates> {
    let (_, rest) = s.split_once("geo:")?;
    let (lat, rest) = rest.split_once(';')?;
    let lng = rest
        .split(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-'))
        .next()?;

    let lat = lat.trim().parse::<f64>().ok()?;
    let lng = lng.parse::<f64>().ok()?;
    Some(Coordinates::new(lat, lng))
}

/// Sentinels, `null`, missing and unparseable values are all "no data".
pub fn parse_aqi(value: Option<&Value>) -> AqiReading {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => {
            let s = s.trim();
            if NO_DATA_SENTINELS.contains(&s) {
                None
            } else {
                s.parse::<f64>().ok()
            }
        }
        _ => None,
    };

    match parsed.filter(|v| v.is_finite()) {
        Some(v) => AqiReading::Measured(v.round() as i32),
        None => AqiReading::NoData,
    }
}

/// `Kathmandu (US Embassy)` -> `Kathmandu`.
pub fn clean_name(name: &str) -> Option<String> {
    let base = name.split('(').next().unwrap_or_default().trim();
    (!base.is_empty()).then(|| base.to_string())
}

/// Sub-reading `v` for `key` (`pm25`, `pm10`, ...), top level first.
pub fn pollutant(raw: &Value, key: &str) -> f64 {
    [format!("/iaqi/{key}/v"), format!("/station/iaqi/{key}/v")]
        .iter()
        .find_map(|ptr| raw.pointer(ptr).and_then(as_number))
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|ndt| ndt.and_utc())
        })
}

/// `time.s` is local wall-clock time; `time.tz` (e.g. `+05:45`) places it.
/// Without an offset it is taken as UTC.
pub fn parse_local_time(s: &str, tz: Option<&str>) -> Option<DateTime<Utc>> {
    let s = s.trim();
    tz.and_then(|tz| {
        DateTime::parse_from_str(&format!("{s} {}", tz.trim()), "%Y-%m-%d %H:%M:%S %:z").ok()
    })
    .map(|dt| dt.with_timezone(&Utc))
    .or_else(|| parse_timestamp(s))
}

fn observed_at(raw: &Value) -> Option<DateTime<Utc>> {
    TIME_POINTERS
        .iter()
        .filter_map(|ptr| raw.pointer(ptr).and_then(Value::as_str))
        .find_map(parse_timestamp)
        .or_else(|| {
            let local = raw.pointer("/time/s").and_then(Value::as_str)?;
            parse_local_time(local, raw.pointer("/time/tz").and_then(Value::as_str))
        })
}

/// Build one record, or nothing if the position is unusable.
///
/// `now` stands in for the observation time when the source omits it.
pub fn normalize_station(
    raw: Value,
    policy: AxisOrderPolicy,
    now: DateTime<Utc>,
) -> Option<StationRecord> {
    let coords = extract_coordinates(&raw, policy)?;

    let name = NAME_POINTERS
        .iter()
        .filter_map(|ptr| raw.pointer(ptr).and_then(Value::as_str))
        .find_map(clean_name)
        .unwrap_or_else(|| UNKNOWN_STATION.to_string());

    let timestamp = observed_at(&raw).unwrap_or(now);

    Some(StationRecord {
        name,
        lat: coords.lat,
        lng: coords.lng,
        reading: parse_aqi(raw.get("aqi")),
        timestamp,
        pm25: pollutant(&raw, "pm25"),
        pm10: pollutant(&raw, "pm10"),
        raw,
        fetched_at: None,
    })
}

/// Normalize a batch, keeping valid records in input order.
pub fn normalize_all(
    raws: Vec<Value>,
    policy: AxisOrderPolicy,
    now: DateTime<Utc>,
) -> Vec<StationRecord> {
    let total = raws.len();
    let stations: Vec<StationRecord> = raws
        .into_iter()
        .filter_map(|raw| normalize_station(raw, policy, now))
        .collect();

    if stations.len() < total {
        debug!(
            dropped = total - stations.len(),
            kept = stations.len(),
            "discarded records without usable coordinates"
        );
    }

    stations
}

fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn as_pair(v: &Value) -> Option<[f64; 2]> {
    match v.as_array()?.as_slice() {
        [a, b] => Some([as_number(a)?, as_number(b)?]),
        _ => None,
    }
}
