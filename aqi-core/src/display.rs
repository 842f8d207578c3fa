//! Small helpers shared by anything that renders stations.

use chrono::{DateTime, Utc};

use crate::classify::{estimate_pm10, estimate_pm25};
use crate::model::StationRecord;

/// "Just now", "5 minutes ago", "3 hours ago", or an absolute UTC time once
/// the observation is a day old.
pub fn format_relative(ts: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(ts);
    let minutes = elapsed.num_minutes();
    let hours = elapsed.num_hours();

    if minutes < 1 {
        "Just now".to_string()
    } else if minutes < 60 {
        format!("{minutes} minute{} ago", plural(minutes))
    } else if hours < 24 {
        format!("{hours} hour{} ago", plural(hours))
    } else {
        ts.format("%Y-%m-%d %H:%M UTC").to_string()
    }
}

fn plural(n: i64) -> &'static str {
    if n == 1 { "" } else { "s" }
}

/// Neighbour of the station named `current`, wrapping at both ends.
/// `direction` is usually `1` (next) or `-1` (previous).
pub fn step_station<'a>(
    stations: &'a [StationRecord],
    current: &str,
    direction: isize,
) -> Option<&'a StationRecord> {
    let idx = stations.iter().position(|s| s.name == current)?;
    let len = stations.len() as isize;
    let next = (idx as isize + direction).rem_euclid(len);
    stations.get(next as usize)
}

/// Reported PM2.5, or an estimate from the index when none was reported.
pub fn effective_pm25(station: &StationRecord) -> f64 {
    if station.pm25 > 0.0 { station.pm25 } else { estimate_pm25(station.aqi()) }
}

pub fn effective_pm10(station: &StationRecord) -> f64 {
    if station.pm10 > 0.0 { station.pm10 } else { estimate_pm10(station.aqi()) }
}

/// Effective PM2.5 above this (µg/m³) raises a particulate alert.
pub const PM25_ALERT_THRESHOLD: f64 = 80.0;

/// Advice banded on the station's index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthAlert {
    Unhealthy,
    SensitiveGroups,
    Acceptable,
}

impl HealthAlert {
    pub fn message(&self) -> &'static str {
        match self {
            HealthAlert::Unhealthy => {
                "AQI levels are unhealthy. Consider limiting outdoor activities and wearing protective masks."
            }
            HealthAlert::SensitiveGroups => {
                "AQI levels are moderate. Sensitive groups should take precautions."
            }
            HealthAlert::Acceptable => "Air quality is acceptable. Enjoy outdoor activities safely.",
        }
    }
}

pub fn health_alert(station: &StationRecord) -> HealthAlert {
    match station.aqi() {
        a if a > 150 => HealthAlert::Unhealthy,
        a if a > 100 => HealthAlert::SensitiveGroups,
        _ => HealthAlert::Acceptable,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pm25Alert {
    /// Effective PM2.5, reported or estimated.
    pub level: f64,
    pub high: bool,
}

impl Pm25Alert {
    pub fn message(&self) -> String {
        if self.high {
            format!(
                "PM2.5 levels are high ({:.1} µg/m³). Consider reducing outdoor exposure.",
                self.level
            )
        } else {
            format!("PM2.5 levels are within acceptable range ({:.1} µg/m³).", self.level)
        }
    }
}

pub fn pm25_alert(station: &StationRecord) -> Pm25Alert {
    let level = effective_pm25(station);
    Pm25Alert {
        level,
        high: level > PM25_ALERT_THRESHOLD,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{AxisOrderPolicy, normalize_all};
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn relative_times() {
        let now = now();
        assert_eq!(format_relative(now, now), "Just now");
        assert_eq!(format_relative(now + Duration::minutes(5), now), "Just now");
        assert_eq!(format_relative(now - Duration::minutes(1), now), "1 minute ago");
        assert_eq!(format_relative(now - Duration::minutes(42), now), "42 minutes ago");
        assert_eq!(format_relative(now - Duration::hours(1), now), "1 hour ago");
        assert_eq!(format_relative(now - Duration::hours(23), now), "23 hours ago");
        assert_eq!(format_relative(now - Duration::hours(30), now), "2025-01-14 06:00 UTC");
    }

    fn stations() -> Vec<StationRecord> {
        normalize_all(
            vec![
                json!({"lat": 27.70, "lon": 85.30, "aqi": 120, "station": {"name": "A"}, "iaqi": {"pm25": {"v": 44.0}}}),
                json!({"lat": 27.80, "lon": 85.40, "aqi": 100, "station": {"name": "B"}}),
                json!({"lat": 27.90, "lon": 85.50, "aqi": "-", "station": {"name": "C"}}),
            ],
            AxisOrderPolicy::default(),
            now(),
        )
    }

    #[test]
    fn stepping_wraps_around() {
        let stations = stations();
        assert_eq!(step_station(&stations, "A", 1).unwrap().name, "B");
        assert_eq!(step_station(&stations, "C", 1).unwrap().name, "A");
        assert_eq!(step_station(&stations, "A", -1).unwrap().name, "C");
        assert!(step_station(&stations, "missing", 1).is_none());
        assert!(step_station(&[], "A", 1).is_none());
    }

    #[test]
    fn particulates_fall_back_to_estimates() {
        let stations = stations();
        assert_eq!(effective_pm25(&stations[0]), 44.0);
        assert_eq!(effective_pm25(&stations[1]), 50.0);
        assert_eq!(effective_pm10(&stations[1]), 80.0);
        assert_eq!(effective_pm25(&stations[2]), 0.0);
    }

    fn reading(aqi: i64, pm25: f64) -> StationRecord {
        let raw = json!({"lat": 27.7, "lon": 85.3, "aqi": aqi, "iaqi": {"pm25": {"v": pm25}}});
        normalize_all(vec![raw], AxisOrderPolicy::default(), now()).remove(0)
    }

    #[test]
    fn health_alert_bands() {
        assert_eq!(health_alert(&reading(100, 0.0)), HealthAlert::Acceptable);
        assert_eq!(health_alert(&reading(101, 0.0)), HealthAlert::SensitiveGroups);
        assert_eq!(health_alert(&reading(150, 0.0)), HealthAlert::SensitiveGroups);
        assert_eq!(health_alert(&reading(151, 0.0)), HealthAlert::Unhealthy);
        assert_eq!(health_alert(&stations()[2]), HealthAlert::Acceptable);
        assert!(HealthAlert::Unhealthy.message().contains("limiting outdoor activities"));
    }

    #[test]
    fn pm25_alert_threshold_is_exclusive() {
        let at = pm25_alert(&reading(120, 80.0));
        assert_eq!(at.level, 80.0);
        assert!(!at.high);
        assert_eq!(at.message(), "PM2.5 levels are within acceptable range (80.0 µg/m³).");

        let above = pm25_alert(&reading(120, 80.1));
        assert!(above.high);
        assert!(above.message().starts_with("PM2.5 levels are high (80.1"));
    }

    #[test]
    fn pm25_alert_uses_estimate_when_unreported() {
        let alert = pm25_alert(&reading(180, 0.0));
        assert_eq!(alert.level, estimate_pm25(180));
        assert!(alert.high);
    }
}
