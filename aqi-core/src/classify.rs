//! AQI tiers and the fixed labels attached to them.

use serde::{Deserialize, Serialize};

/// One of the six US-EPA style AQI bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AqiTier {
    Good,
    Moderate,
    UnhealthyForSensitiveGroups,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
}

impl AqiTier {
    /// Map an index to its tier. Upper bounds are inclusive.
    ///
    /// Total over `i32`: anything outside `0..=300` (negative values included)
    /// lands in [`AqiTier::Hazardous`].
    pub fn from_aqi(aqi: i32) -> Self {
        match aqi {
            0..=50 => AqiTier::Good,
            51..=100 => AqiTier::Moderate,
            101..=150 => AqiTier::UnhealthyForSensitiveGroups,
            151..=200 => AqiTier::Unhealthy,
            201..=300 => AqiTier::VeryUnhealthy,
            _ => AqiTier::Hazardous,
        }
    }

    pub const fn all() -> &'static [AqiTier] {
        &[
            AqiTier::Good,
            AqiTier::Moderate,
            AqiTier::UnhealthyForSensitiveGroups,
            AqiTier::Unhealthy,
            AqiTier::VeryUnhealthy,
            AqiTier::Hazardous,
        ]
    }

    pub fn category(&self) -> &'static str {
        match self {
            AqiTier::Good => "Good",
            AqiTier::Moderate => "Moderate",
            AqiTier::UnhealthyForSensitiveGroups => "Unhealthy for Sensitive Groups",
            AqiTier::Unhealthy => "Unhealthy",
            AqiTier::VeryUnhealthy => "Very Unhealthy",
            AqiTier::Hazardous => "Hazardous",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            AqiTier::Good => "😊",
            AqiTier::Moderate => "😐",
            AqiTier::UnhealthyForSensitiveGroups => "😷",
            AqiTier::Unhealthy => "⚠️",
            AqiTier::VeryUnhealthy | AqiTier::Hazardous => "🚨",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            AqiTier::Good => {
                "Air quality is satisfactory, and air pollution poses little or no risk."
            }
            AqiTier::Moderate => {
                "Air quality is acceptable. Unusually sensitive people should consider \
                 limiting prolonged outdoor exertion."
            }
            AqiTier::UnhealthyForSensitiveGroups => {
                "Members of sensitive groups may experience health effects. \
                 The general public is less likely to be affected."
            }
            AqiTier::Unhealthy => {
                "Some members of the general public may experience health effects; \
                 sensitive groups may experience more serious effects."
            }
            AqiTier::VeryUnhealthy => {
                "Health alert: the risk of health effects is increased for everyone."
            }
            AqiTier::Hazardous => {
                "Health warning of emergency conditions: everyone is more likely to be affected."
            }
        }
    }

    /// Map marker colour for this tier.
    pub fn color(&self) -> &'static str {
        match self {
            AqiTier::Good => "#00e400",
            AqiTier::Moderate => "#ffff00",
            AqiTier::UnhealthyForSensitiveGroups => "#ff7e00",
            AqiTier::Unhealthy => "#ff0000",
            AqiTier::VeryUnhealthy => "#8f3f97",
            AqiTier::Hazardous => "#7e0023",
        }
    }
}

impl std::fmt::Display for AqiTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.category())
    }
}

/// Rough PM2.5 concentration (µg/m³) implied by an AQI value.
pub fn estimate_pm25(aqi: i32) -> f64 {
    let aqi = f64::from(aqi.max(0));
    if aqi <= 50.0 {
        aqi * 0.5
    } else if aqi <= 100.0 {
        25.0 + (aqi - 50.0) * 0.5
    } else if aqi <= 150.0 {
        50.0 + (aqi - 100.0) * 0.75
    } else if aqi <= 200.0 {
        87.5 + (aqi - 150.0) * 0.75
    } else {
        125.0 + (aqi - 200.0)
    }
}

/// Rough PM10 concentration (µg/m³) implied by an AQI value.
pub fn estimate_pm10(aqi: i32) -> f64 {
    let aqi = f64::from(aqi.max(0));
    if aqi <= 50.0 {
        aqi * 0.8
    } else if aqi <= 100.0 {
        40.0 + (aqi - 50.0) * 0.8
    } else if aqi <= 150.0 {
        80.0 + (aqi - 100.0) * 1.2
    } else if aqi <= 200.0 {
        140.0 + (aqi - 150.0) * 1.2
    } else {
        200.0 + (aqi - 200.0) * 1.5
    }
}
