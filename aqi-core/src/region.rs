//! Region presets: what to query when sweeping a country or valley.

use std::convert::TryFrom;

use serde::{Deserialize, Serialize};

use crate::model::{BoundingBox, Coordinates};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionId {
    Nepal,
    KathmanduValley,
}

impl RegionId {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegionId::Nepal => "nepal",
            RegionId::KathmanduValley => "kathmandu-valley",
        }
    }

    pub const fn all() -> &'static [RegionId] {
        &[RegionId::Nepal, RegionId::KathmanduValley]
    }

    pub fn region(&self) -> Region {
        match self {
            RegionId::Nepal => Region::nepal(),
            RegionId::KathmanduValley => Region::kathmandu_valley(),
        }
    }
}

impl std::fmt::Display for RegionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for RegionId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "nepal" => Ok(RegionId::Nepal),
            "kathmandu-valley" | "kathmandu_valley" | "valley" => Ok(RegionId::KathmanduValley),
            _ => Err(anyhow::anyhow!(
                "Unknown region '{value}'. Supported regions: nepal, kathmandu-valley."
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedBox {
    pub name: String,
    pub bounds: BoundingBox,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedPoint {
    pub name: String,
    pub coords: Coordinates,
}

/// Everything the fetcher needs to sweep one area.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub name: String,
    /// Map centre for display.
    pub center: Coordinates,
    /// Provider station ids found in earlier sweeps, without the `@` prefix.
    pub station_ids: Vec<String>,
    pub bounds: Vec<NamedBox>,
    pub points: Vec<NamedPoint>,
    /// City feeds tried in order when nothing else returns a station.
    pub fallback_cities: Vec<String>,
}

impl Region {
    pub fn nepal() -> Self {
        Self {
            name: "Nepal".to_string(),
            center: Coordinates::new(28.3949, 84.1240),
            station_ids: ids(&["8673", "12488", "13600", "14641"]),
            bounds: boxes(&[
                ("Sudurpashchim", BoundingBox::new(28.4, 80.0, 30.3, 81.5)),
                ("Karnali", BoundingBox::new(28.3, 81.3, 30.5, 83.3)),
                ("Lumbini", BoundingBox::new(27.3, 81.6, 28.6, 84.0)),
                ("Gandaki", BoundingBox::new(27.6, 83.0, 29.3, 85.0)),
                ("Bagmati", BoundingBox::new(27.2, 84.3, 28.4, 86.6)),
                ("Madhesh", BoundingBox::new(26.5, 84.7, 27.5, 87.0)),
                ("Koshi", BoundingBox::new(26.3, 86.0, 28.1, 88.2)),
            ]),
            points: points(&[
                ("Kathmandu", 27.7172, 85.3240),
                ("Pokhara", 28.2096, 83.9856),
                ("Lalitpur", 27.6644, 85.3188),
                ("Bharatpur", 27.6833, 84.4333),
                ("Biratnagar", 26.4525, 87.2718),
                ("Birgunj", 27.0104, 84.8770),
                ("Dharan", 26.8125, 87.2833),
                ("Butwal", 27.7006, 83.4484),
                ("Nepalgunj", 28.0500, 81.6167),
                ("Dhangadhi", 28.6833, 80.6000),
                ("Janakpur", 26.7288, 85.9263),
                ("Hetauda", 27.4287, 85.0322),
            ]),
            fallback_cities: ids(&["kathmandu", "pokhara", "lalitpur", "biratnagar"]),
        }
    }

    pub fn kathmandu_valley() -> Self {
        Self {
            name: "Kathmandu Valley".to_string(),
            center: Coordinates::new(27.7172, 85.3240),
            station_ids: ids(&["8673", "12488"]),
            bounds: boxes(&[
                ("Kathmandu", BoundingBox::new(27.65, 85.25, 27.76, 85.40)),
                ("Lalitpur", BoundingBox::new(27.60, 85.28, 27.68, 85.38)),
                ("Bhaktapur", BoundingBox::new(27.64, 85.38, 27.72, 85.48)),
            ]),
            points: points(&[
                ("Kathmandu", 27.7172, 85.3240),
                ("Lalitpur", 27.6644, 85.3188),
                ("Bhaktapur", 27.6710, 85.4298),
                ("Kirtipur", 27.6787, 85.2775),
                ("Thimi", 27.6810, 85.3870),
                ("Budhanilkantha", 27.7650, 85.3650),
            ]),
            fallback_cities: ids(&["kathmandu", "lalitpur", "bhaktapur"]),
        }
    }
}

fn ids(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn boxes(items: &[(&str, BoundingBox)]) -> Vec<NamedBox> {
    items
        .iter()
        .map(|(name, bounds)| NamedBox { name: name.to_string(), bounds: *bounds })
        .collect()
}

fn points(items: &[(&str, f64, f64)]) -> Vec<NamedPoint> {
    items
        .iter()
        .map(|(name, lat, lng)| NamedPoint {
            name: name.to_string(),
            coords: Coordinates::new(*lat, *lng),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_id_as_str_roundtrip() {
        for id in RegionId::all() {
            let parsed = RegionId::try_from(id.as_str()).expect("roundtrip should succeed");
            assert_eq!(*id, parsed);
        }
    }

    #[test]
    fn region_id_aliases() {
        assert_eq!(RegionId::try_from("Valley").unwrap(), RegionId::KathmanduValley);
        assert_eq!(RegionId::try_from("NEPAL").unwrap(), RegionId::Nepal);
    }

    #[test]
    fn unknown_region_error() {
        let err = RegionId::try_from("atlantis").unwrap_err();
        assert!(err.to_string().contains("Unknown region"));
    }

    #[test]
    fn presets_are_well_formed() {
        for id in RegionId::all() {
            let region = id.region();
            assert!(region.center.is_valid());
            assert!(!region.bounds.is_empty());
            assert!(!region.fallback_cities.is_empty());

            for b in &region.bounds {
                assert!(b.bounds.south_west.lat < b.bounds.north_east.lat, "{}", b.name);
                assert!(b.bounds.south_west.lng < b.bounds.north_east.lng, "{}", b.name);
            }
            for p in &region.points {
                assert!(p.coords.is_valid(), "{}", p.name);
            }
        }
    }
}
