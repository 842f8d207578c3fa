//! Multi-strategy station sweep for a region.
//!
//! Steps, in order:
//! 1. feeds for station ids already known to exist,
//! 2. map-bounds sweeps over each sub-region,
//! 3. geo feeds for population centres not yet covered,
//! 4. city feeds, only when 1-3 found nothing.
//!
//! Within a step requests run concurrently (bounded), but results are merged
//! in dispatch order so that "first seen wins" stays deterministic.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::{
    error::AqiError,
    model::{Coordinates, StationRecord},
    normalize::{AxisOrderPolicy, normalize_all},
    region::Region,
    source::{AqiSource, FeedTarget, Fetched, into_records},
};

#[derive(Debug, Clone, PartialEq)]
pub struct FetchOptions {
    /// Requests in flight at once within a single step.
    pub max_concurrent: usize,
    /// Stations closer than this (degrees, both axes) are the same station.
    pub dedupe_tolerance: f64,
    /// Population centres this close to a known station are not queried.
    pub point_skip_tolerance: f64,
    pub axis_policy: AxisOrderPolicy,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            max_concurrent: 4,
            dedupe_tolerance: 0.01,
            point_skip_tolerance: 0.05,
            axis_policy: AxisOrderPolicy::default(),
        }
    }
}

/// Stations collected so far, deduplicated by proximity.
#[derive(Debug, Clone)]
pub struct StationSet {
    tolerance: f64,
    stations: Vec<StationRecord>,
}

impl StationSet {
    pub fn new(tolerance: f64) -> Self {
        Self {
            tolerance,
            stations: Vec::new(),
        }
    }

    /// Add `station` unless one already collected lies within tolerance.
    pub fn insert(&mut self, station: StationRecord) -> bool {
        let coords = station.coordinates();
        if self.covers(&coords, self.tolerance) {
            return false;
        }
        self.stations.push(station);
        true
    }

    /// Returns how many were actually added.
    pub fn extend(&mut self, stations: impl IntoIterator<Item = StationRecord>) -> usize {
        let mut added = 0;
        for station in stations {
            if self.insert(station) {
                added += 1;
            }
        }
        added
    }

    pub fn covers(&self, coords: &Coordinates, tolerance: f64) -> bool {
        self.stations
            .iter()
            .any(|s| s.coordinates().is_near(coords, tolerance))
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn into_vec(self) -> Vec<StationRecord> {
        self.stations
    }
}

#[derive(Debug)]
pub struct StationFetcher<S> {
    source: S,
    options: FetchOptions,
}

impl<S: AqiSource> StationFetcher<S> {
    pub fn new(source: S, options: FetchOptions) -> Self {
        Self { source, options }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    /// Sweep `region`.
    ///
    /// `Ok(vec![])` means the provider genuinely had nothing. `Err` is only
    /// returned when the city fallback ran and every city call failed.
    #[instrument(skip_all, fields(region = %region.name))]
    pub async fn fetch_region(&self, region: &Region) -> Result<Vec<StationRecord>, AqiError> {
        let now = Utc::now();
        let mut collected = StationSet::new(self.options.dedupe_tolerance);

        let by_id: Vec<FeedTarget> = region
            .station_ids
            .iter()
            .map(|id| FeedTarget::Station(id.clone()))
            .collect();
        for (target, result) in self.feeds(by_id).await {
            self.absorb(&mut collected, "known-id", &target.to_string(), result, now);
        }

        let sweeps = stream::iter(region.bounds.iter().cloned())
            .map(|b| async move {
                let result = self.source.bounds(&b.bounds).await;
                (b, result)
            })
            .buffered(self.concurrency())
            .collect::<Vec<_>>()
            .await;
        for (b, result) in sweeps {
            let result = result.map(|f| f.map(Value::Array));
            self.absorb(&mut collected, "bounds", &b.name, result, now);
        }

        let mut uncovered = Vec::new();
        for point in &region.points {
            if collected.covers(&point.coords, self.options.point_skip_tolerance) {
                debug!(point = %point.name, "already covered, skipping point lookup");
            } else {
                uncovered.push(FeedTarget::Geo(point.coords));
            }
        }
        for (target, result) in self.feeds(uncovered).await {
            // Lookups run ahead of merging, so a point may have been covered by
            // an earlier point's stations since it was dispatched.
            let covered = match &target {
                FeedTarget::Geo(coords) => {
                    collected.covers(coords, self.options.point_skip_tolerance)
                }
                _ => false,
            };
            if covered {
                debug!(lookup = %target, "covered by an earlier point, discarding");
                continue;
            }
            self.absorb(&mut collected, "point", &target.to_string(), result, now);
        }

        if !collected.is_empty() {
            info!(stations = collected.len(), "region sweep complete");
            return Ok(collected.into_vec());
        }

        warn!("no stations from id, bounds or point lookups; trying city feeds");
        self.city_fallback(region, now).await
    }

    /// Single city feed. Unlike the region sweep, errors propagate.
    #[instrument(skip(self))]
    pub async fn fetch_city(&self, city: &str) -> Result<Vec<StationRecord>, AqiError> {
        let fetched = self.source.feed(&FeedTarget::City(city.to_string())).await?;
        Ok(match fetched {
            Fetched::Data(data) => self.normalize(data, Utc::now()),
            Fetched::Empty => Vec::new(),
        })
    }

    async fn city_fallback(
        &self,
        region: &Region,
        now: DateTime<Utc>,
    ) -> Result<Vec<StationRecord>, AqiError> {
        let mut last_err = None;
        let mut answered = false;

        for city in &region.fallback_cities {
            match self.source.feed(&FeedTarget::City(city.clone())).await {
                Ok(Fetched::Data(data)) => {
                    answered = true;
                    let mut set = StationSet::new(self.options.dedupe_tolerance);
                    set.extend(self.normalize(data, now));
                    if !set.is_empty() {
                        info!(%city, stations = set.len(), "city feed fallback succeeded");
                        return Ok(set.into_vec());
                    }
                }
                Ok(Fetched::Empty) => {
                    answered = true;
                    debug!(%city, "city feed has no data");
                }
                Err(err) => {
                    warn!(%city, error = %err, "city feed failed");
                    last_err = Some(err);
                }
            }
        }

        match last_err {
            Some(err) if !answered => Err(err),
            _ => Ok(Vec::new()),
        }
    }

    async fn feeds(
        &self,
        targets: Vec<FeedTarget>,
    ) -> Vec<(FeedTarget, Result<Fetched<Value>, AqiError>)> {
        stream::iter(targets)
            .map(|target| async move {
                let result = self.source.feed(&target).await;
                (target, result)
            })
            .buffered(self.concurrency())
            .collect()
            .await
    }

    fn absorb(
        &self,
        collected: &mut StationSet,
        step: &str,
        label: &str,
        result: Result<Fetched<Value>, AqiError>,
        now: DateTime<Utc>,
    ) {
        match result {
            Ok(Fetched::Data(data)) => {
                let stations = self.normalize(data, now);
                let found = stations.len();
                let added = collected.extend(stations);
                debug!(step, lookup = label, found, added, "merged stations");
            }
            Ok(Fetched::Empty) => debug!(step, lookup = label, "no data"),
            Err(err) => warn!(step, lookup = label, error = %err, "lookup failed, skipping"),
        }
    }

    fn normalize(&self, data: Value, now: DateTime<Utc>) -> Vec<StationRecord> {
        normalize_all(into_records(data), self.options.axis_policy, now)
    }

    fn concurrency(&self) -> usize {
        self.options.max_concurrent.max(1)
    }
}
