//! A running dashboard: one region, refreshed on a fixed interval.
//!
//! The session owns the refresh task and the latest snapshot. Dropping it (or
//! calling [`DashboardSession::shutdown`]) stops the task and any fetch the
//! task has in flight.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::{
    error::AqiError, fetcher::StationFetcher, model::StationRecord, region::Region,
    source::AqiSource,
};

/// Result of one completed refresh, replaced wholesale by the next.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub stations: Vec<StationRecord>,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug)]
pub enum RefreshOutcome {
    /// A new snapshot with this many stations was published.
    Updated(usize),
    /// Another refresh was already running.
    Skipped,
    /// The fetch failed; the previous snapshot is kept.
    Failed(AqiError),
}

pub type SnapshotReceiver = watch::Receiver<Option<Arc<Snapshot>>>;

struct Shared<S> {
    fetcher: StationFetcher<S>,
    region: Region,
    in_flight: tokio::sync::Mutex<()>,
    snapshots: watch::Sender<Option<Arc<Snapshot>>>,
}

impl<S: AqiSource> Shared<S> {
    async fn refresh(&self) -> RefreshOutcome {
        let Ok(_guard) = self.in_flight.try_lock() else {
            debug!(region = %self.region.name, "refresh already in flight, skipping");
            return RefreshOutcome::Skipped;
        };

        match self.fetcher.fetch_region(&self.region).await {
            Ok(mut stations) => {
                let fetched_at = Utc::now();
                for station in &mut stations {
                    station.fetched_at = Some(fetched_at);
                }
                let count = stations.len();
                self.snapshots
                    .send_replace(Some(Arc::new(Snapshot { stations, fetched_at })));
                info!(region = %self.region.name, stations = count, "snapshot published");
                RefreshOutcome::Updated(count)
            }
            Err(err) => {
                warn!(region = %self.region.name, error = %err, "refresh failed");
                RefreshOutcome::Failed(err)
            }
        }
    }
}

pub struct DashboardSession<S> {
    shared: Arc<Shared<S>>,
    interval: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<S: AqiSource + 'static> DashboardSession<S> {
    pub fn new(fetcher: StationFetcher<S>, region: Region, interval: Duration) -> Self {
        let (snapshots, _) = watch::channel(None);
        Self {
            shared: Arc::new(Shared {
                fetcher,
                region,
                in_flight: tokio::sync::Mutex::new(()),
                snapshots,
            }),
            interval: interval.max(Duration::from_millis(1)),
            task: Mutex::new(None),
        }
    }

    pub fn region(&self) -> &Region {
        &self.shared.region
    }

    /// Fetch now unless a fetch is already running.
    pub async fn refresh(&self) -> RefreshOutcome {
        self.shared.refresh().await
    }

    pub fn subscribe(&self) -> SnapshotReceiver {
        self.shared.snapshots.subscribe()
    }

    pub fn latest(&self) -> Option<Arc<Snapshot>> {
        self.shared.snapshots.borrow().clone()
    }

    /// Start the periodic refresh loop. The first refresh happens immediately.
    /// Does nothing if the loop is already running.
    pub fn start(&self) {
        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if task.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }

        let shared = Arc::clone(&self.shared);
        let period = self.interval;
        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                shared.refresh().await;
            }
        }));
        info!(region = %self.shared.region.name, ?period, "refresh loop started");
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Stop the refresh loop, cancelling a fetch it has in flight.
    pub fn shutdown(&self) {
        let handle = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
            info!(region = %self.shared.region.name, "refresh loop stopped");
        }
    }
}

impl<S> Drop for DashboardSession<S> {
    fn drop(&mut self) {
        let task = self.task.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = task.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::FetchOptions;
    use crate::model::BoundingBox;
    use crate::region::NamedBox;
    use crate::source::FeedTarget;
    use crate::source::stub::{Reply, StubSource};
    use serde_json::json;

    const BOX: BoundingBox = BoundingBox::new(27.6, 85.2, 27.8, 85.5);

    fn session(source: StubSource, interval: Duration) -> DashboardSession<StubSource> {
        let region = Region {
            name: "test".into(),
            bounds: vec![NamedBox {
                name: "box".into(),
                bounds: BOX,
            }],
            ..Region::default()
        };
        DashboardSession::new(
            StationFetcher::new(source, FetchOptions::default()),
            region,
            interval,
        )
    }

    fn one_station() -> StubSource {
        StubSource::new().on_bounds(BOX, Reply::Data(json!([{"lat": 27.7, "lon": 85.3, "aqi": 42}])))
    }

    #[tokio::test]
    async fn refresh_publishes_stamped_snapshot() {
        let session = session(one_station(), Duration::from_secs(60));
        assert!(session.latest().is_none());

        let outcome = session.refresh().await;
        assert!(matches!(outcome, RefreshOutcome::Updated(1)));

        let snapshot = session.latest().expect("snapshot published");
        assert_eq!(snapshot.stations.len(), 1);
        assert_eq!(snapshot.stations[0].fetched_at, Some(snapshot.fetched_at));
    }

    #[tokio::test]
    async fn overlapping_refresh_is_skipped() {
        let source = one_station().with_delay(Duration::from_millis(50));
        let session = session(source, Duration::from_secs(60));

        let (first, second) = tokio::join!(session.refresh(), session.refresh());

        assert!(matches!(first, RefreshOutcome::Updated(1)));
        assert!(matches!(second, RefreshOutcome::Skipped));
    }

    #[tokio::test]
    async fn failed_refresh_publishes_nothing() {
        let region = Region {
            fallback_cities: vec!["kathmandu".into()],
            ..Region::default()
        };
        let source =
            StubSource::new().on_feed(FeedTarget::City("kathmandu".into()), Reply::HttpStatus(500));
        let session = DashboardSession::new(
            StationFetcher::new(source, FetchOptions::default()),
            region,
            Duration::from_secs(60),
        );
        let rx = session.subscribe();

        assert!(matches!(session.refresh().await, RefreshOutcome::Failed(_)));
        assert!(session.latest().is_none());
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn empty_result_replaces_snapshot() {
        let session = session(StubSource::new(), Duration::from_secs(60));

        assert!(matches!(session.refresh().await, RefreshOutcome::Updated(0)));
        assert!(session.latest().unwrap().stations.is_empty());
    }

    #[tokio::test]
    async fn loop_refreshes_until_shutdown() {
        let session = session(one_station(), Duration::from_secs(3600));
        let mut rx = session.subscribe();

        session.start();
        assert!(session.is_running());
        session.start();

        rx.changed().await.expect("sender alive");
        assert_eq!(rx.borrow().as_ref().map(|s| s.stations.len()), Some(1));

        session.shutdown();
        assert!(!session.is_running());
        session.shutdown();
    }
}
