//! Core library for the `aqi` CLI.
//!
//! This crate defines:
//! - AQI classification and the canonical station record
//! - Normalization of the provider's inconsistent record shapes
//! - The provider source abstraction and its WAQI HTTP implementation
//! - A multi-strategy region sweep with deduplication
//! - A refreshing dashboard session
//! - Configuration & logging setup
//!
//! It is used by `aqi-cli`, but can also be reused by other binaries or services.

pub mod classify;
pub mod config;
pub mod display;
pub mod error;
pub mod fetcher;
pub mod logging;
pub mod model;
pub mod normalize;
pub mod region;
pub mod session;
pub mod source;

pub use classify::AqiTier;
pub use config::Config;
pub use error::AqiError;
pub use fetcher::{FetchOptions, StationFetcher};
pub use model::{AqiReading, BoundingBox, Coordinates, StationRecord};
pub use normalize::{AxisOrderPolicy, normalize_all, normalize_station};
pub use region::{Region, RegionId};
pub use session::{DashboardSession, RefreshOutcome, Snapshot};
pub use source::{AqiSource, FeedTarget, Fetched, WaqiClient};
