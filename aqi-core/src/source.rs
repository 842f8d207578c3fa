use crate::{
    config::Config,
    error::AqiError,
    model::{BoundingBox, Coordinates},
};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::fmt::Debug;

pub mod waqi;

#[cfg(test)]
pub(crate) mod stub;

pub use waqi::WaqiClient;

/// Outcome of a call the provider answered.
///
/// `Empty` is the provider saying it has nothing for this query; transport
/// and provider failures are `Err` instead.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched<T> {
    Data(T),
    Empty,
}

impl<T> Fetched<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Fetched<U> {
        match self {
            Fetched::Data(v) => Fetched::Data(f(v)),
            Fetched::Empty => Fetched::Empty,
        }
    }
}

/// What a `/feed/...` request is about.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedTarget {
    City(String),
    Geo(Coordinates),
    /// Provider station id, with or without the leading `@`.
    Station(String),
}

impl FeedTarget {
    pub fn path(&self) -> String {
        match self {
            FeedTarget::City(city) => format!("/feed/{}/", city.trim()),
            FeedTarget::Geo(c) => format!("/feed/geo:{};{}/", c.lat, c.lng),
            FeedTarget::Station(id) => format!("/feed/@{}/", id.trim_start_matches('@')),
        }
    }
}

impl std::fmt::Display for FeedTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedTarget::City(city) => write!(f, "city {city}"),
            FeedTarget::Geo(c) => write!(f, "geo {};{}", c.lat, c.lng),
            FeedTarget::Station(id) => write!(f, "station @{}", id.trim_start_matches('@')),
        }
    }
}

/// `{ "status": ..., "data": ... }` wrapper around every provider response.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    pub status: String,
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    pub fn into_fetched(self) -> Result<Fetched<Value>, AqiError> {
        match self.status.as_str() {
            "ok" if self.data.is_null() => Err(AqiError::MissingPayload),
            "ok" => Ok(Fetched::Data(self.data)),
            "nope" => Ok(Fetched::Empty),
            "error" => {
                let message = match self.data {
                    Value::String(s) => s,
                    Value::Null => "unspecified error".to_string(),
                    other => other.to_string(),
                };
                Err(AqiError::Provider(message))
            }
            other => Err(AqiError::UnexpectedStatus(other.to_string())),
        }
    }
}

pub fn parse_envelope(body: &str) -> Result<Fetched<Value>, AqiError> {
    let envelope: Envelope = serde_json::from_str(body)?;
    envelope.into_fetched()
}

/// Split a payload into individual station records.
///
/// Feed endpoints answer with one object, the bounds endpoint with a list.
pub fn into_records(data: Value) -> Vec<Value> {
    match data {
        Value::Array(items) => items,
        Value::Object(_) => vec![data],
        _ => Vec::new(),
    }
}

#[async_trait]
pub trait AqiSource: Send + Sync + Debug {
    async fn feed(&self, target: &FeedTarget) -> Result<Fetched<Value>, AqiError>;

    async fn bounds(&self, bbox: &BoundingBox) -> Result<Fetched<Vec<Value>>, AqiError>;
}

/// Construct the HTTP source from config.
pub fn source_from_config(config: &Config) -> anyhow::Result<WaqiClient> {
    let token = config.token()?;
    let client = WaqiClient::new(
        token,
        &config.base_url,
        config.request_timeout(),
        config.max_retries,
    )?;
    Ok(client)
}
