use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde_json::Value;
use tracing::debug;

use crate::{
    error::AqiError,
    model::BoundingBox,
    source::{AqiSource, FeedTarget, Fetched, into_records, parse_envelope},
};

pub const DEFAULT_BASE_URL: &str = "https://api.waqi.info";

/// HTTP client for the World Air Quality Index API.
#[derive(Clone)]
pub struct WaqiClient {
    token: String,
    base_url: String,
    http: ClientWithMiddleware,
}

impl std::fmt::Debug for WaqiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaqiClient")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl WaqiClient {
    /// Build a client whose requests time out after `timeout` and are retried
    /// with exponential backoff up to `max_retries` times on transient errors.
    pub fn new(
        token: String,
        base_url: &str,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Self, AqiError> {
        let inner = Client::builder().timeout(timeout).build()?;
        let policy = ExponentialBackoff::builder().build_with_max_retries(max_retries);
        let http = ClientBuilder::new(inner)
            .with(RetryTransientMiddleware::new_with_policy(policy))
            .build();

        Ok(Self {
            token,
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_envelope(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Fetched<Value>, AqiError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "requesting");

        let res = self
            .http
            .get(&url)
            .query(query)
            .query(&[("token", self.token.as_str())])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(AqiError::Status {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        parse_envelope(&body)
    }
}

#[async_trait]
impl AqiSource for WaqiClient {
    async fn feed(&self, target: &FeedTarget) -> Result<Fetched<Value>, AqiError> {
        self.get_envelope(&target.path(), &[]).await
    }

    async fn bounds(&self, bbox: &BoundingBox) -> Result<Fetched<Vec<Value>>, AqiError> {
        let latlng = bbox.to_query();
        let fetched = self
            .get_envelope("/map/bounds/", &[("latlng", latlng.as_str())])
            .await?;
        Ok(fetched.map(into_records))
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_long_bodies_on_char_boundaries() {
        let short = "Bad Gateway";
        assert_eq!(truncate_body(short), short);

        let long = "é".repeat(300);
        let truncated = truncate_body(&long);
        assert!(truncated.ends_with("..."));
        assert_eq!(truncated.chars().count(), 203);
    }

    #[test]
    fn base_url_is_normalized_and_token_hidden() {
        let client =
            WaqiClient::new("SECRET".into(), "https://api.waqi.info/", Duration::from_secs(5), 1)
                .unwrap();
        assert_eq!(client.base_url(), DEFAULT_BASE_URL);
        assert!(!format!("{client:?}").contains("SECRET"));
    }
}
