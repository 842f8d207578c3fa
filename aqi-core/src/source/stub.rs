//! In-memory source for tests.
//!
//! Replies are keyed by request path (`/feed/@8673/`, `/map/bounds/?latlng=...`);
//! unknown paths answer like the provider's `nope`.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    error::AqiError,
    model::BoundingBox,
    source::{AqiSource, FeedTarget, Fetched, into_records},
};

#[derive(Debug, Clone)]
pub enum Reply {
    Data(Value),
    Nope,
    ProviderError(String),
    HttpStatus(u16),
}

#[derive(Debug, Default)]
pub struct StubSource {
    replies: HashMap<String, Reply>,
    delay: Option<Duration>,
    calls: Mutex<Vec<String>>,
}

impl StubSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_feed(mut self, target: FeedTarget, reply: Reply) -> Self {
        self.replies.insert(target.path(), reply);
        self
    }

    pub fn on_bounds(mut self, bbox: BoundingBox, reply: Reply) -> Self {
        self.replies.insert(bounds_key(&bbox), reply);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    async fn answer(&self, key: String) -> Result<Fetched<Value>, AqiError> {
        self.calls.lock().unwrap().push(key.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.replies.get(&key).cloned().unwrap_or(Reply::Nope) {
            Reply::Data(v) => Ok(Fetched::Data(v)),
            Reply::Nope => Ok(Fetched::Empty),
            Reply::ProviderError(m) => Err(AqiError::Provider(m)),
            Reply::HttpStatus(status) => Err(AqiError::Status {
                status,
                body: String::new(),
            }),
        }
    }
}

pub fn bounds_key(bbox: &BoundingBox) -> String {
    format!("/map/bounds/?latlng={}", bbox.to_query())
}

#[async_trait]
impl AqiSource for StubSource {
    async fn feed(&self, target: &FeedTarget) -> Result<Fetched<Value>, AqiError> {
        self.answer(target.path()).await
    }

    async fn bounds(&self, bbox: &BoundingBox) -> Result<Fetched<Vec<Value>>, AqiError> {
        Ok(self.answer(bounds_key(bbox)).await?.map(into_records))
    }
}
