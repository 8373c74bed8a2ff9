//! Scripted fetcher for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tokio::time::Instant;

use super::{FetchError, Fetcher};
use crate::resolver::MediaKind;

/// Replays scripted outcomes per URL (query string ignored) and records
/// every call with the tokio instant it started at.
#[derive(Debug, Default)]
pub(crate) struct ScriptedFetcher {
    scripts: Mutex<HashMap<String, VecDeque<Result<MediaKind, FetchError>>>>,
    calls: Mutex<Vec<(String, Instant)>>,
    latency: Duration,
    /// When set, each fetch waits for a permit before completing
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Queues outcomes for `url`; once exhausted the URL succeeds.
    pub fn script(self, url: &str, outcomes: Vec<Result<MediaKind, FetchError>>) -> Self {
        self.scripts
            .lock()
            .insert(url.to_string(), outcomes.into_iter().collect());
        self
    }

    /// `url` fails `times` times, then succeeds.
    pub fn failing(self, url: &str, times: usize) -> Self {
        self.script(url, vec![Err(FetchError::Status(503)); times])
    }

    pub fn calls(&self) -> Vec<(String, Instant)> {
        self.calls.lock().clone()
    }

    pub fn call_urls(&self) -> Vec<String> {
        self.calls.lock().iter().map(|(url, _)| url.clone()).collect()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<MediaKind, FetchError> {
        self.calls.lock().push((url.to_string(), Instant::now()));

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if let Some(gate) = &self.gate {
            let _permit = gate
                .acquire()
                .await
                .map_err(|e| FetchError::Network(e.to_string()))?;
        }

        let key = url.split('?').next().unwrap_or(url);
        let scripted = self
            .scripts
            .lock()
            .get_mut(key)
            .and_then(|queue| queue.pop_front());
        scripted.unwrap_or_else(|| Ok(MediaKind::from_reference(key)))
    }
}
