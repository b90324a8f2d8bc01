//! Shared test helpers: scripted record sources and recording sinks.

use crate::classify::Classification;
use crate::config::{Config, RetryConfig};
use crate::error::SinkError;
use crate::fetcher::RecordSource;
use crate::sink::RecordSink;
use crate::types::Record;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Retry settings with the production attempt budget and short delays.
pub(crate) fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_retries: 3,
        initial_backoff_delay: Duration::from_secs(1),
        max_backoff_delay: Duration::from_secs(60),
        jitter: false,
    }
}

/// Config for a sweep over scripted data.
pub(crate) fn test_config(start_id: u64, batch: usize, limit: u64) -> Config {
    let mut config = Config::default();
    config.http.base_url = "http://127.0.0.1:9/items".to_string();
    config.sweep.start_id = start_id;
    config.sweep.max_concurrent = batch;
    config.sweep.consecutive_fail_limit = limit;
    config.retry = fast_retry();
    config
}

/// [`RecordSource`] that replays per-ID responses.
///
/// Queued responses (`respond`) are consumed one per attempt; fixed responses
/// (`always`) are returned every time. IDs with nothing scripted are absent.
/// With `with_permits` the source caps concurrent attempts the way
/// [`HttpRecordSource`](crate::fetcher::HttpRecordSource) does.
pub(crate) struct ScriptedSource {
    queued: Mutex<HashMap<u64, VecDeque<Classification>>>,
    fixed: HashMap<u64, Classification>,
    attempts: Mutex<HashMap<u64, Vec<Instant>>>,
    latency: Duration,
    permits: Option<Arc<Semaphore>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedSource {
    pub(crate) fn new() -> Self {
        Self {
            queued: Mutex::new(HashMap::new()),
            fixed: HashMap::new(),
            attempts: Mutex::new(HashMap::new()),
            latency: Duration::ZERO,
            permits: None,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Simulated request duration
    pub(crate) fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Allow at most `n` attempts in flight; the rest wait for a slot
    pub(crate) fn with_permits(mut self, n: usize) -> Self {
        self.permits = Some(Arc::new(Semaphore::new(n)));
        self
    }

    /// Queue a one-shot response for `id`
    pub(crate) fn respond(self, id: u64, response: Classification) -> Self {
        self.queued
            .lock()
            .unwrap()
            .entry(id)
            .or_default()
            .push_back(response);
        self
    }

    /// Answer every attempt for `id` with `response`
    pub(crate) fn always(mut self, id: u64, response: Classification) -> Self {
        self.fixed.insert(id, response);
        self
    }

    pub(crate) fn attempts(&self, id: u64) -> usize {
        self.attempts
            .lock()
            .unwrap()
            .get(&id)
            .map_or(0, Vec::len)
    }

    pub(crate) fn total_attempts(&self) -> usize {
        self.attempts.lock().unwrap().values().map(Vec::len).sum()
    }

    pub(crate) fn first_attempt_at(&self, id: u64) -> Option<Instant> {
        self.attempts
            .lock()
            .unwrap()
            .get(&id)
            .and_then(|times| times.first().copied())
    }

    pub(crate) fn last_attempt_at(&self, id: u64) -> Option<Instant> {
        self.attempts
            .lock()
            .unwrap()
            .get(&id)
            .and_then(|times| times.last().copied())
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn next_response(&self, id: u64) -> Classification {
        let queued = self
            .queued
            .lock()
            .unwrap()
            .get_mut(&id)
            .and_then(VecDeque::pop_front);
        queued
            .or_else(|| self.fixed.get(&id).cloned())
            .unwrap_or(Classification::PermanentAbsence)
    }
}

#[async_trait::async_trait]
impl RecordSource for ScriptedSource {
    async fn fetch_once(&self, id: u64) -> Classification {
        let _permit = match &self.permits {
            Some(permits) => Some(permits.acquire().await.unwrap()),
            None => None,
        };
        self.attempts
            .lock()
            .unwrap()
            .entry(id)
            .or_default()
            .push(Instant::now());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.next_response(id)
    }
}

/// [`RecordSink`] that keeps records in memory and can reject chosen IDs.
#[derive(Default)]
pub(crate) struct RecordingSink {
    records: Mutex<Vec<Record>>,
    reject: HashSet<u64>,
    cancel_on_append: Mutex<Option<CancellationToken>>,
}

impl RecordingSink {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Fail appends for these IDs
    pub(crate) fn rejecting(ids: impl IntoIterator<Item = u64>) -> Self {
        Self {
            reject: ids.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Cancel `token` whenever a record is appended
    pub(crate) fn cancel_on_append(&self, token: CancellationToken) {
        *self.cancel_on_append.lock().unwrap() = Some(token);
    }

    pub(crate) fn ids(&self) -> Vec<u64> {
        self.records.lock().unwrap().iter().map(|r| r.id).collect()
    }

    pub(crate) fn records(&self) -> Vec<Record> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl RecordSink for RecordingSink {
    async fn append(&self, record: &Record) -> Result<(), SinkError> {
        if self.reject.contains(&record.id) {
            return Err(SinkError::Io(std::io::Error::other(format!(
                "refusing record {}",
                record.id
            ))));
        }
        self.records.lock().unwrap().push(record.clone());
        if let Some(token) = self.cancel_on_append.lock().unwrap().as_ref() {
            token.cancel();
        }
        Ok(())
    }
}
