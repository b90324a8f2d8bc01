//! Per-ID fetching: the record source abstraction and the fetch worker.

use crate::classify::{Classification, classify_response, classify_transport};
use crate::config::{Config, RetryConfig};
use crate::error::Result;
use crate::retry::fetch_with_retry;
use crate::types::FetchOutcome;
use reqwest::StatusCode;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Abstraction over a single request attempt for one ID, enabling testability.
///
/// Implementations perform exactly one request and classify it; retrying is
/// the [`FetchWorker`]'s job.
#[async_trait::async_trait]
pub trait RecordSource: Send + Sync {
    /// Perform one attempt for `id`
    async fn fetch_once(&self, id: u64) -> Classification;
}

/// Production [`RecordSource`] backed by a shared `reqwest` client.
///
/// At most `max_concurrent` requests are in flight at once across every
/// worker sharing this source. A permit is held only while a request is
/// running, so workers sleeping through a backoff do not occupy a slot.
pub struct HttpRecordSource {
    client: reqwest::Client,
    config: Arc<Config>,
    permits: Arc<Semaphore>,
}

impl HttpRecordSource {
    /// Build the HTTP client from the configuration
    ///
    /// # Errors
    /// Returns [`Error::Network`](crate::Error::Network) if the HTTP client
    /// cannot be built, e.g. for a `user_agent` that is not a valid header value
    pub fn new(config: Arc<Config>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.http.request_timeout)
            .user_agent(config.http.user_agent.clone())
            .pool_max_idle_per_host(config.sweep.max_concurrent)
            .build()?;
        let permits = Arc::new(Semaphore::new(config.sweep.max_concurrent));

        Ok(Self {
            client,
            config,
            permits,
        })
    }

    /// Requests that could start right now without waiting for a permit
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }
}

#[async_trait::async_trait]
impl RecordSource for HttpRecordSource {
    async fn fetch_once(&self, id: u64) -> Classification {
        // Only fails if the semaphore is closed, which this type never does
        let _permit = match self.permits.acquire().await {
            Ok(permit) => permit,
            Err(e) => return Classification::TransientError(format!("connection pool closed: {e}")),
        };

        let url = self.config.record_url(id);
        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => return classify_transport(&e),
        };

        let status = response.status();
        let headers = response.headers().clone();
        if status != StatusCode::OK {
            return classify_response(status, &headers, &[]);
        }

        match response.bytes().await {
            Ok(body) => classify_response(status, &headers, &body),
            Err(e) => classify_transport(&e),
        }
    }
}

/// Fetches single IDs through a [`RecordSource`] with rate-limit retries
#[derive(Clone)]
pub struct FetchWorker {
    source: Arc<dyn RecordSource>,
    retry: RetryConfig,
}

impl FetchWorker {
    /// Create a worker over `source`
    pub fn new(source: Arc<dyn RecordSource>, retry: RetryConfig) -> Self {
        Self { source, retry }
    }

    /// Fetch `id`, returning exactly one outcome
    pub async fn fetch(&self, id: u64) -> FetchOutcome {
        let source: &dyn RecordSource = self.source.as_ref();
        fetch_with_retry(&self.retry, id, move |_attempt| source.fetch_once(id)).await
    }
}
