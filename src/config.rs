//! Configuration types for sweep-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::Path, path::PathBuf, time::Duration};

/// Outbound HTTP settings for the record endpoint
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Collection base URL; records live at `{base_url}/{id}/brief-info`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// `User-Agent` header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Timeout for a single request attempt (default: 10 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// ID-space traversal and stop heuristic settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SweepConfig {
    /// First ID to fetch (default: 4463796)
    #[serde(default = "default_start_id")]
    pub start_id: u64,

    /// Connection pool size and default batch size (default: 100)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// IDs per batch (None = `max_concurrent`)
    ///
    /// Batches larger than the pool are allowed; the excess requests wait for
    /// a free connection instead of exceeding `max_concurrent`.
    #[serde(default)]
    pub batch_size: Option<usize>,

    /// Accumulated IDs in fully empty batches that stop the sweep (default: 100)
    #[serde(default = "default_consecutive_fail_limit")]
    pub consecutive_fail_limit: u64,
}

impl SweepConfig {
    /// Effective number of IDs dispatched per batch
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.unwrap_or(self.max_concurrent)
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            start_id: default_start_id(),
            max_concurrent: default_max_concurrent(),
            batch_size: None,
            consecutive_fail_limit: default_consecutive_fail_limit(),
        }
    }
}

/// Rate-limit retry configuration
///
/// Only HTTP 429 responses are retried. Transport faults and unexpected
/// statuses fail the ID on the first attempt.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per ID, including the first one (default: 3)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Backoff used when a 429 carries no usable `Retry-After` (default: 5 seconds)
    #[serde(default = "default_initial_backoff_delay", with = "duration_serde")]
    pub initial_backoff_delay: Duration,

    /// Upper bound for the doubled backoff delay (default: 300 seconds)
    ///
    /// Only the internal backoff is capped. A `Retry-After` hint is waited out
    /// in full however large it is, and the worker holds its batch open
    /// meanwhile.
    #[serde(default = "default_max_backoff_delay", with = "duration_serde")]
    pub max_backoff_delay: Duration,

    /// Add random jitter to backoff-derived waits (default: false)
    ///
    /// Server-supplied `Retry-After` values are always honored exactly.
    #[serde(default)]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_delay: default_initial_backoff_delay(),
            max_backoff_delay: default_max_backoff_delay(),
            jitter: false,
        }
    }
}

/// What the sweep does when the record sink rejects a record
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkFailurePolicy {
    /// Log the failure, count it, keep sweeping (default)
    #[default]
    Continue,
    /// Stop the sweep and return the sink error
    Abort,
}

/// Record sink configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SinkConfig {
    /// JSONL output path (default: "./records.jsonl")
    #[serde(default = "default_sink_path")]
    pub path: PathBuf,

    /// Call `fsync` after every appended line (default: false, flush only)
    #[serde(default)]
    pub fsync: bool,

    /// Reaction to a failed append
    #[serde(default)]
    pub on_failure: SinkFailurePolicy,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            path: default_sink_path(),
            fsync: false,
            on_failure: SinkFailurePolicy::default(),
        }
    }
}

/// Main configuration for [`Sweeper`](crate::Sweeper)
///
/// Fields are organized into sub-configs:
/// - [`http`](HttpConfig) - endpoint, user agent, request timeout
/// - [`sweep`](SweepConfig) - start ID, concurrency, batch size, stop limit
/// - [`retry`](RetryConfig) - rate-limit retry budget and backoff
/// - [`sink`](SinkConfig) - output file and failure policy
///
/// `http` and `sweep` are flattened, so a config file reads as a flat object
/// with `retry` and `sink` as the only nested sections.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Outbound HTTP settings
    #[serde(flatten)]
    pub http: HttpConfig,

    /// ID-space traversal settings
    #[serde(flatten)]
    pub sweep: SweepConfig,

    /// Rate-limit retry settings
    #[serde(default)]
    pub retry: RetryConfig,

    /// Record sink settings
    #[serde(default)]
    pub sink: SinkConfig,
}

impl Config {
    /// Load a configuration from a JSON file
    ///
    /// Missing fields fall back to their defaults. The result is validated.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Config = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every option holds a usable value
    pub fn validate(&self) -> Result<()> {
        let base = url::Url::parse(&self.http.base_url)
            .map_err(|e| Error::config("base_url", format!("invalid base URL: {e}")))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(Error::config(
                "base_url",
                format!("unsupported scheme '{}'", base.scheme()),
            ));
        }
        if self.http.request_timeout.is_zero() {
            return Err(Error::config("request_timeout", "must be greater than zero"));
        }
        if self.sweep.max_concurrent == 0 {
            return Err(Error::config("max_concurrent", "must be at least 1"));
        }
        if self.sweep.batch_size == Some(0) {
            return Err(Error::config("batch_size", "must be at least 1"));
        }
        if self.retry.max_retries == 0 {
            return Err(Error::config(
                "max_retries",
                "must allow at least one attempt",
            ));
        }
        if self.retry.max_backoff_delay < self.retry.initial_backoff_delay {
            return Err(Error::config(
                "max_backoff_delay",
                "must not be shorter than initial_backoff_delay",
            ));
        }
        Ok(())
    }

    /// URL of the record for `id`
    pub fn record_url(&self, id: u64) -> String {
        format!("{}/{}/brief-info", self.http.base_url.trim_end_matches('/'), id)
    }
}

fn default_base_url() -> String {
    "https://api.music.yandex.net/artists".to_string()
}

fn default_user_agent() -> String {
    "PostmanRuntime/7.29.0".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_start_id() -> u64 {
    4_463_796
}

fn default_max_concurrent() -> usize {
    100
}

fn default_consecutive_fail_limit() -> u64 {
    100
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_backoff_delay() -> Duration {
    Duration::from_secs(5)
}

fn default_max_backoff_delay() -> Duration {
    Duration::from_secs(300)
}

fn default_sink_path() -> PathBuf {
    PathBuf::from("./records.jsonl")
}

// Duration serialization helper
//
// Durations are seconds. Whole values are written as integers, anything finer
// as a fractional number, so `50ms` round-trips as `0.05`.
mod duration_serde {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_nanos() == 0 {
            serializer.serialize_u64(duration.as_secs())
        } else {
            serializer.serialize_f64(duration.as_secs_f64())
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs)
            .map_err(|e| D::Error::custom(format!("invalid duration {secs}: {e}")))
    }
}
