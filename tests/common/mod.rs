//! Common test utilities for sweep-dl HTTP tests

#![allow(dead_code)]
// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;
use sweep_dl::{Config, FetchWorker, HttpRecordSource, RetryConfig};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// User agent every test request must carry
pub const TEST_USER_AGENT: &str = "sweep-dl-tests/1.0";

/// Config pointing at `server` with short backoff delays
pub fn config_for(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.http.base_url = format!("{}/artists", server.uri());
    config.http.user_agent = TEST_USER_AGENT.to_string();
    config.http.request_timeout = Duration::from_secs(5);
    config.retry = RetryConfig {
        max_retries: 3,
        initial_backoff_delay: Duration::from_millis(50),
        max_backoff_delay: Duration::from_secs(1),
        jitter: false,
    };
    config
}

/// Path the record for `id` is served from
pub fn record_path(id: u64) -> String {
    format!("/artists/{id}/brief-info")
}

/// Serve `body` as the record for `id` on every request
pub async fn mount_record(server: &MockServer, id: u64, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(record_path(id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Answer the next `times` requests for `id` with `response`
///
/// Mount this before the steady-state mock; wiremock falls through to it once
/// these responses are used up.
pub async fn mount_first(server: &MockServer, id: u64, response: ResponseTemplate, times: u64) {
    Mock::given(method("GET"))
        .and(path(record_path(id)))
        .respond_with(response)
        .up_to_n_times(times)
        .mount(server)
        .await;
}

/// HTTP-backed fetch worker for `config`
pub fn http_worker(config: &Config) -> FetchWorker {
    let source = HttpRecordSource::new(Arc::new(config.clone())).expect("HTTP client");
    FetchWorker::new(Arc::new(source), config.retry.clone())
}

/// Number of requests the server received for `id`
pub async fn requests_for(server: &MockServer, id: u64) -> usize {
    let wanted = record_path(id);
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == wanted)
        .count()
}
