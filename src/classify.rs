//! HTTP response classification
//!
//! Maps one request attempt (status, headers, body, or a transport fault) to a
//! [`Classification`]. The retry loop in [`crate::retry`] decides what to do
//! with it; nothing here sleeps or retries.

use reqwest::StatusCode;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use std::time::Duration;

/// Result of a single request attempt
#[derive(Clone, Debug, PartialEq)]
pub enum Classification {
    /// 200 with a JSON body
    Success(serde_json::Value),
    /// 404: the record does not exist
    PermanentAbsence,
    /// 429: the caller must wait and retry
    RateLimited {
        /// Parsed `Retry-After` header, if present and usable
        retry_after: Option<Duration>,
    },
    /// Timeout, connection reset, or a body that could not be read/decoded
    TransientError(String),
    /// Any other status
    UnexpectedStatus(u16),
}

impl Classification {
    /// Wait before the next attempt for a rate-limited response
    ///
    /// Returns the server's hint when it sent one, otherwise `current_backoff`.
    /// `None` for every other classification.
    pub fn wait_hint(&self, current_backoff: Duration) -> Option<Duration> {
        match self {
            Classification::RateLimited { retry_after } => {
                Some(retry_after.unwrap_or(current_backoff))
            }
            _ => None,
        }
    }
}

/// Classify a response from its status, headers and body
///
/// The body is only inspected for 200 responses.
pub fn classify_response(status: StatusCode, headers: &HeaderMap, body: &[u8]) -> Classification {
    match status {
        StatusCode::OK => match serde_json::from_slice(body) {
            Ok(payload) => Classification::Success(payload),
            Err(e) => Classification::TransientError(format!("undecodable JSON body: {e}")),
        },
        StatusCode::NOT_FOUND => Classification::PermanentAbsence,
        StatusCode::TOO_MANY_REQUESTS => Classification::RateLimited {
            retry_after: parse_retry_after(headers),
        },
        other => Classification::UnexpectedStatus(other.as_u16()),
    }
}

/// Classify a transport-level fault from the HTTP client
pub fn classify_transport(err: &reqwest::Error) -> Classification {
    let kind = if err.is_timeout() {
        "timeout"
    } else if err.is_connect() {
        "connection failed"
    } else if err.is_body() || err.is_decode() {
        "body read failed"
    } else {
        "request failed"
    };
    Classification::TransientError(format!("{kind}: {err}"))
}

/// Parse a `Retry-After` header given in delay-seconds
///
/// HTTP-date values and garbage are treated as absent so the caller falls back
/// to its own backoff.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?;
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}
