//! Rate-limit retry with exponential backoff
//!
//! Each ID gets up to [`RetryConfig::max_retries`] attempts. Only 429 responses
//! are retried: transport faults and unexpected statuses fail the ID on the
//! spot.
//!
//! # Example
//!
//! ```no_run
//! use sweep_dl::classify::Classification;
//! use sweep_dl::config::RetryConfig;
//! use sweep_dl::retry::fetch_with_retry;
//!
//! # async fn example() {
//! let config = RetryConfig::default();
//! let outcome = fetch_with_retry(&config, 42, |_attempt| async {
//!     Classification::PermanentAbsence
//! })
//! .await;
//! assert!(!outcome.is_success());
//! # }
//! ```

use crate::classify::Classification;
use crate::config::RetryConfig;
use crate::types::{FailureReason, FetchOutcome};
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Per-ID retry bookkeeping; never shared between workers
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryState {
    /// Attempts made so far (1-based once the first request is sent)
    pub attempt: u32,
    /// Backoff to use when the next 429 carries no `Retry-After`
    pub delay: Duration,
}

impl RetryState {
    /// Fresh state before the first attempt
    pub fn new(initial_delay: Duration) -> Self {
        Self {
            attempt: 0,
            delay: initial_delay,
        }
    }

    /// Double the backoff, capped at `max_delay`
    fn escalate(&mut self, max_delay: Duration) {
        self.delay = self.delay.saturating_mul(2).min(max_delay);
    }
}

/// Fetch one ID, retrying only while the server answers 429
///
/// `attempt_fn` performs a single request and receives the 1-based attempt
/// number. Exactly one [`FetchOutcome`] is returned:
/// - `Success`/`Absent` as soon as an attempt yields one
/// - `Failed` immediately on a transport fault or unexpected status
/// - `Failed` with [`FailureReason::RateLimitExhausted`] if the last allowed
///   attempt is still rate limited (no sleep after it)
///
/// Between rate-limited attempts the worker sleeps for the `Retry-After` hint
/// or the current backoff, and the backoff doubles either way.
pub async fn fetch_with_retry<F, Fut>(config: &RetryConfig, id: u64, mut attempt_fn: F) -> FetchOutcome
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Classification>,
{
    let max_attempts = config.max_retries.max(1);
    let mut state = RetryState::new(config.initial_backoff_delay);

    loop {
        state.attempt += 1;
        tracing::debug!(id, attempt = state.attempt, "Fetching record");

        let classification = attempt_fn(state.attempt).await;
        match classification {
            Classification::Success(payload) => {
                if state.attempt > 1 {
                    tracing::info!(id, attempts = state.attempt, "Fetch succeeded after retry");
                }
                return FetchOutcome::Success { id, payload };
            }
            Classification::PermanentAbsence => {
                tracing::debug!(id, "Record not found");
                return FetchOutcome::Absent { id };
            }
            Classification::UnexpectedStatus(status) => {
                tracing::warn!(id, status, attempt = state.attempt, "Unexpected status");
                return FetchOutcome::Failed {
                    id,
                    reason: FailureReason::UnexpectedStatus { status },
                };
            }
            Classification::TransientError(message) => {
                tracing::warn!(id, error = %message, attempt = state.attempt, "Request failed");
                return FetchOutcome::Failed {
                    id,
                    reason: FailureReason::Transport { message },
                };
            }
            Classification::RateLimited { retry_after } => {
                if state.attempt >= max_attempts {
                    tracing::warn!(
                        id,
                        attempts = state.attempt,
                        "Still rate limited after all attempts"
                    );
                    return FetchOutcome::Failed {
                        id,
                        reason: FailureReason::RateLimitExhausted {
                            attempts: state.attempt,
                        },
                    };
                }

                let wait = match retry_after {
                    Some(hint) => hint,
                    None if config.jitter => add_jitter(state.delay),
                    None => state.delay,
                };
                tracing::warn!(
                    id,
                    attempt = state.attempt,
                    max_attempts,
                    wait_ms = wait.as_millis() as u64,
                    server_hint = retry_after.is_some(),
                    "Rate limited, waiting before retry"
                );

                tokio::time::sleep(wait).await;
                state.escalate(config.max_backoff_delay);
            }
        }
    }
}

/// Add random jitter to a delay to prevent thundering herd
///
/// Jitter is uniformly distributed between 0% and 100% of the delay, so the
/// result lies between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor))
}
