//! # sweep-dl
//!
//! Concurrent ID-space sweeper for HTTP record endpoints.
//!
//! Starting at a configured ID, sweep-dl requests `{base_url}/{id}/brief-info`
//! for consecutive IDs in fixed-size batches, keeps every record that exists,
//! and stops once enough consecutive IDs come back empty.
//!
//! ## Design Philosophy
//!
//! - **Bounded** - Never more than `max_concurrent` requests in flight
//! - **Polite** - 429 responses are retried after `Retry-After` or an exponential backoff
//! - **Never crashes on one ID** - Every ID resolves to a success, an absence, or a failure
//! - **Library-first** - Records go to a pluggable [`RecordSink`]; progress is an event stream
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use sweep_dl::{Config, JsonlFileSink, Sweeper};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let sink = Arc::new(JsonlFileSink::from_config(&config.sink).await?);
//!     let sweeper = Sweeper::new(config, sink)?;
//!
//!     // Subscribe to events
//!     let mut events = sweeper.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let summary = sweeper.run().await?;
//!     println!("Collected {} records", summary.total_collected);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Response classification
pub mod classify;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Record sources and the fetch worker
pub mod fetcher;
/// Rate-limit retry with exponential backoff
pub mod retry;
/// Record sinks
pub mod sink;
/// Sweep controller and batch orchestration
pub mod sweep;
/// Core types and events
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use classify::Classification;
pub use config::{Config, HttpConfig, RetryConfig, SinkConfig, SinkFailurePolicy, SweepConfig};
pub use error::{Error, Result, SinkError};
pub use fetcher::{FetchWorker, HttpRecordSource, RecordSource};
pub use sink::{ChannelSink, JsonlFileSink, RecordSink};
pub use sweep::{SweepState, Sweeper};
pub use types::{
    BatchResult, BatchTally, Event, FailureReason, FetchOutcome, Record, StopReason, SweepSummary,
};

/// Run a sweep, stopping cleanly on a termination signal.
///
/// A signal cancels the sweeper's token; the batch in flight is allowed to
/// finish and its records reach the sink before [`Sweeper::run`] returns.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use sweep_dl::{Config, JsonlFileSink, Sweeper, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = Config::default();
///     let sink = Arc::new(JsonlFileSink::from_config(&config.sink).await?);
///     let sweeper = Sweeper::new(config, sink)?;
///
///     let summary = run_with_shutdown(&sweeper).await?;
///     println!("Stopped: {}", summary.stop_reason);
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(sweeper: &Sweeper) -> Result<SweepSummary> {
    let token = sweeper.cancellation_token();
    let signal_task = tokio::spawn(async move {
        wait_for_signal().await;
        tracing::info!("Finishing the current batch before stopping");
        token.cancel();
    });

    let result = sweeper.run().await;
    signal_task.abort();
    result
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Signal registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
