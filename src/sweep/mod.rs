//! Sweep controller: drives batches over the ID space until the stop heuristic fires.
//!
//! The controller owns the [`SweepState`] exclusively. Each iteration:
//! 1. Check the stop condition and the cancellation token
//! 2. Dispatch the next contiguous batch and wait for every ID
//! 3. Hand successful records to the sink in ID order
//! 4. Fold the batch into the state (reset or grow the failure counter, advance the cursor)

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::config::{Config, SinkFailurePolicy};
use crate::error::{Error, Result};
use crate::fetcher::{FetchWorker, HttpRecordSource, RecordSource};
use crate::sink::RecordSink;
use crate::types::{BatchResult, Event, StopReason, SweepSummary};

mod batch;
mod state;


pub use batch::run_batch;
pub use state::SweepState;

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Sweeps a contiguous ID range against a record endpoint
///
/// Cloning is cheap; clones share the source, sink, event channel and
/// cancellation token.
#[derive(Clone)]
pub struct Sweeper {
    config: Arc<Config>,
    worker: FetchWorker,
    sink: Arc<dyn RecordSink>,
    event_tx: broadcast::Sender<Event>,
    cancel_token: CancellationToken,
}

impl Sweeper {
    /// Create a sweeper that fetches over HTTP
    ///
    /// # Errors
    /// Returns error if the configuration is invalid or the HTTP client cannot be built
    pub fn new(config: Config, sink: Arc<dyn RecordSink>) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let source = Arc::new(HttpRecordSource::new(Arc::clone(&config))?);
        Ok(Self::assemble(config, source, sink))
    }

    /// Create a sweeper over a custom [`RecordSource`]
    ///
    /// # Errors
    /// Returns error if the configuration is invalid
    pub fn with_source(
        config: Config,
        source: Arc<dyn RecordSource>,
        sink: Arc<dyn RecordSink>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self::assemble(Arc::new(config), source, sink))
    }

    fn assemble(
        config: Arc<Config>,
        source: Arc<dyn RecordSource>,
        sink: Arc<dyn RecordSink>,
    ) -> Self {
        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let worker = FetchWorker::new(source, config.retry.clone());
        Self {
            config,
            worker,
            sink,
            event_tx,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Subscribe to progress events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Token that stops the sweep at the next batch boundary when cancelled
    ///
    /// The token is shared by every clone and every run; see [`Sweeper::cancel`].
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Request a stop; the batch in flight still completes
    ///
    /// Cancellation is permanent. Every later [`run`](Sweeper::run) on this
    /// sweeper or any of its clones returns [`StopReason::Cancelled`] before
    /// dispatching a batch. Build a new `Sweeper` to sweep again.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    /// Run the sweep to completion
    ///
    /// Ends with `Ok` when the consecutive-failure limit is reached or the
    /// sweep is cancelled. Per-ID failures never end the sweep; the only error
    /// is a sink failure under [`SinkFailurePolicy::Abort`]. A sweeper that was
    /// cancelled once stays cancelled, so a later run returns immediately.
    pub async fn run(&self) -> Result<SweepSummary> {
        let started_at = Utc::now();
        let batch_size = self.config.sweep.effective_batch_size();
        let limit = self.config.sweep.consecutive_fail_limit;
        let mut state = SweepState::new(self.config.sweep.start_id);
        let mut sink_failures = 0u64;

        tracing::info!(
            start_id = state.next_id(),
            batch_size,
            max_concurrent = self.config.sweep.max_concurrent,
            consecutive_fail_limit = limit,
            "Starting sweep"
        );

        let stop_reason = loop {
            if state.should_stop(limit) {
                break StopReason::FailureLimitReached;
            }
            if self.cancel_token.is_cancelled() {
                break StopReason::Cancelled;
            }

            let ids = state.next_batch(batch_size);
            if ids.is_empty() {
                // Cursor saturated at u64::MAX
                break StopReason::FailureLimitReached;
            }
            let (first_id, last_id) = (ids.start, ids.end - 1);
            self.event_tx
                .send(Event::BatchStarted { first_id, last_id })
                .ok();

            let batch = run_batch(&self.worker, ids).await;
            sink_failures += self.deliver(&batch).await?;
            let tally = state.record_batch(&batch);

            if tally.collected == 0 {
                tracing::info!(
                    first_id,
                    last_id,
                    absent = tally.absent,
                    failed = tally.failed,
                    consecutive_failures = state.consecutive_failures(),
                    consecutive_fail_limit = limit,
                    "Batch empty"
                );
            } else {
                tracing::info!(
                    first_id,
                    last_id,
                    collected = tally.collected,
                    absent = tally.absent,
                    failed = tally.failed,
                    total_collected = state.total_collected(),
                    "Batch complete"
                );
            }

            self.event_tx
                .send(Event::BatchCompleted {
                    first_id,
                    last_id,
                    tally,
                    consecutive_failures: state.consecutive_failures(),
                    total_collected: state.total_collected(),
                })
                .ok();
        };

        tracing::info!(
            reason = %stop_reason,
            total_collected = state.total_collected(),
            batches = state.batches_completed(),
            next_id = state.next_id(),
            sink_failures,
            "Sweep finished"
        );
        self.event_tx
            .send(Event::SweepStopped {
                reason: stop_reason,
                total_collected: state.total_collected(),
            })
            .ok();

        Ok(SweepSummary {
            total_collected: state.total_collected(),
            batches_completed: state.batches_completed(),
            next_id: state.next_id(),
            consecutive_failures: state.consecutive_failures(),
            sink_failures,
            stop_reason,
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Hand every successful record in `batch` to the sink, in ID order.
    ///
    /// Returns the number of records the sink rejected.
    async fn deliver(&self, batch: &BatchResult) -> Result<u64> {
        let mut rejected = 0;
        for record in batch.outcomes().iter().filter_map(|o| o.to_record()) {
            let id = record.id;
            match self.sink.append(&record).await {
                Ok(()) => {
                    tracing::info!(id, "Record collected");
                    self.event_tx.send(Event::RecordCollected { id }).ok();
                }
                Err(e) => match self.config.sink.on_failure {
                    SinkFailurePolicy::Continue => {
                        tracing::warn!(id, error = %e, "Failed to persist record, continuing");
                        rejected += 1;
                    }
                    SinkFailurePolicy::Abort => {
                        tracing::error!(id, error = %e, "Failed to persist record, aborting sweep");
                        return Err(Error::Sink(e));
                    }
                },
            }
        }
        Ok(rejected)
    }
}
