//! Core types and events for sweep-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// Why a fetch ended in [`FetchOutcome::Failed`]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    /// Server answered with a status other than 200/404/429
    UnexpectedStatus {
        /// HTTP status code
        status: u16,
    },
    /// Timeout, connection failure, or unreadable/undecodable response body
    Transport {
        /// Description of the fault
        message: String,
    },
    /// Every attempt was answered with 429
    RateLimitExhausted {
        /// Number of attempts made
        attempts: u32,
    },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::UnexpectedStatus { status } => write!(f, "unexpected status {status}"),
            FailureReason::Transport { message } => write!(f, "transport error: {message}"),
            FailureReason::RateLimitExhausted { attempts } => {
                write!(f, "still rate limited after {attempts} attempts")
            }
        }
    }
}

/// Final result of fetching a single ID
#[derive(Clone, Debug, PartialEq)]
pub enum FetchOutcome {
    /// The record exists and its body decoded as JSON
    Success {
        /// Record ID
        id: u64,
        /// Decoded response body
        payload: serde_json::Value,
    },
    /// The server reported the record as not existing (404)
    Absent {
        /// Record ID
        id: u64,
    },
    /// The record could not be fetched
    Failed {
        /// Record ID
        id: u64,
        /// What went wrong
        reason: FailureReason,
    },
}

impl FetchOutcome {
    /// ID this outcome belongs to
    pub fn id(&self) -> u64 {
        match self {
            FetchOutcome::Success { id, .. }
            | FetchOutcome::Absent { id }
            | FetchOutcome::Failed { id, .. } => *id,
        }
    }

    /// Whether this outcome carries a record
    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success { .. })
    }

    /// Build the emitted record for a successful outcome
    pub fn to_record(&self) -> Option<Record> {
        match self {
            FetchOutcome::Success { id, payload } => Some(Record {
                id: *id,
                data: payload.clone(),
            }),
            _ => None,
        }
    }
}

/// Outcomes of one batch, index-aligned with the batch's ID range
#[derive(Clone, Debug, PartialEq)]
pub struct BatchResult {
    ids: Range<u64>,
    outcomes: Vec<FetchOutcome>,
}

impl BatchResult {
    pub(crate) fn new(ids: Range<u64>, outcomes: Vec<FetchOutcome>) -> Self {
        debug_assert_eq!(
            (ids.end - ids.start) as usize,
            outcomes.len(),
            "batch result must hold one outcome per requested ID"
        );
        Self { ids, outcomes }
    }

    /// ID range this batch covered
    pub fn ids(&self) -> Range<u64> {
        self.ids.clone()
    }

    /// Outcomes in ID order
    pub fn outcomes(&self) -> &[FetchOutcome] {
        &self.outcomes
    }

    /// Number of outcomes (always equals the number of requested IDs)
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Whether the batch was empty
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Per-kind counts
    pub fn tally(&self) -> BatchTally {
        let mut tally = BatchTally::default();
        for outcome in &self.outcomes {
            match outcome {
                FetchOutcome::Success { .. } => tally.collected += 1,
                FetchOutcome::Absent { .. } => tally.absent += 1,
                FetchOutcome::Failed { .. } => tally.failed += 1,
            }
        }
        tally
    }
}

/// Outcome counts for one batch
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchTally {
    /// Successful fetches
    pub collected: u64,
    /// 404 responses
    pub absent: u64,
    /// Failed fetches
    pub failed: u64,
}

/// One collected record as handed to the sink
///
/// Serializes to a single JSON object: `{"id": 4463796, "data": {...}}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Record ID
    pub id: u64,
    /// Opaque response payload
    pub data: serde_json::Value,
}

/// Why a sweep ended
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Consecutive empty batches reached the configured limit
    FailureLimitReached,
    /// The cancellation token fired (observed between batches)
    Cancelled,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::FailureLimitReached => write!(f, "consecutive failure limit reached"),
            StopReason::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Final report of a completed sweep
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SweepSummary {
    /// Records fetched successfully
    pub total_collected: u64,
    /// Batches dispatched and awaited
    pub batches_completed: u64,
    /// First ID that was not dispatched
    pub next_id: u64,
    /// Counter value at the moment the sweep stopped
    pub consecutive_failures: u64,
    /// Records the sink failed to persist (only non-zero under the `continue` policy)
    pub sink_failures: u64,
    /// Why the sweep stopped
    pub stop_reason: StopReason,
    /// When the sweep started
    pub started_at: DateTime<Utc>,
    /// When the sweep stopped
    pub finished_at: DateTime<Utc>,
}

/// Sweep progress events, delivered through [`Sweeper::subscribe`](crate::Sweeper::subscribe)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A batch was dispatched
    BatchStarted {
        /// First ID in the batch
        first_id: u64,
        /// Last ID in the batch (inclusive)
        last_id: u64,
    },

    /// A record was fetched and handed to the sink
    RecordCollected {
        /// Record ID
        id: u64,
    },

    /// A batch finished and the sweep state was updated
    BatchCompleted {
        /// First ID in the batch
        first_id: u64,
        /// Last ID in the batch (inclusive)
        last_id: u64,
        /// Outcome counts
        tally: BatchTally,
        /// Counter value after this batch
        consecutive_failures: u64,
        /// Running total of collected records
        total_collected: u64,
    },

    /// The sweep stopped
    SweepStopped {
        /// Why it stopped
        reason: StopReason,
        /// Records collected over the whole sweep
        total_collected: u64,
    },
}
