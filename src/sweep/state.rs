//! Sweep state: cursor, consecutive-failure counter, running totals.

use crate::types::{BatchResult, BatchTally};
use std::ops::Range;

/// Mutable state of one sweep pass
///
/// Owned by the controller and only touched between batches, so it needs no
/// synchronization. Nothing here outlives the process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SweepState {
    next_id: u64,
    consecutive_failures: u64,
    total_collected: u64,
    batches_completed: u64,
}

impl SweepState {
    /// Initial state for a sweep starting at `start_id`
    pub fn new(start_id: u64) -> Self {
        Self {
            next_id: start_id,
            consecutive_failures: 0,
            total_collected: 0,
            batches_completed: 0,
        }
    }

    /// First ID not yet dispatched
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// IDs in fully empty batches since the last success
    pub fn consecutive_failures(&self) -> u64 {
        self.consecutive_failures
    }

    /// Records collected so far
    pub fn total_collected(&self) -> u64 {
        self.total_collected
    }

    /// Batches folded into this state
    pub fn batches_completed(&self) -> u64 {
        self.batches_completed
    }

    /// The next `size` consecutive IDs
    pub fn next_batch(&self, size: usize) -> Range<u64> {
        self.next_id..self.next_id.saturating_add(size as u64)
    }

    /// Fold a finished batch into the state
    ///
    /// Any success resets the failure counter; otherwise it grows by the batch
    /// length. The cursor always moves past the whole batch.
    pub fn record_batch(&mut self, batch: &BatchResult) -> BatchTally {
        let tally = batch.tally();
        let len = batch.len() as u64;

        self.total_collected += tally.collected;
        if tally.collected > 0 {
            self.consecutive_failures = 0;
        } else {
            self.consecutive_failures += len;
        }
        self.next_id = self.next_id.saturating_add(len);
        self.batches_completed += 1;
        tally
    }

    /// Whether the stop heuristic has fired
    pub fn should_stop(&self, consecutive_fail_limit: u64) -> bool {
        self.consecutive_failures >= consecutive_fail_limit
    }
}
