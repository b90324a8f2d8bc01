//! Batch orchestration: one fetch worker per ID, awaited as a unit.

use futures::future::join_all;
use std::ops::Range;

use crate::fetcher::FetchWorker;
use crate::types::BatchResult;

/// Fetch every ID in `ids` concurrently and wait for all of them.
///
/// Every ID gets its own worker up front. The request ceiling is enforced by
/// the worker's [`RecordSource`](crate::fetcher::RecordSource), which only
/// holds a connection slot while a request is running, so a worker sleeping
/// through a 429 backoff never keeps queued IDs from starting. Outcomes come
/// back in ID order regardless of completion order, and the call only returns
/// once every ID has an outcome.
pub async fn run_batch(worker: &FetchWorker, ids: Range<u64>) -> BatchResult {
    let outcomes = join_all(ids.clone().map(|id| worker.fetch(id))).await;
    BatchResult::new(ids, outcomes)
}
