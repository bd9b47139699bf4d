//! Coordinator role
//!
//! The coordinator:
//! - Claims the singleton role for a namespace
//! - Initializes the completion counter (winner only)
//! - Waits for the counter to reach zero or a deadline
//! - Snapshots and aggregates the published records

use super::{elect_singleton, CompletionStatus, RunNamespace};
use crate::stats::{aggregate_records, Aggregate, ResultRecord};
use crate::store::{SharedStore, StoreError, StoreResult};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Everything the coordinator learned about one run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub namespace: RunNamespace,
    pub status: CompletionStatus,
    pub expected_count: u64,
    /// Clients that had not reported when the wait ended
    pub remaining: u64,
    /// Time spent waiting for clients
    pub elapsed: Duration,
    pub aggregate: Aggregate,
}

impl RunSummary {
    /// Clients that reported before the wait ended
    pub fn reported(&self) -> u64 {
        self.expected_count.saturating_sub(self.remaining)
    }
}

/// Elected coordinator of one run
pub struct Coordinator {
    store: Arc<dyn SharedStore>,
    namespace: RunNamespace,

    /// Number of clients the counter was initialized for
    expected_count: u64,
}

impl Coordinator {
    /// Try to become the coordinator of `namespace`
    ///
    /// Returns `None` to every caller that lost the election; those callers
    /// have no coordinator duties. The winner initializes the completion
    /// counter to `expected_count` unless some participant already did.
    pub fn setup(
        store: Arc<dyn SharedStore>,
        namespace: RunNamespace,
        expected_count: u64,
    ) -> StoreResult<Option<Self>> {
        if !elect_singleton(store.as_ref(), &namespace)? {
            debug!(namespace = %namespace, "Coordinator role already claimed");
            return Ok(None);
        }

        if !store.try_init_counter(namespace.counter(), expected_count)? {
            debug!(
                namespace = %namespace,
                "Completion counter already initialized, keeping existing value"
            );
        }

        info!(namespace = %namespace, expected_count, "Elected coordinator");
        Ok(Some(Self {
            store,
            namespace,
            expected_count,
        }))
    }

    pub fn namespace(&self) -> &RunNamespace {
        &self.namespace
    }

    pub fn expected_count(&self) -> u64 {
        self.expected_count
    }

    /// Clients that have not reported yet
    pub fn remaining(&self) -> StoreResult<u64> {
        self.store.count(self.namespace.counter())
    }

    /// Block until every client reported or `max_wait` elapsed
    ///
    /// Each poll suspends for at most `poll_interval`. Interrupted polls are
    /// retried. With `max_wait` unset the wait is unbounded.
    pub fn await_completion(
        &self,
        poll_interval: Duration,
        max_wait: Option<Duration>,
    ) -> StoreResult<CompletionStatus> {
        let status = await_counter(self.store.as_ref(), self.namespace.counter(), poll_interval, max_wait)?;
        if status == CompletionStatus::Completed {
            info!(
                "Got response from {} clients, stopping now!",
                self.expected_count
            );
        }
        Ok(status)
    }

    /// Aggregate every record published so far
    ///
    /// Records appended after the snapshot is taken are not included.
    pub fn aggregate(&self) -> StoreResult<Aggregate> {
        let records = self
            .store
            .snapshot(&self.namespace.results())?
            .iter()
            .map(|bytes| ResultRecord::decode(bytes))
            .collect::<StoreResult<Vec<_>>>()?;

        debug!(namespace = %self.namespace, records = records.len(), "Aggregating results");
        Ok(aggregate_records(&records))
    }

    /// Wait for the clients, then aggregate whatever they published
    ///
    /// A timed-out run is still aggregated; the summary's status tells the
    /// caller whether the results are partial.
    pub fn run(
        &self,
        poll_interval: Duration,
        max_wait: Option<Duration>,
    ) -> StoreResult<RunSummary> {
        let start = Instant::now();
        let status = self.await_completion(poll_interval, max_wait)?;
        let elapsed = start.elapsed();

        Ok(RunSummary {
            namespace: self.namespace.clone(),
            status,
            expected_count: self.expected_count,
            remaining: self.remaining()?,
            elapsed,
            aggregate: self.aggregate()?,
        })
    }
}

/// Poll counter `name` until it reads zero or `max_wait` elapses
pub fn await_counter(
    store: &dyn SharedStore,
    name: &str,
    poll_interval: Duration,
    max_wait: Option<Duration>,
) -> StoreResult<CompletionStatus> {
    let deadline = max_wait.map(|wait| Instant::now() + wait);

    loop {
        let slice = match deadline {
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    return Ok(CompletionStatus::TimedOut);
                }
                poll_interval.min(deadline - now)
            }
            None => poll_interval,
        };

        match store.await_zero(name, slice) {
            Ok(_) => {}
            Err(StoreError::Interrupted) => debug!(counter = name, "Wait interrupted, resuming"),
            Err(e) => return Err(e),
        }

        let remaining = store.count(name)?;
        if remaining == 0 {
            return Ok(CompletionStatus::Completed);
        }
        info!("Waiting for {} clients...", remaining);
    }
}
