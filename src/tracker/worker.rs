//! Worker role
//!
//! A worker publishes its result records, then counts down the completion
//! counter exactly once. Calling `report_completion` twice from the same
//! worker is a caller error; nothing here deduplicates it.

use super::RunNamespace;
use crate::stats::ResultRecord;
use crate::store::{SharedStore, StoreError, StoreResult};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

/// One external client of a run
pub struct Worker {
    store: Arc<dyn SharedStore>,
    namespace: RunNamespace,
}

impl Worker {
    pub fn new(store: Arc<dyn SharedStore>, namespace: RunNamespace) -> Self {
        Self { store, namespace }
    }

    pub fn namespace(&self) -> &RunNamespace {
        &self.namespace
    }

    /// Wait until the coordinator has initialized the completion counter
    ///
    /// Returns `false` if `max_wait` elapsed first. A worker that reports
    /// before the counter exists gets `StoreError::UnknownCounter`.
    pub fn await_run_open(
        &self,
        poll_interval: Duration,
        max_wait: Option<Duration>,
    ) -> StoreResult<bool> {
        let deadline = max_wait.map(|wait| Instant::now() + wait);

        loop {
            match self.store.count(self.namespace.counter()) {
                Ok(_) => return Ok(true),
                Err(StoreError::UnknownCounter(_)) => {}
                Err(e) => return Err(e),
            }

            let sleep_for = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(false);
                    }
                    poll_interval.min(deadline - now)
                }
                None => poll_interval,
            };
            debug!(namespace = %self.namespace, "Run not open yet, waiting");
            thread::sleep(sleep_for);
        }
    }

    /// Append one record to the run's result sequence
    pub fn publish_result(&self, record: &ResultRecord) -> StoreResult<()> {
        self.store.append(&self.namespace.results(), record.encode()?)
    }

    /// Count down the completion counter, returning how many clients remain
    pub fn report_completion(&self) -> StoreResult<u64> {
        let remaining = self.store.count_down(self.namespace.counter())?;
        debug!(namespace = %self.namespace, remaining, "Reported completion");
        Ok(remaining)
    }
}
