//! Local simulation
//!
//! Runs a whole benchmark round inside one process: an in-memory store, an
//! elected coordinator on the calling thread, and one scoped thread per
//! simulated client. Each client sleeps a random delay, publishes a
//! throughput record and a latency record, then counts down.
//!
//! Useful for trying out a configuration without starting a store service
//! and external clients.

use crate::config::RunConfig;
use crate::stats::ResultRecord;
use crate::store::{InMemoryStore, SharedStore};
use crate::tracker::{Coordinator, RunSummary, Worker};
use anyhow::{Context, Result};
use rand::Rng;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

/// Simulated client behaviour
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Upper bound of each client's random delay before reporting
    pub max_delay: Duration,
    /// Latency samples each client publishes
    pub latency_samples: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_delay: Duration::from_millis(500),
            latency_samples: 100,
        }
    }
}

/// Run one simulated round and return the coordinator's summary
pub fn run_simulation(run: &RunConfig, sim: &SimulationConfig) -> Result<RunSummary> {
    let store: Arc<dyn SharedStore> = Arc::new(InMemoryStore::new());
    let namespace = run.namespace();

    let coordinator = Coordinator::setup(Arc::clone(&store), namespace.clone(), run.expected_count)?
        .context("In-process store refused the coordinator role")?;

    crossbeam::scope(|scope| -> Result<RunSummary> {
        let handles: Vec<_> = (0..run.expected_count)
            .map(|client_id| {
                let worker = Worker::new(Arc::clone(&store), namespace.clone());
                scope.spawn(move |_| simulate_client(client_id, &worker, sim))
            })
            .collect();

        let summary = coordinator.run(run.poll_interval(), run.max_wait())?;

        for handle in handles {
            handle
                .join()
                .map_err(|_| anyhow::anyhow!("Simulated client panicked"))??;
        }

        Ok(summary)
    })
    .map_err(|_| anyhow::anyhow!("Simulation thread scope panicked"))?
}

/// One simulated client: wait, publish, count down
fn simulate_client(client_id: u64, worker: &Worker, sim: &SimulationConfig) -> Result<()> {
    let mut rng = rand::thread_rng();
    let start = Instant::now();

    let max_delay_ms = sim.max_delay.as_millis() as u64;
    let delay = Duration::from_millis(rng.gen_range(0..=max_delay_ms));
    let latencies: Vec<Duration> = (0..sim.latency_samples)
        .map(|_| Duration::from_micros(rng.gen_range(50..5_000)))
        .collect();
    let operations = rng.gen_range(1_000..100_000);

    thread::sleep(delay);
    let elapsed = start.elapsed();

    worker.publish_result(&ResultRecord::throughput(operations, elapsed))?;
    if !latencies.is_empty() {
        worker.publish_result(&ResultRecord::latency(&latencies))?;
    }
    let remaining = worker.report_completion()?;

    debug!(client_id, operations, elapsed_ms = elapsed.as_millis() as u64, remaining, "Simulated client done");
    Ok(())
}
