//! Result records published by external clients
//!
//! Every client publishes its measurements as [`ResultRecord`]s: a metric name
//! and an ordered list of numeric samples. Two metrics are understood by the
//! aggregator:
//!
//! - **throughput**: `[operation_count, duration_nanos]`
//! - **latency**: one latency sample per value, in nanoseconds
//!
//! Records with any other metric name are stored and carried along but not
//! aggregated.
//!
//! # Example
//!
//! ```
//! use benchlatch::stats::ResultRecord;
//! use std::time::Duration;
//!
//! let record = ResultRecord::throughput(1000, Duration::from_secs(2));
//! assert_eq!(record.operation_count(), Some(1000));
//! assert_eq!(record.duration(), Some(Duration::from_secs(2)));
//! ```

pub mod aggregator;
pub mod histogram;

pub use aggregator::{aggregate_records, Aggregate, AggregateReport, LatencySummary};

use crate::store::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Metric name of throughput records
pub const METRIC_THROUGHPUT: &str = "throughput";

/// Metric name of latency records
pub const METRIC_LATENCY: &str = "latency";

/// One client's published measurement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub metric: String,
    pub values: Vec<u64>,
}

impl ResultRecord {
    /// Create a record for an arbitrary metric
    pub fn new(metric: impl Into<String>, values: Vec<u64>) -> Self {
        Self {
            metric: metric.into(),
            values,
        }
    }

    /// Throughput record: `operations` completed in `duration`
    pub fn throughput(operations: u64, duration: Duration) -> Self {
        Self::new(METRIC_THROUGHPUT, vec![operations, duration.as_nanos() as u64])
    }

    /// Latency record holding one sample per operation
    pub fn latency(samples: &[Duration]) -> Self {
        Self::new(
            METRIC_LATENCY,
            samples.iter().map(|d| d.as_nanos() as u64).collect(),
        )
    }

    pub fn is_throughput(&self) -> bool {
        self.metric == METRIC_THROUGHPUT
    }

    pub fn is_latency(&self) -> bool {
        self.metric == METRIC_LATENCY
    }

    /// Operation count of a throughput record
    pub fn operation_count(&self) -> Option<u64> {
        if !self.is_throughput() {
            return None;
        }
        self.values.first().copied()
    }

    /// Duration of a throughput record
    pub fn duration(&self) -> Option<Duration> {
        if !self.is_throughput() {
            return None;
        }
        self.values.get(1).map(|nanos| Duration::from_nanos(*nanos))
    }

    /// Encode for storage in a shared sequence
    pub fn encode(&self) -> StoreResult<Vec<u8>> {
        rmp_serde::to_vec(self).map_err(|e| StoreError::Codec(e.to_string()))
    }

    /// Decode a record read back from a shared sequence
    pub fn decode(bytes: &[u8]) -> StoreResult<Self> {
        rmp_serde::from_slice(bytes).map_err(|e| StoreError::Codec(e.to_string()))
    }
}

impl fmt::Display for ResultRecord {
    /// Throughput records print in the `<ops>|<nanos>` form accepted by `FromStr`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.operation_count(), self.duration()) {
            (Some(ops), Some(duration)) => write!(f, "{}|{}", ops, duration.as_nanos()),
            _ => write!(f, "{}{:?}", self.metric, self.values),
        }
    }
}

impl FromStr for ResultRecord {
    type Err = anyhow::Error;

    /// Parse the textual throughput form `<operation_count>|<duration_nanos>`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (ops, nanos) = s
            .trim()
            .split_once('|')
            .ok_or_else(|| anyhow::anyhow!("Invalid throughput record (expected ops|nanos): {}", s))?;

        let ops: u64 = ops
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid operation count in throughput record: {}", s))?;
        let nanos: u64 = nanos
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid duration in throughput record: {}", s))?;

        Ok(Self::throughput(ops, Duration::from_nanos(nanos)))
    }
}
