//! Result aggregation
//!
//! Folds the records published by every client into one [`Aggregate`].
//!
//! - **Throughput**: operation counts are summed; durations are truncated to
//!   whole milliseconds per record, summed, and averaged per record (a plain
//!   arithmetic mean, not weighted by operation count)
//! - **Latency**: every sample from every latency record lands in a single
//!   HdrHistogram
//!
//! A run with no throughput records has nothing to divide by and yields
//! [`Aggregate::Empty`] rather than a NaN average. Latency samples published
//! without any throughput record are still summarized on `Empty`.
//!
//! # Example
//!
//! ```
//! use benchlatch::stats::{aggregate_records, Aggregate, ResultRecord};
//! use std::time::Duration;
//!
//! let records = vec![
//!     ResultRecord::throughput(100, Duration::from_millis(1000)),
//!     ResultRecord::throughput(200, Duration::from_millis(2000)),
//! ];
//!
//! match aggregate_records(&records) {
//!     Aggregate::Report(report) => {
//!         assert_eq!(report.total_samples, 300);
//!         assert_eq!(report.average_duration_millis, 1500.0);
//!     }
//!     Aggregate::Empty { .. } => unreachable!(),
//! }
//! ```

use super::histogram::LatencyHistogram;
use super::ResultRecord;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Outcome of aggregating a run's records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Aggregate {
    /// No throughput record was published
    Empty { latency: Option<LatencySummary> },
    Report(AggregateReport),
}

impl Aggregate {
    pub fn is_empty(&self) -> bool {
        matches!(self, Aggregate::Empty { .. })
    }

    pub fn report(&self) -> Option<&AggregateReport> {
        match self {
            Aggregate::Report(report) => Some(report),
            Aggregate::Empty { .. } => None,
        }
    }

    /// Latency distribution, whether or not throughput was published
    pub fn latency(&self) -> Option<&LatencySummary> {
        match self {
            Aggregate::Report(report) => report.latency.as_ref(),
            Aggregate::Empty { latency } => latency.as_ref(),
        }
    }
}

/// Aggregate view over all clients of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    /// Throughput records that contributed
    pub records: usize,

    /// Sum of operation counts
    pub total_samples: u64,

    /// Sum of per-record durations in whole milliseconds
    pub total_duration_millis: u64,

    /// `total_duration_millis / records`
    pub average_duration_millis: f64,

    /// Present when at least one latency sample was published
    pub latency: Option<LatencySummary>,

    /// Records that were neither usable throughput nor latency
    pub ignored_records: usize,
}

impl AggregateReport {
    /// Operations per second over the average client duration
    pub fn operations_per_second(&self) -> f64 {
        if self.average_duration_millis <= 0.0 {
            return 0.0;
        }
        self.total_samples as f64 / (self.average_duration_millis / 1000.0)
    }
}

/// Latency distribution across all clients, in nanoseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatencySummary {
    pub count: u64,
    pub min_nanos: u64,
    pub max_nanos: u64,
    pub mean_nanos: u64,
    pub p50_nanos: u64,
    pub p90_nanos: u64,
    pub p99_nanos: u64,
    pub p99_9_nanos: u64,
}

impl LatencySummary {
    /// Summarize a histogram, or None if it has no samples
    pub fn from_histogram(hist: &LatencyHistogram) -> Option<Self> {
        let nanos = |d: Option<std::time::Duration>| d.map(|d| d.as_nanos() as u64);

        Some(Self {
            count: hist.len(),
            min_nanos: nanos(hist.min())?,
            max_nanos: nanos(hist.max())?,
            mean_nanos: nanos(hist.mean())?,
            p50_nanos: nanos(hist.percentile(50.0))?,
            p90_nanos: nanos(hist.percentile(90.0))?,
            p99_nanos: nanos(hist.percentile(99.0))?,
            p99_9_nanos: nanos(hist.percentile(99.9))?,
        })
    }
}

/// Incremental fold over result records
#[derive(Debug, Default)]
pub struct RecordAggregator {
    records: usize,
    total_samples: u64,
    total_duration_millis: u64,
    latency: LatencyHistogram,
    ignored_records: usize,
}

impl RecordAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one record in
    pub fn add(&mut self, record: &ResultRecord) {
        if record.is_latency() {
            for nanos in &record.values {
                self.latency.record_nanos(*nanos);
            }
            return;
        }

        match (record.operation_count(), record.duration()) {
            (Some(operations), Some(duration)) => {
                let millis = duration.as_millis() as u64;
                info!(
                    "External client executed {} operations in {} ms",
                    operations, millis
                );

                self.records += 1;
                self.total_samples = self.total_samples.saturating_add(operations);
                self.total_duration_millis = self.total_duration_millis.saturating_add(millis);
            }
            _ => {
                warn!(metric = %record.metric, values = record.values.len(), "Ignoring result record");
                self.ignored_records += 1;
            }
        }
    }

    /// Produce the aggregate of everything added so far
    pub fn finish(&self) -> Aggregate {
        let latency = LatencySummary::from_histogram(&self.latency);
        if self.records == 0 {
            return Aggregate::Empty { latency };
        }

        let average_duration_millis = self.total_duration_millis as f64 / self.records as f64;
        info!(
            "All external clients executed {} operations in {} ms",
            self.total_samples,
            average_duration_millis.round() as u64
        );

        Aggregate::Report(AggregateReport {
            records: self.records,
            total_samples: self.total_samples,
            total_duration_millis: self.total_duration_millis,
            average_duration_millis,
            latency,
            ignored_records: self.ignored_records,
        })
    }
}

/// Aggregate a snapshot of records
pub fn aggregate_records(records: &[ResultRecord]) -> Aggregate {
    let mut aggregator = RecordAggregator::new();
    for record in records {
        aggregator.add(record);
    }
    aggregator.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn report(aggregate: Aggregate) -> AggregateReport {
        match aggregate {
            Aggregate::Report(report) => report,
            Aggregate::Empty { .. } => panic!("expected a report, got Empty"),
        }
    }

    #[test]
    fn test_aggregate_empty() {
        let aggregate = aggregate_records(&[]);
        assert_eq!(aggregate, Aggregate::Empty { latency: None });
        assert!(aggregate.is_empty());
        assert!(aggregate.report().is_none());
        assert!(aggregate.latency().is_none());
    }

    #[test]
    fn test_aggregate_two_clients() {
        let report = report(aggregate_records(&[
            ResultRecord::throughput(100, Duration::from_millis(1000)),
            ResultRecord::throughput(200, Duration::from_millis(2000)),
        ]));

        assert_eq!(report.records, 2);
        assert_eq!(report.total_samples, 300);
        assert_eq!(report.total_duration_millis, 3000);
        assert_eq!(report.average_duration_millis, 1500.0);
        assert_eq!(report.latency, None);
        assert_eq!(report.operations_per_second(), 200.0);
    }

    #[test]
    fn test_mean_is_not_weighted_by_operations() {
        let report = report(aggregate_records(&[
            ResultRecord::throughput(1, Duration::from_millis(100)),
            ResultRecord::throughput(1000, Duration::from_millis(300)),
        ]));
        assert_eq!(report.average_duration_millis, 200.0);
    }

    #[test]
    fn test_durations_truncate_to_millis() {
        let report = report(aggregate_records(&[ResultRecord::throughput(
            10,
            Duration::from_nanos(1_999_999),
        )]));
        assert_eq!(report.total_duration_millis, 1);
    }

    #[test]
    fn test_latency_only_keeps_samples() {
        let aggregate = aggregate_records(&[ResultRecord::latency(&[
            Duration::from_micros(100),
            Duration::from_micros(200),
        ])]);
        assert!(aggregate.is_empty());
        assert!(aggregate.report().is_none());

        let latency = aggregate.latency().expect("latency samples must survive");
        assert_eq!(latency.count, 2);
        assert!(latency.min_nanos <= latency.max_nanos);
    }

    #[test]
    fn test_latency_summary() {
        let report = report(aggregate_records(&[
            ResultRecord::throughput(3, Duration::from_millis(10)),
            ResultRecord::latency(&[Duration::from_micros(100), Duration::from_micros(200)]),
            ResultRecord::latency(&[Duration::from_micros(300)]),
        ]));

        let latency = report.latency.unwrap();
        assert_eq!(latency.count, 3);
        assert!(latency.min_nanos <= latency.p50_nanos);
        assert!(latency.p50_nanos <= latency.p99_nanos);
        assert!(latency.p99_nanos <= latency.max_nanos);
    }

    #[test]
    fn test_unknown_and_malformed_records_ignored() {
        let report = report(aggregate_records(&[
            ResultRecord::throughput(5, Duration::from_millis(50)),
            ResultRecord::new("gc_pauses", vec![1, 2, 3]),
            ResultRecord::new(crate::stats::METRIC_THROUGHPUT, vec![5]),
        ]));

        assert_eq!(report.records, 1);
        assert_eq!(report.total_samples, 5);
        assert_eq!(report.ignored_records, 2);
    }

    #[test]
    fn test_zero_duration_throughput() {
        let report = report(aggregate_records(&[ResultRecord::throughput(5, Duration::ZERO)]));
        assert_eq!(report.average_duration_millis, 0.0);
        assert_eq!(report.operations_per_second(), 0.0);
    }
}
