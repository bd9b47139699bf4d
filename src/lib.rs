//! benchlatch - Coordinated completion tracking for multi-client benchmarks
//!
//! A benchmark run is driven by N independent external clients. Each client
//! publishes its results to a shared store and counts down a shared completion
//! counter exactly once. A single elected coordinator waits for the counter to
//! reach zero (or a deadline), then aggregates the published results.
//!
//! # Architecture
//!
//! - **Shared store**: capability trait with in-process and TCP implementations
//! - **Tracker**: coordinator election, completion wait, worker reporting
//! - **Statistics**: result records, throughput aggregation, latency histograms
//! - **Output**: console results, log summary, JSON report

pub mod config;
pub mod output;
pub mod simulation;
pub mod stats;
pub mod store;
pub mod tracker;

// Re-export commonly used types
pub use config::Config;
pub use stats::{Aggregate, AggregateReport, ResultRecord};
pub use store::{SharedStore, StoreError};
pub use tracker::{CompletionStatus, Coordinator, RunNamespace, Worker};

/// Result type used throughout benchlatch
pub type Result<T> = anyhow::Result<T>;
