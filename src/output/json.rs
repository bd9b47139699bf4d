//! JSON output formatting
//!
//! Writes one report per run containing the completion outcome, the
//! aggregate, and enough context (host, namespace, timestamp) to tell runs
//! apart when reports from many runs are collected together.

use crate::stats::Aggregate;
use crate::store::service::get_node_id;
use crate::tracker::{CompletionStatus, RunSummary};
use crate::Result;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Top-level JSON report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonReport {
    /// RFC 3339 timestamp of report creation
    pub generated_at: String,
    /// Host that ran the coordinator
    pub host: String,
    pub namespace: String,
    pub status: CompletionStatus,
    pub expected_clients: u64,
    pub reported_clients: u64,
    pub waited_ms: u64,
    pub aggregate: Aggregate,
    /// Convenience copy of the aggregate's rate (0 for an empty aggregate)
    pub operations_per_second: f64,
}

impl JsonReport {
    pub fn from_summary(summary: &RunSummary) -> Self {
        Self {
            generated_at: chrono::Utc::now().to_rfc3339(),
            host: get_node_id(),
            namespace: summary.namespace.to_string(),
            status: summary.status,
            expected_clients: summary.expected_count,
            reported_clients: summary.reported(),
            waited_ms: summary.elapsed.as_millis() as u64,
            aggregate: summary.aggregate.clone(),
            operations_per_second: summary
                .aggregate
                .report()
                .map(|r| r.operations_per_second())
                .unwrap_or(0.0),
        }
    }
}

/// Write the report for `summary` to `output_path`
pub fn write_json_report(output_path: &Path, summary: &RunSummary) -> Result<()> {
    let report = JsonReport::from_summary(summary);

    let file = File::create(output_path)
        .with_context(|| format!("Failed to create JSON report: {}", output_path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &report)
        .with_context(|| format!("Failed to write JSON report: {}", output_path.display()))?;
    writer.flush().context("Failed to flush JSON report")?;

    Ok(())
}
