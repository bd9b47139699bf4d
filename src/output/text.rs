//! Human-readable text output

use crate::stats::{Aggregate, LatencySummary};
use crate::tracker::{CompletionStatus, RunSummary};
use std::time::Duration;
use tracing::{info, warn};

/// Emit the one-line summary through the logger
pub fn log_summary(summary: &RunSummary) {
    match (&summary.aggregate, summary.status) {
        (Aggregate::Report(report), _) => info!(
            namespace = %summary.namespace,
            status = %summary.status,
            clients = summary.reported(),
            total_samples = report.total_samples,
            average_duration_ms = report.average_duration_millis,
            ops_per_sec = report.operations_per_second(),
            "Run aggregated"
        ),
        (Aggregate::Empty { .. }, CompletionStatus::Completed) => warn!(
            namespace = %summary.namespace,
            clients = summary.reported(),
            latency_samples = summary.aggregate.latency().map_or(0, |l| l.count),
            "Run completed but no client published throughput results"
        ),
        (Aggregate::Empty { .. }, CompletionStatus::TimedOut) => warn!(
            namespace = %summary.namespace,
            clients = summary.reported(),
            expected = summary.expected_count,
            "Run timed out before any client published throughput results"
        ),
    }
}

/// Print run results to console
pub fn print_results(summary: &RunSummary) {
    println!("═══════════════════════════════════════════════════════════");
    println!("                    RUN RESULTS");
    println!("═══════════════════════════════════════════════════════════");
    println!();

    println!("Run:     {}", summary.namespace);
    println!("Status:  {}", summary.status);
    println!(
        "Clients: {} / {} reported",
        format_number(summary.reported()),
        format_number(summary.expected_count)
    );
    println!("Waited:  {:.3}s", summary.elapsed.as_secs_f64());
    println!();

    let report = match summary.aggregate {
        Aggregate::Report(ref report) => report,
        Aggregate::Empty { ref latency } => {
            println!("No throughput results were published.");
            println!();
            if let Some(latency) = latency {
                print_latency(latency);
            }
            return;
        }
    };

    println!("Throughput:");
    println!("  Records:      {}", format_number(report.records as u64));
    println!("  Operations:   {}", format_number(report.total_samples));
    println!("  Avg duration: {:.1} ms", report.average_duration_millis);
    println!("  Rate:         {} ops/s", format_rate(report.operations_per_second()));
    if report.ignored_records > 0 {
        println!("  Ignored:      {} records", report.ignored_records);
    }
    println!();

    if let Some(ref latency) = report.latency {
        print_latency(latency);
    }
}

fn print_latency(latency: &LatencySummary) {
    println!("Latency ({} samples):", format_number(latency.count));
    println!("  min:   {}", format_nanos(latency.min_nanos));
    println!("  mean:  {}", format_nanos(latency.mean_nanos));
    println!("  p50:   {}", format_nanos(latency.p50_nanos));
    println!("  p90:   {}", format_nanos(latency.p90_nanos));
    println!("  p99:   {}", format_nanos(latency.p99_nanos));
    println!("  p99.9: {}", format_nanos(latency.p99_9_nanos));
    println!("  max:   {}", format_nanos(latency.max_nanos));
    println!();
}

/// Format a number with thousand separators
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();

    for (count, c) in s.chars().rev().enumerate() {
        if count > 0 && count % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }

    result.chars().rev().collect()
}

/// Format an operation rate (1.50K, 2.50M)
fn format_rate(rate: f64) -> String {
    if rate < 1_000.0 {
        format!("{:.0}", rate)
    } else if rate < 1_000_000.0 {
        format!("{:.2}K", rate / 1_000.0)
    } else if rate < 1_000_000_000.0 {
        format!("{:.2}M", rate / 1_000_000.0)
    } else {
        format!("{:.2}G", rate / 1_000_000_000.0)
    }
}

/// Format a nanosecond latency with a readable unit
fn format_nanos(nanos: u64) -> String {
    let duration = Duration::from_nanos(nanos);
    if nanos < 1_000 {
        format!("{}ns", nanos)
    } else if nanos < 1_000_000 {
        format!("{:.2}us", nanos as f64 / 1_000.0)
    } else if nanos < 1_000_000_000 {
        format!("{:.2}ms", nanos as f64 / 1_000_000.0)
    } else {
        format!("{:.2}s", duration.as_secs_f64())
    }
}
