//! benchlatch CLI entry point

use anyhow::{Context, Result};
use benchlatch::config::cli::{Cli, ExecutionMode};
use benchlatch::config::cli_convert::parse_duration;
use benchlatch::config::{toml::build_config, validator::validate_config, Config};
use benchlatch::output::{json, text};
use benchlatch::simulation::{run_simulation, SimulationConfig};
use benchlatch::store::{InMemoryStore, RemoteStore, SharedStore, StoreService};
use benchlatch::tracker::{CompletionStatus, Coordinator, RunSummary, Worker};
use benchlatch::ResultRecord;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse_args();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli.debug))
        .init();

    cli.validate()?;

    let config = build_config(&cli)?;
    validate_config(&config).context("Configuration validation failed")?;

    match cli.mode {
        ExecutionMode::Local => run_local(&cli, &config),
        ExecutionMode::Coordinator => run_coordinator(&config),
        ExecutionMode::Client => run_client(&cli, &config),
        ExecutionMode::Service => run_service(&config),
    }
}

/// `--debug` forces DEBUG; otherwise `RUST_LOG` applies, falling back to INFO
fn log_filter(debug: bool) -> EnvFilter {
    if debug {
        return EnvFilter::new("debug");
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Run a whole round in this process with simulated clients
fn run_local(cli: &Cli, config: &Config) -> Result<()> {
    println!("benchlatch v{}", env!("CARGO_PKG_VERSION"));
    println!();
    print!("{}", config);
    println!();

    let sim = SimulationConfig {
        max_delay: parse_duration(&cli.max_delay).context("Invalid max delay")?,
        ..SimulationConfig::default()
    };

    let summary = run_simulation(&config.run, &sim)?;
    report(&summary, config)
}

/// Run in coordinator mode (claim the run, wait, aggregate)
fn run_coordinator(config: &Config) -> Result<()> {
    let store = connect_store(config)?;
    let namespace = config.run.namespace();

    let coordinator = match Coordinator::setup(store, namespace.clone(), config.run.expected_count)
        .context("Coordinator election failed")?
    {
        Some(coordinator) => coordinator,
        None => {
            info!(namespace = %namespace, "Another participant coordinates this run, nothing to do");
            return Ok(());
        }
    };

    let summary = coordinator
        .run(config.run.poll_interval(), config.run.max_wait())
        .context("Failed while waiting for clients")?;
    report(&summary, config)
}

/// Run in client mode (publish results, report completion)
fn run_client(cli: &Cli, config: &Config) -> Result<()> {
    // Presence checked by Cli::validate
    let operations = cli.ops.context("--ops is required in client mode")?;
    let elapsed = cli
        .elapsed
        .as_deref()
        .context("--elapsed is required in client mode")
        .and_then(parse_duration)
        .context("Invalid elapsed time")?;
    let latencies = cli
        .latency
        .iter()
        .map(|sample| parse_duration(sample))
        .collect::<Result<Vec<_>>>()
        .context("Invalid latency sample")?;

    let store = connect_store(config)?;
    let worker = Worker::new(store, config.run.namespace());

    let open = worker
        .await_run_open(config.run.poll_interval(), config.run.max_wait())
        .context("Failed while waiting for the run to open")?;
    if !open {
        anyhow::bail!(
            "Run '{}' was not opened by a coordinator in time",
            worker.namespace()
        );
    }

    worker.publish_result(&ResultRecord::throughput(operations, elapsed))?;
    if !latencies.is_empty() {
        worker.publish_result(&ResultRecord::latency(&latencies))?;
    }
    let remaining = worker.report_completion()?;

    info!(
        namespace = %worker.namespace(),
        operations,
        elapsed_ms = elapsed.as_millis() as u64,
        remaining,
        "Reported completion"
    );
    Ok(())
}

/// Run in service mode (host the shared store)
fn run_service(config: &Config) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()
        .context("Failed to create tokio runtime")?;

    runtime.block_on(async {
        let addr = format!("0.0.0.0:{}", config.store.listen_port);
        let service = StoreService::bind(&addr, Arc::new(InMemoryStore::new())).await?;
        service.run().await
    })
}

/// Connect to the configured store service
fn connect_store(config: &Config) -> Result<Arc<dyn SharedStore>> {
    let address = config
        .store
        .address
        .as_deref()
        .context("A store address is required (--store or [store] address)")?;

    let store = RemoteStore::connect(address)
        .with_context(|| format!("Failed to connect to store service at {}", address))?;
    Ok(Arc::new(store))
}

/// Log, print and optionally write the run summary
fn report(summary: &RunSummary, config: &Config) -> Result<()> {
    text::log_summary(summary);
    if !config.output.quiet {
        text::print_results(summary);
    }

    if let Some(ref path) = config.output.json_output {
        json::write_json_report(path, summary)?;
        info!(path = %path.display(), "JSON report written");
    }

    if summary.status == CompletionStatus::TimedOut {
        anyhow::bail!(
            "Timed out waiting for clients: {} of {} reported",
            summary.reported(),
            summary.expected_count
        );
    }
    Ok(())
}
