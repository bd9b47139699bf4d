//! CLI argument parsing using clap

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Execution mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExecutionMode {
    /// Local mode (default) - simulate all clients in this process
    Local,
    /// Coordinator mode - claim the run, wait for clients, aggregate
    Coordinator,
    /// Client mode - publish results and report completion
    Client,
    /// Service mode - host the shared store for other processes
    Service,
}

/// benchlatch - Coordinated completion tracking for multi-client benchmarks
#[derive(Parser, Debug)]
#[command(name = "benchlatch")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Execution mode: local, coordinator, client, or service
    #[arg(long, value_enum, default_value = "local")]
    pub mode: ExecutionMode,

    /// TOML configuration file (CLI flags take precedence)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    // === Run Options ===
    /// Run basename; every shared object of the run is named after it
    #[arg(long)]
    pub basename: Option<String>,

    /// Number of clients expected to report
    #[arg(short = 'n', long)]
    pub clients: Option<u64>,

    /// Poll interval while waiting for clients (e.g., 500ms, 60s)
    #[arg(long)]
    pub poll_interval: Option<String>,

    /// Maximum time to wait for clients (e.g., 10m); unbounded if unset
    #[arg(long)]
    pub max_wait: Option<String>,

    // === Store Options ===
    /// Store service address (host:port)
    #[arg(long, env = "BENCHLATCH_STORE")]
    pub store: Option<String>,

    /// Port for the store service to listen on (service mode only)
    #[arg(long)]
    pub listen_port: Option<u16>,

    // === Client Options ===
    /// Operations executed by this client (client mode)
    #[arg(long)]
    pub ops: Option<u64>,

    /// Time this client spent executing its operations (client mode, e.g., 1500ms)
    #[arg(long)]
    pub elapsed: Option<String>,

    /// Latency samples to publish (client mode, comma-separated, e.g., 120us,3ms)
    #[arg(long, value_delimiter = ',')]
    pub latency: Vec<String>,

    // === Local Simulation Options ===
    /// Upper bound of the random delay before each simulated client reports
    #[arg(long, default_value = "500ms")]
    pub max_delay: String,

    // === Output Options ===
    /// Write the aggregate report as JSON to this path
    #[arg(long)]
    pub json_output: Option<PathBuf>,

    /// Do not print the results block
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate mode-specific CLI arguments
    pub fn validate(&self) -> anyhow::Result<()> {
        match self.mode {
            ExecutionMode::Client => {
                if self.ops.is_none() {
                    anyhow::bail!("--ops is required in client mode");
                }
                if self.elapsed.is_none() {
                    anyhow::bail!("--elapsed is required in client mode");
                }
            }
            ExecutionMode::Local => {
                if self.store.is_some() {
                    anyhow::bail!("--store cannot be used in local mode (local mode uses an in-process store)");
                }
            }
            ExecutionMode::Coordinator | ExecutionMode::Service => {}
        }

        if let Some(0) = self.clients {
            anyhow::bail!("clients must be at least 1");
        }

        Ok(())
    }
}
