//! Configuration module
//!
//! Handles CLI argument parsing, TOML configuration files, and validation.

pub mod cli;
pub mod cli_convert;
pub mod toml;
pub mod validator;

use crate::tracker::{RunNamespace, DEFAULT_BASENAME};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Complete run configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Coordination parameters of one benchmark run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Run-scoped name for all shared objects
    #[serde(default = "default_basename")]
    pub basename: String,
    /// Number of clients expected to report
    #[serde(default = "default_expected_count")]
    pub expected_count: u64,
    /// Longest single suspension while waiting for clients
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Give up waiting after this long (unbounded if unset)
    pub max_wait_ms: Option<u64>,
}

fn default_basename() -> String {
    DEFAULT_BASENAME.to_string()
}

fn default_expected_count() -> u64 {
    1
}

fn default_poll_interval_ms() -> u64 {
    60_000
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            basename: default_basename(),
            expected_count: default_expected_count(),
            poll_interval_ms: default_poll_interval_ms(),
            max_wait_ms: None,
        }
    }
}

impl RunConfig {
    pub fn namespace(&self) -> RunNamespace {
        RunNamespace::new(self.basename.clone())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn max_wait(&self) -> Option<Duration> {
        self.max_wait_ms.map(Duration::from_millis)
    }
}

/// Shared store location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Address of a store service (host:port)
    pub address: Option<String>,
    /// Port the store service listens on (service mode)
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,
}

fn default_listen_port() -> u16 {
    9999
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            address: None,
            listen_port: default_listen_port(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// JSON report path
    pub json_output: Option<PathBuf>,
    /// Skip the printed results block (log line is still emitted)
    #[serde(default)]
    pub quiet: bool,
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Run:")?;
        writeln!(f, "  Basename:        {}", self.run.basename)?;
        writeln!(f, "  Expected count:  {}", self.run.expected_count)?;
        writeln!(f, "  Poll interval:   {}ms", self.run.poll_interval_ms)?;
        match self.run.max_wait_ms {
            Some(ms) => writeln!(f, "  Max wait:        {}ms", ms)?,
            None => writeln!(f, "  Max wait:        unbounded")?,
        }
        writeln!(f, "Store:")?;
        match self.store.address {
            Some(ref address) => writeln!(f, "  Address:         {}", address)?,
            None => writeln!(f, "  Address:         in-process")?,
        }
        if let Some(ref path) = self.output.json_output {
            writeln!(f, "Output:")?;
            writeln!(f, "  JSON:            {}", path.display())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.run.basename, "externalClientsRunning");
        assert_eq!(config.run.expected_count, 1);
        assert_eq!(config.run.poll_interval(), Duration::from_secs(60));
        assert_eq!(config.run.max_wait(), None);
        assert_eq!(config.store.listen_port, 9999);
        assert!(config.store.address.is_none());
    }

    #[test]
    fn test_display_mentions_store() {
        let mut config = Config::default();
        assert!(config.to_string().contains("in-process"));

        config.store.address = Some("10.0.1.10:9999".to_string());
        config.run.max_wait_ms = Some(5000);
        let text = config.to_string();
        assert!(text.contains("10.0.1.10:9999"));
        assert!(text.contains("5000ms"));
    }
}
