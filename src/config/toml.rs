//! TOML configuration file parsing

use super::cli_convert::parse_duration_ms;
use super::*;
use crate::config::cli::Cli;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Parse TOML configuration file
pub fn parse_toml_file(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_toml_string(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse TOML configuration from string
pub fn parse_toml_string(contents: &str) -> Result<Config> {
    let config: Config = ::toml::from_str(contents)
        .context("Failed to parse TOML configuration")?;

    Ok(config)
}

/// Merge CLI arguments with TOML configuration (CLI takes precedence)
pub fn merge_cli_with_config(cli: &Cli, mut config: Config) -> Result<Config> {
    // Run settings
    if let Some(ref basename) = cli.basename {
        config.run.basename = basename.clone();
    }
    if let Some(clients) = cli.clients {
        config.run.expected_count = clients;
    }
    if let Some(ref interval) = cli.poll_interval {
        config.run.poll_interval_ms = parse_duration_ms(interval)
            .context("Invalid poll interval")?;
    }
    if let Some(ref max_wait) = cli.max_wait {
        config.run.max_wait_ms = Some(parse_duration_ms(max_wait)
            .context("Invalid max wait")?);
    }

    // Store settings
    if let Some(ref address) = cli.store {
        config.store.address = Some(address.clone());
    }
    if let Some(port) = cli.listen_port {
        config.store.listen_port = port;
    }

    // Output settings
    if let Some(ref path) = cli.json_output {
        config.output.json_output = Some(path.clone());
    }
    if cli.quiet {
        config.output.quiet = true;
    }

    Ok(config)
}

/// Build the effective configuration: TOML file (if any) overridden by CLI
pub fn build_config(cli: &Cli) -> Result<Config> {
    let config = match cli.config {
        Some(ref path) => parse_toml_file(path)?,
        None => Config::default(),
    };

    merge_cli_with_config(cli, config)
}
