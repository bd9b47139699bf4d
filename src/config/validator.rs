//! Configuration validation

use super::*;
use anyhow::Result;

/// Validate complete configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_run(&config.run)?;
    validate_store(&config.store)?;
    validate_output(&config.output)?;

    Ok(())
}

/// Validate run configuration
pub fn validate_run(run: &RunConfig) -> Result<()> {
    if run.basename.trim().is_empty() {
        anyhow::bail!("basename must not be empty");
    }
    if run.basename.chars().any(char::is_whitespace) {
        anyhow::bail!("basename must not contain whitespace, got '{}'", run.basename);
    }

    if run.expected_count == 0 {
        anyhow::bail!("expected_count must be at least 1");
    }

    if run.poll_interval_ms == 0 {
        anyhow::bail!("poll_interval must be greater than zero");
    }

    Ok(())
}

/// Validate store configuration
pub fn validate_store(store: &StoreConfig) -> Result<()> {
    if let Some(ref address) = store.address {
        let Some((host, port)) = address.rsplit_once(':') else {
            anyhow::bail!("store address must be host:port, got '{}'", address);
        };
        if host.is_empty() {
            anyhow::bail!("store address is missing a host: '{}'", address);
        }
        if port.parse::<u16>().is_err() {
            anyhow::bail!("store address has an invalid port: '{}'", address);
        }
    }

    Ok(())
}

/// Validate output configuration
pub fn validate_output(output: &OutputConfig) -> Result<()> {
    if let Some(ref path) = output.json_output {
        if path.as_os_str().is_empty() {
            anyhow::bail!("json_output path must not be empty");
        }
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                anyhow::bail!(
                    "json_output directory does not exist: {}",
                    parent.display()
                );
            }
        }
    }

    Ok(())
}
