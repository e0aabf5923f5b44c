use super::Config;
use anyhow::{Context, Result};
use std::path::Path;

/// Reads, parses and validates a configuration file.
///
/// # Errors
/// Returns an error if the file cannot be read, is not UTF-8 or TOML, or
/// fails validation.
pub fn parse_config_file(path: &Path) -> Result<Config> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    // Validate UTF-8 using SIMD
    let content = simdutf8::basic::from_utf8(&bytes)
        .map_err(|e| anyhow::anyhow!("Invalid UTF-8 in config file: {e}"))?;

    parse_config_str(content)
}

fn parse_config_str(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse TOML config")?;

    // Validate and return validation errors directly without wrapping
    validate_config(&config)?;
    Ok(config)
}

/// Rejects values that would make scanning or watching misbehave.
///
/// # Errors
/// Returns an error naming the first invalid value.
pub fn validate_config(config: &Config) -> Result<()> {
    if config.scan.max_content_size == 0 {
        anyhow::bail!("Maximum content size must be at least 1 byte");
    }

    if config.report.context_lines > 100 {
        anyhow::bail!("Context lines cannot exceed 100");
    }

    if config.watch.poll_interval()?.is_zero() {
        anyhow::bail!("Poll interval must be greater than zero");
    }

    config.watch.debounce()?;

    Ok(())
}
