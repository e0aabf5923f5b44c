use crate::ProjectContext;
use crate::output;
use anyhow::{Context, Result};
use colored::Colorize;

/// Execute config command to get/set configuration values
///
/// # Errors
///
/// Returns an error if:
/// - The value is invalid for the key
/// - Failed to save configuration
pub fn execute(
    ctx: &mut ProjectContext,
    key: Option<&str>,
    value: Option<&str>,
    list: bool,
) -> Result<()> {
    // If --list flag is set or no key is provided, show all configuration
    let Some(key) = key.filter(|_| !list) else {
        show_all_config(ctx)?;
        return Ok(());
    };

    if let Some(value) = value {
        ctx.config.set(key, value)?;
        ctx.config.save(&ctx.config_path).with_context(|| {
            format!("Failed to save configuration: {}", ctx.config_path.display())
        })?;
        output::success(&format!("Set {key} = {value}"));
    } else if let Some(current) = ctx.config.get(key) {
        println!("{current}");
    } else {
        anyhow::bail!("Unknown configuration key: {key}");
    }

    Ok(())
}

/// Show all configuration values
fn show_all_config(ctx: &ProjectContext) -> Result<()> {
    let text = toml::to_string_pretty(&ctx.config).context("Failed to serialize configuration")?;
    output::verbose(&format!("# {}", ctx.config_path.display()));

    for line in text.lines() {
        if line.starts_with('[') {
            println!("{}", line.bold());
        } else {
            println!("{line}");
        }
    }
    Ok(())
}
