use crate::cli::{load_config, ConfigScope};
use anyhow::{Context, Result};
use clap::Subcommand;
use codep_config::{validate_config, CodepConfig};
use colored::*;
use std::path::{Path, PathBuf};
use tokio::runtime::Runtime;

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the merged configuration as JSON
    Show,

    /// Show which config file would be used
    Path,

    /// Validate the merged configuration
    Validate,
}

pub fn handle_config_command(
    cmd: &ConfigCommand,
    explicit: Option<PathBuf>,
    overrides: CodepConfig,
) -> Result<()> {
    let runtime = Runtime::new().context("Failed to create tokio runtime")?;

    let working_dir = std::env::current_dir().context("Failed to get current working directory")?;

    runtime.block_on(async {
        match cmd {
            ConfigCommand::Show => show_config(&working_dir, explicit, overrides).await,
            ConfigCommand::Path => show_config_path(&working_dir, explicit, &overrides).await,
            ConfigCommand::Validate => validate(&working_dir, explicit, overrides).await,
        }
    })
}

async fn show_config(cwd: &Path, explicit: Option<PathBuf>, overrides: CodepConfig) -> Result<()> {
    let config = load_config(cwd, explicit, overrides).await?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

async fn show_config_path(
    cwd: &Path,
    explicit: Option<PathBuf>,
    overrides: &CodepConfig,
) -> Result<()> {
    let loaded = ConfigScope::new(cwd, explicit, overrides)?.load().await?;

    match loaded.source {
        Some(path) => println!("{}", path.display()),
        None => println!("No config file found; using defaults and flags"),
    }
    Ok(())
}

async fn validate(cwd: &Path, explicit: Option<PathBuf>, overrides: CodepConfig) -> Result<()> {
    let loaded = ConfigScope::new(cwd, explicit, &overrides)?.load().await?;
    let source = loaded
        .source
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "flags only".to_string());

    let config = loaded.config.merge(overrides);
    let result = validate_config(&config);

    for warning in &result.warnings {
        println!("{} {}", "⚠".yellow(), warning);
    }
    if result.is_valid() {
        println!("{} Configuration is valid ({})", "✓".green(), source);
        Ok(())
    } else {
        for error in &result.errors {
            println!("{} {}", "✗".red(), error);
        }
        anyhow::bail!("Configuration is invalid ({})", source)
    }
}
