//! Config command - configuration management

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use smartblock_core::Config;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::context::{find_config_file, load_config, project_dirs, CONFIG_CANDIDATES};

/// Config command arguments
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show {
        /// Config file to show (default: detect)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Write a configuration file with every default spelled out
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "smartblock.toml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Validate a configuration file
    Validate {
        /// Config file to validate
        file: PathBuf,
    },

    /// Show config and data file locations
    Paths,
}

/// Execute config command
pub fn execute(args: &ConfigArgs, global_config: Option<&Path>) -> Result<()> {
    match &args.action {
        ConfigAction::Show { file } => show_config(file.as_deref().or(global_config)),
        ConfigAction::Generate { output, force } => generate_config(output, *force),
        ConfigAction::Validate { file } => validate_config(file),
        ConfigAction::Paths => {
            show_paths();
            Ok(())
        }
    }
}

fn show_config(file: Option<&Path>) -> Result<()> {
    let config = load_config(file)?;
    let toml_str = config.to_toml().context("Failed to serialize config")?;
    println!("{toml_str}");
    Ok(())
}

fn generate_config(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", output.display());
    }

    let toml_str = Config::default().to_toml().context("Failed to serialize config")?;
    let content = format!(
        "# SmartBlock configuration\n\
         # Every value below is the built-in default\n\n\
         {toml_str}"
    );

    std::fs::write(output, content).with_context(|| format!("Failed to write config to {}", output.display()))?;

    info!(path = %output.display(), "Generated config file");
    println!("{} Configuration file generated: {}", "✓".green(), output.display());
    Ok(())
}

fn validate_config(file: &Path) -> Result<()> {
    let config = load_config(Some(file))?;

    println!("{} Configuration is valid", "✓".green());
    println!("  Diff strategy: {:?}", config.reconcile.diff);
    println!("  Single flight: {}", config.reconcile.single_flight);
    println!("  Rule limit: {}", config.host.max_rules);
    println!("  Extra domains: {}", config.blocking.extra_domains.len());
    println!("  Resource types: {}", config.blocking.resource_types);
    println!("  Refresh every: {} min", config.updates.update_interval_minutes);
    Ok(())
}

fn show_paths() {
    println!("Configuration file search paths:");
    println!();
    for (i, name) in CONFIG_CANDIDATES.iter().enumerate() {
        println!("  {}. ./{name}", i + 1);
    }
    if let Some(dirs) = project_dirs() {
        println!("  {}. {}", CONFIG_CANDIDATES.len() + 1, dirs.config_dir().join("config.toml").display());
    }

    match find_config_file() {
        Some(path) => println!("\nActive: {}", path.display().to_string().cyan()),
        None => println!("\nActive: {}", "(built-in defaults)".dimmed()),
    }

    println!();
    println!("Data directory:");
    match project_dirs() {
        Some(dirs) => println!("  {}", dirs.data_dir().display()),
        None => println!("  ./.smartblock"),
    }
}
