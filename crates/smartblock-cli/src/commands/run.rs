//! Run command - long-running background service

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use smartblock_core::{Config, Scheduler};
use tracing::{info, warn};

use crate::args::Args as GlobalArgs;
use crate::context::AppContext;

/// Run command arguments
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Override the rule refresh period, in minutes
    #[arg(long, value_name = "MINUTES")]
    pub update_minutes: Option<u64>,

    /// Override the stats flush period, in minutes
    #[arg(long, value_name = "MINUTES")]
    pub stats_minutes: Option<u64>,

    /// Initialize, print status and exit without starting timers
    #[arg(long)]
    pub once: bool,
}

/// Execute the run command
pub async fn execute(args: &RunArgs, global: &GlobalArgs, mut config: Config) -> Result<()> {
    if let Some(minutes) = args.update_minutes {
        config.updates.update_interval_minutes = minutes;
    }
    if let Some(minutes) = args.stats_minutes {
        config.updates.stats_interval_minutes = minutes;
    }
    config.validate().context("Invalid timer override")?;

    info!("Starting SmartBlock service...");
    let updates = config.updates.clone();
    let ctx = AppContext::open(global, config).await?;

    ctx.service.initialize().await.context("Service failed to start")?;
    print_status(&ctx);

    if args.once {
        ctx.finish().await;
        return Ok(());
    }

    let scheduler = Scheduler::new(ctx.service.clone(), &updates).spawn();
    info!(
        update = ?updates.update_interval(),
        stats = ?updates.stats_interval(),
        "Service running - press Ctrl+C to stop"
    );

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl+C; stopping");
    }

    info!("Received interrupt signal, shutting down...");
    scheduler.shutdown().await;
    info!("SmartBlock stopped");
    Ok(())
}

fn print_status(ctx: &AppContext) {
    let rules_line = if ctx.service.reconciler().snapshot().is_empty() {
        "no rules installed".yellow()
    } else {
        format!("{} rules installed", ctx.table.len()).green()
    };
    let stats = ctx.service.performance().stats();

    println!("{}", "═".repeat(50).bright_blue());
    println!("{}", " SmartBlock".bright_white().bold());
    println!("{}", "═".repeat(50).bright_blue());
    println!("Data dir:       {}", ctx.data_dir.display().to_string().cyan());
    println!("Rule table:     {rules_line}");
    println!("Blocked so far: {}", stats.total_blocked);
    println!("{}", "═".repeat(50).bright_blue());
}
