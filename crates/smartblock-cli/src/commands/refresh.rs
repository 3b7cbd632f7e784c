//! Refresh command - one reconcile pass

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use smartblock_core::{Config, ReconcileOutcome, RefreshOutcome};

use crate::args::Args as GlobalArgs;
use crate::context::AppContext;

/// Refresh command arguments
#[derive(Args, Debug)]
pub struct RefreshArgs {
    /// Install only the built-in list, skipping extras and the remote directory
    #[arg(long)]
    pub static_only: bool,
}

/// Execute the refresh command
pub async fn execute(args: &RefreshArgs, global: &GlobalArgs, config: Config) -> Result<()> {
    let ctx = AppContext::prepared(global, config).await?;

    let outcome = if args.static_only {
        ctx.service.install_static_rules().await
    } else {
        ctx.service.refresh_rules().await
    }
    .context("Rule refresh failed")?;

    match outcome {
        RefreshOutcome::Paused => {
            println!("{} Blocking is disabled; installed rules left untouched", "!".yellow());
        }
        RefreshOutcome::Reconciled {
            domains,
            dynamic,
            outcome,
        } => {
            println!(
                "{} {} domains compiled ({} from the tracker directory)",
                "✓".green(),
                domains,
                dynamic
            );
            match outcome {
                ReconcileOutcome::Unchanged => println!("  Rule table already up to date"),
                ReconcileOutcome::Applied { removed, added } => {
                    println!("  Removed {removed}, added {added}; {} rules installed", ctx.table.len());
                }
            }
        }
    }

    ctx.finish().await;
    Ok(())
}
