//! Stats command - savings estimate and tracker tally

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use smartblock_core::blocklist::is_high_risk;
use smartblock_core::Config;

use crate::args::Args as GlobalArgs;
use crate::context::AppContext;

/// Stats command arguments
#[derive(Args, Debug)]
pub struct StatsArgs {
    #[command(subcommand)]
    pub action: StatsAction,
}

/// Stats subcommands
#[derive(Subcommand, Debug)]
pub enum StatsAction {
    /// Show the savings estimate
    Show {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Zero the savings estimate
    Reset,

    /// Show detection counts per tracker
    Trackers {
        /// Only show the N most frequent
        #[arg(short = 'n', long)]
        top: Option<usize>,
    },
}

/// Execute stats command
pub async fn execute(args: &StatsArgs, global: &GlobalArgs, config: Config) -> Result<()> {
    let threshold = config.trackers.frequent_threshold;
    let ctx = AppContext::prepared(global, config).await?;

    match &args.action {
        StatsAction::Show { json } => {
            let stats = ctx.service.performance().stats();
            if *json {
                println!("{}", serde_json::to_string_pretty(&stats).context("Failed to serialize stats")?);
            } else {
                println!("{}", "═".repeat(50).bright_blue());
                println!("{}", " Protection Stats".bright_white().bold());
                println!("{}", "═".repeat(50).bright_blue());
                println!("Trackers blocked: {}", stats.total_blocked.to_string().green());
                println!("Data saved:       {}", format_kb(stats.data_saved));
                println!("Time saved:       {:.1} s", stats.time_saved);
                println!("{}", "═".repeat(50).bright_blue());
            }
        }
        StatsAction::Reset => {
            ctx.service.performance().reset().await.context("Failed to reset stats")?;
            ctx.service.storage().reset_tracker_tally().await.context("Failed to reset tally")?;
            println!("{} Stats reset", "✓".green());
        }
        StatsAction::Trackers { top } => {
            let mut tally: Vec<(String, u64)> = ctx.service.storage().tracker_tally().await.into_iter().collect();
            tally.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            if let Some(n) = top {
                tally.truncate(*n);
            }

            println!("{}", "═".repeat(50).bright_blue());
            println!("{}", " Detected Trackers".bright_white().bold());
            println!("{}", "═".repeat(50).bright_blue());
            if tally.is_empty() {
                println!("{}", "  (none yet)".dimmed());
            }
            for (host, count) in &tally {
                let marker = if is_high_risk(host) {
                    "◉".red()
                } else if *count > threshold {
                    "◉".yellow()
                } else {
                    "●".green()
                };
                println!("  {marker} {count:>6}  {host}");
            }
            println!("{}", "═".repeat(50).bright_blue());
        }
    }
    Ok(())
}

fn format_kb(kb: u64) -> String {
    match kb {
        0..=1023 => format!("{kb} KB"),
        1024..=1_048_575 => format!("{:.1} MB", kb as f64 / 1024.0),
        _ => format!("{:.2} GB", kb as f64 / 1_048_576.0),
    }
}
