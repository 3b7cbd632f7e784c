//! URLs command - stored short links

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use smartblock_core::host::{Clock, SystemClock};
use smartblock_core::Config;

use crate::args::Args as GlobalArgs;
use crate::context::AppContext;

/// URLs command arguments
#[derive(Args, Debug)]
pub struct UrlsArgs {
    #[command(subcommand)]
    pub action: UrlsAction,
}

/// URLs subcommands
#[derive(Subcommand, Debug)]
pub enum UrlsAction {
    /// List stored short links
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete one short link
    Delete {
        /// Short hash
        hash: String,
    },

    /// Delete every short link
    Clear,

    /// Show shortener counters
    Stats {
        /// Zero the counters
        #[arg(long)]
        reset: bool,
    },
}

/// Execute urls command
pub async fn execute(args: &UrlsArgs, global: &GlobalArgs, config: Config) -> Result<()> {
    let ctx = AppContext::open(global, config).await?;
    let shortener = ctx.service.shortener();

    match &args.action {
        UrlsAction::List { json } => {
            let mappings = shortener.all_urls().await.context("Failed to read short links")?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&mappings).context("Failed to serialize")?);
                return Ok(());
            }

            let now = SystemClock.now_millis();
            println!("{}", "═".repeat(60).bright_blue());
            println!("{}", " Short Links".bright_white().bold());
            println!("{}", "═".repeat(60).bright_blue());
            if mappings.is_empty() {
                println!("{}", "  (empty)".dimmed());
            }
            for (hash, record) in &mappings {
                let marker = if record.is_expired(now) { "✗".red() } else { "●".green() };
                println!(
                    "  {marker} {}  {}  {}",
                    shortener.short_url_for(hash).cyan(),
                    record.original_url,
                    format!("({} uses)", record.use_count).dimmed()
                );
            }
            println!("{}", "═".repeat(60).bright_blue());
        }
        UrlsAction::Delete { hash } => {
            if shortener.delete_url(hash).await.context("Failed to delete")? {
                println!("{} Deleted {}", "✓".green(), hash.cyan());
            } else {
                println!("{} No short link {}", "✗".red(), hash);
            }
        }
        UrlsAction::Clear => {
            shortener.clear().await.context("Failed to clear short links")?;
            println!("{} All short links deleted", "✓".green());
        }
        UrlsAction::Stats { reset } => {
            if *reset {
                shortener.reset_stats().await.context("Failed to reset counters")?;
                println!("{} Shortener counters reset", "✓".green());
            } else {
                let stats = shortener.stats().await;
                println!("URLs shortened:      {}", stats.urls_shortened.to_string().green());
                println!("URLs accessed:       {}", stats.urls_accessed);
                println!("Characters reduced:  {}", stats.characters_reduced);
            }
        }
    }
    Ok(())
}
