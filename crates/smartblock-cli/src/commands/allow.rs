//! Allow command - sites excluded from blocking

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use smartblock_core::rules::{allow_pattern_for, pattern_host};
use smartblock_core::Config;

use crate::args::Args as GlobalArgs;
use crate::context::AppContext;

/// Allow command arguments
#[derive(Args, Debug)]
pub struct AllowArgs {
    #[command(subcommand)]
    pub action: AllowAction,
}

/// Allow subcommands
#[derive(Subcommand, Debug)]
pub enum AllowAction {
    /// List stored allow patterns
    List,

    /// Stop blocking on every page of a URL's host
    Add {
        /// Page URL, e.g. https://www.example.com/article
        url: String,
    },

    /// Resume blocking on a URL's host
    Remove {
        /// Page URL
        url: String,
    },

    /// Check whether a URL is allowed
    Check {
        /// Page URL
        url: String,
    },
}

const PENDING_HINT: &str =
    "Installed rules pick this up on the next block list change; set reconcile.diff = \"by-id\" to apply it immediately";

/// Whether every installed rule excludes `url`'s host; `None` with no rules installed
fn installed_exclusion(ctx: &AppContext, url: &str) -> Option<bool> {
    let host = allow_pattern_for(url).and_then(|p| pattern_host(&p)).ok()?;
    let snapshot = ctx.service.reconciler().snapshot();
    if snapshot.is_empty() {
        return None;
    }
    Some(snapshot.iter().all(|r| r.condition.excluded_domains.contains(&host)))
}

/// Execute allow command
pub async fn execute(args: &AllowArgs, global: &GlobalArgs, config: Config) -> Result<()> {
    let ctx = AppContext::prepared(global, config).await?;
    let storage = ctx.service.storage();

    match &args.action {
        AllowAction::List => {
            let patterns = storage.allowed_sites().await;

            println!("{}", "═".repeat(50).bright_blue());
            println!("{}", " Allowed Sites".bright_white().bold());
            println!("{}", "═".repeat(50).bright_blue());
            if patterns.is_empty() {
                println!("{}", "  (empty)".dimmed());
            }
            for pattern in &patterns {
                match pattern_host(pattern) {
                    Ok(host) => println!("  {} {} {}", "●".green(), host, pattern.dimmed()),
                    Err(_) => println!("  {} {} {}", "✗".red(), pattern, "(ignored)".dimmed()),
                }
            }
            println!("{}", "═".repeat(50).bright_blue());
        }
        AllowAction::Add { url } => {
            if ctx.service.allow_url(url).await.context("Failed to allow site")? {
                if installed_exclusion(&ctx, url) == Some(true) {
                    println!("{} Blocking disabled on {}", "✓".green(), url.cyan());
                } else {
                    println!("{} {} added to the allow list", "✓".green(), url.cyan());
                    println!("  {}", PENDING_HINT.dimmed());
                }
            } else {
                println!("{} {} is already allowed", "!".yellow(), url);
            }
        }
        AllowAction::Remove { url } => {
            if ctx.service.disallow_url(url).await.context("Failed to remove site")? {
                if installed_exclusion(&ctx, url) == Some(false) {
                    println!("{} Blocking re-enabled on {}", "✓".green(), url.cyan());
                } else {
                    println!("{} {} removed from the allow list", "✓".green(), url.cyan());
                    println!("  {}", PENDING_HINT.dimmed());
                }
            } else {
                println!("{} {} was not in the allow list", "!".yellow(), url);
            }
        }
        AllowAction::Check { url } => {
            if storage.is_url_allowed(url).await {
                println!("{} {} is allowed", "●".green(), url);
            } else {
                println!("{} {} is subject to blocking", "●".red(), url);
            }
        }
    }

    ctx.finish().await;
    Ok(())
}
