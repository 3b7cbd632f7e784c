//! Shorten and resolve commands

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use smartblock_core::shortener::assess_url;
use smartblock_core::Config;

use crate::args::Args as GlobalArgs;
use crate::context::AppContext;

/// Shorten command arguments
#[derive(Args, Debug)]
pub struct ShortenArgs {
    /// URL to shorten
    pub url: String,

    /// Days until the link expires (0 = never; default from config)
    #[arg(short, long)]
    pub days: Option<u32>,
}

/// Resolve command arguments
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Short hash (or full short link)
    pub hash: String,
}

/// Execute shorten command
pub async fn shorten(args: &ShortenArgs, global: &GlobalArgs, config: Config) -> Result<()> {
    let ctx = AppContext::open(global, config).await?;

    if let Some(reason) = assess_url(&args.url) {
        eprintln!("{} Destination looks suspicious: {reason}", "!".yellow());
    }

    let short = ctx
        .service
        .shortener()
        .shorten(&args.url, args.days)
        .await
        .context("Failed to shorten URL")?;

    println!("{}", short.short_url);
    if short.reused {
        eprintln!("{} Existing link reused", "●".cyan());
    }
    Ok(())
}

/// Execute resolve command
pub async fn resolve(args: &ResolveArgs, global: &GlobalArgs, config: Config) -> Result<()> {
    let ctx = AppContext::open(global, config).await?;
    let hash = args.hash.rsplit('/').next().unwrap_or(&args.hash);

    match ctx.service.shortener().resolve(hash).await.context("Failed to resolve")? {
        Some(url) => {
            if let Some(reason) = assess_url(&url) {
                eprintln!("{} Destination looks suspicious: {reason}", "!".yellow());
            }
            println!("{url}");
            Ok(())
        }
        None => anyhow::bail!("No live short link for '{hash}'"),
    }
}
