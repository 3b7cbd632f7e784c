//! Observe command - run resource URLs through the page-side tracker observer

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use smartblock_core::tracker::observer::{should_protect, ReportSink, TrackerObserver};
use smartblock_core::Config;
use std::sync::Arc;
use std::time::Duration;

use crate::args::Args as GlobalArgs;
use crate::context::AppContext;

/// Observe command arguments
#[derive(Args, Debug)]
pub struct ObserveArgs {
    /// Page the resources were loaded by
    pub page: String,

    /// Resource URLs seen on the page
    #[arg(required = true, num_args = 1..)]
    pub resources: Vec<String>,
}

/// Execute observe command
pub async fn execute(args: &ObserveArgs, global: &GlobalArgs, config: Config) -> Result<()> {
    let debounce = Duration::from_millis(config.trackers.debounce_ms);
    let ctx = AppContext::prepared(global, config).await?;

    let settings = ctx.service.storage().load_settings().await;
    if !settings.tracker_protection || !should_protect(&args.page) {
        println!("{} Tracker protection inactive for {}", "!".yellow(), args.page);
        return Ok(());
    }

    let sink: Arc<dyn ReportSink> = ctx.service.clone();
    let observer = TrackerObserver::new(sink, debounce).for_page(args.page.clone());

    let mut matched = 0usize;
    for resource in &args.resources {
        if let Some(host) = observer.observe_resource(resource) {
            matched += 1;
            println!("  {} {}", "◉".red(), host);
        }
    }

    let delivered = observer.on_page_unload().await;
    ctx.finish().await;

    println!(
        "{} {} of {} resources were trackers; {} hosts reported",
        "✓".green(),
        matched,
        args.resources.len(),
        delivered
    );
    Ok(())
}
