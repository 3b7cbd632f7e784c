//! SmartBlock CLI
//!
//! Command-line front end for the blocking engine.

mod args;
mod commands;
mod context;
mod logging;

use anyhow::Result;
use clap::Parser;
use smartblock_core::config::LoggingConfig;
use smartblock_core::Config;
use tracing::error;

use args::Args;
use commands::Command;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // These work without (or on a broken) configuration
    match &args.command {
        Command::Completions(comp_args) => return commands::completions::execute(comp_args),
        Command::Config(config_args) => {
            let _guard = logging::init(&args, &LoggingConfig::default())?;
            return commands::config::execute(config_args, args.config.as_deref());
        }
        _ => {}
    }

    let config = context::load_config(args.config.as_deref())?;
    let _guard = logging::init(&args, &config.logging)?;

    if matches!(args.command, Command::Run(_)) && !args.quiet {
        print_banner();
    }

    let result = run(&args, config).await;

    if let Err(ref e) = result {
        error!("Fatal error: {:#}", e);
    }

    result
}

async fn run(args: &Args, config: Config) -> Result<()> {
    match &args.command {
        Command::Run(run_args) => commands::run::execute(run_args, args, config).await,
        Command::Refresh(refresh_args) => commands::refresh::execute(refresh_args, args, config).await,
        Command::Rules(rules_args) => commands::rules::execute(rules_args, args, config).await,
        Command::Allow(allow_args) => commands::allow::execute(allow_args, args, config).await,
        Command::Settings(settings_args) => commands::settings::execute(settings_args, args, config).await,
        Command::Stats(stats_args) => commands::stats::execute(stats_args, args, config).await,
        Command::Shorten(shorten_args) => commands::shorten::shorten(shorten_args, args, config).await,
        Command::Resolve(resolve_args) => commands::shorten::resolve(resolve_args, args, config).await,
        Command::Urls(urls_args) => commands::urls::execute(urls_args, args, config).await,
        Command::Observe(observe_args) => commands::observe::execute(observe_args, args, config).await,
        Command::Message(message_args) => commands::message::execute(message_args, args, config).await,
        Command::Config(config_args) => commands::config::execute(config_args, args.config.as_deref()),
        Command::Completions(comp_args) => commands::completions::execute(comp_args),
    }
}

fn print_banner() {
    use colored::Colorize;

    println!();
    println!("{}", "╔═══════════════════════════════════════════════════════╗".cyan());
    println!(
        "{}{}{}",
        "║  ".cyan(),
        format!("SmartBlock v{:<12}", env!("CARGO_PKG_VERSION")).green().bold(),
        "                             ║".cyan()
    );
    println!(
        "{}{}{}",
        "║  ".cyan(),
        "Ad and tracker blocking engine".white(),
        "                       ║".cyan()
    );
    println!("{}", "╚═══════════════════════════════════════════════════════╝".cyan());
    println!();
}
