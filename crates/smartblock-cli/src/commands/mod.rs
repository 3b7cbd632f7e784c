//! CLI commands

pub mod allow;
pub mod completions;
pub mod config;
pub mod message;
pub mod observe;
pub mod refresh;
pub mod rules;
pub mod run;
pub mod settings;
pub mod shorten;
pub mod stats;
pub mod urls;

use clap::Subcommand;

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the background service (timers, refresh, stats flush)
    Run(run::RunArgs),

    /// Rebuild the block list and reconcile the rule table once
    Refresh(refresh::RefreshArgs),

    /// Inspect compiled and installed rules
    Rules(rules::RulesArgs),

    /// Manage sites excluded from blocking
    Allow(allow::AllowArgs),

    /// View and change user settings
    Settings(settings::SettingsArgs),

    /// Savings estimate and tracker tally
    Stats(stats::StatsArgs),

    /// Create a short link
    Shorten(shorten::ShortenArgs),

    /// Look up a short link
    Resolve(shorten::ResolveArgs),

    /// Manage stored short links
    Urls(urls::UrlsArgs),

    /// Feed resource URLs of a page through the tracker observer
    Observe(observe::ObserveArgs),

    /// Send one raw JSON request to the service
    Message(message::MessageArgs),

    /// Configuration management
    Config(config::ConfigArgs),

    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}
