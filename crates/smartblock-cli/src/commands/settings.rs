//! Settings command - user toggles

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use smartblock_core::{Config, RefreshOutcome, UserSettings};

use crate::args::Args as GlobalArgs;
use crate::context::AppContext;

/// Settings command arguments
#[derive(Args, Debug)]
pub struct SettingsArgs {
    #[command(subcommand)]
    pub action: SettingsAction,
}

/// Settings subcommands
#[derive(Subcommand, Debug)]
pub enum SettingsAction {
    /// Show current settings
    Show {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change one toggle and re-apply rules
    Set {
        /// Setting name (blockingEnabled, trackerProtection, fingerprintProtection,
        /// autoUpdateLists, showNotifications)
        key: String,

        /// New value
        #[arg(action = clap::ArgAction::Set)]
        value: bool,
    },

    /// Restore defaults and re-apply rules
    Reset,
}

/// Execute settings command
pub async fn execute(args: &SettingsArgs, global: &GlobalArgs, config: Config) -> Result<()> {
    let ctx = AppContext::prepared(global, config).await?;
    let storage = ctx.service.storage();

    match &args.action {
        SettingsAction::Show { json } => {
            let settings = storage.load_settings().await;
            if *json {
                println!("{}", serde_json::to_string_pretty(&settings).context("Failed to serialize settings")?);
            } else {
                print_settings(&settings);
            }
        }
        SettingsAction::Set { key, value } => {
            let mut settings = storage.load_settings().await;
            if !settings.set_field(key, *value) {
                anyhow::bail!("Unknown setting '{key}'");
            }
            let outcome = ctx.service.update_settings(&settings).await.context("Failed to apply settings")?;
            println!("{} {} = {}", "✓".green(), key.cyan(), value);
            report(outcome);
        }
        SettingsAction::Reset => {
            let settings = storage.reset_settings().await.context("Failed to reset settings")?;
            let outcome = ctx.service.refresh_rules().await.context("Failed to apply settings")?;
            println!("{} Settings restored to defaults", "✓".green());
            print_settings(&settings);
            report(outcome);
        }
    }

    ctx.finish().await;
    Ok(())
}

fn print_settings(settings: &UserSettings) {
    let rows = [
        ("blockingEnabled", settings.blocking_enabled),
        ("trackerProtection", settings.tracker_protection),
        ("fingerprintProtection", settings.fingerprint_protection),
        ("autoUpdateLists", settings.auto_update_lists),
        ("showNotifications", settings.show_notifications),
    ];
    for (name, on) in rows {
        let state = if on { "on".green() } else { "off".dimmed() };
        println!("  {name:<22} {state}");
    }
}

fn report(outcome: RefreshOutcome) {
    if outcome == RefreshOutcome::Paused {
        println!("  {}", "Blocking paused; installed rules left as they were".yellow());
    }
}
