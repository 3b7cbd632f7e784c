//! Rules command - compiled and installed rule inspection

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use smartblock_core::{Config, Rule};

use crate::args::Args as GlobalArgs;
use crate::context::AppContext;

/// Rules command arguments
#[derive(Args, Debug)]
pub struct RulesArgs {
    #[command(subcommand)]
    pub action: RulesAction,
}

/// Rules subcommands
#[derive(Subcommand, Debug)]
pub enum RulesAction {
    /// Compile the current candidate rule set without installing it
    Compile {
        /// Print the rules as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the rules in the installed table
    Installed {
        /// Print the rules as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Execute rules command
pub async fn execute(args: &RulesArgs, global: &GlobalArgs, config: Config) -> Result<()> {
    let ctx = AppContext::prepared(global, config).await?;

    match &args.action {
        RulesAction::Compile { json } => {
            let rules = ctx.service.candidate_rules().await;
            let pending = ctx.service.reconciler().plan(&rules);
            print_rules("Candidate Rules", &rules, *json)?;
            if !*json {
                if pending.is_noop() {
                    println!("{}", "Installed table matches".green());
                } else {
                    println!("{}", "Installed table differs; run 'smartblock refresh'".yellow());
                }
            }
        }
        RulesAction::Installed { json } => print_rules("Installed Rules", &ctx.table.rules(), *json)?,
    }
    Ok(())
}

fn print_rules(title: &str, rules: &[Rule], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(rules).context("Failed to serialize rules")?);
        return Ok(());
    }

    println!("{}", "═".repeat(60).bright_blue());
    println!(" {}", title.bright_white().bold());
    println!("{}", "═".repeat(60).bright_blue());
    println!("Total rules: {}", rules.len().to_string().green());
    println!("{}", "─".repeat(60).bright_black());

    if rules.is_empty() {
        println!("{}", "  (empty)".dimmed());
    }
    for rule in rules {
        println!("  {:>10}  {}", rule.id.to_string().dimmed(), rule.url_filter());
    }

    if let Some(first) = rules.first() {
        println!("{}", "─".repeat(60).bright_black());
        println!("Resource types: {}", first.condition.resource_types);
        if !first.condition.excluded_domains.is_empty() {
            println!("Excluded:       {}", first.condition.excluded_domains.join(", ").cyan());
        }
    }
    println!("{}", "═".repeat(60).bright_blue());
    Ok(())
}
