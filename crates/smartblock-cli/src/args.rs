//! Command-line argument parsing

use crate::commands::Command;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// SmartBlock - ad and tracker blocking engine
///
/// Compiles block lists into dynamic rules, keeps the installed rule table
/// in sync, tallies detected trackers and runs a local URL shortener.
#[derive(Parser, Debug)]
#[command(name = "smartblock")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE", global = true, env = "SMARTBLOCK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding rules, settings and stats
    #[arg(long, value_name = "DIR", global = true, env = "SMARTBLOCK_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Never contact the remote tracker directory
    #[arg(long, global = true)]
    pub offline: bool,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output format for logs
    #[arg(long, value_enum, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Log file path
    #[arg(long, value_name = "FILE", global = true)]
    pub log_file: Option<PathBuf>,

    /// Run in quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable text
    Text,
    /// JSON format
    Json,
    /// Compact format
    Compact,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{allow::AllowAction, Command};

    #[test]
    fn test_verbose() {
        let args = Args::parse_from(["smartblock", "-v", "refresh"]);
        assert_eq!(args.verbose, 1);

        let args = Args::parse_from(["smartblock", "refresh", "-vvv"]);
        assert_eq!(args.verbose, 3);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::parse_from(["smartblock", "allow", "add", "https://news.test", "--offline", "--data-dir", "/tmp/sb"]);
        assert!(args.offline);
        assert_eq!(args.data_dir, Some(PathBuf::from("/tmp/sb")));
        match args.command {
            Command::Allow(allow) => assert!(matches!(allow.action, AllowAction::Add { ref url } if url == "https://news.test")),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_log_format() {
        let args = Args::parse_from(["smartblock", "--log-format", "json", "refresh"]);
        assert_eq!(args.log_format, LogFormat::Json);
    }
}
