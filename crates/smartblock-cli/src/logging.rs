//! Logging initialization

use anyhow::{Context, Result};
use smartblock_core::config::LoggingConfig;
use std::path::Path;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::args::{Args, LogFormat};

/// Pick the log level from the flags, falling back to the config
fn level_for(args: &Args, config: &LoggingConfig) -> Level {
    if args.quiet {
        return Level::ERROR;
    }
    match args.verbose {
        0 => config.level.parse().unwrap_or(Level::INFO),
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialize logging based on CLI arguments and the logging section
///
/// Logs go to stderr so command output on stdout stays machine-readable.
/// The returned guard flushes the log file and must be held until exit.
pub fn init(args: &Args, config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let level = level_for(args, config);

    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let format = match args.log_format {
        LogFormat::Text if config.json_format => LogFormat::Json,
        other => other,
    };

    let log_file = args.log_file.as_deref().or(config.file.as_deref().map(Path::new));
    let (file_writer, guard) = match log_file {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create log file: {}", path.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry().with(env_filter);

    match format {
        LogFormat::Text => {
            let file_layer = file_writer.map(|w| fmt::layer().with_ansi(false).with_writer(w));
            registry
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(args.verbose >= 2)
                        .with_thread_ids(args.verbose >= 3)
                        .with_file(args.verbose >= 3)
                        .with_line_number(args.verbose >= 3),
                )
                .with(file_layer)
                .try_init()
        }
        LogFormat::Json => {
            let file_layer = file_writer.map(|w| fmt::layer().json().with_writer(w));
            registry
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .with(file_layer)
                .try_init()
        }
        LogFormat::Compact => {
            let file_layer = file_writer.map(|w| fmt::layer().compact().with_ansi(false).with_writer(w));
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .with(file_layer)
                .try_init()
        }
    }
    .context("Failed to initialize logging")?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_level_selection() {
        let config = LoggingConfig {
            level: "warn".into(),
            ..LoggingConfig::default()
        };

        let args = Args::parse_from(["smartblock", "refresh"]);
        assert_eq!(level_for(&args, &config), Level::WARN);

        let args = Args::parse_from(["smartblock", "-vv", "refresh"]);
        assert_eq!(level_for(&args, &config), Level::TRACE);

        let args = Args::parse_from(["smartblock", "-q", "-v", "refresh"]);
        assert_eq!(level_for(&args, &config), Level::ERROR);

        let bogus = LoggingConfig {
            level: "loud".into(),
            ..LoggingConfig::default()
        };
        let args = Args::parse_from(["smartblock", "refresh"]);
        assert_eq!(level_for(&args, &bogus), Level::INFO);
    }
}
