use clap::Parser;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::PathBuf;

mod cli;
mod commands;
mod config;
mod emitter;
mod event;
mod recorder;
mod sink;

use cli::{Cli, Commands};
use commands::run::RunOptions;
use config::{Config, LogLevel};

fn log_dir() -> PathBuf {
    std::env::var("EVENTCLIENT_LOG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| Config::data_dir().join("logs"))
}

fn setup_logging(log_level: &LogLevel, verbose: bool) -> Result<()> {
    let log_dir = log_dir();
    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("eventclient.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    // RUST_LOG env var takes precedence, then --verbose, then config log_level
    let mut builder = env_logger::Builder::new();

    if std::env::var("RUST_LOG").is_ok() {
        builder.parse_default_env();
    } else if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    } else {
        builder.filter_level(match log_level {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Off => log::LevelFilter::Off,
        });
    }

    builder.target(env_logger::Target::Pipe(target)).init();

    info!("Logging initialized, writing to: {}", log_file.display());
    info!(
        "Log level: {} (from {})",
        if verbose { "debug" } else { log_level.as_filter() },
        if std::env::var("RUST_LOG").is_ok() { "RUST_LOG env" } else { "config" }
    );
    Ok(())
}

fn run(cli: Cli, config: Config) -> Result<()> {
    let quiet = cli.quiet;
    match cli.command {
        Commands::Run {
            overrides,
            interval_ms,
            mode,
            count,
        } => commands::run::run(
            &overrides,
            RunOptions {
                interval_ms,
                mode,
                count,
                quiet,
            },
            &config,
        ),
        Commands::Emit { overrides } => commands::emit::run(&overrides, quiet, &config),
        Commands::Config { action } => commands::config::run(action, &config),
        Commands::Completions { shell } => commands::completions::run(shell),
    }
}

fn main() -> Result<()> {
    // Parse CLI arguments first
    let cli = Cli::parse();

    // Load configuration (before logging, so log messages in Config::load are silent)
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(&config.log_level, cli.verbose).context("Failed to setup logging")?;

    info!("Starting eventclient with config from: {:?}", cli.config);

    run(cli, config).context("Command failed")?;

    Ok(())
}
