//! CoGEx CLI - Main entry point

use anyhow::Context as _;
use clap::Parser;
use cogex_cli::commands::{self, Context};
use cogex_cli::config::CliConfig;
use cogex_cli::{Cli, Commands};
use cogex_common::logging::{init_logging, LogConfig, LogLevel, LogOutput, LoggingGuard};
use colored::Colorize;
use std::process;
use tracing::error;

#[tokio::main]
async fn main() {
    // before parsing, so that clap sees `.env` values for `env = ...` flags
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // The CLI works without logging, so setup failures are ignored
    let _guard = init_cli_logging(&cli);

    if let Err(e) = execute_command(&cli).await {
        error!(error = %e, "Command failed");
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

/// `-v`/`--quiet` decide the level unless `COGEX_LOG_LEVEL` is set and no
/// flag was given
fn init_cli_logging(cli: &Cli) -> Option<LoggingGuard> {
    let mut config = LogConfig::from_env().unwrap_or_else(|_| {
        LogConfig::builder()
            .output(LogOutput::Console)
            .log_file("./logs", "cogex-cli")
            .build()
    });

    if cli.quiet {
        config.level = LogLevel::Error;
    } else if cli.verbose > 0 || std::env::var("COGEX_LOG_LEVEL").is_err() {
        config.level = LogLevel::from_verbosity(cli.verbose);
    }

    init_logging(&config).ok()
}

async fn execute_command(cli: &Cli) -> anyhow::Result<()> {
    let config = CliConfig::load(&cli.connection).context("Failed to load configuration")?;
    let ctx = Context {
        config,
        format: cli.format,
        quiet: cli.quiet,
    };

    match &cli.command {
        Commands::Discrete(args) => commands::discrete::run(&ctx, args).await?,
        Commands::Signed(args) => commands::signed::run(&ctx, args).await?,
        Commands::Continuous(args) => commands::continuous::run(&ctx, args).await?,
        Commands::Metabolite(args) => commands::metabolite::run(&ctx, args).await?,
        Commands::Enzyme(args) => commands::enzyme::run(&ctx, args).await?,
        Commands::Cache { command } => commands::cache::run(&ctx, command).await?,
    }

    Ok(())
}
