//! CLI argument parsing and command dispatch.

pub mod args;
pub mod commands;

use anyhow::Result;
use args::{Cli, Commands};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::output::OutputFormat;

/// Run the CLI application.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(&cli.log_level);

    if cli.no_color {
        colored::control::set_override(false);
    }

    // Load configuration
    let config = Config::load()?;

    // CLI flag wins over the configured default
    let output_format = cli
        .output
        .or(config.output_format)
        .unwrap_or(OutputFormat::Pretty);

    // Flags and env vars win over the config file
    let api_key = cli.api_key.or_else(|| config.api_key.clone());
    let api_url = cli.api_url.or_else(|| config.api_base_url.clone());

    let ctx = commands::Context {
        api_key,
        api_url,
        output_format,
        no_color: cli.no_color,
        config,
    };

    match cli.command {
        Commands::Analyze(args) => commands::analyze::execute(ctx, args).await,
        Commands::Devices => commands::devices::execute(ctx).await,
        Commands::Config(args) => commands::config::execute(ctx, args).await,
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
