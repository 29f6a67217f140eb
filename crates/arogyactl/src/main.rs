//! Arogya Control - command-line client for the Arogya pipeline
//!
//! Runs the resolver in-process against the configured data files.

use anyhow::Result;
use arogyactl::cli::{Cli, Commands};
use arogyactl::commands;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = commands::load_config(cli.config.as_deref(), cli.offline)?;

    match cli.command {
        Commands::Ask { question, json } => commands::ask(&config, &question.join(" "), json).await,
        Commands::Chat { save } => commands::chat(&config, save).await,
        Commands::Check => commands::check(&config),
        Commands::Explain { question, top } => commands::explain(&config, &question.join(" "), top),
        Commands::Config { init } => commands::config(&config, init),
    }
}
