//! Coalesce CLI - coalesce command

use anyhow::Result;
use clap::{Parser, Subcommand};
use coalesce_core::CoalesceMode;
use std::path::PathBuf;

mod cmd;

/// Coalesce - burst simulator for the call-coalescing dispatcher
#[derive(Parser)]
#[command(name = "coalesce")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Drive a synthetic request burst through a coalescing policy
    Simulate {
        /// Coalescing mode: off, debounce, or throttle (overrides config)
        #[arg(long)]
        mode: Option<CoalesceMode>,

        /// Coalescing interval in milliseconds (overrides config)
        #[arg(long)]
        interval_ms: Option<i64>,

        /// Number of requests to issue
        #[arg(long, default_value = "20")]
        events: u32,

        /// Milliseconds between requests
        #[arg(long, default_value = "10")]
        spacing_ms: u64,

        /// Load defaults from a TOML config file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Emit statistics as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print an example configuration file
    ExampleConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            mode,
            interval_ms,
            events,
            spacing_ms,
            config,
            json,
        } => cmd::simulate::run(mode, interval_ms, events, spacing_ms, config, json).await,
        Commands::ExampleConfig => cmd::example_config::run().await,
    }
}
