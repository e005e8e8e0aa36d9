//! Atelier CLI
//!
//! Command-line interface for directing batches of product image variants.

mod commands;
mod config;
mod presets;
mod simulate;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "atelier")]
#[command(about = "Atelier batch image direction CLI", long_about = None)]
struct Cli {
    /// Image generation service URL (simulated generator when unset)
    #[arg(long, env = "ATELIER_GENERATOR_URL", global = true)]
    generator_url: Option<String>,

    /// Maximum number of variants generating at once
    #[arg(
        short,
        long,
        env = "ATELIER_CONCURRENCY",
        default_value_t = 3,
        global = true
    )]
    concurrency: usize,

    /// Per-request timeout in seconds
    #[arg(long, env = "ATELIER_REQUEST_TIMEOUT", default_value_t = 120, global = true)]
    request_timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so JSON reports on stdout stay clean
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "atelier_cli=info,atelier_orchestrator=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = Config {
        generator_url: cli.generator_url,
        concurrency: cli.concurrency,
        request_timeout: Duration::from_secs(cli.request_timeout),
    };
    config.validate()?;

    handle_command(cli.command, &config).await
}
