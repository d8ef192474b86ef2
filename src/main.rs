use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use breakout_levels::cli::{self, Cli};
use breakout_levels::config;

#[tokio::main]
async fn main() -> Result<()> {
    // .env / .env.local before anything reads the environment
    config::load_env_files();

    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // Logs go to stderr so progress output on stdout stays readable
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr)
        .json();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "breakout-levels starting up");

    cli::run(cli).await?;

    info!("breakout-levels completed successfully");
    Ok(())
}
