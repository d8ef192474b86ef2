use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::info;

pub mod commands;

#[derive(Parser)]
#[command(
    name = "breakout-levels",
    about = "Groww access tokens and prior-day high/low snapshots for breakout detection",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Exchange the API key and secret for an access token and save it
    Token,

    /// Fetch yesterday's OHLC for every mapped stock and replace the stored snapshot
    Refresh {
        /// Only fetch and replace these symbols (repeatable); unmapped symbols get the unclassified sector
        #[arg(short, long = "symbol")]
        symbols: Vec<String>,

        /// Write to an in-memory store instead of the database
        #[arg(long)]
        dry_run: bool,
    },

    /// Print a stored snapshot ordered by symbol
    Show {
        /// Snapshot date (defaults to the latest stored date)
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// Delete the stored snapshot for one date
    Clear {
        /// Snapshot date to delete
        #[arg(short, long)]
        date: NaiveDate,
    },

    /// Parse the sector mapping and print sector and symbol counts
    Sectors,
}

/// Execute a CLI command
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Token => {
            info!("Generating access token");
            commands::token().await?;
        }
        Commands::Refresh { symbols, dry_run } => {
            info!(dry_run, "Refreshing daily high/low snapshot");
            commands::refresh(symbols, dry_run).await?;
        }
        Commands::Show { date } => {
            info!("Displaying stored snapshot");
            commands::show(date).await?;
        }
        Commands::Clear { date } => {
            info!("Clearing snapshot for {}", date);
            commands::clear(date).await?;
        }
        Commands::Sectors => {
            commands::sectors()?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_refresh_arguments() {
        let cli = Cli::try_parse_from([
            "breakout-levels",
            "refresh",
            "--symbol",
            "TCS",
            "-s",
            "INFY",
            "--dry-run",
        ])
        .unwrap();

        match cli.command {
            Commands::Refresh { symbols, dry_run } => {
                assert_eq!(symbols, vec!["TCS", "INFY"]);
                assert!(dry_run);
            }
            _ => panic!("expected refresh"),
        }
    }

    #[test]
    fn test_parse_show_date() {
        let cli = Cli::try_parse_from(["breakout-levels", "-v", "show", "--date", "2024-03-01"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Show { date } => assert_eq!(date, NaiveDate::from_ymd_opt(2024, 3, 1)),
            _ => panic!("expected show"),
        }
    }

    #[test]
    fn test_clear_requires_date() {
        assert!(Cli::try_parse_from(["breakout-levels", "clear"]).is_err());
    }
}
