//! Command-line interface definitions.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Minute bar ingestion and basket analytics.
#[derive(Debug, Parser)]
#[command(name = "basket", version, about = "Minute bar ingestion and basket analytics")]
pub struct Cli {
    /// SQLite database path.
    #[arg(long, global = true, default_value = "minute_bars.db")]
    pub db: PathBuf,

    /// Universe reference CSV path.
    #[arg(long, global = true, default_value = "tickers.csv")]
    pub universe: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Ingest full sessions for one or more dates
    Backfill {
        /// Trading dates (YYYY-MM-DD)
        #[arg(required = true)]
        dates: Vec<NaiveDate>,
        /// Restrict to these tickers (references are still appended)
        #[arg(long, num_args = 1..)]
        tickers: Option<Vec<String>>,
    },
    /// Ingest today's session for the full universe
    Update {
        /// Refetch even when the day is already stored
        #[arg(long)]
        force: bool,
    },
    /// List dates where both the reference ETF and holdings have bars
    Dates,
    /// Compare holdings aggregates against the reference ETF
    Compare {
        /// Trading date (YYYY-MM-DD)
        date: NaiveDate,
    },
    /// Build the lagged prediction dataset
    Predict {
        /// Trading date (YYYY-MM-DD)
        date: NaiveDate,
        /// Number of top holdings to use as features
        #[arg(long, default_value_t = 10)]
        top_n: usize,
        /// Also run the correlation and regression analysis
        #[arg(long)]
        regression: bool,
    },
    /// Print database statistics
    Status,
    /// Fetch and normalize one ticker/date without storing
    Probe {
        /// Provider symbol (e.g. AAPL or ^VIX)
        symbol: String,
        /// Trading date (YYYY-MM-DD)
        date: NaiveDate,
    },
}
