//! Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "seace")]
#[command(version, about = "SEACE procurement intelligence: tender history and trends")]
pub struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true, env = "SEACE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Ignore cached responses and fetch again
    #[arg(long, global = true)]
    pub refresh: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Find the historical editions of a tender and their value trend
    History(HistoryArgs),
    /// List tenders, optionally filtered
    Tenders(TenderArgs),
    /// Inspect or clear the response cache
    #[command(subcommand)]
    Cache(CacheCommand),
}

#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// Nomenclature of the reference tender, e.g. AS-SM-15-2024-HIDRANDINA-1
    pub nomenclature: String,

    /// Minimum description similarity for a fuzzy match, in [0, 1]
    #[arg(long, value_parser = parse_threshold)]
    pub threshold: Option<f64>,

    /// Only match tenders with the same object of contract
    #[arg(long)]
    pub same_object: bool,

    /// Only match tenders published before the reference
    #[arg(long)]
    pub earlier_only: bool,
}

#[derive(Debug, Args)]
pub struct TenderArgs {
    #[arg(long)]
    pub region: Option<String>,

    #[arg(long)]
    pub entity: Option<String>,

    /// Free-text search over descriptions
    #[arg(long)]
    pub search: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum CacheCommand {
    /// Entry count, size and hit rate
    Stats,
    /// Drop every cached response, including the persisted copies
    Clear,
}

fn parse_threshold(raw: &str) -> Result<f64, String> {
    let value: f64 = raw
        .parse()
        .map_err(|_| format!("`{}` is not a number", raw))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("threshold must be between 0 and 1, got {}", value))
    }
}
