mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::analytics::{AnalyticsArgs, AnalyticsBatchArgs};
use commands::index::{
    BenchmarkValueArgs, HistoryArgs, InceptionArgs, RebalanceArgs, ValueArgs, WeightsArgs,
};

/// Divisor-based crypto index calculations
#[derive(Parser)]
#[command(
    name = "cix",
    version,
    about = "Divisor-based crypto index calculations",
    long_about = "A CLI for constructing and valuing divisor-based crypto indexes \
                  with decimal precision. Supports capped market-cap weighting, \
                  inception portfolios, point-in-time valuation, daily history, \
                  rebalancing, and risk/performance analytics."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Calculate capped market-cap constituent weights
    Weights(WeightsArgs),
    /// Build an inception portfolio from an index definition
    Inception(InceptionArgs),
    /// Value a divisor-based index at one timestamp
    Value(ValueArgs),
    /// Value a single-asset benchmark index at one timestamp
    BenchmarkValue(BenchmarkValueArgs),
    /// Compute an index's daily snapshot series
    History(HistoryArgs),
    /// Roll a portfolio into a new constituent basket
    Rebalance(RebalanceArgs),
    /// Risk and performance analytics for an index series
    Analytics(AnalyticsArgs),
    /// Run analytics for several indexes in one call
    AnalyticsBatch(AnalyticsBatchArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Weights(args) => commands::index::run_weights(args),
        Commands::Inception(args) => commands::index::run_inception(args),
        Commands::Value(args) => commands::index::run_value(args),
        Commands::BenchmarkValue(args) => commands::index::run_benchmark_value(args),
        Commands::History(args) => commands::index::run_history(args),
        Commands::Rebalance(args) => commands::index::run_rebalance(args),
        Commands::Analytics(args) => commands::analytics::run_analytics(args),
        Commands::AnalyticsBatch(args) => commands::analytics::run_analytics_batch(args),
        Commands::Version => {
            println!("cix {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
