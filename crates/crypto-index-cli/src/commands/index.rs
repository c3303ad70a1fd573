use clap::Args;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;

use crypto_index_core::index::inception::{build_inception_portfolio, InceptionInput};
use crypto_index_core::index::rebalancing::{rebalance_portfolio, RebalanceInput};
use crypto_index_core::index::series::{build_index_history, IndexHistoryInput};
use crypto_index_core::index::valuation::{
    value_benchmark_index, value_index, BenchmarkValuationInput, ValuationInput,
};
use crypto_index_core::index::weighting::{
    calculate_capped_weights, CappedWeightsInput, MarketCapEntry,
};

use super::read_request;
use crate::input;

/// Arguments for capped weight calculation
#[derive(Args)]
pub struct WeightsArgs {
    /// Path to a JSON/YAML file with the full weight request
    #[arg(long)]
    pub input: Option<String>,

    /// Comma-separated SYMBOL=MARKET_CAP pairs
    /// (e.g. "BTC=820000000000,ETH=300000000000")
    #[arg(long, value_delimiter = ',')]
    pub market_caps: Option<Vec<String>>,

    /// Max weight per constituent, used with --market-caps
    #[arg(long, default_value = "0.25")]
    pub max_weight: Decimal,

    /// Max redistribution passes, used with --market-caps
    #[arg(long, default_value = "10")]
    pub max_iterations: u32,
}

/// Arguments for inception portfolio construction
#[derive(Args)]
pub struct InceptionArgs {
    /// Path to a JSON/YAML file with the index definition and observations
    #[arg(long)]
    pub input: Option<String>,

    /// Path to a CSV of price observations
    /// (symbol,price,market_cap,timestamp); replaces any observations
    /// in the request
    #[arg(long)]
    pub observations: Option<String>,
}

/// Arguments for single-timestamp valuation
#[derive(Args)]
pub struct ValueArgs {
    /// Path to a JSON/YAML file with the portfolio, timestamp and prices
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for benchmark index valuation
#[derive(Args)]
pub struct BenchmarkValueArgs {
    /// Path to a JSON/YAML file with the tracked symbol, timestamp and prices
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for daily history computation
#[derive(Args)]
pub struct HistoryArgs {
    /// Path to a JSON/YAML file with the index definition and observations
    #[arg(long)]
    pub input: Option<String>,

    /// Path to a CSV of price observations; replaces any observations
    /// in the request
    #[arg(long)]
    pub observations: Option<String>,
}

/// Arguments for a rebalancing event
#[derive(Args)]
pub struct RebalanceArgs {
    /// Path to a JSON/YAML file with the portfolio, new constituents,
    /// observations and boundary timestamp
    #[arg(long)]
    pub input: Option<String>,

    /// Path to a CSV of price observations; replaces any observations
    /// in the request
    #[arg(long)]
    pub observations: Option<String>,
}

pub fn run_weights(args: WeightsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let input: CappedWeightsInput = if let Some(ref path) = args.input {
        input::file::read_document(path)?
    } else if let Some(ref pairs) = args.market_caps {
        if args.max_weight <= dec!(0) || args.max_weight > dec!(1) {
            return Err(format!(
                "--max-weight must be in (0, 1], got {}",
                args.max_weight
            )
            .into());
        }
        CappedWeightsInput {
            market_caps: parse_market_caps(pairs)?,
            max_weight: args.max_weight,
            max_iterations: args.max_iterations,
        }
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("Provide --market-caps or --input file or pipe JSON via stdin".into());
    };

    let result = calculate_capped_weights(&input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_inception(args: InceptionArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut input: InceptionInput = read_request(&args.input)?;
    if let Some(ref path) = args.observations {
        input.observations = input::csv_in::read_observations(path)?;
    }
    let result = build_inception_portfolio(&input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_value(args: ValueArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let input: ValuationInput = read_request(&args.input)?;
    let result = value_index(&input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_benchmark_value(args: BenchmarkValueArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let input: BenchmarkValuationInput = read_request(&args.input)?;
    let result = value_benchmark_index(&input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_history(args: HistoryArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut input: IndexHistoryInput = read_request(&args.input)?;
    if let Some(ref path) = args.observations {
        input.observations = input::csv_in::read_observations(path)?;
    }
    let result = build_index_history(&input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_rebalance(args: RebalanceArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut input: RebalanceInput = read_request(&args.input)?;
    if let Some(ref path) = args.observations {
        input.observations = input::csv_in::read_observations(path)?;
    }
    let result = rebalance_portfolio(&input)?;
    Ok(serde_json::to_value(result)?)
}

fn parse_market_caps(pairs: &[String]) -> Result<Vec<MarketCapEntry>, Box<dyn std::error::Error>> {
    let mut entries = Vec::with_capacity(pairs.len());
    for pair in pairs {
        let (symbol, cap) = pair
            .split_once('=')
            .ok_or_else(|| format!("Expected SYMBOL=MARKET_CAP, got '{}'", pair))?;
        let market_cap: Decimal = cap
            .trim()
            .parse()
            .map_err(|e| format!("Invalid market cap for '{}': {}", symbol, e))?;
        entries.push(MarketCapEntry {
            symbol: symbol.trim().to_string(),
            market_cap,
        });
    }
    Ok(entries)
}
