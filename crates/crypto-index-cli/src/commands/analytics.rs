use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use crypto_index_core::analytics::report::{
    calculate_analytics_batch, calculate_index_analytics, AnalyticsBatchInput, AnalyticsInput,
};

use super::read_request;
use crate::input;

/// Arguments for single-index analytics
#[derive(Args)]
pub struct AnalyticsArgs {
    /// Path to a JSON/YAML file with the series and analytics knobs
    #[arg(long)]
    pub input: Option<String>,

    /// Path to a CSV of series points (timestamp,value); replaces any
    /// points in the request
    #[arg(long)]
    pub series: Option<String>,

    /// Window in days back from the latest point; overrides the request
    #[arg(long)]
    pub period_days: Option<i64>,

    /// Annualised risk-free rate; overrides the request
    #[arg(long, allow_hyphen_values = true)]
    pub risk_free_rate: Option<Decimal>,
}

/// Arguments for batch analytics
#[derive(Args)]
pub struct AnalyticsBatchArgs {
    /// Path to a JSON/YAML file with one request per index
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_analytics(args: AnalyticsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut input: AnalyticsInput = read_request(&args.input)?;
    if let Some(ref path) = args.series {
        input.points = input::csv_in::read_series(path)?;
    }
    if let Some(days) = args.period_days {
        input.period_days = Some(days);
    }
    if let Some(rate) = args.risk_free_rate {
        input.risk_free_rate = rate;
    }

    let result = calculate_index_analytics(&input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_analytics_batch(args: AnalyticsBatchArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let input: AnalyticsBatchInput = read_request(&args.input)?;
    let result = calculate_analytics_batch(&input)?;
    Ok(serde_json::to_value(result)?)
}
