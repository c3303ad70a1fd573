//! Inception Portfolio Construction.
//!
//! Converts capped market-cap weights plus a notional investment amount
//! into a fixed number of shares per constituent, and computes the index
//! divisor such that the index value equals the configured base value at
//! the inception timestamp. Shares and divisor are immutable for the
//! life of the index absent an explicit rebalancing event.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::time::Instant;

use crate::error::IndexEngineError;
use crate::index::weighting::{cap_and_redistribute, raw_market_cap_weights};
use crate::types::*;
use crate::IndexEngineResult;

// ---------------------------------------------------------------------------
// Input / Output
// ---------------------------------------------------------------------------

/// Input for inception portfolio construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InceptionInput {
    pub definition: IndexDefinition,
    /// Market data covering the inception timestamp. Rows for symbols
    /// outside the constituent set are ignored.
    pub observations: Vec<PriceObservation>,
    /// Scale constant for share counts; cancels out of the index value.
    #[serde(default = "defaults::notional_investment")]
    pub notional_investment: Money,
    #[serde(default = "defaults::max_capping_iterations")]
    pub max_capping_iterations: u32,
}

/// Output of inception portfolio construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InceptionOutput {
    pub portfolio: InceptionPortfolio,
    /// Constituents dropped for missing or unusable inception data.
    pub skipped_constituents: Vec<String>,
    pub capping_iterations: u32,
    pub capping_converged: bool,
}

// ---------------------------------------------------------------------------
// Calculation
// ---------------------------------------------------------------------------

/// Build the inception portfolio for a capped market-cap-weighted index.
///
/// Constituents without a usable inception observation (positive price
/// and positive market cap at or before the inception timestamp) are
/// skipped with a warning; failing only when none survive.
pub fn build_inception_portfolio(
    input: &InceptionInput,
) -> IndexEngineResult<ComputationOutput<InceptionOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_inception_input(input)?;
    let definition = &input.definition;

    let quotes = latest_quotes_at(&input.observations, definition.inception_timestamp);

    let mut usable: Vec<(&str, Money, Money)> = Vec::new();
    let mut skipped: Vec<String> = Vec::new();
    for symbol in &definition.constituents {
        match quotes.get(symbol.as_str()) {
            Some(obs) if obs.price > Decimal::ZERO && obs.market_cap > Decimal::ZERO => {
                usable.push((symbol.as_str(), obs.price, obs.market_cap));
            }
            _ => skipped.push(symbol.clone()),
        }
    }

    if usable.is_empty() {
        return Err(IndexEngineError::InsufficientInceptionData(format!(
            "No constituent of {} has a usable price and market cap at inception",
            definition.index_symbol
        )));
    }
    if !skipped.is_empty() {
        warnings.push(format!(
            "{} constituent(s) skipped at inception for missing data: {}",
            skipped.len(),
            skipped.join(", ")
        ));
    }

    let caps: Vec<Money> = usable.iter().map(|(_, _, cap)| *cap).collect();
    let raw = raw_market_cap_weights(&caps).ok_or_else(|| {
        IndexEngineError::InsufficientInceptionData(format!(
            "Total inception market cap for {} is zero",
            definition.index_symbol
        ))
    })?;
    let outcome = cap_and_redistribute(&raw, definition.weight_cap, input.max_capping_iterations);
    warnings.extend(outcome.warnings(input.max_capping_iterations));

    let mut holdings: Vec<Holding> = Vec::with_capacity(usable.len());
    let mut portfolio_value = Decimal::ZERO;
    for ((symbol, price, _), &weight) in usable.iter().zip(outcome.weights.iter()) {
        let shares = input.notional_investment * weight / price;
        portfolio_value += shares * price;
        holdings.push(Holding {
            symbol: (*symbol).to_string(),
            weight,
            shares,
            inception_price: *price,
        });
    }

    if portfolio_value <= Decimal::ZERO {
        return Err(IndexEngineError::InsufficientInceptionData(format!(
            "Inception portfolio value for {} is zero",
            definition.index_symbol
        )));
    }
    let divisor = portfolio_value / definition.base_value;

    let output = InceptionOutput {
        portfolio: InceptionPortfolio {
            index_symbol: definition.index_symbol.clone(),
            inception_timestamp: definition.inception_timestamp,
            holdings,
            divisor,
            base_value: definition.base_value,
        },
        skipped_constituents: skipped,
        capping_iterations: outcome.iterations,
        capping_converged: outcome.converged,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Divisor-Based Index Inception (fixed shares, divisor maps portfolio value to base value)",
        &serde_json::json!({
            "index_symbol": definition.index_symbol,
            "constituents": definition.constituents.len(),
            "priced_constituents": output.portfolio.holdings.len(),
            "base_value": definition.base_value.to_string(),
            "weight_cap": definition.weight_cap.to_string(),
            "notional_investment": input.notional_investment.to_string(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Quote selection
// ---------------------------------------------------------------------------

/// Latest observation per symbol at or before `cutoff`.
///
/// The collector records at most one observation per (symbol, day), so
/// "latest at or before" picks each symbol's row for the cutoff day when
/// one exists, or its most recent prior day otherwise.
pub(crate) fn latest_quotes_at(
    observations: &[PriceObservation],
    cutoff: DateTime<Utc>,
) -> BTreeMap<&str, &PriceObservation> {
    let mut quotes: BTreeMap<&str, &PriceObservation> = BTreeMap::new();
    for obs in observations {
        if obs.timestamp > cutoff {
            continue;
        }
        match quotes.get(obs.symbol.as_str()) {
            Some(existing) if existing.timestamp >= obs.timestamp => {}
            _ => {
                quotes.insert(obs.symbol.as_str(), obs);
            }
        }
    }
    quotes
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_inception_input(input: &InceptionInput) -> IndexEngineResult<()> {
    let definition = &input.definition;
    if definition.methodology != IndexMethodology::CappedMarketCapWeighted {
        return Err(IndexEngineError::InvalidInput {
            field: "definition.methodology".into(),
            reason: "Inception portfolios apply to capped market-cap-weighted indexes only".into(),
        });
    }
    if definition.constituents.is_empty() {
        return Err(IndexEngineError::InvalidInput {
            field: "definition.constituents".into(),
            reason: "Constituent set is empty".into(),
        });
    }
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    for symbol in &definition.constituents {
        if !seen.insert(symbol.as_str()) {
            return Err(IndexEngineError::InvalidInput {
                field: "definition.constituents".into(),
                reason: format!("Duplicate constituent {}", symbol),
            });
        }
    }
    if definition.base_value <= Decimal::ZERO {
        return Err(IndexEngineError::InvalidInput {
            field: "definition.base_value".into(),
            reason: "Base value must be positive".into(),
        });
    }
    if definition.weight_cap <= Decimal::ZERO || definition.weight_cap > Decimal::ONE {
        return Err(IndexEngineError::InvalidInput {
            field: "definition.weight_cap".into(),
            reason: "Cap must be a fraction in (0, 1]".into(),
        });
    }
    validate_unique_observations(&input.observations)?;
    if input.notional_investment <= Decimal::ZERO {
        return Err(IndexEngineError::InvalidInput {
            field: "notional_investment".into(),
            reason: "Notional investment must be positive".into(),
        });
    }
    if input.max_capping_iterations == 0 {
        return Err(IndexEngineError::InvalidInput {
            field: "max_capping_iterations".into(),
            reason: "At least one capping iteration is required".into(),
        });
    }
    Ok(())
}

/// Reject observation sets carrying more than one row per
/// (symbol, timestamp). Quote selection keeps a single row per symbol,
/// and a tie at the same instant has no well-defined winner.
pub(crate) fn validate_unique_observations(
    observations: &[PriceObservation],
) -> IndexEngineResult<()> {
    let mut seen: BTreeSet<(&str, DateTime<Utc>)> = BTreeSet::new();
    for obs in observations {
        if !seen.insert((obs.symbol.as_str(), obs.timestamp)) {
            return Err(IndexEngineError::InvalidInput {
                field: "observations".into(),
                reason: format!(
                    "Duplicate observation for {} at {}",
                    obs.symbol, obs.timestamp
                ),
            });
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
