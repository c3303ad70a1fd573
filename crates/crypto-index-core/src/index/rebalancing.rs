//! Rebalancing / Reconstitution.
//!
//! Replaces the basket at an explicit boundary while keeping the index
//! value continuous. The old holdings are valued at the boundary, the
//! proceeds are notionally reinvested into the new capped weights, and
//! the divisor is chained: `new_divisor = old_divisor × new_raw_value /
//! old_raw_value`. Published index values before and after the boundary
//! therefore meet at the same number.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use crate::error::IndexEngineError;
use crate::index::inception::{latest_quotes_at, validate_unique_observations};
use crate::index::valuation::value_portfolio;
use crate::index::weighting::{cap_and_redistribute, raw_market_cap_weights};
use crate::types::*;
use crate::IndexEngineResult;

// ---------------------------------------------------------------------------
// Input / Output
// ---------------------------------------------------------------------------

/// Input for a rebalancing event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebalanceInput {
    /// The portfolio being retired.
    pub portfolio: InceptionPortfolio,
    /// The new constituent set, in basket order.
    pub constituents: Vec<String>,
    /// Market data covering the boundary timestamp for both the old
    /// holdings and the new constituents.
    pub observations: Vec<PriceObservation>,
    pub timestamp: DateTime<Utc>,
    #[serde(default = "defaults::weight_cap")]
    pub weight_cap: Weight,
    #[serde(default = "defaults::max_capping_iterations")]
    pub max_capping_iterations: u32,
}

/// Output of a rebalancing event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebalanceOutput {
    /// The replacement portfolio, anchored at the boundary timestamp.
    pub portfolio: InceptionPortfolio,
    /// Index value carried across the boundary.
    pub index_value: Decimal,
    pub old_divisor: Decimal,
    pub new_divisor: Decimal,
    /// New constituents dropped for missing or unusable boundary data.
    pub skipped_constituents: Vec<String>,
}

// ---------------------------------------------------------------------------
// Calculation
// ---------------------------------------------------------------------------

/// Rebalance an index into a new constituent set at one timestamp.
pub fn rebalance_portfolio(
    input: &RebalanceInput,
) -> IndexEngineResult<ComputationOutput<RebalanceOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_rebalance_input(input)?;

    let quotes = latest_quotes_at(&input.observations, input.timestamp);
    let prices: BTreeMap<&str, Money> = quotes
        .iter()
        .map(|(&symbol, obs)| (symbol, obs.price))
        .collect();

    // Value the outgoing basket at the boundary.
    let old_valuation = value_portfolio(&input.portfolio, &prices)?;
    let old_raw_value = old_valuation.value * input.portfolio.divisor;
    if old_valuation.coverage < Decimal::ONE {
        warnings.push(format!(
            "outgoing basket valued with partial coverage ({}) at the boundary",
            old_valuation.coverage
        ));
    }

    // Capped weights for the incoming basket.
    let mut usable: Vec<(&str, Money, Money)> = Vec::new();
    let mut skipped: Vec<String> = Vec::new();
    for symbol in &input.constituents {
        match quotes.get(symbol.as_str()) {
            Some(obs) if obs.price > Decimal::ZERO && obs.market_cap > Decimal::ZERO => {
                usable.push((symbol.as_str(), obs.price, obs.market_cap));
            }
            _ => skipped.push(symbol.clone()),
        }
    }
    if usable.is_empty() {
        return Err(IndexEngineError::InsufficientInceptionData(format!(
            "No new constituent of {} has usable data at the rebalance boundary",
            input.portfolio.index_symbol
        )));
    }
    if !skipped.is_empty() {
        warnings.push(format!(
            "{} new constituent(s) skipped at the boundary for missing data: {}",
            skipped.len(),
            skipped.join(", ")
        ));
    }

    let caps: Vec<Money> = usable.iter().map(|(_, _, cap)| *cap).collect();
    let raw = raw_market_cap_weights(&caps).ok_or_else(|| {
        IndexEngineError::InsufficientInceptionData(format!(
            "Total market cap of the new {} basket is zero",
            input.portfolio.index_symbol
        ))
    })?;
    let outcome = cap_and_redistribute(&raw, input.weight_cap, input.max_capping_iterations);
    warnings.extend(outcome.warnings(input.max_capping_iterations));

    // Reinvest the outgoing basket's raw value into the new weights.
    let mut holdings: Vec<Holding> = Vec::with_capacity(usable.len());
    let mut new_raw_value = Decimal::ZERO;
    for ((symbol, price, _), &weight) in usable.iter().zip(outcome.weights.iter()) {
        let shares = old_raw_value * weight / price;
        new_raw_value += shares * price;
        holdings.push(Holding {
            symbol: (*symbol).to_string(),
            weight,
            shares,
            inception_price: *price,
        });
    }
    if new_raw_value <= Decimal::ZERO {
        return Err(IndexEngineError::InsufficientInceptionData(format!(
            "New {} basket values to zero at the boundary",
            input.portfolio.index_symbol
        )));
    }

    let new_divisor = input.portfolio.divisor * new_raw_value / old_raw_value;

    let output = RebalanceOutput {
        portfolio: InceptionPortfolio {
            index_symbol: input.portfolio.index_symbol.clone(),
            inception_timestamp: input.timestamp,
            holdings,
            divisor: new_divisor,
            base_value: input.portfolio.base_value,
        },
        index_value: old_valuation.value,
        old_divisor: input.portfolio.divisor,
        new_divisor,
        skipped_constituents: skipped,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Divisor Continuity Adjustment (chained divisor across reconstitution)",
        &serde_json::json!({
            "index_symbol": input.portfolio.index_symbol,
            "outgoing_holdings": input.portfolio.holdings.len(),
            "incoming_constituents": input.constituents.len(),
            "weight_cap": input.weight_cap.to_string(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_rebalance_input(input: &RebalanceInput) -> IndexEngineResult<()> {
    if input.portfolio.divisor <= Decimal::ZERO {
        return Err(IndexEngineError::InvalidInput {
            field: "portfolio.divisor".into(),
            reason: "Divisor must be positive".into(),
        });
    }
    if input.timestamp < input.portfolio.inception_timestamp {
        return Err(IndexEngineError::InvalidInput {
            field: "timestamp".into(),
            reason: "Rebalance precedes the portfolio's inception".into(),
        });
    }
    if input.constituents.is_empty() {
        return Err(IndexEngineError::InvalidInput {
            field: "constituents".into(),
            reason: "New constituent set is empty".into(),
        });
    }
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    for symbol in &input.constituents {
        if !seen.insert(symbol.as_str()) {
            return Err(IndexEngineError::InvalidInput {
                field: "constituents".into(),
                reason: format!("Duplicate constituent {}", symbol),
            });
        }
    }
    validate_unique_observations(&input.observations)?;
    if input.weight_cap <= Decimal::ZERO || input.weight_cap > Decimal::ONE {
        return Err(IndexEngineError::InvalidInput {
            field: "weight_cap".into(),
            reason: "Cap must be a fraction in (0, 1]".into(),
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

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
