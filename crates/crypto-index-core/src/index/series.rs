//! Daily Index History.
//!
//! Drives the full pipeline over a bulk read of observations: build the
//! inception portfolio once, then value the index at every observed
//! timestamp from inception forward, one snapshot per day. Relies on the
//! collector's invariant that timestamps are normalized to a fixed
//! time-of-day, at most one observation per (symbol, day).
//!
//! Days where no holding has a price are skipped rather than persisted
//! as zero, so a data outage never looks like a crash in the index.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use crate::error::IndexEngineError;
use crate::index::inception::{build_inception_portfolio, InceptionInput};
use crate::index::valuation::value_portfolio;
use crate::types::*;
use crate::IndexEngineResult;

// ---------------------------------------------------------------------------
// Input / Output
// ---------------------------------------------------------------------------

/// Input for computing an index's full daily history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexHistoryInput {
    pub definition: IndexDefinition,
    /// Market data covering inception through the last day of interest.
    /// Rows for symbols outside the constituent set are ignored.
    pub observations: Vec<PriceObservation>,
    #[serde(default = "defaults::notional_investment")]
    pub notional_investment: Money,
    #[serde(default = "defaults::max_capping_iterations")]
    pub max_capping_iterations: u32,
}

/// Output of a full history computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexHistoryOutput {
    /// Snapshots in ascending timestamp order, at most one per day.
    pub snapshots: Vec<IndexSnapshot>,
    /// The portfolio backing the series. None for benchmark indexes.
    pub portfolio: Option<InceptionPortfolio>,
    /// Observed timestamps where no holding had a usable price.
    pub skipped_timestamps: Vec<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Calculation
// ---------------------------------------------------------------------------

/// Compute an index's snapshot series from raw observations.
pub fn build_index_history(
    input: &IndexHistoryInput,
) -> IndexEngineResult<ComputationOutput<IndexHistoryOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let definition = &input.definition;
    validate_history_input(input)?;

    let days = days_by_timestamp(input)?;

    let (output, methodology) = match definition.methodology {
        IndexMethodology::CappedMarketCapWeighted => (
            weighted_history(input, &days, &mut warnings)?,
            "Daily Index History (divisor-based valuation per observed day)",
        ),
        IndexMethodology::BenchmarkPrice => (
            benchmark_history(definition, &days),
            "Daily Index History (benchmark price tracking)",
        ),
    };

    if output.snapshots.is_empty() {
        warnings.push(format!(
            "no observations at or after inception for {}; history is empty",
            definition.index_symbol
        ));
    }
    if !output.skipped_timestamps.is_empty() {
        warnings.push(format!(
            "{} day(s) skipped for lack of any constituent price",
            output.skipped_timestamps.len()
        ));
    }
    let partial_days = output
        .snapshots
        .iter()
        .filter(|s| s.coverage < Decimal::ONE)
        .count();
    if partial_days > 0 {
        warnings.push(format!(
            "{} of {} day(s) valued with partial constituent coverage",
            partial_days,
            output.snapshots.len()
        ));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        methodology,
        &serde_json::json!({
            "index_symbol": definition.index_symbol,
            "constituents": definition.constituents.len(),
            "observed_days": days.len(),
            "inception_timestamp": definition.inception_timestamp.to_rfc3339(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

fn weighted_history(
    input: &IndexHistoryInput,
    days: &BTreeMap<DateTime<Utc>, BTreeMap<&str, Money>>,
    warnings: &mut Vec<String>,
) -> IndexEngineResult<IndexHistoryOutput> {
    let inception = build_inception_portfolio(&InceptionInput {
        definition: input.definition.clone(),
        observations: input.observations.clone(),
        notional_investment: input.notional_investment,
        max_capping_iterations: input.max_capping_iterations,
    })?;
    warnings.extend(inception.warnings);
    let portfolio = inception.result.portfolio;

    let mut snapshots: Vec<IndexSnapshot> = Vec::with_capacity(days.len());
    let mut skipped: Vec<DateTime<Utc>> = Vec::new();
    for (&timestamp, prices) in days {
        match value_portfolio(&portfolio, prices) {
            Ok(valuation) => snapshots.push(IndexSnapshot {
                index_symbol: portfolio.index_symbol.clone(),
                timestamp,
                value: valuation.value,
                coverage: valuation.coverage,
            }),
            Err(IndexEngineError::NoValidPrices(_)) => skipped.push(timestamp),
            Err(other) => return Err(other),
        }
    }

    Ok(IndexHistoryOutput {
        snapshots,
        portfolio: Some(portfolio),
        skipped_timestamps: skipped,
    })
}

fn benchmark_history(
    definition: &IndexDefinition,
    days: &BTreeMap<DateTime<Utc>, BTreeMap<&str, Money>>,
) -> IndexHistoryOutput {
    let tracked = definition.constituents[0].as_str();
    let mut snapshots: Vec<IndexSnapshot> = Vec::with_capacity(days.len());
    let mut skipped: Vec<DateTime<Utc>> = Vec::new();
    for (&timestamp, prices) in days {
        match prices.get(tracked) {
            Some(&price) if price > Decimal::ZERO => snapshots.push(IndexSnapshot {
                index_symbol: definition.index_symbol.clone(),
                timestamp,
                value: price,
                coverage: Decimal::ONE,
            }),
            _ => skipped.push(timestamp),
        }
    }
    IndexHistoryOutput {
        snapshots,
        portfolio: None,
        skipped_timestamps: skipped,
    }
}

/// Group constituent observations at or after inception into one price
/// map per timestamp. Rejects duplicate (symbol, timestamp) rows.
fn days_by_timestamp(
    input: &IndexHistoryInput,
) -> IndexEngineResult<BTreeMap<DateTime<Utc>, BTreeMap<&str, Money>>> {
    let members: BTreeSet<&str> = input
        .definition
        .constituents
        .iter()
        .map(|s| s.as_str())
        .collect();
    let mut days: BTreeMap<DateTime<Utc>, BTreeMap<&str, Money>> = BTreeMap::new();
    for obs in &input.observations {
        if obs.timestamp < input.definition.inception_timestamp
            || !members.contains(obs.symbol.as_str())
        {
            continue;
        }
        let day = days.entry(obs.timestamp).or_default();
        if day.insert(obs.symbol.as_str(), obs.price).is_some() {
            return Err(IndexEngineError::InvalidInput {
                field: "observations".into(),
                reason: format!(
                    "Duplicate observation for {} at {}",
                    obs.symbol, obs.timestamp
                ),
            });
        }
    }
    Ok(days)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_history_input(input: &IndexHistoryInput) -> IndexEngineResult<()> {
    let definition = &input.definition;
    if definition.constituents.is_empty() {
        return Err(IndexEngineError::InvalidInput {
            field: "definition.constituents".into(),
            reason: "Constituent set is empty".into(),
        });
    }
    if definition.methodology == IndexMethodology::BenchmarkPrice
        && definition.constituents.len() != 1
    {
        return Err(IndexEngineError::InvalidInput {
            field: "definition.constituents".into(),
            reason: "Benchmark indexes track exactly one symbol".into(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
