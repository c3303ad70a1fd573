//! Capped Market-Cap Weighting.
//!
//! Raw weight is proportional to market capitalization, subject to a
//! maximum per-constituent weight. Excess weight removed from capped
//! constituents is redistributed proportionally among the uncapped ones.
//! Redistribution can push a previously-uncapped constituent over the
//! cap (common with 2-3 dominant constituents), so the pass repeats,
//! bounded by a fixed iteration count.
//!
//! All arithmetic uses `rust_decimal::Decimal`. No `f64`.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Instant;

use crate::error::IndexEngineError;
use crate::types::*;
use crate::IndexEngineResult;

/// Renormalization trigger: drift of the weight sum from 1 beyond this
/// tolerance gets scaled back.
const WEIGHT_SUM_TOLERANCE: Decimal = dec!(0.0001);

// ---------------------------------------------------------------------------
// Input / Output
// ---------------------------------------------------------------------------

/// One (symbol, market cap) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketCapEntry {
    pub symbol: String,
    pub market_cap: Money,
}

/// Input for capped weight calculation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CappedWeightsInput {
    pub market_caps: Vec<MarketCapEntry>,
    /// Max weight per constituent, in (0, 1].
    #[serde(default = "defaults::weight_cap")]
    pub max_weight: Weight,
    #[serde(default = "defaults::max_capping_iterations")]
    pub max_iterations: u32,
}

/// A constituent weight result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstituentWeight {
    pub symbol: String,
    pub weight: Weight,
}

/// Output of capped weight calculation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CappedWeightsOutput {
    /// Weights in input order. Empty when the input is empty or the
    /// total market cap is zero.
    pub weights: Vec<ConstituentWeight>,
    /// Redistribution passes performed.
    pub iterations_used: u32,
    /// False when the iteration bound was hit with a residual over-cap
    /// weight, or when every constituent sat at/above the cap.
    pub converged: bool,
    /// Herfindahl-Hirschman index: sum((weight * 100)^2).
    pub hhi: Decimal,
    /// Effective constituent count, 10000 / HHI.
    pub effective_n: Decimal,
    pub top_5_weight: Decimal,
}

// ---------------------------------------------------------------------------
// Calculation
// ---------------------------------------------------------------------------

/// Calculate normalized portfolio weights with a per-constituent cap.
pub fn calculate_capped_weights(
    input: &CappedWeightsInput,
) -> IndexEngineResult<ComputationOutput<CappedWeightsOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_weights_input(input)?;

    let caps: Vec<Money> = input.market_caps.iter().map(|e| e.market_cap).collect();
    let outcome = match raw_market_cap_weights(&caps) {
        Some(raw) => cap_and_redistribute(&raw, input.max_weight, input.max_iterations),
        None => {
            if !input.market_caps.is_empty() {
                warnings.push("total market cap is zero; no weights computed".to_string());
            }
            CapOutcome::empty()
        }
    };
    warnings.extend(outcome.warnings(input.max_iterations));

    let weights: Vec<ConstituentWeight> = input
        .market_caps
        .iter()
        .zip(outcome.weights.iter())
        .map(|(entry, &weight)| ConstituentWeight {
            symbol: entry.symbol.clone(),
            weight,
        })
        .collect();

    let hhi: Decimal = outcome
        .weights
        .iter()
        .map(|w| {
            let pct = *w * dec!(100);
            pct * pct
        })
        .sum();
    let effective_n = if hhi.is_zero() {
        Decimal::ZERO
    } else {
        dec!(10000) / hhi
    };
    let mut sorted = outcome.weights.clone();
    sorted.sort_by(|a, b| b.cmp(a));
    let top_5_weight: Decimal = sorted.iter().take(5).copied().sum();

    let output = CappedWeightsOutput {
        weights,
        iterations_used: outcome.iterations,
        converged: outcome.converged,
        hhi,
        effective_n,
        top_5_weight,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Capped Market-Cap Weighting (iterative excess redistribution)",
        &serde_json::json!({
            "constituents": input.market_caps.len(),
            "max_weight": input.max_weight.to_string(),
            "max_iterations": input.max_iterations,
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Core algorithm
// ---------------------------------------------------------------------------

/// Result of the cap-and-redistribute loop, shared with the inception
/// engine.
#[derive(Debug, Clone)]
pub(crate) struct CapOutcome {
    /// Weights aligned with the input order.
    pub weights: Vec<Weight>,
    pub iterations: u32,
    pub converged: bool,
    /// Every constituent sat at/above the cap, so there was nowhere to
    /// redistribute; the pre-cap weights stand (sum stays 1).
    pub cap_unsatisfiable: bool,
}

impl CapOutcome {
    pub(crate) fn empty() -> Self {
        Self {
            weights: Vec::new(),
            iterations: 0,
            converged: true,
            cap_unsatisfiable: false,
        }
    }

    pub(crate) fn warnings(&self, max_iterations: u32) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.cap_unsatisfiable {
            warnings.push(
                "every constituent is at or above the cap; weights left uncapped".to_string(),
            );
        } else if !self.converged {
            warnings.push(format!(
                "weight capping did not converge within {} iterations; residual over-cap weights remain",
                max_iterations
            ));
        }
        warnings
    }
}

/// Raw market-cap-proportional weights, or None when the total is zero.
pub(crate) fn raw_market_cap_weights(market_caps: &[Money]) -> Option<Vec<Weight>> {
    let total: Money = market_caps.iter().copied().sum();
    if total.is_zero() {
        return None;
    }
    Some(market_caps.iter().map(|cap| cap / total).collect())
}

/// Iteratively cap weights at `max_weight`, redistributing the removed
/// excess among constituents that have never been capped.
///
/// Once a constituent is capped it is pinned at the cap and excluded
/// from later redistribution; that is what makes each pass strictly
/// reduce the over-cap count and the loop converge on realistic
/// distributions. Pathological inputs can still exhaust the bound, so
/// the current weights are returned either way.
pub(crate) fn cap_and_redistribute(
    raw: &[Weight],
    max_weight: Weight,
    max_iterations: u32,
) -> CapOutcome {
    let mut weights = raw.to_vec();
    let mut pinned: BTreeSet<usize> = BTreeSet::new();
    let mut iterations = 0u32;
    let mut converged = false;
    let mut cap_unsatisfiable = false;

    loop {
        let over_cap: Vec<usize> = (0..weights.len())
            .filter(|i| !pinned.contains(i) && weights[*i] > max_weight)
            .collect();
        if over_cap.is_empty() {
            converged = true;
            break;
        }

        let absorbers: Vec<usize> = (0..weights.len())
            .filter(|i| !pinned.contains(i) && !over_cap.contains(i))
            .collect();
        if absorbers.is_empty() {
            // The cap cannot be satisfied for all; accept the current
            // weights rather than break the sum-to-one invariant.
            cap_unsatisfiable = true;
            break;
        }

        if iterations == max_iterations {
            break;
        }
        iterations += 1;

        let mut excess = Decimal::ZERO;
        for &i in &over_cap {
            excess += weights[i] - max_weight;
            weights[i] = max_weight;
            pinned.insert(i);
        }

        let absorber_total: Decimal = absorbers.iter().map(|&i| weights[i]).sum();
        if absorber_total.is_zero() {
            // Zero-weight absorbers: split the excess equally.
            let share = excess / Decimal::from(absorbers.len() as i64);
            for &i in &absorbers {
                weights[i] += share;
            }
        } else {
            let scale = excess / absorber_total;
            for &i in &absorbers {
                let delta = weights[i] * scale;
                weights[i] += delta;
            }
        }

        let total: Decimal = weights.iter().copied().sum();
        if !total.is_zero() && (total - Decimal::ONE).abs() > WEIGHT_SUM_TOLERANCE {
            for w in weights.iter_mut() {
                *w /= total;
            }
        }
    }

    CapOutcome {
        weights,
        iterations,
        converged,
        cap_unsatisfiable,
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_weights_input(input: &CappedWeightsInput) -> IndexEngineResult<()> {
    if input.max_weight <= Decimal::ZERO || input.max_weight > Decimal::ONE {
        return Err(IndexEngineError::InvalidInput {
            field: "max_weight".into(),
            reason: "Cap must be a fraction in (0, 1]".into(),
        });
    }
    if input.max_iterations == 0 {
        return Err(IndexEngineError::InvalidInput {
            field: "max_iterations".into(),
            reason: "At least one capping iteration is required".into(),
        });
    }
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    for entry in &input.market_caps {
        if entry.market_cap < Decimal::ZERO {
            return Err(IndexEngineError::InvalidInput {
                field: "market_caps".into(),
                reason: format!("Negative market cap for {}", entry.symbol),
            });
        }
        if !seen.insert(entry.symbol.as_str()) {
            return Err(IndexEngineError::InvalidInput {
                field: "market_caps".into(),
                reason: format!("Duplicate symbol {}", entry.symbol),
            });
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
