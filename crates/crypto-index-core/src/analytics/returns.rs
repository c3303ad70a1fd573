//! Return and volatility computations.
//!
//! Everything here is a pure function of an ordered value or return
//! sequence. Annualization uses 365 periods by default (crypto markets
//! have no closed sessions).

use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use serde::{Deserialize, Serialize};

/// Day-over-day fractional changes: `(v[i] - v[i-1]) / v[i-1]`.
///
/// A zero previous value yields a 0 return for that step rather than a
/// division error.
pub fn daily_returns(values: &[Decimal]) -> Vec<Decimal> {
    values
        .windows(2)
        .map(|pair| {
            if pair[0].is_zero() {
                Decimal::ZERO
            } else {
                (pair[1] - pair[0]) / pair[0]
            }
        })
        .collect()
}

/// `(last - first) / first`; 0 when fewer than 2 points or the first
/// value is 0.
pub fn total_return(values: &[Decimal]) -> Decimal {
    match (values.first(), values.last()) {
        (Some(first), Some(last)) if values.len() >= 2 && !first.is_zero() => {
            (last - first) / first
        }
        _ => Decimal::ZERO,
    }
}

/// `(annualized_return - risk_free_rate) / annualized_volatility`;
/// 0 on a flat series (zero volatility), not infinite.
pub fn sharpe_ratio(
    annualized_return: Decimal,
    annualized_volatility: Decimal,
    risk_free_rate: Decimal,
) -> Decimal {
    if annualized_volatility.is_zero() {
        Decimal::ZERO
    } else {
        (annualized_return - risk_free_rate) / annualized_volatility
    }
}

/// Sortino ratio, with the downside-free case kept distinct instead of
/// being folded into an arbitrary large number. Serialization of
/// `Unbounded` is the boundary layer's decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortinoRatio {
    Finite(Decimal),
    Unbounded,
}

impl SortinoRatio {
    pub fn is_unbounded(&self) -> bool {
        matches!(self, SortinoRatio::Unbounded)
    }
}

/// `(annualized_return - risk_free_rate) / annualized_downside_deviation`.
///
/// With zero downside deviation the ratio is `Unbounded` when the
/// excess return is positive, and a defined 0 otherwise.
pub fn sortino_ratio(
    annualized_return: Decimal,
    annualized_downside_deviation: Decimal,
    risk_free_rate: Decimal,
) -> SortinoRatio {
    if annualized_downside_deviation.is_zero() {
        if annualized_return > risk_free_rate {
            SortinoRatio::Unbounded
        } else {
            SortinoRatio::Finite(Decimal::ZERO)
        }
    } else {
        SortinoRatio::Finite(
            (annualized_return - risk_free_rate) / annualized_downside_deviation,
        )
    }
}

/// Mean of a sequence; 0 on empty input.
pub(crate) fn mean(data: &[Decimal]) -> Decimal {
    if data.is_empty() {
        return Decimal::ZERO;
    }
    let sum: Decimal = data.iter().sum();
    sum / Decimal::from(data.len() as i64)
}

/// Sample variance (n-1 denominator)
pub(crate) fn sample_variance(data: &[Decimal], mean: Decimal) -> Decimal {
    let n = data.len();
    if n < 2 {
        return Decimal::ZERO;
    }
    let sum_sq: Decimal = data.iter().map(|x| (x - mean) * (x - mean)).sum();
    sum_sq / Decimal::from((n - 1) as i64)
}

/// Downside deviation below `threshold`, penalizing the full sample:
/// only below-threshold deviations enter the numerator, but the divisor
/// is the full sample count (standard Sortino convention).
pub(crate) fn downside_deviation(returns: &[Decimal], threshold: Decimal) -> Decimal {
    let n = returns.len();
    if n == 0 {
        return Decimal::ZERO;
    }
    let sum_sq: Decimal = returns
        .iter()
        .map(|r| {
            let diff = r - threshold;
            if diff < Decimal::ZERO {
                diff * diff
            } else {
                Decimal::ZERO
            }
        })
        .sum();
    sqrt_decimal(sum_sq / Decimal::from(n as i64))
}

/// Decimal square root; 0 for negative input (variances are never
/// negative, so this only absorbs rounding residue).
pub(crate) fn sqrt_decimal(value: Decimal) -> Decimal {
    value.sqrt().unwrap_or(Decimal::ZERO)
}
