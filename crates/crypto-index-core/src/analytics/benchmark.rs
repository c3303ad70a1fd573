//! Benchmark relation metrics: beta, correlation, R².

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::analytics::returns::{mean, sample_variance, sqrt_decimal};

/// How an index's returns co-move with one benchmark's returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetaMetrics {
    /// Sample covariance over benchmark sample variance; 0 when the
    /// benchmark is flat.
    pub beta: Decimal,
    /// 0 when either series is flat.
    pub correlation: Decimal,
    pub r_squared: Decimal,
    /// Return pairs the metrics were computed over.
    pub observations: usize,
}

/// Compute beta/correlation/R² for two return sequences, truncated to
/// the shorter length and aligned from the start. `None` when fewer
/// than 2 common observations exist.
pub fn beta_metrics(index_returns: &[Decimal], benchmark_returns: &[Decimal]) -> Option<BetaMetrics> {
    let n = index_returns.len().min(benchmark_returns.len());
    if n < 2 {
        return None;
    }
    let xs = &index_returns[..n];
    let ys = &benchmark_returns[..n];

    let mean_x = mean(xs);
    let mean_y = mean(ys);
    let cov = covariance(xs, ys, mean_x, mean_y);
    let var_x = sample_variance(xs, mean_x);
    let var_y = sample_variance(ys, mean_y);

    let beta = if var_y.is_zero() {
        Decimal::ZERO
    } else {
        cov / var_y
    };

    let sd_x = sqrt_decimal(var_x);
    let sd_y = sqrt_decimal(var_y);
    let correlation = if sd_x.is_zero() || sd_y.is_zero() {
        Decimal::ZERO
    } else {
        cov / (sd_x * sd_y)
    };

    Some(BetaMetrics {
        beta,
        correlation,
        r_squared: correlation * correlation,
        observations: n,
    })
}

/// Sample covariance (n-1 denominator)
fn covariance(xs: &[Decimal], ys: &[Decimal], mean_x: Decimal, mean_y: Decimal) -> Decimal {
    let n = xs.len();
    if n < 2 {
        return Decimal::ZERO;
    }
    let sum: Decimal = xs
        .iter()
        .zip(ys.iter())
        .map(|(x, y)| (x - mean_x) * (y - mean_y))
        .sum();
    sum / Decimal::from((n - 1) as i64)
}
