//! Full analytics report over an index value series.
//!
//! One call produces the complete derived record for an (index, period)
//! pair: total return, volatility, Sharpe/Sortino, max drawdown, and
//! beta/correlation/R² against each supplied benchmark. The report is
//! fully determined by the input series, so callers may discard and
//! recompute it at will.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Instant;

use crate::analytics::benchmark::beta_metrics;
use crate::analytics::drawdown::{max_drawdown, MaxDrawdown};
use crate::analytics::returns::{
    daily_returns, downside_deviation, mean, sample_variance, sharpe_ratio, sortino_ratio,
    sqrt_decimal, total_return, SortinoRatio,
};
use crate::error::IndexEngineError;
use crate::types::*;
use crate::IndexEngineResult;

// ---------------------------------------------------------------------------
// Input / Output
// ---------------------------------------------------------------------------

/// One benchmark's value series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkSeries {
    pub symbol: String,
    pub points: Vec<SeriesPoint>,
}

/// Input for one (index, period) analytics computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsInput {
    pub index_symbol: String,
    /// The stored snapshot series; order does not matter, duplicate
    /// timestamps do.
    pub points: Vec<SeriesPoint>,
    /// Window in days back from the latest observation. None means the
    /// full series.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period_days: Option<i64>,
    #[serde(default = "defaults::risk_free_rate")]
    pub risk_free_rate: Rate,
    #[serde(default = "defaults::trading_days_per_year")]
    pub trading_days_per_year: Decimal,
    #[serde(default = "defaults::downside_threshold")]
    pub downside_threshold: Decimal,
    #[serde(default)]
    pub benchmarks: Vec<BenchmarkSeries>,
}

/// Co-movement of the index with one benchmark over the window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkRelation {
    pub benchmark_symbol: String,
    pub beta: Decimal,
    pub correlation: Decimal,
    pub r_squared: Decimal,
    pub observations: usize,
}

/// The derived analytics record for one (index, period) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexAnalytics {
    pub index_symbol: String,
    pub period_days: Option<i64>,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub data_points: usize,
    pub total_return: Rate,
    pub annualized_return: Rate,
    pub daily_volatility: Rate,
    pub annualized_volatility: Rate,
    pub sharpe_ratio: Decimal,
    pub sortino_ratio: SortinoRatio,
    /// Annualized, below the configured threshold.
    pub downside_deviation: Rate,
    /// Annualized return over |max drawdown|; None when no drawdown.
    pub calmar_ratio: Option<Decimal>,
    pub max_drawdown: MaxDrawdown,
    pub benchmarks: Vec<BenchmarkRelation>,
}

// ---------------------------------------------------------------------------
// Calculation
// ---------------------------------------------------------------------------

/// Compute the full analytics report for one index over one window.
pub fn calculate_index_analytics(
    input: &AnalyticsInput,
) -> IndexEngineResult<ComputationOutput<IndexAnalytics>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_analytics_input(input)?;

    let series = sorted_series(&input.points, "points")?;
    let windowed = window_series(&series, input.period_days);
    if windowed.len() < 2 {
        return Err(IndexEngineError::InsufficientData(format!(
            "{} has {} point(s) in the requested window; at least 2 required",
            input.index_symbol,
            windowed.len()
        )));
    }
    let window_start = windowed[0].timestamp;
    let window_end = windowed[windowed.len() - 1].timestamp;

    let values: Vec<Decimal> = windowed.iter().map(|p| p.value).collect();
    let returns = daily_returns(&values);
    let periods = input.trading_days_per_year;

    let mean_return = mean(&returns);
    let annualized_return = mean_return * periods;

    let daily_volatility = sqrt_decimal(sample_variance(&returns, mean_return));
    let annualized_volatility = daily_volatility * sqrt_decimal(periods);
    let sharpe = sharpe_ratio(annualized_return, annualized_volatility, input.risk_free_rate);

    let downside_daily = downside_deviation(&returns, input.downside_threshold);
    let downside_annualized = downside_daily * sqrt_decimal(periods);
    let sortino = sortino_ratio(annualized_return, downside_annualized, input.risk_free_rate);

    let drawdown = max_drawdown(&windowed);
    let calmar_ratio = if drawdown.drawdown.is_zero() {
        None
    } else {
        Some(annualized_return / drawdown.drawdown.abs())
    };

    let mut relations: Vec<BenchmarkRelation> = Vec::new();
    for bench in &input.benchmarks {
        let sorted = sorted_series(&bench.points, "benchmarks")?;
        let bench_values: Vec<Decimal> = sorted
            .iter()
            .filter(|p| p.timestamp >= window_start && p.timestamp <= window_end)
            .map(|p| p.value)
            .collect();
        match beta_metrics(&returns, &daily_returns(&bench_values)) {
            Some(metrics) => relations.push(BenchmarkRelation {
                benchmark_symbol: bench.symbol.clone(),
                beta: metrics.beta,
                correlation: metrics.correlation,
                r_squared: metrics.r_squared,
                observations: metrics.observations,
            }),
            None => warnings.push(format!(
                "benchmark {} has fewer than 2 overlapping observations in the window; skipped",
                bench.symbol
            )),
        }
    }

    let output = IndexAnalytics {
        index_symbol: input.index_symbol.clone(),
        period_days: input.period_days,
        window_start,
        window_end,
        data_points: windowed.len(),
        total_return: total_return(&values),
        annualized_return,
        daily_volatility,
        annualized_volatility,
        sharpe_ratio: sharpe,
        sortino_ratio: sortino,
        downside_deviation: downside_annualized,
        calmar_ratio,
        max_drawdown: drawdown,
        benchmarks: relations,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Index Performance Analytics (returns, volatility, Sharpe/Sortino, drawdown, benchmark relations)",
        &serde_json::json!({
            "index_symbol": input.index_symbol,
            "period_days": input.period_days,
            "risk_free_rate": input.risk_free_rate.to_string(),
            "trading_days_per_year": input.trading_days_per_year.to_string(),
            "downside_threshold": input.downside_threshold.to_string(),
            "benchmarks": input.benchmarks.len(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Batch
// ---------------------------------------------------------------------------

/// Input for analytics over many (index, period) pairs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsBatchInput {
    pub requests: Vec<AnalyticsInput>,
}

/// One batch slot: either the analytics record or the failure that
/// replaced it. One index's data gap never blocks the others.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsBatchItem {
    pub index_symbol: String,
    pub period_days: Option<i64>,
    pub analytics: Option<IndexAnalytics>,
    pub error: Option<String>,
    pub warnings: Vec<String>,
}

/// Output of a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsBatchOutput {
    pub items: Vec<AnalyticsBatchItem>,
    pub computed: usize,
    pub failed: usize,
}

/// Run analytics for each request independently. Requests are pure and
/// isolated, so callers may also fan them out across threads and join.
pub fn calculate_analytics_batch(
    input: &AnalyticsBatchInput,
) -> IndexEngineResult<ComputationOutput<AnalyticsBatchOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let mut items: Vec<AnalyticsBatchItem> = Vec::with_capacity(input.requests.len());
    let mut computed = 0usize;
    let mut failed = 0usize;
    for request in &input.requests {
        match calculate_index_analytics(request) {
            Ok(out) => {
                computed += 1;
                items.push(AnalyticsBatchItem {
                    index_symbol: request.index_symbol.clone(),
                    period_days: request.period_days,
                    analytics: Some(out.result),
                    error: None,
                    warnings: out.warnings,
                });
            }
            Err(err) => {
                failed += 1;
                items.push(AnalyticsBatchItem {
                    index_symbol: request.index_symbol.clone(),
                    period_days: request.period_days,
                    analytics: None,
                    error: Some(err.to_string()),
                    warnings: Vec::new(),
                });
            }
        }
    }
    if failed > 0 {
        warnings.push(format!(
            "{} of {} analytics request(s) not computable",
            failed,
            input.requests.len()
        ));
    }

    let output = AnalyticsBatchOutput {
        items,
        computed,
        failed,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Index Analytics Batch (independent per-index computation)",
        &serde_json::json!({ "requests": input.requests.len() }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Windowing
// ---------------------------------------------------------------------------

/// Ascending copy of the series; duplicate timestamps are rejected to
/// keep period lookups well defined.
fn sorted_series(points: &[SeriesPoint], field: &str) -> IndexEngineResult<Vec<SeriesPoint>> {
    let mut sorted = points.to_vec();
    sorted.sort_by_key(|p| p.timestamp);
    for pair in sorted.windows(2) {
        if pair[0].timestamp == pair[1].timestamp {
            return Err(IndexEngineError::InvalidInput {
                field: field.into(),
                reason: format!("Duplicate timestamp {}", pair[0].timestamp),
            });
        }
    }
    Ok(sorted)
}

/// Keep points within `period_days` of the latest observation; the full
/// series when no period is given.
fn window_series(sorted: &[SeriesPoint], period_days: Option<i64>) -> Vec<SeriesPoint> {
    match (period_days, sorted.last()) {
        (Some(days), Some(latest)) => {
            // A window reaching past the representable time range starts
            // before every point, so it degrades to the full series.
            let cutoff = Duration::try_days(days)
                .and_then(|window| latest.timestamp.checked_sub_signed(window));
            match cutoff {
                Some(cutoff) => sorted
                    .iter()
                    .filter(|p| p.timestamp >= cutoff)
                    .cloned()
                    .collect(),
                None => sorted.to_vec(),
            }
        }
        _ => sorted.to_vec(),
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_analytics_input(input: &AnalyticsInput) -> IndexEngineResult<()> {
    if let Some(days) = input.period_days {
        if days < 1 {
            return Err(IndexEngineError::InvalidInput {
                field: "period_days".into(),
                reason: "Period must be at least 1 day".into(),
            });
        }
    }
    if input.trading_days_per_year <= Decimal::ZERO {
        return Err(IndexEngineError::InvalidInput {
            field: "trading_days_per_year".into(),
            reason: "Annualization period count must be positive".into(),
        });
    }
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    for series in &input.benchmarks {
        if !seen.insert(series.symbol.as_str()) {
            return Err(IndexEngineError::InvalidInput {
                field: "benchmarks".into(),
                reason: format!("Duplicate benchmark {}", series.symbol),
            });
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn day(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap() + Duration::days(n)
    }

    fn series(values: &[Decimal]) -> Vec<SeriesPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| SeriesPoint::new(day(i as i64), v))
            .collect()
    }

    fn analytics_input(points: Vec<SeriesPoint>) -> AnalyticsInput {
        AnalyticsInput {
            index_symbol: "TOP-MCW".into(),
            points,
            period_days: None,
            risk_free_rate: dec!(0.05),
            trading_days_per_year: dec!(365),
            downside_threshold: Decimal::ZERO,
            benchmarks: Vec::new(),
        }
    }

    #[test]
    fn test_full_report_over_rising_series() {
        let mut input = analytics_input(series(&[
            dec!(1000),
            dec!(1020),
            dec!(990),
            dec!(1050),
        ]));
        input.benchmarks = vec![BenchmarkSeries {
            symbol: "BTC".into(),
            points: series(&[dec!(50000), dec!(51000), dec!(49000), dec!(52600)]),
        }];
        let out = calculate_index_analytics(&input).unwrap();
        let report = &out.result;

        assert_eq!(report.data_points, 4);
        assert_eq!(report.window_start, day(0));
        assert_eq!(report.window_end, day(3));
        assert_eq!(report.total_return, dec!(0.05));
        assert!(report.annualized_volatility > Decimal::ZERO);
        // Peak 1020, trough 990
        assert!((report.max_drawdown.drawdown - dec!(-0.0294117647)).abs() < dec!(0.0000001));
        assert_eq!(report.benchmarks.len(), 1);
        assert_eq!(report.benchmarks[0].observations, 3);
        assert!(report.benchmarks[0].beta > Decimal::ZERO);
        assert!(report.calmar_ratio.is_some());
    }

    #[test]
    fn test_window_keeps_recent_points_only() {
        // 10 daily points; a 3-day window back from day 9 keeps days 6-9
        let values: Vec<Decimal> = (0..10).map(|i| Decimal::from(1000 + i)).collect();
        let mut input = analytics_input(series(&values));
        input.period_days = Some(3);
        let out = calculate_index_analytics(&input).unwrap();
        assert_eq!(out.result.data_points, 4);
        assert_eq!(out.result.window_start, day(6));
        assert_eq!(out.result.window_end, day(9));
        assert_eq!(out.result.period_days, Some(3));
    }

    #[test]
    fn test_window_past_representable_time_keeps_everything() {
        // A billion-day window reaches past the representable datetime
        // range; the cutoff precedes every point, so all of them stay.
        let mut input = analytics_input(series(&[dec!(1000), dec!(1100), dec!(1210)]));
        input.period_days = Some(1_000_000_000);
        let out = calculate_index_analytics(&input).unwrap();
        assert_eq!(out.result.data_points, 3);
        assert_eq!(out.result.window_start, day(0));
        assert_eq!(out.result.window_end, day(2));
        assert_eq!(out.result.period_days, Some(1_000_000_000));
    }

    #[test]
    fn test_flat_series_yields_zero_sentinels() {
        let out = calculate_index_analytics(&analytics_input(series(&[
            dec!(1000),
            dec!(1000),
            dec!(1000),
        ])))
        .unwrap();
        let report = &out.result;
        assert_eq!(report.annualized_volatility, Decimal::ZERO);
        assert_eq!(report.sharpe_ratio, Decimal::ZERO);
        assert_eq!(report.sortino_ratio, SortinoRatio::Finite(Decimal::ZERO));
        assert_eq!(report.max_drawdown.drawdown, Decimal::ZERO);
        assert!(report.calmar_ratio.is_none());
    }

    #[test]
    fn test_rising_series_without_losses_has_unbounded_sortino() {
        let out = calculate_index_analytics(&analytics_input(series(&[
            dec!(1000),
            dec!(1010),
            dec!(1025),
        ])))
        .unwrap();
        assert!(out.result.sortino_ratio.is_unbounded());
    }

    #[test]
    fn test_single_point_is_insufficient() {
        let result = calculate_index_analytics(&analytics_input(series(&[dec!(1000)])));
        assert!(matches!(result, Err(IndexEngineError::InsufficientData(_))));
    }

    #[test]
    fn test_two_points_compute_degenerate_but_defined_metrics() {
        let out =
            calculate_index_analytics(&analytics_input(series(&[dec!(1000), dec!(1000)]))).unwrap();
        let report = &out.result;
        assert_eq!(report.total_return, Decimal::ZERO);
        assert_eq!(report.annualized_volatility, Decimal::ZERO);
        assert_eq!(report.sharpe_ratio, Decimal::ZERO);
        assert_eq!(report.sortino_ratio, SortinoRatio::Finite(Decimal::ZERO));
    }

    #[test]
    fn test_unsorted_input_is_sorted_before_analysis() {
        let mut points = series(&[dec!(1000), dec!(1020), dec!(990)]);
        points.reverse();
        let out = calculate_index_analytics(&analytics_input(points)).unwrap();
        assert_eq!(out.result.window_start, day(0));
        assert_eq!(out.result.window_end, day(2));
        assert!((out.result.total_return - dec!(-0.01)).abs() < dec!(0.0000001));
    }

    #[test]
    fn test_duplicate_timestamps_rejected() {
        let mut points = series(&[dec!(1000), dec!(1020)]);
        points.push(SeriesPoint::new(day(1), dec!(1021)));
        let result = calculate_index_analytics(&analytics_input(points));
        assert!(matches!(
            result,
            Err(IndexEngineError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_short_benchmark_skipped_with_warning() {
        let mut input = analytics_input(series(&[dec!(1000), dec!(1020), dec!(990)]));
        input.benchmarks = vec![BenchmarkSeries {
            symbol: "BTC".into(),
            points: series(&[dec!(50000)]),
        }];
        let out = calculate_index_analytics(&input).unwrap();
        assert!(out.result.benchmarks.is_empty());
        assert!(out.warnings.iter().any(|w| w.contains("BTC")));
    }

    #[test]
    fn test_benchmark_points_outside_window_ignored() {
        // Benchmark has extra points before the index window; relation
        // must align on the window only
        let mut input = analytics_input(
            series(&[dec!(1000), dec!(1020), dec!(990), dec!(1050)])
                .split_off(1),
        );
        input.benchmarks = vec![BenchmarkSeries {
            symbol: "BTC".into(),
            points: series(&[dec!(48000), dec!(50000), dec!(51000), dec!(49000)]),
        }];
        let out = calculate_index_analytics(&input).unwrap();
        assert_eq!(out.result.benchmarks[0].observations, 2);
    }

    #[test]
    fn test_invalid_period_rejected() {
        let mut input = analytics_input(series(&[dec!(1000), dec!(1020)]));
        input.period_days = Some(0);
        assert!(calculate_index_analytics(&input).is_err());
    }

    #[test]
    fn test_batch_isolates_failures() {
        let good = analytics_input(series(&[dec!(1000), dec!(1020), dec!(990)]));
        let bad = analytics_input(series(&[dec!(1000)]));
        let out = calculate_analytics_batch(&AnalyticsBatchInput {
            requests: vec![good, bad],
        })
        .unwrap();
        let batch = &out.result;
        assert_eq!(batch.computed, 1);
        assert_eq!(batch.failed, 1);
        assert!(batch.items[0].analytics.is_some());
        assert!(batch.items[0].error.is_none());
        assert!(batch.items[1].analytics.is_none());
        assert!(batch.items[1]
            .error
            .as_deref()
            .unwrap()
            .contains("Insufficient data"));
        assert!(!out.warnings.is_empty());
    }
}
