//! Index Valuation.
//!
//! A pure function of fixed shares, the divisor, and a price snapshot:
//! `value = Σ shares × price / divisor`. Constituents missing from the
//! snapshot contribute zero (their weight is dropped for the day, not
//! interpolated), and the snapshot records the resulting coverage so
//! callers can tell a thin day from a real decline.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use crate::error::IndexEngineError;
use crate::types::*;
use crate::IndexEngineResult;

// ---------------------------------------------------------------------------
// Input / Output
// ---------------------------------------------------------------------------

/// One (symbol, price) pair of a day's price snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolPrice {
    pub symbol: String,
    pub price: Money,
}

/// Input for valuing a divisor-based index at one timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationInput {
    pub portfolio: InceptionPortfolio,
    pub timestamp: DateTime<Utc>,
    /// The day's prices. Symbols outside the portfolio are ignored.
    pub prices: Vec<SymbolPrice>,
}

/// Output of a single index valuation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationOutput {
    pub snapshot: IndexSnapshot,
    /// Holdings without a usable price at this timestamp.
    pub missing_symbols: Vec<String>,
}

/// Input for valuing a benchmark-tracking index at one timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkValuationInput {
    pub index_symbol: String,
    /// The single symbol the index tracks.
    pub tracked_symbol: String,
    pub timestamp: DateTime<Utc>,
    pub prices: Vec<SymbolPrice>,
}

// ---------------------------------------------------------------------------
// Calculation
// ---------------------------------------------------------------------------

/// Value a divisor-based index at one timestamp.
pub fn value_index(
    input: &ValuationInput,
) -> IndexEngineResult<ComputationOutput<ValuationOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_valuation_input(input)?;

    let prices: BTreeMap<&str, Money> = input
        .prices
        .iter()
        .map(|p| (p.symbol.as_str(), p.price))
        .collect();
    let valuation = value_portfolio(&input.portfolio, &prices)?;

    if !valuation.missing.is_empty() {
        warnings.push(format!(
            "{} of {} holdings unpriced at {}; index value understates the full basket",
            valuation.missing.len(),
            input.portfolio.holdings.len(),
            input.timestamp.date_naive()
        ));
    }

    let output = ValuationOutput {
        snapshot: IndexSnapshot {
            index_symbol: input.portfolio.index_symbol.clone(),
            timestamp: input.timestamp,
            value: valuation.value,
            coverage: valuation.coverage,
        },
        missing_symbols: valuation.missing,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Divisor-Based Index Valuation (sum of shares times price over divisor)",
        &serde_json::json!({
            "index_symbol": input.portfolio.index_symbol,
            "holdings": input.portfolio.holdings.len(),
            "divisor": input.portfolio.divisor.to_string(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

/// Value a benchmark-tracking index: the raw observed price of the
/// tracked symbol, no shares or divisor involved.
pub fn value_benchmark_index(
    input: &BenchmarkValuationInput,
) -> IndexEngineResult<ComputationOutput<ValuationOutput>> {
    let start = Instant::now();

    validate_prices(&input.prices)?;
    let price = input
        .prices
        .iter()
        .find(|p| p.symbol == input.tracked_symbol && p.price > Decimal::ZERO)
        .map(|p| p.price)
        .ok_or_else(|| {
            IndexEngineError::NoValidPrices(format!(
                "No price for tracked symbol {} at {}",
                input.tracked_symbol,
                input.timestamp.date_naive()
            ))
        })?;

    let output = ValuationOutput {
        snapshot: IndexSnapshot {
            index_symbol: input.index_symbol.clone(),
            timestamp: input.timestamp,
            value: price,
            coverage: Decimal::ONE,
        },
        missing_symbols: Vec::new(),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Benchmark Price Tracking (raw observed price)",
        &serde_json::json!({
            "index_symbol": input.index_symbol,
            "tracked_symbol": input.tracked_symbol,
        }),
        Vec::new(),
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Core valuation
// ---------------------------------------------------------------------------

/// A portfolio valued against one day's price map.
#[derive(Debug, Clone)]
pub(crate) struct PortfolioValuation {
    pub value: Money,
    /// priced holdings / total holdings
    pub coverage: Decimal,
    pub missing: Vec<String>,
}

/// Value the holdings against a price map. Non-positive prices count as
/// missing. Fails with `NoValidPrices` when nothing is priced, so a
/// dataless day is distinguishable from an index near zero.
pub(crate) fn value_portfolio(
    portfolio: &InceptionPortfolio,
    prices: &BTreeMap<&str, Money>,
) -> IndexEngineResult<PortfolioValuation> {
    let mut raw_value = Decimal::ZERO;
    let mut priced = 0usize;
    let mut missing: Vec<String> = Vec::new();

    for holding in &portfolio.holdings {
        match prices.get(holding.symbol.as_str()) {
            Some(price) if *price > Decimal::ZERO => {
                raw_value += holding.shares * price;
                priced += 1;
            }
            _ => missing.push(holding.symbol.clone()),
        }
    }

    if priced == 0 {
        return Err(IndexEngineError::NoValidPrices(format!(
            "No holding of {} has a price in this snapshot",
            portfolio.index_symbol
        )));
    }

    let total = Decimal::from(portfolio.holdings.len() as i64);
    Ok(PortfolioValuation {
        value: raw_value / portfolio.divisor,
        coverage: Decimal::from(priced as i64) / total,
        missing,
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_valuation_input(input: &ValuationInput) -> IndexEngineResult<()> {
    if input.portfolio.divisor <= Decimal::ZERO {
        return Err(IndexEngineError::InvalidInput {
            field: "portfolio.divisor".into(),
            reason: "Divisor must be positive".into(),
        });
    }
    validate_prices(&input.prices)
}

fn validate_prices(prices: &[SymbolPrice]) -> IndexEngineResult<()> {
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    for price in prices {
        if !seen.insert(price.symbol.as_str()) {
            return Err(IndexEngineError::InvalidInput {
                field: "prices".into(),
                reason: format!("Duplicate symbol {}", price.symbol),
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

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn price(symbol: &str, value: Decimal) -> SymbolPrice {
        SymbolPrice {
            symbol: symbol.into(),
            price: value,
        }
    }

    /// 10 BTC @ 50k + 100 ETH @ 3k = 800,000; divisor 800 maps that to
    /// a base value of 1,000.
    fn portfolio() -> InceptionPortfolio {
        InceptionPortfolio {
            index_symbol: "TOP-MCW".into(),
            inception_timestamp: at(),
            holdings: vec![
                Holding {
                    symbol: "BTC".into(),
                    weight: dec!(0.625),
                    shares: dec!(10),
                    inception_price: dec!(50000),
                },
                Holding {
                    symbol: "ETH".into(),
                    weight: dec!(0.375),
                    shares: dec!(100),
                    inception_price: dec!(3000),
                },
            ],
            divisor: dec!(800),
            base_value: dec!(1000),
        }
    }

    fn input(prices: Vec<SymbolPrice>) -> ValuationInput {
        ValuationInput {
            portfolio: portfolio(),
            timestamp: at(),
            prices,
        }
    }

    #[test]
    fn test_value_at_inception_prices_recovers_base_value() {
        let out = value_index(&input(vec![
            price("BTC", dec!(50000)),
            price("ETH", dec!(3000)),
        ]))
        .unwrap();
        assert_eq!(out.result.snapshot.value, dec!(1000));
        assert_eq!(out.result.snapshot.coverage, Decimal::ONE);
        assert!(out.result.missing_symbols.is_empty());
    }

    #[test]
    fn test_value_moves_with_prices() {
        // (10 * 60,000 + 100 * 2,500) / 800 = 850,000 / 800 = 1,062.5
        let out = value_index(&input(vec![
            price("BTC", dec!(60000)),
            price("ETH", dec!(2500)),
        ]))
        .unwrap();
        assert_eq!(out.result.snapshot.value, dec!(1062.5));
    }

    #[test]
    fn test_missing_holding_contributes_zero() {
        let out = value_index(&input(vec![price("BTC", dec!(60000))])).unwrap();
        assert_eq!(out.result.snapshot.value, dec!(750));
        assert_eq!(out.result.snapshot.coverage, dec!(0.5));
        assert_eq!(out.result.missing_symbols, vec!["ETH".to_string()]);
        assert!(!out.warnings.is_empty());
    }

    #[test]
    fn test_zero_price_counts_as_missing() {
        let out = value_index(&input(vec![
            price("BTC", dec!(60000)),
            price("ETH", dec!(0)),
        ]))
        .unwrap();
        assert_eq!(out.result.snapshot.coverage, dec!(0.5));
        assert_eq!(out.result.missing_symbols, vec!["ETH".to_string()]);
    }

    #[test]
    fn test_all_prices_missing_fails() {
        let result = value_index(&input(vec![price("SOL", dec!(150))]));
        assert!(matches!(result, Err(IndexEngineError::NoValidPrices(_))));
    }

    #[test]
    fn test_non_holding_prices_are_ignored() {
        let out = value_index(&input(vec![
            price("BTC", dec!(50000)),
            price("ETH", dec!(3000)),
            price("SOL", dec!(150)),
        ]))
        .unwrap();
        assert_eq!(out.result.snapshot.value, dec!(1000));
    }

    #[test]
    fn test_valuation_is_deterministic() {
        let prices = vec![price("BTC", dec!(61234.5678)), price("ETH", dec!(2987.01))];
        let first = value_index(&input(prices.clone())).unwrap();
        let second = value_index(&input(prices)).unwrap();
        assert_eq!(first.result.snapshot.value, second.result.snapshot.value);
        assert_eq!(
            serde_json::to_string(&first.result.snapshot).unwrap(),
            serde_json::to_string(&second.result.snapshot).unwrap()
        );
    }

    #[test]
    fn test_duplicate_price_symbol_rejected() {
        let result = value_index(&input(vec![
            price("BTC", dec!(50000)),
            price("BTC", dec!(51000)),
        ]));
        assert!(matches!(
            result,
            Err(IndexEngineError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_non_positive_divisor_rejected() {
        let mut bad = input(vec![price("BTC", dec!(50000))]);
        bad.portfolio.divisor = Decimal::ZERO;
        assert!(value_index(&bad).is_err());
    }

    #[test]
    fn test_benchmark_index_tracks_raw_price() {
        let out = value_benchmark_index(&BenchmarkValuationInput {
            index_symbol: "BTC-BENCH".into(),
            tracked_symbol: "BTC".into(),
            timestamp: at(),
            prices: vec![price("BTC", dec!(64250.75)), price("ETH", dec!(3000))],
        })
        .unwrap();
        assert_eq!(out.result.snapshot.value, dec!(64250.75));
        assert_eq!(out.result.snapshot.coverage, Decimal::ONE);
    }

    #[test]
    fn test_benchmark_index_without_price_fails() {
        let result = value_benchmark_index(&BenchmarkValuationInput {
            index_symbol: "BTC-BENCH".into(),
            tracked_symbol: "BTC".into(),
            timestamp: at(),
            prices: vec![price("ETH", dec!(3000))],
        });
        assert!(matches!(result, Err(IndexEngineError::NoValidPrices(_))));
    }
}
