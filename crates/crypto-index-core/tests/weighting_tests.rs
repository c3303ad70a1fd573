use crypto_index_core::index::weighting::{
    calculate_capped_weights, CappedWeightsInput, MarketCapEntry,
};
use crypto_index_core::IndexEngineError;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ===========================================================================
// Capped market-cap weighting tests
// Normalization, cap enforcement, and the redistribution cascade that
// makes a single pass insufficient.
// ===========================================================================

fn caps(entries: &[(&str, Decimal)]) -> Vec<MarketCapEntry> {
    entries
        .iter()
        .map(|(symbol, cap)| MarketCapEntry {
            symbol: symbol.to_string(),
            market_cap: *cap,
        })
        .collect()
}

fn input(entries: &[(&str, Decimal)], max_weight: Decimal) -> CappedWeightsInput {
    CappedWeightsInput {
        market_caps: caps(entries),
        max_weight,
        max_iterations: 10,
    }
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

#[test]
fn test_weights_sum_to_one_within_tolerance() {
    let distributions: Vec<Vec<(&str, Decimal)>> = vec![
        vec![("BTC", dec!(800)), ("ETH", dec!(150)), ("SOL", dec!(50))],
        vec![("BTC", dec!(1)), ("ETH", dec!(1)), ("SOL", dec!(1))],
        vec![
            ("BTC", dec!(1200000000000)),
            ("ETH", dec!(400000000000)),
            ("SOL", dec!(80000000000)),
            ("ADA", dec!(15000000000)),
            ("DOT", dec!(9000000000)),
        ],
    ];
    for entries in &distributions {
        let out = calculate_capped_weights(&input(entries, dec!(0.25))).unwrap();
        let sum: Decimal = out.result.weights.iter().map(|w| w.weight).sum();
        assert!(
            (sum - Decimal::ONE).abs() < dec!(0.0001),
            "weights sum {} for {:?}",
            sum,
            entries
        );
        for w in &out.result.weights {
            assert!(w.weight >= Decimal::ZERO, "negative weight for {}", w.symbol);
        }
    }
}

#[test]
fn test_cap_respected_when_satisfiable() {
    // 4 constituents with cap 0.30 >= 1/4: every weight must land at or
    // under the cap after convergence
    let out = calculate_capped_weights(&input(
        &[
            ("BTC", dec!(700)),
            ("ETH", dec!(200)),
            ("SOL", dec!(70)),
            ("ADA", dec!(30)),
        ],
        dec!(0.30),
    ))
    .unwrap();
    assert!(out.result.converged);
    for w in &out.result.weights {
        assert!(
            w.weight <= dec!(0.30) + dec!(0.000001),
            "{} over cap: {}",
            w.symbol,
            w.weight
        );
    }
}

#[test]
fn test_single_constituent_takes_full_weight() {
    let out = calculate_capped_weights(&input(&[("BTC", dec!(100))], dec!(0.25))).unwrap();
    assert_eq!(out.result.weights.len(), 1);
    assert_eq!(out.result.weights[0].weight, Decimal::ONE);
}

// ---------------------------------------------------------------------------
// Redistribution cascade
// ---------------------------------------------------------------------------

#[test]
fn test_cascade_requires_second_iteration() {
    // Raw weights [0.6, 0.3, 0.1] with cap 0.4. Pass 1 caps BTC and
    // lifts ETH to 0.3 + 0.2 * 0.3/0.4 = 0.45, over the cap; pass 2
    // caps ETH and hands the excess to SOL. Final: [0.4, 0.4, 0.2].
    let out = calculate_capped_weights(&input(
        &[("BTC", dec!(600)), ("ETH", dec!(300)), ("SOL", dec!(100))],
        dec!(0.4),
    ))
    .unwrap();
    let res = &out.result;

    assert!(res.converged, "cascade must converge within the bound");
    assert_eq!(res.iterations_used, 2);
    assert_eq!(res.weights[0].weight, dec!(0.4));
    assert_eq!(res.weights[1].weight, dec!(0.4));
    assert!((res.weights[2].weight - dec!(0.2)).abs() < dec!(0.0001));

    let sum: Decimal = res.weights.iter().map(|w| w.weight).sum();
    assert!((sum - Decimal::ONE).abs() < dec!(0.0001));
    for w in &res.weights {
        assert!(w.weight <= dec!(0.4) + dec!(0.000001));
    }
}

#[test]
fn test_dominant_constituent_under_generous_cap() {
    // One 90% constituent, cap 0.5: excess flows to the other two in
    // proportion to their current weights
    let out = calculate_capped_weights(&input(
        &[("BTC", dec!(900)), ("ETH", dec!(60)), ("SOL", dec!(40))],
        dec!(0.5),
    ))
    .unwrap();
    let res = &out.result;
    assert!(res.converged);
    assert_eq!(res.weights[0].weight, dec!(0.5));
    // Remaining 0.5 split 60:40
    assert!((res.weights[1].weight - dec!(0.3)).abs() < dec!(0.0001));
    assert!((res.weights[2].weight - dec!(0.2)).abs() < dec!(0.0001));
}

#[test]
fn test_cap_of_one_never_triggers() {
    let out = calculate_capped_weights(&input(
        &[("BTC", dec!(999)), ("ETH", dec!(1))],
        dec!(1.0),
    ))
    .unwrap();
    assert_eq!(out.result.iterations_used, 0);
    assert_eq!(out.result.weights[0].weight, dec!(0.999));
}

#[test]
fn test_equal_constituents_need_no_capping() {
    let out = calculate_capped_weights(&input(
        &[
            ("BTC", dec!(250)),
            ("ETH", dec!(250)),
            ("SOL", dec!(250)),
            ("ADA", dec!(250)),
        ],
        dec!(0.25),
    ))
    .unwrap();
    assert!(out.result.converged);
    assert_eq!(out.result.iterations_used, 0);
    for w in &out.result.weights {
        assert_eq!(w.weight, dec!(0.25));
    }
}

// ---------------------------------------------------------------------------
// Degenerate inputs
// ---------------------------------------------------------------------------

#[test]
fn test_empty_input_yields_empty_weights() {
    let out = calculate_capped_weights(&input(&[], dec!(0.25))).unwrap();
    assert!(out.result.weights.is_empty());
    assert_eq!(out.result.hhi, Decimal::ZERO);
}

#[test]
fn test_all_zero_market_caps_yield_no_weights() {
    let out =
        calculate_capped_weights(&input(&[("BTC", dec!(0)), ("ETH", dec!(0))], dec!(0.25)))
            .unwrap();
    assert!(out.result.weights.iter().all(|w| w.weight.is_zero()));
    assert!(out
        .warnings
        .iter()
        .any(|w| w.contains("total market cap is zero")));
}

#[test]
fn test_unsatisfiable_cap_leaves_weights_uncapped() {
    // Five equal constituents at 0.2 each, cap 0.1: no absorber exists,
    // so weights stand and the output carries a warning
    let entries: Vec<(&str, Decimal)> = vec![
        ("BTC", dec!(100)),
        ("ETH", dec!(100)),
        ("SOL", dec!(100)),
        ("ADA", dec!(100)),
        ("DOT", dec!(100)),
    ];
    let out = calculate_capped_weights(&input(&entries, dec!(0.1))).unwrap();
    assert!(!out.result.converged);
    let sum: Decimal = out.result.weights.iter().map(|w| w.weight).sum();
    assert!((sum - Decimal::ONE).abs() < dec!(0.0001));
    for w in &out.result.weights {
        assert_eq!(w.weight, dec!(0.2));
    }
    assert!(!out.warnings.is_empty());
}

// ---------------------------------------------------------------------------
// Concentration diagnostics
// ---------------------------------------------------------------------------

#[test]
fn test_hhi_and_effective_n() {
    // Two equal weights: HHI = 2 * 50^2 = 5000, effective N = 2
    let out = calculate_capped_weights(&input(
        &[("BTC", dec!(500)), ("ETH", dec!(500))],
        dec!(0.9),
    ))
    .unwrap();
    assert_eq!(out.result.hhi, dec!(5000));
    assert_eq!(out.result.effective_n, dec!(2));
}

#[test]
fn test_top_five_weight_on_wide_basket() {
    // Six equal constituents: top 5 hold 5/6 of the basket
    let entries: Vec<(&str, Decimal)> = vec![
        ("BTC", dec!(100)),
        ("ETH", dec!(100)),
        ("SOL", dec!(100)),
        ("ADA", dec!(100)),
        ("DOT", dec!(100)),
        ("AVAX", dec!(100)),
    ];
    let out = calculate_capped_weights(&input(&entries, dec!(0.9))).unwrap();
    assert!((out.result.top_5_weight - dec!(0.8333333333)).abs() < dec!(0.0001));
}

// ---------------------------------------------------------------------------
// Input validation
// ---------------------------------------------------------------------------

#[test]
fn test_negative_market_cap_rejected() {
    let result = calculate_capped_weights(&input(&[("BTC", dec!(-5))], dec!(0.25)));
    assert!(matches!(
        result,
        Err(IndexEngineError::InvalidInput { .. })
    ));
}

#[test]
fn test_duplicate_symbol_rejected() {
    let result = calculate_capped_weights(&input(
        &[("BTC", dec!(100)), ("BTC", dec!(200))],
        dec!(0.25),
    ));
    assert!(result.is_err());
}

#[test]
fn test_cap_outside_unit_interval_rejected() {
    assert!(calculate_capped_weights(&input(&[("BTC", dec!(100))], dec!(0))).is_err());
    assert!(calculate_capped_weights(&input(&[("BTC", dec!(100))], dec!(1.01))).is_err());
}
