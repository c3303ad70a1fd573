use napi::Result as NapiResult;
use napi_derive::napi;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Weighting
// ---------------------------------------------------------------------------

#[napi]
pub fn calculate_capped_weights(input_json: String) -> NapiResult<String> {
    let input: crypto_index_core::index::weighting::CappedWeightsInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = crypto_index_core::index::weighting::calculate_capped_weights(&input)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Construction and valuation
// ---------------------------------------------------------------------------

#[napi]
pub fn build_inception_portfolio(input_json: String) -> NapiResult<String> {
    let input: crypto_index_core::index::inception::InceptionInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = crypto_index_core::index::inception::build_inception_portfolio(&input)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn value_index(input_json: String) -> NapiResult<String> {
    let input: crypto_index_core::index::valuation::ValuationInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        crypto_index_core::index::valuation::value_index(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn value_benchmark_index(input_json: String) -> NapiResult<String> {
    let input: crypto_index_core::index::valuation::BenchmarkValuationInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = crypto_index_core::index::valuation::value_benchmark_index(&input)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn build_index_history(input_json: String) -> NapiResult<String> {
    let input: crypto_index_core::index::series::IndexHistoryInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        crypto_index_core::index::series::build_index_history(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn rebalance_portfolio(input_json: String) -> NapiResult<String> {
    let input: crypto_index_core::index::rebalancing::RebalanceInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = crypto_index_core::index::rebalancing::rebalance_portfolio(&input)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Analytics
// ---------------------------------------------------------------------------

#[napi]
pub fn calculate_index_analytics(input_json: String) -> NapiResult<String> {
    let input: crypto_index_core::analytics::report::AnalyticsInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = crypto_index_core::analytics::report::calculate_index_analytics(&input)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn calculate_analytics_batch(input_json: String) -> NapiResult<String> {
    let input: crypto_index_core::analytics::report::AnalyticsBatchInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = crypto_index_core::analytics::report::calculate_analytics_batch(&input)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
