use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexEngineError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    /// No constituent had usable price/market-cap data at inception.
    /// Fatal to index creation; cannot be retried without new data.
    #[error("Insufficient inception data: {0}")]
    InsufficientInceptionData(String),

    /// Every constituent was missing from a day's price snapshot. The
    /// caller should skip the day rather than persist a garbage value.
    #[error("No valid prices: {0}")]
    NoValidPrices(String),

    /// Fewer than 2 data points in the requested window. Non-fatal;
    /// callers treat this as "not computable now".
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for IndexEngineError {
    fn from(e: serde_json::Error) -> Self {
        IndexEngineError::SerializationError(e.to_string())
    }
}
