use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// All monetary values (USD). Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = Decimal;

/// Portfolio weights expressed as fractions of 1.
pub type Weight = Decimal;

/// Default values for the engine's configuration surface. Every tunable
/// an operation accepts is plain input data with one of these defaults;
/// the engine reads no environment variables.
pub mod defaults {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    /// Maximum weight any single constituent may carry.
    pub fn weight_cap() -> Decimal {
        dec!(0.25)
    }

    /// Index value at inception.
    pub fn base_value() -> Decimal {
        dec!(1000)
    }

    /// Notional investment used to size inception shares. An arbitrary
    /// scale constant that cancels out of all ratios; it only affects
    /// intermediate share-count magnitudes.
    pub fn notional_investment() -> Decimal {
        dec!(1_000_000)
    }

    /// Annualized risk-free rate for Sharpe/Sortino.
    pub fn risk_free_rate() -> Decimal {
        dec!(0.05)
    }

    /// Crypto markets trade continuously, so annualization uses 365
    /// days, not the 252 of exchange-listed equities.
    pub fn trading_days_per_year() -> Decimal {
        dec!(365)
    }

    /// Bound on cap-and-redistribute passes.
    pub fn max_capping_iterations() -> u32 {
        10
    }

    /// Return threshold below which a period counts as downside.
    pub fn downside_threshold() -> Decimal {
        Decimal::ZERO
    }
}

/// One asset's market data at one instant.
///
/// The collector records at most one observation per (symbol, day), with
/// timestamps normalized to a fixed time-of-day; period lookups rely on
/// that uniqueness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceObservation {
    pub symbol: String,
    pub price: Money,
    pub market_cap: Money,
    pub timestamp: DateTime<Utc>,
}

/// How an index derives its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexMethodology {
    /// Market-cap weights subject to a per-constituent cap, valued
    /// through fixed shares and a divisor.
    CappedMarketCapWeighted,
    /// The raw observed price of a single tracked symbol (e.g. BTC).
    BenchmarkPrice,
}

/// One investable index. Created at launch and effectively immutable:
/// changing constituents or methodology means recomputing the index
/// history from scratch, not mutating the definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexDefinition {
    /// Unique identifier, e.g. "N100-MCW".
    pub index_symbol: String,
    pub methodology: IndexMethodology,
    /// The static constituent set, in basket order. For
    /// `BenchmarkPrice` this is the single tracked symbol.
    pub constituents: Vec<String>,
    #[serde(default = "defaults::base_value")]
    pub base_value: Money,
    pub inception_timestamp: DateTime<Utc>,
    #[serde(default = "defaults::weight_cap")]
    pub weight_cap: Weight,
}

/// One constituent position fixed at inception.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Holding {
    pub symbol: String,
    pub weight: Weight,
    pub shares: Decimal,
    pub inception_price: Money,
}

/// Fixed shares plus the divisor that maps portfolio value to index
/// value.
///
/// Invariant: Σ(shares × inception_price) / divisor == base_value.
/// Immutable for the life of the index; a rebalance event replaces the
/// whole portfolio (see `index::rebalancing`), never edits it in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InceptionPortfolio {
    pub index_symbol: String,
    pub inception_timestamp: DateTime<Utc>,
    pub holdings: Vec<Holding>,
    pub divisor: Decimal,
    pub base_value: Money,
}

/// One computed index value. Append-only; at most one per (index, day).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub index_symbol: String,
    pub timestamp: DateTime<Utc>,
    pub value: Decimal,
    /// Fraction of holdings that had a price at this timestamp. Below 1
    /// the value understates the index (missing constituents contribute
    /// zero).
    pub coverage: Decimal,
}

/// One point of a value series consumed by the analytics engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub timestamp: DateTime<Utc>,
    pub value: Decimal,
}

impl SeriesPoint {
    pub fn new(timestamp: DateTime<Utc>, value: Decimal) -> Self {
        Self { timestamp, value }
    }
}

impl From<&IndexSnapshot> for SeriesPoint {
    fn from(snapshot: &IndexSnapshot) -> Self {
        Self {
            timestamp: snapshot.timestamp,
            value: snapshot.value,
        }
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}
