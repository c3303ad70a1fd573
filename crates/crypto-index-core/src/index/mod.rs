//! Index construction and valuation: capped weights, the inception
//! portfolio (shares + divisor), daily valuation, and the history
//! builder that ties them together.

pub mod inception;
pub mod rebalancing;
pub mod series;
pub mod valuation;
pub mod weighting;
