//! Returns and risk analytics over index value series.
//!
//! Pure, stateless batch computations: the same ordered series and
//! parameters always produce bit-identical results, which is what makes
//! recomputed analytics auditable. Numeric degeneracies (flat series,
//! zero variance) yield defined sentinels rather than errors; only a
//! window with fewer than 2 points is an error (`InsufficientData`).

pub mod benchmark;
pub mod drawdown;
pub mod report;
pub mod returns;
