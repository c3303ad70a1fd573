pub mod analytics;
pub mod error;
pub mod index;
pub mod types;

pub use error::IndexEngineError;
pub use types::*;

/// Standard result type for all index-engine operations
pub type IndexEngineResult<T> = Result<T, IndexEngineError>;
