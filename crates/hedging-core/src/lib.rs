pub mod error;
pub mod market_data;
pub mod stats;
pub mod types;

#[cfg(feature = "hedging")]
pub mod hedging;

#[cfg(feature = "scenarios")]
pub mod scenarios;

pub use error::HedgingError;
pub use types::*;

/// Standard result type for all hedging operations
pub type HedgingResult<T> = Result<T, HedgingError>;
