//! Core business logic abstractions

pub mod config;
pub mod error;
pub mod log;
pub mod rates;

// Re-export main types for cleaner imports
pub use error::{ApiError, DecodeStage, ErrorPayload};
pub use rates::{ExchangeRateProvider, RateSet};
