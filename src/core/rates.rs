//! Exchange rate abstractions

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::error::ApiError;

/// Latest rates as reported by the provider for a single base currency.
///
/// Each rate is expressed as units of the target currency per one unit of
/// `base`. The base currency is only present in `rates` when the provider
/// includes it.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RateSet {
    #[serde(default)]
    pub disclaimer: String,
    #[serde(default)]
    pub license: String,
    pub timestamp: i64,
    pub base: String,
    pub rates: BTreeMap<String, f64>,
}

impl RateSet {
    pub fn rate(&self, code: &str) -> Option<f64> {
        self.rates.get(code).copied()
    }

    /// Converts `amount` of the base currency into `to`, rounded to cents.
    pub fn convert(&self, to: &str, amount: f64) -> Result<f64, ApiError> {
        let rate = self.rate(to).ok_or_else(|| ApiError::RateNotFound {
            currency: to.to_string(),
        })?;
        Ok(round_to_cents(amount * rate))
    }

    pub fn as_of(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.timestamp, 0).single()
    }
}

/// Rounds half away from zero to two decimal places.
pub fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[async_trait]
pub trait ExchangeRateProvider: Send + Sync {
    /// Fetches the latest rates for `base`. An empty `base` selects the
    /// provider's default; empty `symbols` returns every available rate.
    async fn fetch_rates(&self, base: &str, symbols: &[&str]) -> Result<RateSet, ApiError>;

    async fn convert_now(&self, from: &str, to: &str, amount: f64) -> Result<f64, ApiError> {
        let rates = self.fetch_rates(from, &[]).await?;
        rates.convert(to, amount)
    }
}
