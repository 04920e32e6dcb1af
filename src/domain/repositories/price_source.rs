//! Price Source Trait
//!
//! Capability seam for historical daily prices. The production
//! implementation calls an external market-data API with caching and
//! pacing; tests inject a deterministic stub so valuation logic runs
//! without network access.

use crate::domain::errors::PriceError;
use async_trait::async_trait;
use chrono::NaiveDate;

#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Daily USD close for a token symbol. `Ok(None)` means the source has
    /// no data for that day; the caller records it and retries on a later
    /// run.
    async fn token_daily_price(
        &self,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<Option<f64>, PriceError>;

    /// Daily fiat→USD rate (USD per one unit of `currency`).
    async fn fiat_daily_rate(
        &self,
        currency: &str,
        date: NaiveDate,
    ) -> Result<Option<f64>, PriceError>;
}
