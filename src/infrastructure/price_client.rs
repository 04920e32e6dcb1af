//! Historical price client.
//!
//! Resolves daily USD prices from a public market-data API. Token prices
//! try a descending list of stablecoin quote pairs until one yields data;
//! fiat rates come from a daily FX API. Results, including "no price
//! available", are cached per `(asset, date)` and outbound calls are gated
//! by a direct rate limiter so a large backfill cannot hammer the upstream.

use crate::domain::errors::PriceError;
use crate::domain::repositories::price_source::PriceSource;
use async_trait::async_trait;
use chrono::NaiveDate;
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use lru::LruCache;
use reqwest::Client;
use std::num::{NonZeroU32, NonZeroUsize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

const MARKET_API_BASE: &str = "https://api.binance.com";
const FX_API_BASE: &str = "https://api.frankfurter.app";

/// Quote assets tried in order for token daily closes.
const QUOTE_CASCADE: [&str; 4] = ["USDT", "USDC", "FDUSD", "DAI"];

const CACHE_CAPACITY: usize = 4096;

/// Price client configuration.
#[derive(Debug, Clone)]
pub struct PriceClientConfig {
    pub market_api_base: String,
    pub fx_api_base: String,
    /// Maximum upstream requests per minute.
    pub requests_per_minute: u32,
}

impl Default for PriceClientConfig {
    fn default() -> Self {
        Self {
            market_api_base: MARKET_API_BASE.to_string(),
            fx_api_base: FX_API_BASE.to_string(),
            requests_per_minute: 60,
        }
    }
}

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

pub struct HttpPriceClient {
    client: Client,
    config: PriceClientConfig,
    limiter: DirectLimiter,
    /// `(UPPER symbol, date)` → daily price; `None` caches a known miss.
    cache: Mutex<LruCache<(String, NaiveDate), Option<f64>>>,
}

impl HttpPriceClient {
    pub fn new(config: PriceClientConfig) -> Result<Self, PriceError> {
        let per_minute = NonZeroU32::new(config.requests_per_minute.max(1))
            .ok_or_else(|| PriceError::RequestFailed("invalid rate limit".to_string()))?;
        let capacity = NonZeroUsize::new(CACHE_CAPACITY)
            .ok_or_else(|| PriceError::RequestFailed("invalid cache capacity".to_string()))?;
        Ok(Self {
            client: Client::new(),
            config,
            limiter: RateLimiter::direct(Quota::per_minute(per_minute)),
            cache: Mutex::new(LruCache::new(capacity)),
        })
    }

    async fn cached(&self, key: &(String, NaiveDate)) -> Option<Option<f64>> {
        self.cache.lock().await.get(key).copied()
    }

    async fn store(&self, key: (String, NaiveDate), value: Option<f64>) {
        self.cache.lock().await.put(key, value);
    }

    /// Daily close for `symbol` against one quote asset, from the kline
    /// endpoint. `Ok(None)` when the pair has no data for that day.
    async fn fetch_daily_close(
        &self,
        symbol: &str,
        quote: &str,
        date: NaiveDate,
    ) -> Result<Option<f64>, PriceError> {
        let start = date
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp_millis())
            .unwrap_or_default();
        let url = format!(
            "{}/api/v3/klines?symbol={}{}&interval=1d&startTime={}&limit=1",
            self.config.market_api_base, symbol, quote, start
        );

        self.limiter.until_ready().await;
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PriceError::RequestFailed(format!("kline request failed: {}", e)))?;

        if response.status().as_u16() == 429 {
            return Err(PriceError::RateLimited);
        }
        if !response.status().is_success() {
            // Unknown pair: fall through the cascade instead of failing.
            return Ok(None);
        }

        let klines: Vec<Vec<serde_json::Value>> = response
            .json()
            .await
            .map_err(|e| PriceError::MalformedResponse(format!("kline body: {}", e)))?;

        let close = klines
            .first()
            .and_then(|row| row.get(4))
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse::<f64>().ok());
        Ok(close)
    }

    async fn fetch_fiat_rate(
        &self,
        currency: &str,
        date: NaiveDate,
    ) -> Result<Option<f64>, PriceError> {
        let url = format!(
            "{}/{}?from={}&to=USD",
            self.config.fx_api_base, date, currency
        );

        self.limiter.until_ready().await;
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PriceError::RequestFailed(format!("fx request failed: {}", e)))?;

        if !response.status().is_success() {
            return Ok(None);
        }

        #[derive(serde::Deserialize)]
        struct FxResponse {
            rates: std::collections::HashMap<String, f64>,
        }

        let body: FxResponse = response
            .json()
            .await
            .map_err(|e| PriceError::MalformedResponse(format!("fx body: {}", e)))?;
        Ok(body.rates.get("USD").copied())
    }
}

#[async_trait]
impl PriceSource for HttpPriceClient {
    async fn token_daily_price(
        &self,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<Option<f64>, PriceError> {
        let symbol = symbol.to_uppercase();
        let key = (symbol.clone(), date);
        if let Some(cached) = self.cached(&key).await {
            return Ok(cached);
        }

        // Stablecoins are the quote side; asking for them would build
        // degenerate pairs like USDTUSDT.
        if QUOTE_CASCADE.contains(&symbol.as_str()) {
            self.store(key, Some(1.0)).await;
            return Ok(Some(1.0));
        }

        for quote in QUOTE_CASCADE {
            match self.fetch_daily_close(&symbol, quote, date).await {
                Ok(Some(price)) => {
                    debug!(%symbol, %quote, %date, price, "Resolved daily price");
                    self.store(key, Some(price)).await;
                    return Ok(Some(price));
                }
                Ok(None) => continue,
                Err(PriceError::RateLimited) => return Err(PriceError::RateLimited),
                Err(e) => {
                    warn!(%symbol, %quote, error = %e, "Quote pair lookup failed");
                    continue;
                }
            }
        }

        // A full-cascade miss is cached so re-runs do not re-query it.
        self.store(key, None).await;
        Ok(None)
    }

    async fn fiat_daily_rate(
        &self,
        currency: &str,
        date: NaiveDate,
    ) -> Result<Option<f64>, PriceError> {
        let currency = currency.to_uppercase();
        if currency == "USD" {
            return Ok(Some(1.0));
        }
        let key = (format!("fiat:{}", currency), date);
        if let Some(cached) = self.cached(&key).await {
            return Ok(cached);
        }

        let rate = self.fetch_fiat_rate(&currency, date).await?;
        self.store(key, rate).await;
        Ok(rate)
    }
}
