//! Signed exchange REST client.
//!
//! Fetches raw activity records from the exchange connection API over
//! time-windowed pages. Requests are authenticated with an HMAC-SHA256
//! signature (hex) over the query string, and pagination is paced with an
//! explicit inter-call delay so cursor-driven syncs stay inside the
//! exchange's request budget.

use crate::domain::entities::exchange_record::ExchangeRecord;
use crate::domain::errors::IngestError;
use crate::domain::repositories::record_source::RecordSource;
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use hmac::{Hmac, Mac};
use reqwest::Client;
use sha2::Sha256;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};
use zeroize::Zeroizing;

const EXCHANGE_API_BASE: &str = "https://api.exchange-gateway.io";

/// Records requested per page.
const PAGE_LIMIT: usize = 500;

type HmacSha256 = Hmac<Sha256>;

/// Exchange connection configuration.
#[derive(Debug, Clone)]
pub struct ExchangeApiConfig {
    pub api_base: String,
    pub connection_id: String,
    pub api_key: String,
    /// Delay between successive page requests.
    pub inter_call_delay: Duration,
}

impl ExchangeApiConfig {
    pub fn new(connection_id: &str, api_key: &str) -> Self {
        Self {
            api_base: EXCHANGE_API_BASE.to_string(),
            connection_id: connection_id.to_string(),
            api_key: api_key.to_string(),
            inter_call_delay: Duration::from_millis(250),
        }
    }
}

pub struct ExchangeApiClient {
    client: Client,
    config: ExchangeApiConfig,
    api_secret: Zeroizing<String>,
}

impl ExchangeApiClient {
    pub fn new(config: ExchangeApiConfig, api_secret: Zeroizing<String>) -> Self {
        Self {
            client: Client::new(),
            config,
            api_secret,
        }
    }

    /// HMAC-SHA256 signature over the query string, hex-encoded.
    fn sign(&self, query: &str) -> Result<String, IngestError> {
        let mut mac = HmacSha256::new_from_slice(self.api_secret.as_bytes())
            .map_err(|e| IngestError::SourceApi(format!("HMAC error: {}", e)))?;
        mac.update(query.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    async fn fetch_page(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ExchangeRecord>, IngestError> {
        let query = format!(
            "startTime={}&endTime={}&limit={}&timestamp={}",
            from.timestamp_millis(),
            to.timestamp_millis(),
            PAGE_LIMIT,
            Utc::now().timestamp_millis()
        );
        let signature = self.sign(&query)?;
        let url = format!(
            "{}/v1/records?{}&signature={}",
            self.config.api_base, query, signature
        );

        let response = self
            .client
            .get(&url)
            .header("X-API-KEY", &self.config.api_key)
            .send()
            .await
            .map_err(|e| IngestError::SourceApi(format!("Records request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(IngestError::SourceApi(format!(
                "Records API error: {} - {}",
                status, error_text
            )));
        }

        response
            .json::<Vec<ExchangeRecord>>()
            .await
            .map_err(|e| IngestError::SourceApi(format!("Failed to parse records: {}", e)))
    }
}

#[async_trait]
impl RecordSource for ExchangeApiClient {
    fn connection_id(&self) -> &str {
        &self.config.connection_id
    }

    /// Page through `[from, to)`. Each page advances the window start past
    /// the last record seen; a short page ends the scan.
    async fn fetch_records(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ExchangeRecord>, IngestError> {
        let mut all_records = Vec::new();
        let mut window_start = from;

        loop {
            let page = self.fetch_page(window_start, to).await?;
            let page_len = page.len();
            debug!(
                connection_id = %self.config.connection_id,
                page_len,
                from = %window_start,
                "Fetched record page"
            );

            let last_timestamp = page.last().map(|r| r.timestamp);
            all_records.extend(page);

            if page_len < PAGE_LIMIT {
                break;
            }
            match last_timestamp {
                Some(last) if last < to => {
                    window_start = last + ChronoDuration::milliseconds(1);
                }
                _ => {
                    warn!(
                        connection_id = %self.config.connection_id,
                        "Pagination stalled; stopping early"
                    );
                    break;
                }
            }
            sleep(self.config.inter_call_delay).await;
        }

        Ok(all_records)
    }
}
