//! Raw centralized-exchange activity records.
//!
//! One record per trade, deposit, withdrawal, conversion, staking or margin
//! event as returned by the exchange connection API. Records carry a closed
//! type tag; anything the tag parser does not recognize becomes
//! `ExchangeRecordType::Unknown` and is skipped by the mapper.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed record-type tag from the exchange API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExchangeRecordType {
    Trade,
    Deposit,
    Withdrawal,
    FiatBuy,
    FiatSell,
    Convert,
    DustConvert,
    C2cTrade,
    Stake,
    Unstake,
    Interest,
    Mining,
    Dividend,
    MarginBorrow,
    MarginRepay,
    MarginInterest,
    MarginLiquidation,
    /// Anything newer than this taxonomy; skipped, never an error.
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeSide {
    Buy,
    Sell,
}

/// One raw record from an exchange connection, unique by
/// `(connection_id, external_id)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRecord {
    pub external_id: String,
    #[serde(rename = "type")]
    pub record_type: ExchangeRecordType,
    pub timestamp: DateTime<Utc>,
    /// Primary asset symbol as reported by the exchange.
    pub asset: String,
    pub amount: f64,
    #[serde(default)]
    pub price_usd: Option<f64>,
    #[serde(default)]
    pub total_value_usd: Option<f64>,
    #[serde(default)]
    pub fee_amount: Option<f64>,
    #[serde(default)]
    pub fee_asset: Option<String>,
    #[serde(default)]
    pub side: Option<TradeSide>,
    #[serde(default)]
    pub trade_pair: Option<String>,
    #[serde(default)]
    pub quote_asset: Option<String>,
    #[serde(default)]
    pub quote_amount: Option<f64>,
    /// Network hint for deposits/withdrawals (e.g. "SOL").
    #[serde(default)]
    pub network: Option<String>,
    /// Embedded on-chain transaction reference, when the exchange reports it.
    #[serde(default)]
    pub tx_id: Option<String>,
}
