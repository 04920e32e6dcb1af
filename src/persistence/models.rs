//! Database Models
//!
//! Row types for the canonical ledger tables plus conversions to and from
//! the domain entities.

use crate::domain::entities::flow::{Flow, FlowDirection};
use crate::domain::entities::transaction::{Transaction, TransactionSource, TransactionType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Transaction row in database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TransactionRecord {
    pub id: String,
    pub source: String,
    pub signature: Option<String>,
    pub external_id: Option<String>,
    pub connection_id: Option<String>,
    pub wallet_address: Option<String>,
    pub transaction_type: String,
    pub category: String,
    pub timestamp: DateTime<Utc>,
    pub slot: Option<i64>,
    pub block_time: Option<i64>,
    pub total_value_usd: Option<f64>,
    pub fee: Option<f64>,
    pub linked_transaction_id: Option<String>,
    pub summary: Option<String>,
    pub raw_data: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Flow row in database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FlowRecord {
    pub id: String,
    pub transaction_id: String,
    pub mint: String,
    pub symbol: String,
    pub decimals: i64,
    pub network: Option<String>,
    pub amount: f64,
    pub direction: String,
    pub value_usd: Option<f64>,
    pub price_at_execution: Option<f64>,
    pub is_fee: bool,
}

impl TransactionRecord {
    pub fn from_entity(transaction: &Transaction) -> Self {
        let now = Utc::now();
        TransactionRecord {
            id: transaction.id.clone(),
            source: transaction.source.as_str().to_string(),
            signature: transaction.signature.clone(),
            external_id: transaction.external_id.clone(),
            connection_id: transaction.connection_id.clone(),
            wallet_address: transaction.wallet_address.clone(),
            transaction_type: transaction.transaction_type.as_str().to_string(),
            category: transaction.category().as_str().to_string(),
            timestamp: transaction.timestamp,
            slot: transaction.slot,
            block_time: transaction.block_time,
            total_value_usd: transaction.total_value_usd,
            fee: transaction.fee,
            linked_transaction_id: transaction.linked_transaction_id.clone(),
            summary: transaction.summary.clone(),
            raw_data: transaction
                .raw_data
                .as_ref()
                .and_then(|v| serde_json::to_string(v).ok()),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn into_entity(self, flows: Vec<FlowRecord>) -> Transaction {
        Transaction {
            id: self.id,
            source: TransactionSource::parse(&self.source).unwrap_or(TransactionSource::OnChain),
            signature: self.signature,
            external_id: self.external_id,
            connection_id: self.connection_id,
            wallet_address: self.wallet_address,
            transaction_type: TransactionType::parse(&self.transaction_type),
            timestamp: self.timestamp,
            slot: self.slot,
            block_time: self.block_time,
            total_value_usd: self.total_value_usd,
            fee: self.fee,
            linked_transaction_id: self.linked_transaction_id,
            summary: self.summary,
            raw_data: self
                .raw_data
                .as_deref()
                .and_then(|s| serde_json::from_str(s).ok()),
            flows: flows.into_iter().map(FlowRecord::into_entity).collect(),
        }
    }
}

impl FlowRecord {
    pub fn from_entity(transaction_id: &str, flow: &Flow) -> Self {
        FlowRecord {
            id: flow.id.clone(),
            transaction_id: transaction_id.to_string(),
            mint: flow.mint.clone(),
            symbol: flow.symbol.clone(),
            decimals: flow.decimals as i64,
            network: flow.network.clone(),
            amount: flow.amount,
            direction: flow.direction.as_str().to_string(),
            value_usd: flow.value_usd,
            price_at_execution: flow.price_at_execution,
            is_fee: flow.is_fee,
        }
    }

    pub fn into_entity(self) -> Flow {
        Flow {
            id: self.id,
            mint: self.mint,
            symbol: self.symbol,
            decimals: self.decimals.clamp(0, u8::MAX as i64) as u8,
            network: self.network,
            amount: self.amount,
            // The CHECK constraint keeps direction to IN/OUT.
            direction: FlowDirection::parse(&self.direction).unwrap_or(FlowDirection::In),
            value_usd: self.value_usd,
            price_at_execution: self.price_at_execution,
            is_fee: self.is_fee,
        }
    }
}

/// Token symbol mapping row in database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TokenSymbolMappingRecord {
    pub symbol: String,
    pub network: Option<String>,
    pub mint: String,
    pub decimals: i64,
    pub is_default: bool,
}

/// Sync cursor row in database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SyncCursorRecord {
    pub connection_id: String,
    pub phase: String,
    pub window_end: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Address label row in database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AddressLabelRecord {
    pub address: String,
    pub source: String,
    pub label: String,
}
