use crate::domain::entities::flow::Flow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which upstream system produced a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionSource {
    OnChain,
    Exchange,
}

impl TransactionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionSource::OnChain => "ON_CHAIN",
            TransactionSource::Exchange => "EXCHANGE",
        }
    }

    pub fn parse(s: &str) -> Option<TransactionSource> {
        match s {
            "ON_CHAIN" => Some(TransactionSource::OnChain),
            "EXCHANGE" => Some(TransactionSource::Exchange),
            _ => None,
        }
    }
}

/// Closed transaction taxonomy.
///
/// Every ingested payload or record maps to exactly one variant; `Unknown`
/// is the universal fallback so classification never fails to produce a
/// result. Stored as text, round-tripped through `as_str`/`parse`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    // On-chain
    Swap,
    TransferIn,
    TransferOut,
    Stake,
    Unstake,
    NftSale,
    NftMint,
    Memo,
    // Exchange
    ExchangeTrade,
    ExchangeC2cTrade,
    ExchangeDeposit,
    ExchangeWithdrawal,
    ExchangeFiatBuy,
    ExchangeFiatSell,
    ExchangeConvert,
    ExchangeDustConvert,
    ExchangeStake,
    ExchangeUnstake,
    ExchangeInterest,
    ExchangeMining,
    ExchangeDividend,
    ExchangeMarginBorrow,
    ExchangeMarginRepay,
    ExchangeMarginInterest,
    ExchangeMarginLiquidation,
    // Fallback
    Unknown,
}

/// Coarser grouping consumed by downstream reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionCategory {
    Trade,
    Transfer,
    Staking,
    Income,
    Margin,
    Nft,
    Other,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Swap => "SWAP",
            TransactionType::TransferIn => "TRANSFER_IN",
            TransactionType::TransferOut => "TRANSFER_OUT",
            TransactionType::Stake => "STAKE",
            TransactionType::Unstake => "UNSTAKE",
            TransactionType::NftSale => "NFT_SALE",
            TransactionType::NftMint => "NFT_MINT",
            TransactionType::Memo => "MEMO",
            TransactionType::ExchangeTrade => "EXCHANGE_TRADE",
            TransactionType::ExchangeC2cTrade => "EXCHANGE_C2C_TRADE",
            TransactionType::ExchangeDeposit => "EXCHANGE_DEPOSIT",
            TransactionType::ExchangeWithdrawal => "EXCHANGE_WITHDRAWAL",
            TransactionType::ExchangeFiatBuy => "EXCHANGE_FIAT_BUY",
            TransactionType::ExchangeFiatSell => "EXCHANGE_FIAT_SELL",
            TransactionType::ExchangeConvert => "EXCHANGE_CONVERT",
            TransactionType::ExchangeDustConvert => "EXCHANGE_DUST_CONVERT",
            TransactionType::ExchangeStake => "EXCHANGE_STAKE",
            TransactionType::ExchangeUnstake => "EXCHANGE_UNSTAKE",
            TransactionType::ExchangeInterest => "EXCHANGE_INTEREST",
            TransactionType::ExchangeMining => "EXCHANGE_MINING",
            TransactionType::ExchangeDividend => "EXCHANGE_DIVIDEND",
            TransactionType::ExchangeMarginBorrow => "EXCHANGE_MARGIN_BORROW",
            TransactionType::ExchangeMarginRepay => "EXCHANGE_MARGIN_REPAY",
            TransactionType::ExchangeMarginInterest => "EXCHANGE_MARGIN_INTEREST",
            TransactionType::ExchangeMarginLiquidation => "EXCHANGE_MARGIN_LIQUIDATION",
            TransactionType::Unknown => "UNKNOWN",
        }
    }

    /// Total parse: unrecognized strings fall back to `Unknown` so rows
    /// written by a newer schema never fail to load.
    pub fn parse(s: &str) -> TransactionType {
        match s {
            "SWAP" => TransactionType::Swap,
            "TRANSFER_IN" => TransactionType::TransferIn,
            "TRANSFER_OUT" => TransactionType::TransferOut,
            "STAKE" => TransactionType::Stake,
            "UNSTAKE" => TransactionType::Unstake,
            "NFT_SALE" => TransactionType::NftSale,
            "NFT_MINT" => TransactionType::NftMint,
            "MEMO" => TransactionType::Memo,
            "EXCHANGE_TRADE" => TransactionType::ExchangeTrade,
            "EXCHANGE_C2C_TRADE" => TransactionType::ExchangeC2cTrade,
            "EXCHANGE_DEPOSIT" => TransactionType::ExchangeDeposit,
            "EXCHANGE_WITHDRAWAL" => TransactionType::ExchangeWithdrawal,
            "EXCHANGE_FIAT_BUY" => TransactionType::ExchangeFiatBuy,
            "EXCHANGE_FIAT_SELL" => TransactionType::ExchangeFiatSell,
            "EXCHANGE_CONVERT" => TransactionType::ExchangeConvert,
            "EXCHANGE_DUST_CONVERT" => TransactionType::ExchangeDustConvert,
            "EXCHANGE_STAKE" => TransactionType::ExchangeStake,
            "EXCHANGE_UNSTAKE" => TransactionType::ExchangeUnstake,
            "EXCHANGE_INTEREST" => TransactionType::ExchangeInterest,
            "EXCHANGE_MINING" => TransactionType::ExchangeMining,
            "EXCHANGE_DIVIDEND" => TransactionType::ExchangeDividend,
            "EXCHANGE_MARGIN_BORROW" => TransactionType::ExchangeMarginBorrow,
            "EXCHANGE_MARGIN_REPAY" => TransactionType::ExchangeMarginRepay,
            "EXCHANGE_MARGIN_INTEREST" => TransactionType::ExchangeMarginInterest,
            "EXCHANGE_MARGIN_LIQUIDATION" => TransactionType::ExchangeMarginLiquidation,
            _ => TransactionType::Unknown,
        }
    }

    pub fn category(&self) -> TransactionCategory {
        match self {
            TransactionType::Swap
            | TransactionType::ExchangeTrade
            | TransactionType::ExchangeC2cTrade
            | TransactionType::ExchangeFiatBuy
            | TransactionType::ExchangeFiatSell
            | TransactionType::ExchangeConvert
            | TransactionType::ExchangeDustConvert => TransactionCategory::Trade,
            TransactionType::TransferIn
            | TransactionType::TransferOut
            | TransactionType::ExchangeDeposit
            | TransactionType::ExchangeWithdrawal => TransactionCategory::Transfer,
            TransactionType::Stake
            | TransactionType::Unstake
            | TransactionType::ExchangeStake
            | TransactionType::ExchangeUnstake => TransactionCategory::Staking,
            TransactionType::ExchangeInterest
            | TransactionType::ExchangeMining
            | TransactionType::ExchangeDividend => TransactionCategory::Income,
            TransactionType::ExchangeMarginBorrow
            | TransactionType::ExchangeMarginRepay
            | TransactionType::ExchangeMarginInterest
            | TransactionType::ExchangeMarginLiquidation => TransactionCategory::Margin,
            TransactionType::NftSale | TransactionType::NftMint => TransactionCategory::Nft,
            TransactionType::Memo | TransactionType::Unknown => TransactionCategory::Other,
        }
    }
}

impl TransactionCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionCategory::Trade => "TRADE",
            TransactionCategory::Transfer => "TRANSFER",
            TransactionCategory::Staking => "STAKING",
            TransactionCategory::Income => "INCOME",
            TransactionCategory::Margin => "MARGIN",
            TransactionCategory::Nft => "NFT",
            TransactionCategory::Other => "OTHER",
        }
    }
}

/// A canonical ledger entry, owning zero or more flows.
///
/// Created once per sync run (deduplicated by signature or
/// `(connection_id, external_id)`), afterwards updated only for linkage and
/// valuation backfill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub source: TransactionSource,
    /// Immutable on-chain signature; `None` for exchange rows.
    pub signature: Option<String>,
    /// Exchange-side identity, unique per connection.
    pub external_id: Option<String>,
    pub connection_id: Option<String>,
    pub wallet_address: Option<String>,
    pub transaction_type: TransactionType,
    pub timestamp: DateTime<Utc>,
    pub slot: Option<i64>,
    pub block_time: Option<i64>,
    pub total_value_usd: Option<f64>,
    pub fee: Option<f64>,
    pub linked_transaction_id: Option<String>,
    pub summary: Option<String>,
    /// Raw upstream payload retained verbatim for re-classification/audit.
    pub raw_data: Option<serde_json::Value>,
    pub flows: Vec<Flow>,
}

impl Transaction {
    pub fn new(
        source: TransactionSource,
        transaction_type: TransactionType,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Transaction {
            id: Uuid::new_v4().to_string(),
            source,
            signature: None,
            external_id: None,
            connection_id: None,
            wallet_address: None,
            transaction_type,
            timestamp,
            slot: None,
            block_time: None,
            total_value_usd: None,
            fee: None,
            linked_transaction_id: None,
            summary: None,
            raw_data: None,
            flows: Vec::new(),
        }
    }

    pub fn category(&self) -> TransactionCategory {
        self.transaction_type.category()
    }

    pub fn is_linked(&self) -> bool {
        self.linked_transaction_id.is_some()
    }

    /// Non-fee flows carry the economic substance of the event.
    pub fn economic_flows(&self) -> impl Iterator<Item = &Flow> {
        self.flows.iter().filter(|f| !f.is_fee)
    }

    /// The notional size of the event: the largest valued non-fee flow.
    pub fn notional_value_usd(&self) -> Option<f64> {
        self.economic_flows()
            .filter_map(|f| f.value_usd)
            .fold(None, |acc, v| Some(acc.map_or(v, |a: f64| a.max(v))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::flow::FlowDirection;

    #[test]
    fn test_type_round_trip() {
        for t in [
            TransactionType::Swap,
            TransactionType::ExchangeTrade,
            TransactionType::ExchangeFiatBuy,
            TransactionType::ExchangeMarginLiquidation,
            TransactionType::Unknown,
        ] {
            assert_eq!(TransactionType::parse(t.as_str()), t);
        }
    }

    #[test]
    fn test_parse_is_total() {
        assert_eq!(
            TransactionType::parse("SOMETHING_NEW"),
            TransactionType::Unknown
        );
        assert_eq!(TransactionType::parse(""), TransactionType::Unknown);
    }

    #[test]
    fn test_category_mapping() {
        assert_eq!(TransactionType::Swap.category(), TransactionCategory::Trade);
        assert_eq!(
            TransactionType::TransferIn.category(),
            TransactionCategory::Transfer
        );
        assert_eq!(
            TransactionType::ExchangeInterest.category(),
            TransactionCategory::Income
        );
        assert_eq!(
            TransactionType::ExchangeMarginRepay.category(),
            TransactionCategory::Margin
        );
        assert_eq!(
            TransactionType::Unknown.category(),
            TransactionCategory::Other
        );
    }

    #[test]
    fn test_notional_value_ignores_fees() {
        let mut tx = Transaction::new(
            TransactionSource::Exchange,
            TransactionType::ExchangeTrade,
            Utc::now(),
        );
        tx.flows.push(
            Flow::new("sol", "SOL", 9, 2.0, FlowDirection::In)
                .unwrap()
                .with_price(100.0),
        );
        tx.flows.push(
            Flow::new("usdc", "USDC", 6, 200.0, FlowDirection::Out)
                .unwrap()
                .with_price(1.0),
        );
        tx.flows.push(
            Flow::new("bnb", "BNB", 8, 10.0, FlowDirection::Out)
                .unwrap()
                .with_price(600.0)
                .as_fee(),
        );
        // Fee leg is worth 6000 USD but must not drive the notional.
        assert_eq!(tx.notional_value_usd(), Some(200.0));
    }

    #[test]
    fn test_notional_value_none_when_unpriced() {
        let mut tx = Transaction::new(
            TransactionSource::OnChain,
            TransactionType::Swap,
            Utc::now(),
        );
        tx.flows
            .push(Flow::new("sol", "SOL", 9, 2.0, FlowDirection::In).unwrap());
        assert_eq!(tx.notional_value_usd(), None);
    }
}
