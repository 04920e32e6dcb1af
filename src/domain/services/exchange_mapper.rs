//! Exchange record mapping.
//!
//! Converts one raw exchange record into one canonical transaction with its
//! flows. Each record type has a fixed flow-generation rule; unrecognized
//! types are skipped with a warning, never an error. The mapper is pure and
//! re-callable: idempotence comes from the caller deduplicating on
//! `(connection_id, external_id)` before persisting.

use crate::domain::entities::exchange_record::{ExchangeRecord, ExchangeRecordType, TradeSide};
use crate::domain::entities::flow::{Flow, FlowDirection};
use crate::domain::entities::transaction::{Transaction, TransactionSource, TransactionType};
use crate::domain::services::token_resolver::{is_fiat, is_stablecoin, TokenResolver};
use tracing::warn;

pub struct ExchangeRecordMapper<'a> {
    resolver: &'a TokenResolver,
}

impl<'a> ExchangeRecordMapper<'a> {
    pub fn new(resolver: &'a TokenResolver) -> Self {
        ExchangeRecordMapper { resolver }
    }

    /// Map a record to a canonical transaction, or `None` when the record
    /// type is unrecognized or the primary amount is unusable.
    pub fn map(&self, record: &ExchangeRecord, connection_id: &str) -> Option<Transaction> {
        let transaction_type = match self.output_type(record) {
            Some(t) => t,
            None => {
                warn!(
                    external_id = %record.external_id,
                    "Skipping exchange record with unrecognized type"
                );
                return None;
            }
        };

        let flows = match self.build_flows(record) {
            Some(flows) => flows,
            None => {
                warn!(
                    external_id = %record.external_id,
                    "Skipping exchange record with unusable primary amount"
                );
                return None;
            }
        };

        let mut tx = Transaction::new(TransactionSource::Exchange, transaction_type, record.timestamp);
        tx.external_id = Some(record.external_id.clone());
        tx.connection_id = Some(connection_id.to_string());
        tx.total_value_usd = record.total_value_usd;
        tx.fee = flows
            .iter()
            .find(|f| f.is_fee)
            .and_then(|f| f.value_usd);
        tx.raw_data = serde_json::to_value(record).ok();
        tx.flows = flows;
        Some(tx)
    }

    /// Output type for a record, applying the fiat remap for deposits and
    /// withdrawals: fiat movements are tax-relevant acquisitions/disposals,
    /// not simple transfers.
    fn output_type(&self, record: &ExchangeRecord) -> Option<TransactionType> {
        let t = match record.record_type {
            ExchangeRecordType::Trade => TransactionType::ExchangeTrade,
            ExchangeRecordType::C2cTrade => TransactionType::ExchangeC2cTrade,
            ExchangeRecordType::Deposit => {
                if is_fiat(&record.asset) {
                    TransactionType::ExchangeFiatBuy
                } else {
                    TransactionType::ExchangeDeposit
                }
            }
            ExchangeRecordType::Withdrawal => {
                if is_fiat(&record.asset) {
                    TransactionType::ExchangeFiatSell
                } else {
                    TransactionType::ExchangeWithdrawal
                }
            }
            ExchangeRecordType::FiatBuy => TransactionType::ExchangeFiatBuy,
            ExchangeRecordType::FiatSell => TransactionType::ExchangeFiatSell,
            ExchangeRecordType::Convert => TransactionType::ExchangeConvert,
            ExchangeRecordType::DustConvert => TransactionType::ExchangeDustConvert,
            ExchangeRecordType::Stake => TransactionType::ExchangeStake,
            ExchangeRecordType::Unstake => TransactionType::ExchangeUnstake,
            ExchangeRecordType::Interest => TransactionType::ExchangeInterest,
            ExchangeRecordType::Mining => TransactionType::ExchangeMining,
            ExchangeRecordType::Dividend => TransactionType::ExchangeDividend,
            ExchangeRecordType::MarginBorrow => TransactionType::ExchangeMarginBorrow,
            ExchangeRecordType::MarginRepay => TransactionType::ExchangeMarginRepay,
            ExchangeRecordType::MarginInterest => TransactionType::ExchangeMarginInterest,
            ExchangeRecordType::MarginLiquidation => TransactionType::ExchangeMarginLiquidation,
            ExchangeRecordType::Unknown => return None,
        };
        Some(t)
    }

    fn build_flows(&self, record: &ExchangeRecord) -> Option<Vec<Flow>> {
        use ExchangeRecordType::*;
        match record.record_type {
            Trade | C2cTrade => {
                let base_direction = match record.side {
                    Some(TradeSide::Buy) => FlowDirection::In,
                    Some(TradeSide::Sell) | None => FlowDirection::Out,
                };
                let mut flows = vec![self.asset_flow(
                    &record.asset,
                    record.network.as_deref(),
                    record.amount,
                    base_direction,
                    record.price_usd,
                )?];
                if let (Some(quote_asset), Some(quote_amount)) =
                    (&record.quote_asset, record.quote_amount)
                {
                    if let Some(flow) = self.asset_flow(
                        quote_asset,
                        record.network.as_deref(),
                        quote_amount,
                        base_direction.opposite(),
                        None,
                    ) {
                        flows.push(flow);
                    }
                }
                self.push_fee_flow(record, &mut flows);
                Some(flows)
            }
            Deposit | FiatBuy | Unstake | Interest | Mining | Dividend | MarginBorrow => {
                let mut flows = vec![self.asset_flow(
                    &record.asset,
                    record.network.as_deref(),
                    record.amount,
                    FlowDirection::In,
                    record.price_usd,
                )?];
                self.push_fee_flow(record, &mut flows);
                Some(flows)
            }
            Withdrawal | FiatSell | Stake | MarginRepay | MarginInterest | MarginLiquidation => {
                let mut flows = vec![self.asset_flow(
                    &record.asset,
                    record.network.as_deref(),
                    record.amount,
                    FlowDirection::Out,
                    record.price_usd,
                )?];
                self.push_fee_flow(record, &mut flows);
                Some(flows)
            }
            Convert | DustConvert => {
                // Source asset leaves the account, target asset arrives.
                let mut flows = vec![self.asset_flow(
                    &record.asset,
                    record.network.as_deref(),
                    record.amount,
                    FlowDirection::Out,
                    record.price_usd,
                )?];
                if let (Some(target_asset), Some(target_amount)) =
                    (&record.quote_asset, record.quote_amount)
                {
                    if let Some(flow) = self.asset_flow(
                        target_asset,
                        record.network.as_deref(),
                        target_amount,
                        FlowDirection::In,
                        None,
                    ) {
                        flows.push(flow);
                    }
                }
                self.push_fee_flow(record, &mut flows);
                Some(flows)
            }
            Unknown => None,
        }
    }

    /// Build one flow, resolving the symbol and applying the stablecoin
    /// price rule. Returns `None` for non-positive amounts.
    fn asset_flow(
        &self,
        symbol: &str,
        network: Option<&str>,
        amount: f64,
        direction: FlowDirection,
        explicit_price: Option<f64>,
    ) -> Option<Flow> {
        let token = self.resolver.resolve(symbol, network);
        let mut flow =
            Flow::new(token.mint, token.symbol.clone(), token.decimals, amount, direction).ok()?;
        if let Some(network) = network {
            flow = flow.with_network(network.to_uppercase());
        }
        if let Some(price) = explicit_price {
            flow = flow.with_price(price);
        } else if is_stablecoin(&token.symbol) || token.symbol == "USD" {
            flow = flow.with_price(1.0);
        }
        Some(flow)
    }

    fn push_fee_flow(&self, record: &ExchangeRecord, flows: &mut Vec<Flow>) {
        if let (Some(fee_asset), Some(fee_amount)) = (&record.fee_asset, record.fee_amount) {
            if let Some(flow) = self.asset_flow(
                fee_asset,
                record.network.as_deref(),
                fee_amount,
                FlowDirection::Out,
                None,
            ) {
                flows.push(flow.as_fee());
            }
        }
    }
}
