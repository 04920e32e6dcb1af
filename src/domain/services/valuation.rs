//! Valuation backfill.
//!
//! Fills missing USD prices on non-fee flows. Convert records are priced
//! from their own cross-asset amounts when one side is a stablecoin; fiat
//! flows use a daily fiat→USD rate; everything else asks the injected
//! `PriceSource` for a daily close. After pricing a flow, the parent's
//! `total_value_usd` (when still unset) becomes the maximum valued non-fee
//! flow on the transaction.

use crate::domain::entities::flow::Flow;
use crate::domain::entities::transaction::TransactionType;
use crate::domain::repositories::price_source::PriceSource;
use crate::domain::services::token_resolver::{is_fiat, is_stablecoin};
use crate::persistence::transaction_repository::{TransactionRepository, UnpricedFlow};
use tracing::{debug, info, warn};

/// Counters for one backfill run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackfillOutcome {
    pub priced: usize,
    /// Flows whose source had no data for the day; retried on later runs.
    pub unpriced: usize,
    pub failures: usize,
}

pub struct ValuationBackfill<'a> {
    repository: &'a TransactionRepository,
    price_source: &'a dyn PriceSource,
    batch_limit: i64,
}

impl<'a> ValuationBackfill<'a> {
    pub fn new(
        repository: &'a TransactionRepository,
        price_source: &'a dyn PriceSource,
        batch_limit: i64,
    ) -> Self {
        ValuationBackfill {
            repository,
            price_source,
            batch_limit,
        }
    }

    pub async fn run(&self) -> Result<BackfillOutcome, crate::persistence::DatabaseError> {
        let pending = self.repository.find_unpriced_flows(self.batch_limit).await?;
        let mut outcome = BackfillOutcome::default();

        for item in &pending {
            match self.price_one(item).await {
                Ok(Some(price)) => {
                    let value_usd = price * item.flow.amount;
                    self.repository
                        .update_flow_price(&item.flow.id, price, value_usd)
                        .await?;
                    self.refresh_total_value(&item.transaction_id).await?;
                    outcome.priced += 1;
                }
                Ok(None) => outcome.unpriced += 1,
                Err(e) => {
                    warn!(
                        flow_id = %item.flow.id,
                        symbol = %item.flow.symbol,
                        error = %e,
                        "Price lookup failed; will retry on a later run"
                    );
                    outcome.failures += 1;
                }
            }
        }

        info!(
            priced = outcome.priced,
            unpriced = outcome.unpriced,
            failures = outcome.failures,
            "Valuation backfill complete"
        );
        Ok(outcome)
    }

    async fn price_one(
        &self,
        item: &UnpricedFlow,
    ) -> Result<Option<f64>, crate::domain::errors::PriceError> {
        if matches!(
            item.transaction_type,
            TransactionType::ExchangeConvert | TransactionType::ExchangeDustConvert
        ) {
            if let Some(price) = self.convert_cross_price(item).await {
                debug!(
                    flow_id = %item.flow.id,
                    price,
                    "Derived price from convert cross-asset amounts"
                );
                return Ok(Some(price));
            }
        }

        let date = item.timestamp.date_naive();
        if is_fiat(&item.flow.symbol) {
            return self
                .price_source
                .fiat_daily_rate(&item.flow.symbol, date)
                .await;
        }
        self.price_source
            .token_daily_price(&item.flow.symbol, date)
            .await
    }

    /// Convert cross-price: when the other leg of the conversion is a
    /// stablecoin, price = stablecoin amount / asset amount.
    async fn convert_cross_price(&self, item: &UnpricedFlow) -> Option<f64> {
        let parent = self
            .repository
            .get(&item.transaction_id)
            .await
            .ok()
            .flatten()?;
        let stable_leg: &Flow = parent
            .economic_flows()
            .find(|f| f.id != item.flow.id && is_stablecoin(&f.symbol))?;
        if item.flow.amount <= 0.0 {
            return None;
        }
        Some(stable_leg.amount / item.flow.amount)
    }

    async fn refresh_total_value(
        &self,
        transaction_id: &str,
    ) -> Result<(), crate::persistence::DatabaseError> {
        if let Some(parent) = self.repository.get(transaction_id).await? {
            if parent.total_value_usd.is_none() {
                if let Some(notional) = parent.notional_value_usd() {
                    self.repository
                        .set_total_value_usd_if_unset(transaction_id, notional)
                        .await?;
                }
            }
        }
        Ok(())
    }
}
