use crate::domain::errors::ValidationError;
use crate::domain::value_objects::amount::{clamp_decimals, Amount};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Direction of an asset movement relative to the owning wallet or account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowDirection {
    In,
    Out,
}

impl FlowDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowDirection::In => "IN",
            FlowDirection::Out => "OUT",
        }
    }

    pub fn parse(s: &str) -> Option<FlowDirection> {
        match s {
            "IN" => Some(FlowDirection::In),
            "OUT" => Some(FlowDirection::Out),
            _ => None,
        }
    }

    pub fn opposite(&self) -> FlowDirection {
        match self {
            FlowDirection::In => FlowDirection::Out,
            FlowDirection::Out => FlowDirection::In,
        }
    }
}

/// One directional movement of one asset within a transaction.
///
/// The amount is always a positive magnitude; `direction` carries the sign.
/// Fee legs are marked with `is_fee` and excluded from swap/trade economic
/// matching and valuation backfill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flow {
    pub id: String,
    pub mint: String,
    pub symbol: String,
    pub decimals: u8,
    pub network: Option<String>,
    pub amount: f64,
    pub direction: FlowDirection,
    pub value_usd: Option<f64>,
    pub price_at_execution: Option<f64>,
    pub is_fee: bool,
}

impl Flow {
    /// Build a validated flow. Rejects non-positive or non-finite amounts
    /// and clamps decimals to the supported ceiling.
    pub fn new(
        mint: impl Into<String>,
        symbol: impl Into<String>,
        decimals: u8,
        amount: f64,
        direction: FlowDirection,
    ) -> Result<Self, ValidationError> {
        let amount = Amount::new(amount)?;
        Ok(Flow {
            id: Uuid::new_v4().to_string(),
            mint: mint.into(),
            symbol: symbol.into(),
            decimals: clamp_decimals(decimals),
            network: None,
            amount: amount.value(),
            direction,
            value_usd: None,
            price_at_execution: None,
            is_fee: false,
        })
    }

    pub fn with_network(mut self, network: impl Into<String>) -> Self {
        self.network = Some(network.into());
        self
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price_at_execution = Some(price);
        self.value_usd = Some(price * self.amount);
        self
    }

    pub fn as_fee(mut self) -> Self {
        self.is_fee = true;
        self
    }

    pub fn is_priced(&self) -> bool {
        self.price_at_execution.is_some()
    }
}
