//! Human-readable transaction summaries.
//!
//! One template per transaction type, formatted from the dominant flow and
//! a counterparty label. Label resolution priority: user-assigned label,
//! then discovered-counterparty label, then the built-in known-address
//! registry, then the shortened raw address.

use crate::domain::entities::flow::{Flow, FlowDirection};
use crate::domain::entities::label::{shorten_address, AddressLabel, LabelSource};
use crate::domain::entities::transaction::TransactionType;
use crate::domain::services::classifier::programs::program_label;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Well-known non-program addresses (exchange hot wallets, burn address).
static KNOWN_ADDRESSES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (
            "5tzFkiKscXHK5ZXCGbXZxdw7gTjjD1mBwuoFbhUvuAi9",
            "Binance Hot Wallet",
        ),
        (
            "2ojv9BAiHUrvsm9gxDe7fJSzbNZSJcxZvf8dqmWGHG8S",
            "Coinbase Hot Wallet",
        ),
        (
            "H8sMJSCQxfKiFTCfDR3DUMLPwcRbM61LGFJ8N4dK3WjS",
            "Coinbase 2",
        ),
        ("1nc1nerator11111111111111111111111111111111", "Incinerator"),
    ])
});

/// Address label lookup spanning user-assigned and discovered labels.
#[derive(Debug, Default)]
pub struct LabelBook {
    user: HashMap<String, String>,
    discovered: HashMap<String, String>,
}

impl LabelBook {
    pub fn new(labels: Vec<AddressLabel>) -> Self {
        let mut book = LabelBook::default();
        for label in labels {
            match label.source {
                LabelSource::User => {
                    book.user.insert(label.address, label.label);
                }
                LabelSource::Discovered => {
                    book.discovered.insert(label.address, label.label);
                }
            }
        }
        book
    }

    pub fn label(&self, address: &str) -> String {
        if let Some(label) = self.user.get(address) {
            return label.clone();
        }
        if let Some(label) = self.discovered.get(address) {
            return label.clone();
        }
        if let Some(label) = KNOWN_ADDRESSES.get(address) {
            return (*label).to_string();
        }
        shorten_address(address)
    }
}

/// Format an amount for display, trimming trailing zeros.
pub fn format_amount(value: f64) -> String {
    let formatted = format!("{:.6}", value);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    trimmed.to_string()
}

/// The flow that names the event: the largest non-fee movement.
pub fn dominant_flow(flows: &[Flow]) -> Option<&Flow> {
    flows
        .iter()
        .filter(|f| !f.is_fee)
        .max_by(|a, b| a.amount.partial_cmp(&b.amount).unwrap_or(std::cmp::Ordering::Equal))
}

pub struct SummaryContext<'a> {
    pub flows: &'a [Flow],
    pub counterparty: Option<&'a str>,
    pub program_id: Option<&'a str>,
    pub labels: &'a LabelBook,
}

/// Render the template for a transaction type.
pub fn summarize(transaction_type: TransactionType, ctx: &SummaryContext) -> String {
    match transaction_type {
        TransactionType::Swap => summarize_swap(ctx),
        TransactionType::TransferIn => {
            let flow = dominant_flow(ctx.flows);
            match (flow, ctx.counterparty) {
                (Some(flow), Some(from)) => format!(
                    "Received {} {} from {}",
                    format_amount(flow.amount),
                    flow.symbol,
                    ctx.labels.label(from)
                ),
                (Some(flow), None) => {
                    format!("Received {} {}", format_amount(flow.amount), flow.symbol)
                }
                _ => "Received assets".to_string(),
            }
        }
        TransactionType::TransferOut => {
            let flow = dominant_flow(ctx.flows);
            match (flow, ctx.counterparty) {
                (Some(flow), Some(to)) => format!(
                    "Sent {} {} to {}",
                    format_amount(flow.amount),
                    flow.symbol,
                    ctx.labels.label(to)
                ),
                (Some(flow), None) => {
                    format!("Sent {} {}", format_amount(flow.amount), flow.symbol)
                }
                _ => "Sent assets".to_string(),
            }
        }
        TransactionType::Stake => match dominant_flow(ctx.flows) {
            Some(flow) => format!("Staked {} {}", format_amount(flow.amount), flow.symbol),
            None => "Staked assets".to_string(),
        },
        TransactionType::Unstake => match dominant_flow(ctx.flows) {
            Some(flow) => format!("Unstaked {} {}", format_amount(flow.amount), flow.symbol),
            None => "Unstaked assets".to_string(),
        },
        TransactionType::NftSale => match ctx.program_id.and_then(program_label) {
            Some(marketplace) => format!("NFT sale on {}", marketplace),
            None => "NFT sale".to_string(),
        },
        TransactionType::NftMint => "Minted NFT".to_string(),
        TransactionType::Memo => "Memo".to_string(),
        TransactionType::Unknown => match ctx.program_id {
            Some(program_id) => match program_label(program_id) {
                Some(label) => format!("Interacted with {}", label),
                None => format!("Interacted with {}", shorten_address(program_id)),
            },
            None => "Unknown transaction".to_string(),
        },
        // Exchange types are summarized by their record shape, not here.
        other => other.as_str().replace('_', " ").to_lowercase(),
    }
}

fn summarize_swap(ctx: &SummaryContext) -> String {
    let sent = ctx
        .flows
        .iter()
        .find(|f| !f.is_fee && f.direction == FlowDirection::Out);
    let received = ctx
        .flows
        .iter()
        .find(|f| !f.is_fee && f.direction == FlowDirection::In);
    match (sent, received) {
        (Some(sent), Some(received)) => format!(
            "Swapped {} {} for {} {}",
            format_amount(sent.amount),
            sent.symbol,
            format_amount(received.amount),
            received.symbol
        ),
        // Legs unresolved: degrade to a generic label, never fail.
        _ => "Swapped assets".to_string(),
    }
}
