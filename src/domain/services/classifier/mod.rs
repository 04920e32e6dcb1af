//! On-chain transaction classification.
//!
//! Turns one webhook payload, already associated with a known wallet, into a
//! semantic transaction type, a direction-aware flow list, and a
//! human-readable summary. Classification is rule-based over known program
//! ids and transfer shapes, deterministic, and total: every payload maps to
//! exactly one type with `Unknown` as the universal fallback.

pub mod programs;
pub mod summary;
pub mod swap_resolver;

use crate::domain::entities::flow::{Flow, FlowDirection};
use crate::domain::entities::label::shorten_address;
use crate::domain::entities::transaction::TransactionType;
use crate::domain::entities::webhook::{
    WebhookPayload, LAMPORTS_PER_SOL, NATIVE_DECIMALS, NATIVE_MINT, NATIVE_SYMBOL,
};
use crate::domain::services::token_resolver::TokenResolver;
use programs::{program_kind, ProgramKind};
use summary::{summarize, LabelBook, SummaryContext};
use swap_resolver::{resolve_swap, SwapContext, SwapLegs};
use tracing::debug;

/// Result of classifying one payload.
#[derive(Debug, Clone)]
pub struct Classification {
    pub transaction_type: TransactionType,
    pub flows: Vec<Flow>,
    pub summary: String,
    pub swap: Option<SwapLegs>,
    /// Mints seen in flows with no symbol mapping; callers may record these
    /// as discovery rows so later runs resolve them.
    pub unmapped_mints: Vec<(String, u8)>,
}

/// One transfer attributed to the wallet, before flow construction.
#[derive(Debug, Clone)]
struct AttributedTransfer {
    mint: String,
    amount: f64,
    decimals: u8,
    direction: FlowDirection,
    counterparty: Option<String>,
}

pub struct OnChainClassifier<'a> {
    resolver: &'a TokenResolver,
    labels: &'a LabelBook,
}

impl<'a> OnChainClassifier<'a> {
    pub fn new(resolver: &'a TokenResolver, labels: &'a LabelBook) -> Self {
        OnChainClassifier { resolver, labels }
    }

    /// Classify a payload for a wallet. Never fails; the worst case is
    /// `Unknown` with an empty flow list.
    pub fn classify(&self, payload: &WebhookPayload, wallet: &str) -> Classification {
        let fee_payer = payload.fee_payer.as_str();
        let attributed = attribute_transfers(payload, wallet, fee_payer);
        let transaction_type = self.derive_type(payload, wallet, &attributed);

        let swap = if transaction_type == TransactionType::Swap {
            resolve_swap(&SwapContext {
                payload,
                wallet,
                fee_payer,
            })
        } else {
            None
        };

        let mut unmapped = Vec::new();
        let mut flows = match &swap {
            Some(legs) => self.swap_flows(legs, &mut unmapped),
            None => self.transfer_flows(&attributed, &mut unmapped),
        };

        // The network fee is a flow of its own when this wallet paid it.
        if payload.fee > 0 && fee_payer.eq_ignore_ascii_case(wallet) {
            if let Ok(flow) = Flow::new(
                NATIVE_MINT,
                NATIVE_SYMBOL,
                NATIVE_DECIMALS,
                payload.fee as f64 / LAMPORTS_PER_SOL,
                FlowDirection::Out,
            ) {
                flows.push(flow.as_fee());
            }
        }

        let counterparty = dominant_counterparty(&attributed);
        let summary = summarize(
            transaction_type,
            &SummaryContext {
                flows: &flows,
                counterparty: counterparty.as_deref(),
                program_id: primary_program(payload),
                labels: self.labels,
            },
        );

        debug!(
            signature = %payload.signature,
            transaction_type = transaction_type.as_str(),
            flow_count = flows.len(),
            "Classified on-chain payload"
        );

        Classification {
            transaction_type,
            flows,
            summary,
            swap,
            unmapped_mints: unmapped,
        }
    }

    fn derive_type(
        &self,
        payload: &WebhookPayload,
        wallet: &str,
        attributed: &[AttributedTransfer],
    ) -> TransactionType {
        let kinds: Vec<ProgramKind> = payload
            .instructions
            .iter()
            .filter_map(|i| program_kind(&i.program_id))
            .collect();

        let has = |kind: ProgramKind| kinds.contains(&kind);

        if has(ProgramKind::Stake) {
            // Direction of the native movement decides stake vs unstake.
            return if payload.native_change_sol(wallet) < 0.0 {
                TransactionType::Stake
            } else {
                TransactionType::Unstake
            };
        }

        let dex_shaped = has(ProgramKind::DexAmm)
            && (!payload.token_transfers.is_empty() || payload.events.swap.is_some());
        if dex_shaped || payload.events.swap.is_some() {
            return TransactionType::Swap;
        }

        if has(ProgramKind::NftMarketplace) {
            return TransactionType::NftSale;
        }
        if has(ProgramKind::NftMetadata) {
            return TransactionType::NftMint;
        }

        if has(ProgramKind::Memo) && !payload.has_transfers() {
            return TransactionType::Memo;
        }

        // Plain transfer shapes: no known action program matched. Unlisted
        // program ids do not block this; only a recognized action program
        // that fell through the rules above does.
        let action_program = payload.instructions.iter().any(|i| {
            matches!(
                program_kind(&i.program_id),
                Some(
                    ProgramKind::DexAmm
                        | ProgramKind::NftMarketplace
                        | ProgramKind::NftMetadata
                        | ProgramKind::Stake
                )
            )
        });
        if !attributed.is_empty() && !action_program {
            let all_in = attributed.iter().all(|t| t.direction == FlowDirection::In);
            let all_out = attributed.iter().all(|t| t.direction == FlowDirection::Out);
            if all_in {
                return TransactionType::TransferIn;
            }
            if all_out {
                return TransactionType::TransferOut;
            }
        }

        TransactionType::Unknown
    }

    fn swap_flows(&self, legs: &SwapLegs, unmapped: &mut Vec<(String, u8)>) -> Vec<Flow> {
        let mut flows = Vec::with_capacity(2);
        for (leg, direction) in [
            (&legs.sent, FlowDirection::Out),
            (&legs.received, FlowDirection::In),
        ] {
            let (symbol, decimals) = self.token_metadata(&leg.mint, leg.decimals, unmapped);
            if let Ok(flow) = Flow::new(leg.mint.clone(), symbol, decimals, leg.amount, direction) {
                flows.push(flow);
            }
        }
        flows
    }

    fn transfer_flows(
        &self,
        attributed: &[AttributedTransfer],
        unmapped: &mut Vec<(String, u8)>,
    ) -> Vec<Flow> {
        attributed
            .iter()
            .filter_map(|transfer| {
                let (symbol, decimals) =
                    self.token_metadata(&transfer.mint, transfer.decimals, unmapped);
                Flow::new(
                    transfer.mint.clone(),
                    symbol,
                    decimals,
                    transfer.amount,
                    transfer.direction,
                )
                .ok()
            })
            .collect()
    }

    /// Symbol and decimals for a mint: native constants, then the mapping
    /// table, then a shortened-mint placeholder recorded for discovery.
    fn token_metadata(
        &self,
        mint: &str,
        payload_decimals: u8,
        unmapped: &mut Vec<(String, u8)>,
    ) -> (String, u8) {
        if mint == NATIVE_MINT {
            return (NATIVE_SYMBOL.to_string(), NATIVE_DECIMALS);
        }
        if let Some((symbol, _)) = self.resolver.lookup_mint(mint) {
            return (symbol, payload_decimals);
        }
        if !unmapped.iter().any(|(m, _)| m == mint) {
            unmapped.push((mint.to_string(), payload_decimals));
        }
        (shorten_address(mint), payload_decimals)
    }
}

/// Derive wallet-relative transfers from the payload.
///
/// IN when the destination (or its user-account alias) matches the wallet or
/// fee payer, otherwise OUT under the symmetric source condition;
/// case-insensitive. Transfers matching neither side are unattributed:
/// excluded from directional flows, surviving only in the retained raw
/// payload.
fn attribute_transfers(
    payload: &WebhookPayload,
    wallet: &str,
    fee_payer: &str,
) -> Vec<AttributedTransfer> {
    let is_own = |account: Option<&str>| {
        account
            .map(|a| a.eq_ignore_ascii_case(wallet) || a.eq_ignore_ascii_case(fee_payer))
            .unwrap_or(false)
    };
    let direction_of = |from: Option<&str>, to: Option<&str>| {
        if is_own(to) {
            Some(FlowDirection::In)
        } else if is_own(from) {
            Some(FlowDirection::Out)
        } else {
            None
        }
    };

    let mut attributed = Vec::new();

    for transfer in &payload.native_transfers {
        let direction = match direction_of(
            transfer.from_user_account.as_deref(),
            transfer.to_user_account.as_deref(),
        ) {
            Some(direction) => direction,
            None => continue,
        };
        let counterparty = match direction {
            FlowDirection::In => transfer.from_user_account.clone(),
            FlowDirection::Out => transfer.to_user_account.clone(),
        };
        attributed.push(AttributedTransfer {
            mint: NATIVE_MINT.to_string(),
            amount: transfer.amount as f64 / LAMPORTS_PER_SOL,
            decimals: NATIVE_DECIMALS,
            direction,
            counterparty,
        });
    }

    for transfer in &payload.token_transfers {
        let direction = match direction_of(
            transfer.from_user_account.as_deref(),
            transfer.to_user_account.as_deref(),
        ) {
            Some(direction) => direction,
            None => continue,
        };
        let counterparty = match direction {
            FlowDirection::In => transfer.from_user_account.clone(),
            FlowDirection::Out => transfer.to_user_account.clone(),
        };
        attributed.push(AttributedTransfer {
            mint: transfer.mint.clone(),
            amount: transfer.token_amount,
            decimals: transfer.decimals,
            direction,
            counterparty,
        });
    }

    attributed
}

/// Counterparty of the largest attributed movement.
fn dominant_counterparty(attributed: &[AttributedTransfer]) -> Option<String> {
    attributed
        .iter()
        .max_by(|a, b| {
            a.amount
                .partial_cmp(&b.amount)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .and_then(|t| t.counterparty.clone())
}

/// First instruction program that is not pure plumbing, for summaries.
fn primary_program(payload: &WebhookPayload) -> Option<&str> {
    payload
        .instructions
        .iter()
        .map(|i| i.program_id.as_str())
        .find(|id| {
            !matches!(
                program_kind(id),
                Some(
                    ProgramKind::System
                        | ProgramKind::Token
                        | ProgramKind::AssociatedToken
                        | ProgramKind::Compute
                )
            )
        })
}
