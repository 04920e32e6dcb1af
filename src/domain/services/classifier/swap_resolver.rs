//! Swap leg resolution.
//!
//! Identifies the two assets and amounts of an exchange-of-value using a
//! cascade of strategies, tried in order, first success wins:
//!
//! 1. structured swap event supplied by the data provider;
//! 2. aggregation of native/token transfers into and out of the wallet;
//! 3. inspection of per-account balance deltas for the account executing a
//!    multi-hop route on the wallet's behalf.
//!
//! Each strategy is a pure function over the payload; when all fail the
//! transaction is still a swap, with a generic summary.

use crate::domain::entities::webhook::{
    WebhookPayload, LAMPORTS_PER_SOL, NATIVE_DECIMALS, NATIVE_MINT,
};
use std::collections::HashMap;

/// Net amounts below this are treated as zero.
const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
pub struct AssetAmount {
    pub mint: String,
    pub amount: f64,
    pub decimals: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwapLegs {
    pub sent: AssetAmount,
    pub received: AssetAmount,
}

pub struct SwapContext<'a> {
    pub payload: &'a WebhookPayload,
    pub wallet: &'a str,
    pub fee_payer: &'a str,
}

impl<'a> SwapContext<'a> {
    fn is_own_account(&self, account: &str) -> bool {
        account.eq_ignore_ascii_case(self.wallet) || account.eq_ignore_ascii_case(self.fee_payer)
    }
}

type Strategy = fn(&SwapContext) -> Option<SwapLegs>;

const STRATEGIES: [Strategy; 3] = [
    structured_event,
    transfer_aggregation,
    balance_delta_inspection,
];

/// Run the cascade; `None` means no strategy could name both legs.
pub fn resolve_swap(ctx: &SwapContext) -> Option<SwapLegs> {
    STRATEGIES.iter().find_map(|strategy| strategy(ctx))
}

/// Strategy 1: the payload carries an explicit input/output pair.
fn structured_event(ctx: &SwapContext) -> Option<SwapLegs> {
    let swap = ctx.payload.events.swap.as_ref()?;

    let sent = if let Some(native) = &swap.native_input {
        Some(native_amount(native.amount))
    } else {
        pick_token_leg(&swap.token_inputs, ctx)
    }?;

    let received = if let Some(native) = &swap.native_output {
        Some(native_amount(native.amount))
    } else {
        pick_token_leg(&swap.token_outputs, ctx)
    }?;

    if sent.mint == received.mint || sent.amount <= EPSILON || received.amount <= EPSILON {
        return None;
    }
    Some(SwapLegs { sent, received })
}

fn native_amount(lamports: u64) -> AssetAmount {
    AssetAmount {
        mint: NATIVE_MINT.to_string(),
        amount: lamports as f64 / LAMPORTS_PER_SOL,
        decimals: NATIVE_DECIMALS,
    }
}

fn pick_token_leg(
    legs: &[crate::domain::entities::webhook::TokenSwapLeg],
    ctx: &SwapContext,
) -> Option<AssetAmount> {
    legs.iter()
        .find(|leg| {
            leg.user_account
                .as_deref()
                .map(|a| ctx.is_own_account(a))
                .unwrap_or(false)
        })
        .or_else(|| legs.first())
        .map(|leg| AssetAmount {
            mint: leg.mint.clone(),
            amount: leg.token_amount,
            decimals: leg.decimals,
        })
}

/// Strategy 2: net all transfers touching the wallet's addresses per asset.
///
/// When at least one non-base asset moved, the base asset's net flow is
/// wrapping/fee noise and is excluded; a second pass includes it only when
/// the token-only pass could not name both legs.
fn transfer_aggregation(ctx: &SwapContext) -> Option<SwapLegs> {
    let mut nets: HashMap<String, (f64, u8)> = HashMap::new();

    for transfer in &ctx.payload.native_transfers {
        let incoming = transfer
            .to_user_account
            .as_deref()
            .map(|a| ctx.is_own_account(a))
            .unwrap_or(false);
        let outgoing = transfer
            .from_user_account
            .as_deref()
            .map(|a| ctx.is_own_account(a))
            .unwrap_or(false);
        if incoming == outgoing {
            continue;
        }
        let delta = transfer.amount as f64 / LAMPORTS_PER_SOL;
        let entry = nets
            .entry(NATIVE_MINT.to_string())
            .or_insert((0.0, NATIVE_DECIMALS));
        entry.0 += if incoming { delta } else { -delta };
    }

    for transfer in &ctx.payload.token_transfers {
        let incoming = transfer
            .to_user_account
            .as_deref()
            .map(|a| ctx.is_own_account(a))
            .unwrap_or(false);
        let outgoing = transfer
            .from_user_account
            .as_deref()
            .map(|a| ctx.is_own_account(a))
            .unwrap_or(false);
        if incoming == outgoing {
            continue;
        }
        let entry = nets
            .entry(transfer.mint.clone())
            .or_insert((0.0, transfer.decimals));
        entry.0 += if incoming {
            transfer.token_amount
        } else {
            -transfer.token_amount
        };
    }

    let tokens_only: HashMap<_, _> = nets
        .iter()
        .filter(|(mint, _)| mint.as_str() != NATIVE_MINT)
        .map(|(m, v)| (m.clone(), *v))
        .collect();

    pick_legs_from_nets(&tokens_only).or_else(|| pick_legs_from_nets(&nets))
}

/// Strategy 3: group account-level balance deltas by owning account and net
/// within the account that moved two or more distinct non-base assets (the
/// executor of a multi-hop route). A secondary pass handles the base↔token
/// case: one non-base delta plus an opposite-signed base delta on the same
/// account.
fn balance_delta_inspection(ctx: &SwapContext) -> Option<SwapLegs> {
    // Owner order follows payload order so classification stays deterministic.
    let mut owners: Vec<String> = Vec::new();
    let mut deltas: HashMap<String, HashMap<String, (f64, u8)>> = HashMap::new();

    let mut record = |owner: &str, mint: &str, amount: f64, decimals: u8| {
        if !deltas.contains_key(owner) {
            owners.push(owner.to_string());
        }
        let entry = deltas
            .entry(owner.to_string())
            .or_default()
            .entry(mint.to_string())
            .or_insert((0.0, decimals));
        entry.0 += amount;
    };

    for account in &ctx.payload.account_data {
        if account.native_balance_change != 0 {
            record(
                &account.account,
                NATIVE_MINT,
                account.native_balance_change as f64 / LAMPORTS_PER_SOL,
                NATIVE_DECIMALS,
            );
        }
        for change in &account.token_balance_changes {
            let owner = change.user_account.as_deref().unwrap_or(&account.account);
            record(owner, &change.mint, change.amount, change.decimals);
        }
    }

    // Primary: an account with two or more distinct non-base assets moving.
    for owner in &owners {
        let mints = &deltas[owner];
        let tokens: HashMap<_, _> = mints
            .iter()
            .filter(|(mint, (delta, _))| mint.as_str() != NATIVE_MINT && delta.abs() > EPSILON)
            .map(|(m, v)| (m.clone(), *v))
            .collect();
        if tokens.len() >= 2 {
            if let Some(legs) = pick_legs_from_nets(&tokens) {
                return Some(legs);
            }
        }
    }

    // Secondary: base↔token on a single account.
    for owner in &owners {
        let mints = &deltas[owner];
        let native = mints
            .get(NATIVE_MINT)
            .map(|(delta, _)| *delta)
            .unwrap_or(0.0);
        let tokens: Vec<_> = mints
            .iter()
            .filter(|(mint, (delta, _))| mint.as_str() != NATIVE_MINT && delta.abs() > EPSILON)
            .collect();
        if tokens.len() == 1 && native.abs() > EPSILON {
            let (mint, (token_delta, decimals)) = tokens[0];
            if token_delta.signum() == native.signum() {
                continue;
            }
            let native_leg = AssetAmount {
                mint: NATIVE_MINT.to_string(),
                amount: native.abs(),
                decimals: NATIVE_DECIMALS,
            };
            let token_leg = AssetAmount {
                mint: mint.clone(),
                amount: token_delta.abs(),
                decimals: *decimals,
            };
            return Some(if *token_delta > 0.0 {
                SwapLegs {
                    sent: native_leg,
                    received: token_leg,
                }
            } else {
                SwapLegs {
                    sent: token_leg,
                    received: native_leg,
                }
            });
        }
    }

    None
}

/// Sent is the most negative net, received the most positive.
fn pick_legs_from_nets(nets: &HashMap<String, (f64, u8)>) -> Option<SwapLegs> {
    let mut sent: Option<(&String, f64, u8)> = None;
    let mut received: Option<(&String, f64, u8)> = None;

    for (mint, (net, decimals)) in nets {
        if *net < -EPSILON && sent.map_or(true, |(_, best, _)| *net < best) {
            sent = Some((mint, *net, *decimals));
        }
        if *net > EPSILON && received.map_or(true, |(_, best, _)| *net > best) {
            received = Some((mint, *net, *decimals));
        }
    }

    let (sent_mint, sent_net, sent_decimals) = sent?;
    let (recv_mint, recv_net, recv_decimals) = received?;
    if sent_mint == recv_mint {
        return None;
    }
    Some(SwapLegs {
        sent: AssetAmount {
            mint: sent_mint.clone(),
            amount: sent_net.abs(),
            decimals: sent_decimals,
        },
        received: AssetAmount {
            mint: recv_mint.clone(),
            amount: recv_net,
            decimals: recv_decimals,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::webhook::*;

    const WALLET: &str = "WalletAAAA";
    const USDC: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";
    const RAY: &str = "4k3Dyjzvzp8eMZWUXbBCjEvwSkkk59S5iCNLY3QrkX6R";

    fn empty_payload() -> WebhookPayload {
        serde_json::from_str(
            r#"{"signature": "sig", "timestamp": 1700000000, "feePayer": "WalletAAAA"}"#,
        )
        .unwrap()
    }

    fn ctx(payload: &WebhookPayload) -> SwapContext {
        SwapContext {
            payload,
            wallet: WALLET,
            fee_payer: WALLET,
        }
    }

    fn token_transfer(from: &str, to: &str, mint: &str, amount: f64) -> TokenTransfer {
        TokenTransfer {
            from_user_account: Some(from.to_string()),
            to_user_account: Some(to.to_string()),
            from_token_account: None,
            to_token_account: None,
            mint: mint.to_string(),
            token_amount: amount,
            decimals: 6,
        }
    }

    #[test]
    fn test_structured_event_native_to_token() {
        let mut payload = empty_payload();
        payload.events.swap = Some(SwapEvent {
            native_input: Some(NativeSwapLeg {
                account: WALLET.to_string(),
                amount: 2_500_000_000,
            }),
            native_output: None,
            token_inputs: vec![],
            token_outputs: vec![TokenSwapLeg {
                mint: USDC.to_string(),
                token_amount: 310.5,
                decimals: 6,
                user_account: Some(WALLET.to_string()),
            }],
        });

        let legs = resolve_swap(&ctx(&payload)).unwrap();
        assert_eq!(legs.sent.mint, NATIVE_MINT);
        assert!((legs.sent.amount - 2.5).abs() < 1e-9);
        assert_eq!(legs.received.mint, USDC);
        assert_eq!(legs.received.amount, 310.5);
    }

    #[test]
    fn test_structured_event_wins_over_transfers() {
        let mut payload = empty_payload();
        payload.events.swap = Some(SwapEvent {
            native_input: Some(NativeSwapLeg {
                account: WALLET.to_string(),
                amount: 1_000_000_000,
            }),
            native_output: None,
            token_inputs: vec![],
            token_outputs: vec![TokenSwapLeg {
                mint: USDC.to_string(),
                token_amount: 150.0,
                decimals: 6,
                user_account: None,
            }],
        });
        // Contradictory transfers that strategy 2 would read differently.
        payload.token_transfers = vec![token_transfer("Pool", WALLET, RAY, 42.0)];

        let legs = resolve_swap(&ctx(&payload)).unwrap();
        assert_eq!(legs.received.mint, USDC);
    }

    #[test]
    fn test_aggregation_token_to_token_excludes_native_noise() {
        let mut payload = empty_payload();
        payload.token_transfers = vec![
            token_transfer(WALLET, "PoolA", USDC, 100.0),
            token_transfer("PoolB", WALLET, RAY, 50.0),
        ];
        // Wrapped-SOL routing noise: small native refund to the wallet.
        payload.native_transfers = vec![NativeTransfer {
            from_user_account: Some("PoolA".to_string()),
            to_user_account: Some(WALLET.to_string()),
            amount: 2_039_280,
        }];

        let legs = resolve_swap(&ctx(&payload)).unwrap();
        assert_eq!(legs.sent.mint, USDC);
        assert_eq!(legs.sent.amount, 100.0);
        assert_eq!(legs.received.mint, RAY);
        assert_eq!(legs.received.amount, 50.0);
    }

    #[test]
    fn test_aggregation_native_fallback_when_only_signal() {
        let mut payload = empty_payload();
        payload.native_transfers = vec![NativeTransfer {
            from_user_account: Some(WALLET.to_string()),
            to_user_account: Some("Pool".to_string()),
            amount: 1_000_000_000,
        }];
        payload.token_transfers = vec![token_transfer("Pool", WALLET, USDC, 150.0)];

        let legs = resolve_swap(&ctx(&payload)).unwrap();
        assert_eq!(legs.sent.mint, NATIVE_MINT);
        assert!((legs.sent.amount - 1.0).abs() < 1e-9);
        assert_eq!(legs.received.mint, USDC);
    }

    #[test]
    fn test_multi_hop_balance_delta_scenario() {
        // No structured event, no transfers attributed to the wallet; the
        // routing account moved USDC -100 and RAY +50.
        let mut payload = empty_payload();
        payload.account_data = vec![AccountBalanceChange {
            account: "RouterXYZ".to_string(),
            native_balance_change: 0,
            token_balance_changes: vec![
                TokenBalanceChange {
                    mint: USDC.to_string(),
                    user_account: Some("RouterXYZ".to_string()),
                    token_account: None,
                    amount: -100.0,
                    decimals: 6,
                },
                TokenBalanceChange {
                    mint: RAY.to_string(),
                    user_account: Some("RouterXYZ".to_string()),
                    token_account: None,
                    amount: 50.0,
                    decimals: 6,
                },
            ],
        }];

        let legs = resolve_swap(&ctx(&payload)).unwrap();
        assert_eq!(legs.sent.mint, USDC);
        assert_eq!(legs.sent.amount, 100.0);
        assert_eq!(legs.received.mint, RAY);
        assert_eq!(legs.received.amount, 50.0);
    }

    #[test]
    fn test_balance_delta_secondary_base_token_case() {
        let mut payload = empty_payload();
        payload.account_data = vec![AccountBalanceChange {
            account: WALLET.to_string(),
            native_balance_change: -2_000_000_000,
            token_balance_changes: vec![TokenBalanceChange {
                mint: USDC.to_string(),
                user_account: Some(WALLET.to_string()),
                token_account: None,
                amount: 300.0,
                decimals: 6,
            }],
        }];

        let legs = resolve_swap(&ctx(&payload)).unwrap();
        assert_eq!(legs.sent.mint, NATIVE_MINT);
        assert!((legs.sent.amount - 2.0).abs() < 1e-9);
        assert_eq!(legs.received.mint, USDC);
        assert_eq!(legs.received.amount, 300.0);
    }

    #[test]
    fn test_all_strategies_fail_returns_none() {
        let payload = empty_payload();
        assert!(resolve_swap(&ctx(&payload)).is_none());
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let mut payload = empty_payload();
        payload.token_transfers = vec![
            token_transfer(WALLET, "PoolA", USDC, 100.0),
            token_transfer("PoolB", WALLET, RAY, 50.0),
        ];
        let a = resolve_swap(&ctx(&payload)).unwrap();
        let b = resolve_swap(&ctx(&payload)).unwrap();
        assert_eq!(a, b);
    }
}
