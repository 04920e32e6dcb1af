//! On-chain webhook payload model.
//!
//! Mirrors the enhanced-transaction payload delivered by the chain data
//! provider: instruction list, native and token transfer lists, per-account
//! balance deltas, and an optional structured swap event. The payload is
//! retained verbatim as `raw_data` on the canonical transaction; these types
//! only shape what the classifier reads.

use serde::{Deserialize, Serialize};

/// Lamports per SOL, for converting raw native amounts.
pub const LAMPORTS_PER_SOL: f64 = 1_000_000_000.0;

/// The chain's native asset pseudo-mint.
pub const NATIVE_MINT: &str = "So11111111111111111111111111111111111111112";
pub const NATIVE_SYMBOL: &str = "SOL";
pub const NATIVE_DECIMALS: u8 = 9;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    pub signature: String,
    /// Unix seconds of the containing block.
    pub timestamp: i64,
    #[serde(default)]
    pub slot: Option<u64>,
    /// Transaction fee in lamports, paid by `fee_payer`.
    #[serde(default)]
    pub fee: u64,
    pub fee_payer: String,
    #[serde(default)]
    pub instructions: Vec<Instruction>,
    #[serde(default)]
    pub native_transfers: Vec<NativeTransfer>,
    #[serde(default)]
    pub token_transfers: Vec<TokenTransfer>,
    #[serde(default)]
    pub account_data: Vec<AccountBalanceChange>,
    #[serde(default)]
    pub events: PayloadEvents,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadEvents {
    #[serde(default)]
    pub swap: Option<SwapEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instruction {
    pub program_id: String,
    #[serde(default)]
    pub accounts: Vec<String>,
    #[serde(default)]
    pub data: Option<String>,
}

/// Movement of the native asset, amount in lamports.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeTransfer {
    pub from_user_account: Option<String>,
    pub to_user_account: Option<String>,
    pub amount: u64,
}

/// Movement of a token, amount already scaled to display units.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenTransfer {
    pub from_user_account: Option<String>,
    pub to_user_account: Option<String>,
    #[serde(default)]
    pub from_token_account: Option<String>,
    #[serde(default)]
    pub to_token_account: Option<String>,
    pub mint: String,
    pub token_amount: f64,
    #[serde(default = "default_token_decimals")]
    pub decimals: u8,
}

fn default_token_decimals() -> u8 {
    NATIVE_DECIMALS
}

/// Per-account balance deltas observed in the transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountBalanceChange {
    pub account: String,
    /// Signed lamport delta for `account` itself.
    #[serde(default)]
    pub native_balance_change: i64,
    #[serde(default)]
    pub token_balance_changes: Vec<TokenBalanceChange>,
}

/// One token delta within an account's balance changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalanceChange {
    pub mint: String,
    /// Owning user account of the token account that changed.
    #[serde(default)]
    pub user_account: Option<String>,
    #[serde(default)]
    pub token_account: Option<String>,
    /// Signed delta in display units.
    pub amount: f64,
    #[serde(default = "default_token_decimals")]
    pub decimals: u8,
}

/// Structured swap event emitted when the provider decoded the route.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapEvent {
    #[serde(default)]
    pub native_input: Option<NativeSwapLeg>,
    #[serde(default)]
    pub native_output: Option<NativeSwapLeg>,
    #[serde(default)]
    pub token_inputs: Vec<TokenSwapLeg>,
    #[serde(default)]
    pub token_outputs: Vec<TokenSwapLeg>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeSwapLeg {
    pub account: String,
    /// Lamports.
    pub amount: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenSwapLeg {
    pub mint: String,
    pub token_amount: f64,
    #[serde(default = "default_token_decimals")]
    pub decimals: u8,
    #[serde(default)]
    pub user_account: Option<String>,
}

impl WebhookPayload {
    /// Signed native delta for an account, in SOL.
    pub fn native_change_sol(&self, account: &str) -> f64 {
        self.account_data
            .iter()
            .filter(|a| a.account.eq_ignore_ascii_case(account))
            .map(|a| a.native_balance_change as f64 / LAMPORTS_PER_SOL)
            .sum()
    }

    pub fn has_transfers(&self) -> bool {
        !self.native_transfers.is_empty() || !self.token_transfers.is_empty()
    }
}
