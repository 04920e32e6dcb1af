//! Token symbol mapping rows.
//!
//! Resolve a free-form exchange symbol (plus optional network) to the
//! canonical asset id and decimal precision. Multiple rows may share a
//! symbol across networks; at most one row per symbol carries `is_default`
//! for the network-agnostic fallback.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSymbolMapping {
    /// Upper-case canonical symbol.
    pub symbol: String,
    pub network: Option<String>,
    /// Canonical asset id (on-chain mint, or a synthetic exchange id).
    pub mint: String,
    pub decimals: u8,
    pub is_default: bool,
}

impl TokenSymbolMapping {
    pub fn new(
        symbol: impl Into<String>,
        network: Option<&str>,
        mint: impl Into<String>,
        decimals: u8,
    ) -> Self {
        TokenSymbolMapping {
            symbol: symbol.into().to_uppercase(),
            network: network.map(|n| n.to_uppercase()),
            mint: mint.into(),
            decimals,
            is_default: false,
        }
    }

    pub fn default_for_symbol(mut self) -> Self {
        self.is_default = true;
        self
    }
}

/// Built-in seed rows for the assets the engine encounters most; the table
/// grows at runtime when classification discovers unmapped mints.
pub fn seed_mappings() -> Vec<TokenSymbolMapping> {
    vec![
        TokenSymbolMapping::new(
            "SOL",
            Some("SOL"),
            "So11111111111111111111111111111111111111112",
            9,
        )
        .default_for_symbol(),
        TokenSymbolMapping::new(
            "USDC",
            Some("SOL"),
            "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
            6,
        )
        .default_for_symbol(),
        TokenSymbolMapping::new(
            "USDT",
            Some("SOL"),
            "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB",
            6,
        )
        .default_for_symbol(),
        TokenSymbolMapping::new(
            "BONK",
            Some("SOL"),
            "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263",
            5,
        )
        .default_for_symbol(),
        TokenSymbolMapping::new(
            "JUP",
            Some("SOL"),
            "JUPyiwrYJFskUPiHa7hkeR8VUtAeFoSYbKedZNsDvCN",
            6,
        )
        .default_for_symbol(),
        TokenSymbolMapping::new(
            "RAY",
            Some("SOL"),
            "4k3Dyjzvzp8eMZWUXbBCjEvwSkkk59S5iCNLY3QrkX6R",
            6,
        )
        .default_for_symbol(),
        TokenSymbolMapping::new("BTC", None, "exchange:BTC", 8).default_for_symbol(),
        TokenSymbolMapping::new("ETH", None, "exchange:ETH", 8).default_for_symbol(),
        TokenSymbolMapping::new("BNB", None, "exchange:BNB", 8).default_for_symbol(),
    ]
}
