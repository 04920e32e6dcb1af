//! Token symbol resolution.
//!
//! Resolves a free-form asset symbol (plus optional network) to a canonical
//! asset id and decimal precision. Resolution never fails: an unmapped
//! symbol gets a synthetic `exchange:<SYMBOL>` placeholder so ingestion
//! cannot stall on an unknown asset.

use crate::domain::entities::token_mapping::TokenSymbolMapping;
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};

/// Decimals assumed for synthetic placeholder assets.
pub const SYNTHETIC_DECIMALS: u8 = 8;

/// Stablecoins priced at exactly 1.0 USD during mapping and valuation.
pub static STABLECOINS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "USDC", "USDT", "BUSD", "FDUSD", "TUSD", "DAI", "USDP", "PYUSD", "UST",
    ]
    .into_iter()
    .collect()
});

/// Fiat currencies recognized for deposit/withdrawal remapping and
/// fiat-rate valuation.
pub static FIAT_CURRENCIES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "USD", "EUR", "GBP", "BRL", "TRY", "JPY", "AUD", "CAD", "CHF", "NGN", "ARS", "UAH", "PLN",
        "RON", "ZAR", "MXN", "INR",
    ]
    .into_iter()
    .collect()
});

pub fn is_stablecoin(symbol: &str) -> bool {
    STABLECOINS.contains(symbol.to_uppercase().as_str())
}

pub fn is_fiat(symbol: &str) -> bool {
    FIAT_CURRENCIES.contains(symbol.to_uppercase().as_str())
}

/// Result of a symbol resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedToken {
    pub mint: String,
    pub symbol: String,
    pub decimals: u8,
    /// False when the resolver fell through to the synthetic placeholder.
    pub mapped: bool,
}

/// In-memory view over the token symbol mapping table, loaded once per run.
pub struct TokenResolver {
    by_symbol_network: HashMap<(String, String), TokenSymbolMapping>,
    by_symbol: HashMap<String, Vec<TokenSymbolMapping>>,
}

impl TokenResolver {
    pub fn new(rows: Vec<TokenSymbolMapping>) -> Self {
        let mut by_symbol_network = HashMap::new();
        let mut by_symbol: HashMap<String, Vec<TokenSymbolMapping>> = HashMap::new();
        for row in rows {
            if let Some(network) = &row.network {
                by_symbol_network.insert((row.symbol.clone(), network.clone()), row.clone());
            }
            by_symbol.entry(row.symbol.clone()).or_default().push(row);
        }
        TokenResolver {
            by_symbol_network,
            by_symbol,
        }
    }

    /// Resolve a symbol to its canonical asset id and decimals.
    ///
    /// Order: exact `(symbol, network)` row, then the symbol's `is_default`
    /// row, then any row for the symbol, then the synthetic placeholder.
    /// Comparison is case-insensitive; the canonical form is upper-case.
    pub fn resolve(&self, symbol: &str, network: Option<&str>) -> ResolvedToken {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return synthetic(&symbol);
        }

        if let Some(network) = network {
            let network = network.trim().to_uppercase();
            if let Some(row) = self.by_symbol_network.get(&(symbol.clone(), network)) {
                return resolved(row);
            }
        }

        if let Some(rows) = self.by_symbol.get(&symbol) {
            if let Some(default) = rows.iter().find(|r| r.is_default) {
                return resolved(default);
            }
            if let Some(first) = rows.first() {
                return resolved(first);
            }
        }

        synthetic(&symbol)
    }

    /// Reverse lookup: symbol and decimals for a known mint, if mapped.
    pub fn lookup_mint(&self, mint: &str) -> Option<(String, u8)> {
        self.by_symbol
            .values()
            .flatten()
            .find(|r| r.mint == mint)
            .map(|r| (r.symbol.clone(), r.decimals))
    }
}

fn resolved(row: &TokenSymbolMapping) -> ResolvedToken {
    ResolvedToken {
        mint: row.mint.clone(),
        symbol: row.symbol.clone(),
        decimals: row.decimals,
        mapped: true,
    }
}

fn synthetic(symbol: &str) -> ResolvedToken {
    ResolvedToken {
        mint: format!("exchange:{}", symbol),
        symbol: symbol.to_string(),
        decimals: SYNTHETIC_DECIMALS,
        mapped: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::token_mapping::{seed_mappings, TokenSymbolMapping};

    fn resolver() -> TokenResolver {
        let mut rows = seed_mappings();
        // Same symbol on two networks, default on neither network hint.
        rows.push(TokenSymbolMapping::new("WETH", Some("ETH"), "eth:weth", 18));
        rows.push(
            TokenSymbolMapping::new("WETH", Some("SOL"), "sol:weth", 8).default_for_symbol(),
        );
        TokenResolver::new(rows)
    }

    #[test]
    fn test_exact_symbol_network_match() {
        let token = resolver().resolve("weth", Some("eth"));
        assert_eq!(token.mint, "eth:weth");
        assert_eq!(token.decimals, 18);
        assert!(token.mapped);
    }

    #[test]
    fn test_default_fallback_without_network() {
        let token = resolver().resolve("WETH", None);
        assert_eq!(token.mint, "sol:weth");
    }

    #[test]
    fn test_default_fallback_with_unknown_network() {
        let token = resolver().resolve("WETH", Some("BASE"));
        assert_eq!(token.mint, "sol:weth");
    }

    #[test]
    fn test_any_row_fallback() {
        let rows = vec![TokenSymbolMapping::new("ORCA", Some("SOL"), "sol:orca", 6)];
        let resolver = TokenResolver::new(rows);
        // Not default, wrong network: still resolves through the any-row step.
        let token = resolver.resolve("ORCA", Some("ETH"));
        assert_eq!(token.mint, "sol:orca");
    }

    #[test]
    fn test_synthetic_placeholder_never_errors() {
        let token = resolver().resolve("notarealtoken", None);
        assert_eq!(token.mint, "exchange:NOTAREALTOKEN");
        assert_eq!(token.symbol, "NOTAREALTOKEN");
        assert_eq!(token.decimals, SYNTHETIC_DECIMALS);
        assert!(!token.mapped);
    }

    #[test]
    fn test_case_insensitive_resolution() {
        let token = resolver().resolve("sol", Some("sol"));
        assert_eq!(token.symbol, "SOL");
        assert_eq!(token.decimals, 9);
        assert!(token.mapped);
    }

    #[test]
    fn test_lookup_mint() {
        let (symbol, decimals) = resolver()
            .lookup_mint("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v")
            .unwrap();
        assert_eq!(symbol, "USDC");
        assert_eq!(decimals, 6);
        assert!(resolver().lookup_mint("nope").is_none());
    }

    #[test]
    fn test_stablecoin_and_fiat_sets() {
        assert!(is_stablecoin("usdc"));
        assert!(!is_stablecoin("SOL"));
        assert!(is_fiat("brl"));
        assert!(!is_fiat("USDC"));
    }
}
