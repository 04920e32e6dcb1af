//! Known on-chain program registry.
//!
//! Maps program ids observed in payload instructions to coarse kinds that
//! drive rule-based classification. Unlisted programs fall through to the
//! generic rules; unresolvable interactions are classified `Unknown` rather
//! than failing.

use once_cell::sync::Lazy;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramKind {
    System,
    Token,
    AssociatedToken,
    Compute,
    Stake,
    Memo,
    DexAmm,
    NftMarketplace,
    NftMetadata,
}

pub static KNOWN_PROGRAMS: Lazy<HashMap<&'static str, (ProgramKind, &'static str)>> =
    Lazy::new(|| {
        HashMap::from([
            (
                "11111111111111111111111111111111",
                (ProgramKind::System, "System Program"),
            ),
            (
                "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA",
                (ProgramKind::Token, "Token Program"),
            ),
            (
                "TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb",
                (ProgramKind::Token, "Token-2022 Program"),
            ),
            (
                "ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL",
                (ProgramKind::AssociatedToken, "Associated Token Program"),
            ),
            (
                "ComputeBudget111111111111111111111111111111",
                (ProgramKind::Compute, "Compute Budget"),
            ),
            (
                "Stake11111111111111111111111111111111111111",
                (ProgramKind::Stake, "Stake Program"),
            ),
            (
                "MemoSq4gqABAXKb96qnH8TysNcWxMyWCqXgDLGmfcHr",
                (ProgramKind::Memo, "Memo Program"),
            ),
            (
                "Memo1UhkJRfHyvLMcVucJwxXeuD728EqVDDwQDxFMNo",
                (ProgramKind::Memo, "Memo Program v1"),
            ),
            (
                "JUP6LkbZbjS1jKKwapdHNy74zcZ3tLUZoi5QNyVTaV4",
                (ProgramKind::DexAmm, "Jupiter"),
            ),
            (
                "675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8",
                (ProgramKind::DexAmm, "Raydium AMM"),
            ),
            (
                "CAMMCzo5YL8w4VFF8KVHrK22GGUsp5VTaW7grrKgrWqK",
                (ProgramKind::DexAmm, "Raydium CLMM"),
            ),
            (
                "whirLbMiicVdio4qvUfM5KAg6Ct8VwpYzGff3uctyCc",
                (ProgramKind::DexAmm, "Orca Whirlpool"),
            ),
            (
                "6EF8rrecthR5Dkzon8Nwu78hRvfCKubJ14M5uBEwF6P",
                (ProgramKind::DexAmm, "Pump.fun"),
            ),
            (
                "LBUZKhRxPF3XUpBCjp4YzTKgLccjZhTSDM9YuVaPwxo",
                (ProgramKind::DexAmm, "Meteora DLMM"),
            ),
            (
                "Eo7WjKq67rjJQSZxS6z3YkapzY3eMj6Xy8X5EQVn5UaB",
                (ProgramKind::DexAmm, "Meteora Pools"),
            ),
            (
                "M2mx93ekt1fmXSVkTrUL9xVFHkmME8HTUi5Cyc5aF7K",
                (ProgramKind::NftMarketplace, "Magic Eden"),
            ),
            (
                "TSWAPaqyCSx2KABk68Shruf4rp7CxcNi8hAsbdwmHbN",
                (ProgramKind::NftMarketplace, "Tensor"),
            ),
            (
                "TCMPhJdwDryooaGtiocG1u3xcYbRpiJzb283XfCZsDp",
                (ProgramKind::NftMarketplace, "Tensor cNFT"),
            ),
            (
                "metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s",
                (ProgramKind::NftMetadata, "Token Metadata"),
            ),
            (
                "BGUMAp9Gq7iTEuizy4pqaxsTyUCBK68MDfK752saRPUY",
                (ProgramKind::NftMetadata, "Bubblegum"),
            ),
        ])
    });

pub fn program_kind(program_id: &str) -> Option<ProgramKind> {
    KNOWN_PROGRAMS.get(program_id).map(|(kind, _)| *kind)
}

pub fn program_label(program_id: &str) -> Option<&'static str> {
    KNOWN_PROGRAMS.get(program_id).map(|(_, label)| *label)
}
