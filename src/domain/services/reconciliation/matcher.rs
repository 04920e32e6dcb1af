//! Pure matching predicates for cross-source reconciliation.
//!
//! The engine feeds these with candidate transactions; everything here is
//! synchronous and side-effect free so tolerance and window behavior can be
//! tested without a database.

use crate::domain::entities::flow::Flow;
use crate::domain::entities::transaction::Transaction;
use chrono::{DateTime, Duration, Utc};

/// Tolerance and window parameters for fuzzy matching.
///
/// The defaults (2% tolerance, 1h deposit look-back, 2h withdrawal
/// look-ahead) are empirically chosen; they are engine configuration, not
/// constants.
#[derive(Debug, Clone, Copy)]
pub struct MatchParams {
    /// Maximum relative amount difference, as a fraction (0.02 = 2%).
    pub amount_tolerance: f64,
    /// How far before a deposit's timestamp the on-chain send may lie.
    pub deposit_lookback: Duration,
    /// How far after a withdrawal's timestamp the on-chain receipt may lie.
    pub withdrawal_lookahead: Duration,
}

impl Default for MatchParams {
    fn default() -> Self {
        MatchParams {
            amount_tolerance: 0.02,
            deposit_lookback: Duration::hours(1),
            withdrawal_lookahead: Duration::hours(2),
        }
    }
}

/// The on-chain send must precede the exchange's observation of the deposit:
/// candidate in `[deposit - lookback, deposit]`.
pub fn within_deposit_window(
    deposit_at: DateTime<Utc>,
    candidate_at: DateTime<Utc>,
    lookback: Duration,
) -> bool {
    candidate_at <= deposit_at && candidate_at >= deposit_at - lookback
}

/// The on-chain receipt follows the exchange's release of a withdrawal:
/// candidate in `[withdrawal, withdrawal + lookahead]`.
pub fn within_withdrawal_window(
    withdrawal_at: DateTime<Utc>,
    candidate_at: DateTime<Utc>,
    lookahead: Duration,
) -> bool {
    candidate_at >= withdrawal_at && candidate_at <= withdrawal_at + lookahead
}

/// Relative amount tolerance check against the larger magnitude.
pub fn amounts_match(a: f64, b: f64, tolerance: f64) -> bool {
    if a <= 0.0 || b <= 0.0 {
        return false;
    }
    (a - b).abs() / a.max(b) <= tolerance
}

/// Same resolved asset: canonical id match, or symbol match when one side
/// carries a synthetic exchange placeholder id.
pub fn same_asset(a: &Flow, b: &Flow) -> bool {
    a.mint == b.mint || a.symbol.eq_ignore_ascii_case(&b.symbol)
}

/// The exchange-side flow that drives matching: the single non-fee leg.
pub fn matching_flow(transaction: &Transaction) -> Option<&Flow> {
    transaction.economic_flows().next()
}

/// First candidate with a non-fee flow of the same asset within tolerance.
///
/// Candidates must already be ordered by the caller (most-recent-first for
/// deposits, earliest-first for withdrawals); scanning stops at the first
/// satisfying candidate.
pub fn find_amount_match<'a>(
    source_flow: &Flow,
    candidates: &'a [Transaction],
    tolerance: f64,
) -> Option<&'a Transaction> {
    candidates.iter().find(|candidate| {
        candidate.economic_flows().any(|flow| {
            same_asset(source_flow, flow)
                && amounts_match(source_flow.amount, flow.amount, tolerance)
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::flow::FlowDirection;
    use crate::domain::entities::transaction::{TransactionSource, TransactionType};
    use chrono::TimeZone;

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn onchain_transfer(amount: f64, minutes: i64) -> Transaction {
        let mut tx = Transaction::new(
            TransactionSource::OnChain,
            TransactionType::TransferIn,
            at(minutes),
        );
        tx.flows.push(
            Flow::new(
                "So11111111111111111111111111111111111111112",
                "SOL",
                9,
                amount,
                FlowDirection::In,
            )
            .unwrap(),
        );
        tx
    }

    #[test]
    fn test_deposit_window_bounds() {
        let lookback = Duration::hours(1);
        // Send one minute before the deposit: inside.
        assert!(within_deposit_window(at(0), at(-1), lookback));
        // Send at the boundary: inside.
        assert!(within_deposit_window(at(0), at(-60), lookback));
        // Send after the deposit: outside.
        assert!(!within_deposit_window(at(0), at(1), lookback));
        // Send too long before: outside.
        assert!(!within_deposit_window(at(0), at(-61), lookback));
    }

    #[test]
    fn test_withdrawal_window_bounds() {
        let lookahead = Duration::hours(2);
        assert!(within_withdrawal_window(at(0), at(30), lookahead));
        assert!(within_withdrawal_window(at(0), at(120), lookahead));
        assert!(!within_withdrawal_window(at(0), at(-1), lookahead));
        assert!(!within_withdrawal_window(at(0), at(121), lookahead));
    }

    #[test]
    fn test_amounts_within_two_percent_match() {
        assert!(amounts_match(5.0, 4.97, 0.02));
        assert!(amounts_match(4.97, 5.0, 0.02));
        assert!(amounts_match(5.0, 5.0, 0.02));
    }

    #[test]
    fn test_amounts_beyond_tolerance_do_not_match() {
        assert!(!amounts_match(5.0, 4.5, 0.02));
        assert!(!amounts_match(5.0, 5.2, 0.02));
        assert!(!amounts_match(5.0, 0.0, 0.02));
    }

    #[test]
    fn test_find_amount_match_takes_first_in_order() {
        let source = Flow::new(
            "So11111111111111111111111111111111111111112",
            "SOL",
            9,
            5.0,
            FlowDirection::Out,
        )
        .unwrap();
        let candidates = vec![
            onchain_transfer(4.97, 30),
            onchain_transfer(5.0, 40),
        ];
        let matched = find_amount_match(&source, &candidates, 0.02).unwrap();
        assert_eq!(matched.id, candidates[0].id);
    }

    #[test]
    fn test_find_amount_match_skips_out_of_tolerance() {
        let source = Flow::new(
            "So11111111111111111111111111111111111111112",
            "SOL",
            9,
            5.0,
            FlowDirection::Out,
        )
        .unwrap();
        let candidates = vec![onchain_transfer(4.5, 30)];
        assert!(find_amount_match(&source, &candidates, 0.02).is_none());
    }

    #[test]
    fn test_find_amount_match_requires_same_asset() {
        let source = Flow::new("exchange:BONK", "BONK", 5, 5.0, FlowDirection::Out).unwrap();
        let candidates = vec![onchain_transfer(5.0, 30)];
        assert!(find_amount_match(&source, &candidates, 0.02).is_none());
    }

    #[test]
    fn test_synthetic_mint_matches_by_symbol() {
        let source = Flow::new("exchange:SOL", "SOL", 8, 5.0, FlowDirection::Out).unwrap();
        let candidates = vec![onchain_transfer(4.98, 10)];
        assert!(find_amount_match(&source, &candidates, 0.02).is_some());
    }
}
