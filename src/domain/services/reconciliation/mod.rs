//! Cross-source reconciliation.
//!
//! Links exchange deposit/withdrawal transactions to the on-chain transfers
//! that represent the same real-world movement, so downstream tax and
//! portfolio computations never double-count value. An exact pass follows
//! embedded on-chain references; a fuzzy pass falls back to time-window and
//! amount-tolerance scanning. Every link is applied as one atomic pair
//! update; a transaction with no match stays unlinked and is retried on the
//! next run.

pub mod matcher;

use crate::domain::entities::transaction::{Transaction, TransactionType};
use crate::domain::errors::ReconciliationError;
use crate::persistence::transaction_repository::TransactionRepository;
use matcher::{find_amount_match, matching_flow, MatchParams};
use tracing::{debug, info, warn};

/// Counters for one reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationOutcome {
    /// Unlinked exchange transfers examined.
    pub scanned: usize,
    pub exact_links: usize,
    pub fuzzy_links: usize,
    /// Link attempts rejected or failed; surfaced, not rethrown.
    pub failures: usize,
}

impl ReconciliationOutcome {
    pub fn linked(&self) -> usize {
        self.exact_links + self.fuzzy_links
    }
}

pub struct ReconciliationEngine<'a> {
    repository: &'a TransactionRepository,
    params: MatchParams,
}

impl<'a> ReconciliationEngine<'a> {
    pub fn new(repository: &'a TransactionRepository, params: MatchParams) -> Self {
        ReconciliationEngine { repository, params }
    }

    /// Reconcile one wallet against one exchange connection.
    ///
    /// Scans the connection's unlinked deposits and withdrawals in
    /// chronological order; already-linked rows are never re-examined.
    pub async fn run(
        &self,
        wallet: &str,
        connection_id: &str,
    ) -> Result<ReconciliationOutcome, ReconciliationError> {
        let sources = self
            .repository
            .find_unlinked_exchange_transfers(connection_id)
            .await
            .map_err(|e| ReconciliationError::Persistence(e.to_string()))?;

        let mut outcome = ReconciliationOutcome::default();
        outcome.scanned = sources.len();

        for source in &sources {
            match self.reconcile_one(wallet, source).await {
                Ok(Some(LinkKind::Exact)) => outcome.exact_links += 1,
                Ok(Some(LinkKind::Fuzzy)) => outcome.fuzzy_links += 1,
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        transaction_id = %source.id,
                        error = %e,
                        "Reconciliation link failed"
                    );
                    outcome.failures += 1;
                }
            }
        }

        info!(
            connection_id,
            scanned = outcome.scanned,
            exact = outcome.exact_links,
            fuzzy = outcome.fuzzy_links,
            failures = outcome.failures,
            "Reconciliation run complete"
        );
        Ok(outcome)
    }

    async fn reconcile_one(
        &self,
        wallet: &str,
        source: &Transaction,
    ) -> Result<Option<LinkKind>, ReconciliationError> {
        if let Some(partner) = self.exact_candidate(source).await? {
            self.link(source, &partner).await?;
            debug!(
                source = %source.id,
                partner = %partner.id,
                "Linked via embedded transaction reference"
            );
            return Ok(Some(LinkKind::Exact));
        }

        if let Some(partner) = self.fuzzy_candidate(wallet, source).await? {
            self.link(source, &partner).await?;
            debug!(
                source = %source.id,
                partner = %partner.id,
                "Linked via fuzzy amount/window match"
            );
            return Ok(Some(LinkKind::Fuzzy));
        }

        Ok(None)
    }

    /// Exact match: the exchange record carried the on-chain signature.
    async fn exact_candidate(
        &self,
        source: &Transaction,
    ) -> Result<Option<Transaction>, ReconciliationError> {
        let tx_id = match source
            .raw_data
            .as_ref()
            .and_then(|raw| raw.get("txId"))
            .and_then(|v| v.as_str())
        {
            Some(tx_id) if !tx_id.is_empty() => tx_id.to_string(),
            _ => return Ok(None),
        };

        let candidate = self
            .repository
            .find_by_signature(&tx_id)
            .await
            .map_err(|e| ReconciliationError::Persistence(e.to_string()))?;

        Ok(candidate.filter(|c| !c.is_linked() && c.id != source.id))
    }

    /// Fuzzy match: window-bounded scan for a same-asset transfer within
    /// amount tolerance. Deposits look back at on-chain sends
    /// (most-recent-first); withdrawals look ahead at on-chain receipts
    /// (earliest-first).
    async fn fuzzy_candidate(
        &self,
        wallet: &str,
        source: &Transaction,
    ) -> Result<Option<Transaction>, ReconciliationError> {
        let flow = match matching_flow(source) {
            Some(flow) => flow,
            None => return Ok(None),
        };

        let (counterpart_type, from, to, newest_first) = match source.transaction_type {
            TransactionType::ExchangeDeposit => (
                TransactionType::TransferOut,
                source.timestamp - self.params.deposit_lookback,
                source.timestamp,
                true,
            ),
            TransactionType::ExchangeWithdrawal => (
                TransactionType::TransferIn,
                source.timestamp,
                source.timestamp + self.params.withdrawal_lookahead,
                false,
            ),
            _ => return Ok(None),
        };

        let candidates = self
            .repository
            .find_unlinked_onchain_transfers(wallet, counterpart_type, from, to, newest_first)
            .await
            .map_err(|e| ReconciliationError::Persistence(e.to_string()))?;

        Ok(find_amount_match(flow, &candidates, self.params.amount_tolerance).cloned())
    }

    async fn link(
        &self,
        source: &Transaction,
        partner: &Transaction,
    ) -> Result<(), ReconciliationError> {
        self.repository
            .link_pair(&source.id, &partner.id)
            .await
            .map_err(|e| ReconciliationError::LinkRejected(e.to_string()))
    }
}

enum LinkKind {
    Exact,
    Fuzzy,
}
