//! Sync orchestration.
//!
//! Drives one batch run per exchange connection: fetch raw records from the
//! cursor forward, map and insert them (dedup-before-insert), advance the
//! cursor, then reconcile cross-source pairs and backfill valuations.
//! Failures are counted per phase and surfaced in the report; a failing
//! phase never aborts the phases after it.

use crate::config::EngineConfig;
use crate::domain::entities::label::shorten_address;
use crate::domain::entities::transaction::{Transaction, TransactionSource};
use crate::domain::entities::webhook::{WebhookPayload, LAMPORTS_PER_SOL};
use crate::domain::repositories::price_source::PriceSource;
use crate::domain::repositories::record_source::RecordSource;
use crate::domain::services::classifier::summary::LabelBook;
use crate::domain::services::classifier::OnChainClassifier;
use crate::domain::services::exchange_mapper::ExchangeRecordMapper;
use crate::domain::services::reconciliation::{ReconciliationEngine, ReconciliationOutcome};
use crate::domain::services::token_resolver::TokenResolver;
use crate::domain::services::valuation::{BackfillOutcome, ValuationBackfill};
use crate::persistence::cursor_repository::CursorRepository;
use crate::persistence::token_repository::TokenRepository;
use crate::persistence::transaction_repository::TransactionRepository;
use chrono::{DateTime, Duration, Utc};
use tracing::{error, info, warn};

/// Cursor phase key for exchange record ingestion.
const RECORDS_PHASE: &str = "records";

/// Outcome of one full sync run.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub records_fetched: usize,
    pub records_ingested: usize,
    pub records_skipped: usize,
    pub record_failures: usize,
    pub reconciliation: ReconciliationOutcome,
    pub valuation: BackfillOutcome,
    /// Phase-level failures: the phase name and its error.
    pub phase_failures: Vec<(String, String)>,
}

pub struct SyncService<'a> {
    config: &'a EngineConfig,
    resolver: &'a TokenResolver,
    labels: &'a LabelBook,
    transactions: &'a TransactionRepository,
    cursors: &'a CursorRepository,
    tokens: &'a TokenRepository,
    price_source: &'a dyn PriceSource,
}

impl<'a> SyncService<'a> {
    pub fn new(
        config: &'a EngineConfig,
        resolver: &'a TokenResolver,
        labels: &'a LabelBook,
        transactions: &'a TransactionRepository,
        cursors: &'a CursorRepository,
        tokens: &'a TokenRepository,
        price_source: &'a dyn PriceSource,
    ) -> Self {
        SyncService {
            config,
            resolver,
            labels,
            transactions,
            cursors,
            tokens,
            price_source,
        }
    }

    /// Run all phases for one wallet + connection pair.
    pub async fn run(
        &self,
        wallet_address: &str,
        record_source: &dyn RecordSource,
    ) -> SyncReport {
        let mut report = SyncReport::default();
        let connection_id = record_source.connection_id().to_string();

        if let Err(e) = self
            .ingest_records_phase(record_source, &mut report)
            .await
        {
            error!(connection_id = %connection_id, error = %e, "Record ingestion phase failed");
            report.phase_failures.push((RECORDS_PHASE.to_string(), e));
        }

        let engine = ReconciliationEngine::new(self.transactions, self.config.match_params());
        match engine.run(wallet_address, &connection_id).await {
            Ok(outcome) => report.reconciliation = outcome,
            Err(e) => {
                error!(connection_id = %connection_id, error = %e, "Reconciliation phase failed");
                report
                    .phase_failures
                    .push(("reconcile".to_string(), e.to_string()));
            }
        }

        let backfill = ValuationBackfill::new(
            self.transactions,
            self.price_source,
            self.config.valuation_batch_limit,
        );
        match backfill.run().await {
            Ok(outcome) => report.valuation = outcome,
            Err(e) => {
                error!(connection_id = %connection_id, error = %e, "Valuation phase failed");
                report
                    .phase_failures
                    .push(("valuation".to_string(), e.to_string()));
            }
        }

        info!(
            connection_id = %connection_id,
            ingested = report.records_ingested,
            skipped = report.records_skipped,
            linked = report.reconciliation.linked(),
            priced = report.valuation.priced,
            phase_failures = report.phase_failures.len(),
            "Sync run complete"
        );
        report
    }

    /// Fetch records from the cursor forward, map them, and insert new rows.
    /// The cursor advances only after the phase completes, so an aborted run
    /// resumes from the same window.
    async fn ingest_records_phase(
        &self,
        record_source: &dyn RecordSource,
        report: &mut SyncReport,
    ) -> Result<(), String> {
        let connection_id = record_source.connection_id();
        let window_end = Utc::now();
        let window_start = match self
            .cursors
            .get(connection_id, RECORDS_PHASE)
            .await
            .map_err(|e| e.to_string())?
        {
            Some(cursor) => cursor,
            None => window_end - Duration::days(self.config.initial_sync_lookback_days as i64),
        };

        let records = record_source
            .fetch_records(window_start, window_end)
            .await
            .map_err(|e| e.to_string())?;
        report.records_fetched = records.len();

        let mapper = ExchangeRecordMapper::new(self.resolver);
        for record in &records {
            let transaction = match mapper.map(record, connection_id) {
                Some(transaction) => transaction,
                None => {
                    report.records_skipped += 1;
                    continue;
                }
            };
            match self.transactions.insert_if_absent(&transaction).await {
                Ok(true) => report.records_ingested += 1,
                Ok(false) => report.records_skipped += 1,
                Err(e) => {
                    warn!(
                        external_id = %record.external_id,
                        error = %e,
                        "Failed to persist exchange record"
                    );
                    report.record_failures += 1;
                }
            }
        }

        self.cursors
            .advance(connection_id, RECORDS_PHASE, window_end)
            .await
            .map_err(|e| e.to_string())?;
        Ok(())
    }

    /// Ingest one on-chain webhook payload: classify, persist, and record
    /// any newly discovered mints. Returns `true` when a new row was
    /// inserted, `false` when the signature was already present.
    pub async fn ingest_webhook_payload(
        &self,
        payload: &WebhookPayload,
        wallet_address: &str,
    ) -> Result<bool, String> {
        let classifier = OnChainClassifier::new(self.resolver, self.labels);
        let classification = classifier.classify(payload, wallet_address);

        let timestamp = DateTime::<Utc>::from_timestamp(payload.timestamp, 0)
            .unwrap_or_else(Utc::now);
        let mut transaction = Transaction::new(
            TransactionSource::OnChain,
            classification.transaction_type,
            timestamp,
        );
        transaction.signature = Some(payload.signature.clone());
        transaction.wallet_address = Some(wallet_address.to_string());
        transaction.slot = payload.slot.map(|s| s as i64);
        transaction.block_time = Some(payload.timestamp);
        transaction.fee = Some(payload.fee as f64 / LAMPORTS_PER_SOL);
        transaction.summary = Some(classification.summary.clone());
        transaction.raw_data = serde_json::to_value(payload).ok();
        transaction.flows = classification.flows.clone();

        let inserted = self
            .transactions
            .insert_if_absent(&transaction)
            .await
            .map_err(|e| e.to_string())?;

        for (mint, decimals) in &classification.unmapped_mints {
            if let Err(e) = self
                .tokens
                .record_discovery(&shorten_address(mint), "SOL", mint, *decimals)
                .await
            {
                warn!(mint = %mint, error = %e, "Failed to record discovered mint");
            }
        }

        Ok(inserted)
    }
}
