//! Normalization End-to-End Tests
//!
//! Exercises the full ingestion path against an in-memory SQLite store:
//! exchange records flow through the mapper, dedup-before-insert, and
//! valuation backfill; webhook payloads flow through the classifier. Record
//! and price sources are deterministic stubs.

use async_trait::async_trait;
use chainledger::application::services::sync_service::SyncService;
use chainledger::config::EngineConfig;
use chainledger::domain::entities::exchange_record::{
    ExchangeRecord, ExchangeRecordType, TradeSide,
};
use chainledger::domain::entities::flow::FlowDirection;
use chainledger::domain::entities::token_mapping::seed_mappings;
use chainledger::domain::entities::transaction::TransactionType;
use chainledger::domain::entities::webhook::WebhookPayload;
use chainledger::domain::errors::{IngestError, PriceError};
use chainledger::domain::repositories::price_source::PriceSource;
use chainledger::domain::repositories::record_source::RecordSource;
use chainledger::domain::services::classifier::summary::LabelBook;
use chainledger::domain::services::token_resolver::TokenResolver;
use chainledger::persistence::cursor_repository::CursorRepository;
use chainledger::persistence::init_database;
use chainledger::persistence::token_repository::TokenRepository;
use chainledger::persistence::transaction_repository::TransactionRepository;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::HashMap;

const WALLET: &str = "WalletAAAA";

struct StubRecordSource {
    connection_id: String,
    records: Vec<ExchangeRecord>,
}

#[async_trait]
impl RecordSource for StubRecordSource {
    fn connection_id(&self) -> &str {
        &self.connection_id
    }

    async fn fetch_records(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ExchangeRecord>, IngestError> {
        Ok(self
            .records
            .iter()
            .filter(|r| r.timestamp >= from && r.timestamp < to)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
struct StubPriceSource {
    tokens: HashMap<String, f64>,
    fiat: HashMap<String, f64>,
}

#[async_trait]
impl PriceSource for StubPriceSource {
    async fn token_daily_price(
        &self,
        symbol: &str,
        _date: NaiveDate,
    ) -> Result<Option<f64>, PriceError> {
        Ok(self.tokens.get(symbol).copied())
    }

    async fn fiat_daily_rate(
        &self,
        currency: &str,
        _date: NaiveDate,
    ) -> Result<Option<f64>, PriceError> {
        Ok(self.fiat.get(currency).copied())
    }
}

fn record(external_id: &str, record_type: ExchangeRecordType) -> ExchangeRecord {
    ExchangeRecord {
        external_id: external_id.to_string(),
        record_type,
        timestamp: Utc::now() - Duration::hours(6),
        asset: "SOL".to_string(),
        amount: 2.0,
        price_usd: None,
        total_value_usd: None,
        fee_amount: None,
        fee_asset: None,
        side: None,
        trade_pair: None,
        quote_asset: None,
        quote_amount: None,
        network: None,
        tx_id: None,
    }
}

struct Harness {
    transactions: TransactionRepository,
    cursors: CursorRepository,
    tokens: TokenRepository,
    resolver: TokenResolver,
    labels: LabelBook,
    config: EngineConfig,
}

async fn harness() -> Harness {
    let pool = init_database("sqlite::memory:").await.unwrap();
    let tokens = TokenRepository::new(pool.clone());
    tokens.seed(&seed_mappings()).await.unwrap();
    let resolver = TokenResolver::new(tokens.load_all().await.unwrap());
    Harness {
        transactions: TransactionRepository::new(pool.clone()),
        cursors: CursorRepository::new(pool.clone()),
        tokens,
        resolver,
        labels: LabelBook::default(),
        config: EngineConfig::default(),
    }
}

impl Harness {
    fn sync<'a>(&'a self, price_source: &'a StubPriceSource) -> SyncService<'a> {
        SyncService::new(
            &self.config,
            &self.resolver,
            &self.labels,
            &self.transactions,
            &self.cursors,
            &self.tokens,
            price_source,
        )
    }
}

#[tokio::test]
async fn test_trade_record_produces_three_flows() {
    let h = harness().await;
    let mut trade = record("t-1", ExchangeRecordType::Trade);
    trade.side = Some(TradeSide::Buy);
    trade.trade_pair = Some("SOLUSDC".to_string());
    trade.quote_asset = Some("USDC".to_string());
    trade.quote_amount = Some(200.0);
    trade.fee_asset = Some("BNB".to_string());
    trade.fee_amount = Some(0.001);

    let source = StubRecordSource {
        connection_id: "conn-1".to_string(),
        records: vec![trade],
    };
    let prices = StubPriceSource::default();
    let report = h.sync(&prices).run(WALLET, &source).await;
    assert_eq!(report.records_ingested, 1);
    assert!(report.phase_failures.is_empty());

    let stored = h
        .transactions
        .find_by_external_id("conn-1", "t-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.transaction_type, TransactionType::ExchangeTrade);
    assert_eq!(stored.flows.len(), 3);

    let sol = &stored.flows[0];
    assert_eq!(sol.symbol, "SOL");
    assert_eq!(sol.amount, 2.0);
    assert_eq!(sol.direction, FlowDirection::In);

    let usdc = &stored.flows[1];
    assert_eq!(usdc.symbol, "USDC");
    assert_eq!(usdc.amount, 200.0);
    assert_eq!(usdc.direction, FlowDirection::Out);
    assert_eq!(usdc.price_at_execution, Some(1.0));

    let fee = &stored.flows[2];
    assert_eq!(fee.symbol, "BNB");
    assert_eq!(fee.amount, 0.001);
    assert_eq!(fee.direction, FlowDirection::Out);
    assert!(fee.is_fee);

    // The cursor advanced: a second run fetches nothing new.
    let report = h.sync(&prices).run(WALLET, &source).await;
    assert_eq!(report.records_fetched, 0);
    assert_eq!(report.records_ingested, 0);
}

#[tokio::test]
async fn test_fiat_deposit_is_priced_by_fiat_backfill() {
    let h = harness().await;
    let mut deposit = record("d-1", ExchangeRecordType::Deposit);
    deposit.asset = "BRL".to_string();
    deposit.amount = 1000.0;

    let source = StubRecordSource {
        connection_id: "conn-1".to_string(),
        records: vec![deposit],
    };
    let mut prices = StubPriceSource::default();
    prices.fiat.insert("BRL".to_string(), 0.19);

    let report = h.sync(&prices).run(WALLET, &source).await;
    assert_eq!(report.records_ingested, 1);
    assert_eq!(report.valuation.priced, 1);

    // The deposit was remapped to a fiat buy and priced via the fiat rate.
    let stored = h
        .transactions
        .find_by_external_id("conn-1", "d-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.transaction_type, TransactionType::ExchangeFiatBuy);
    assert_eq!(stored.flows.len(), 1);
    assert_eq!(stored.flows[0].symbol, "BRL");
    assert_eq!(stored.flows[0].direction, FlowDirection::In);
    assert_eq!(stored.flows[0].price_at_execution, Some(0.19));
    assert_eq!(stored.flows[0].value_usd, Some(190.0));
    assert_eq!(stored.total_value_usd, Some(190.0));
}

#[tokio::test]
async fn test_sync_is_idempotent_across_runs() {
    let h = harness().await;
    let records = vec![
        record("r-1", ExchangeRecordType::Deposit),
        record("r-2", ExchangeRecordType::Withdrawal),
        record("r-3", ExchangeRecordType::Interest),
    ];
    let source = StubRecordSource {
        connection_id: "conn-1".to_string(),
        records,
    };
    let prices = StubPriceSource::default();

    let first = h.sync(&prices).run(WALLET, &source).await;
    assert_eq!(first.records_ingested, 3);

    // Force a re-delivery of the same window: dedup-before-insert makes the
    // re-ingestion a true no-op.
    h.cursors.reset("conn-1").await.unwrap();
    let second = h.sync(&prices).run(WALLET, &source).await;
    assert_eq!(second.records_fetched, 3);
    assert_eq!(second.records_ingested, 0);
    assert_eq!(second.records_skipped, 3);
    assert_eq!(second.record_failures, 0);
}

#[tokio::test]
async fn test_unknown_record_types_are_skipped_not_fatal() {
    let h = harness().await;
    let source = StubRecordSource {
        connection_id: "conn-1".to_string(),
        records: vec![
            record("u-1", ExchangeRecordType::Unknown),
            record("k-1", ExchangeRecordType::Deposit),
        ],
    };
    let prices = StubPriceSource::default();
    let report = h.sync(&prices).run(WALLET, &source).await;
    assert_eq!(report.records_fetched, 2);
    assert_eq!(report.records_ingested, 1);
    assert_eq!(report.records_skipped, 1);
    assert!(report.phase_failures.is_empty());
}

#[tokio::test]
async fn test_webhook_ingestion_classifies_and_dedups() {
    let h = harness().await;
    let prices = StubPriceSource::default();
    let sync = h.sync(&prices);

    let json = format!(
        r#"{{
            "signature": "sig-transfer-1",
            "timestamp": 1714564800,
            "slot": 261000000,
            "fee": 5000,
            "feePayer": "{sender}",
            "instructions": [{{"programId": "11111111111111111111111111111111"}}],
            "nativeTransfers": [
                {{"fromUserAccount": "{sender}", "toUserAccount": "{wallet}", "amount": 2000000000}}
            ]
        }}"#,
        sender = "SenderWalletXYZ",
        wallet = WALLET,
    );
    let payload: WebhookPayload = serde_json::from_str(&json).unwrap();

    assert!(sync.ingest_webhook_payload(&payload, WALLET).await.unwrap());
    // Same signature again: idempotent skip.
    assert!(!sync.ingest_webhook_payload(&payload, WALLET).await.unwrap());

    let stored = h
        .transactions
        .find_by_signature("sig-transfer-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.transaction_type, TransactionType::TransferIn);
    assert_eq!(stored.wallet_address.as_deref(), Some(WALLET));
    assert_eq!(stored.flows.len(), 1);
    assert_eq!(stored.flows[0].direction, FlowDirection::In);
    assert!((stored.flows[0].amount - 2.0).abs() < 1e-9);
    assert!(stored.summary.unwrap().starts_with("Received 2 SOL"));
    assert!(stored.raw_data.is_some());
}
