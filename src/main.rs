mod application;
mod config;
mod domain;
mod infrastructure;
mod persistence;
mod secrets;

use crate::application::services::sync_service::SyncService;
use crate::config::EngineConfig;
use crate::domain::entities::token_mapping::seed_mappings;
use crate::domain::services::classifier::summary::LabelBook;
use crate::domain::services::token_resolver::TokenResolver;
use crate::infrastructure::exchange_api::{ExchangeApiClient, ExchangeApiConfig};
use crate::infrastructure::price_client::{HttpPriceClient, PriceClientConfig};
use crate::persistence::cursor_repository::CursorRepository;
use crate::persistence::label_repository::LabelRepository;
use crate::persistence::token_repository::TokenRepository;
use crate::persistence::transaction_repository::TransactionRepository;
use crate::persistence::{init_database, DatabaseConfig};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chainledger=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Chainledger sync starting...");

    let config = EngineConfig::from_env();
    let db_config = DatabaseConfig::from_env();
    let pool = init_database(&db_config.url).await?;

    let transactions = TransactionRepository::new(pool.clone());
    let cursors = CursorRepository::new(pool.clone());
    let tokens = TokenRepository::new(pool.clone());
    let label_store = LabelRepository::new(pool.clone());

    tokens.seed(&seed_mappings()).await?;
    let resolver = TokenResolver::new(tokens.load_all().await?);
    let labels = LabelBook::new(label_store.load_all().await?);

    // Connection identity and credentials; missing credentials are fatal.
    let wallet_address = std::env::var("WALLET_ADDRESS")
        .map_err(|_| "WALLET_ADDRESS must be set")?;
    let connection_id = std::env::var("EXCHANGE_CONNECTION_ID")
        .map_err(|_| "EXCHANGE_CONNECTION_ID must be set")?;
    let api_key = std::env::var("EXCHANGE_API_KEY")
        .map_err(|_| "EXCHANGE_API_KEY must be set")?;
    let api_secret = secrets::load_secret("EXCHANGE_API_SECRET")?;

    // Forced full re-sync: clear linkage and rows, reset cursors, re-ingest.
    if std::env::var("FULL_RESYNC").map(|v| v == "true" || v == "1") == Ok(true) {
        warn!("FULL_RESYNC requested: purging connection {}", connection_id);
        let purged = transactions.purge_connection(&connection_id).await?;
        let reset = cursors.reset(&connection_id).await?;
        info!("Purged {} transactions, reset {} cursors", purged, reset);
    }

    let mut exchange_config = ExchangeApiConfig::new(&connection_id, &api_key);
    exchange_config.inter_call_delay = Duration::from_millis(config.record_page_delay_millis);
    if let Ok(base) = std::env::var("EXCHANGE_API_BASE") {
        exchange_config.api_base = base;
    }
    let exchange_client = ExchangeApiClient::new(exchange_config, api_secret);

    let mut price_config = PriceClientConfig::default();
    price_config.requests_per_minute = config.price_requests_per_minute;
    let price_client = HttpPriceClient::new(price_config)?;

    let sync = SyncService::new(
        &config,
        &resolver,
        &labels,
        &transactions,
        &cursors,
        &tokens,
        &price_client,
    );

    let report = sync.run(&wallet_address, &exchange_client).await;

    info!(
        "Sync finished: {} fetched, {} ingested, {} skipped, {} linked ({} exact / {} fuzzy), {} flows priced",
        report.records_fetched,
        report.records_ingested,
        report.records_skipped,
        report.reconciliation.linked(),
        report.reconciliation.exact_links,
        report.reconciliation.fuzzy_links,
        report.valuation.priced,
    );
    for (phase, error) in &report.phase_failures {
        warn!("Phase '{}' reported a failure: {}", phase, error);
    }

    Ok(())
}
