//! Persistence Layer
//!
//! SQLite-backed storage for the canonical ledger, with async access via
//! sqlx. The persistence layer is the sole arbiter of the symmetric-link
//! invariant: both sides of a reconciliation link are written inside one
//! database transaction, or not at all.
//!
//! # Database Schema
//!
//! ## Transactions Table
//! - id: UUID
//! - source: ON_CHAIN or EXCHANGE
//! - signature: on-chain signature (unique when present)
//! - connection_id + external_id: exchange identity (unique together)
//! - transaction_type / category: closed taxonomy, stored as text
//! - timestamp, slot, block_time
//! - total_value_usd, fee
//! - linked_transaction_id: symmetric cross-source link
//! - summary, raw_data (verbatim upstream payload)
//!
//! ## Flows Table
//! - id: UUID, transaction_id: owning transaction
//! - mint, symbol, decimals, network
//! - amount (always positive), direction (IN/OUT), is_fee
//! - value_usd, price_at_execution (null until backfilled)
//!
//! ## Token Symbol Mappings Table
//! - (symbol, network) → mint + decimals, one default row per symbol
//!
//! ## Sync Cursors Table
//! - (connection_id, phase) → window_end for resumable incremental sync
//!
//! ## Address Labels Table
//! - address + source → label, backing summary rendering

pub mod cursor_repository;
pub mod label_repository;
pub mod models;
pub mod token_repository;
pub mod transaction_repository;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::ConnectOptions;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

/// Database connection pool
pub type DbPool = SqlitePool;

/// Database initialization error
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Database connection error: {0}")]
    ConnectionError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error("Query error: {0}")]
    QueryError(String),
}

/// Initialize the database connection pool and run migrations.
///
/// # Arguments
/// - `database_url`: Path to SQLite database file (e.g., "sqlite://data/chainledger.db")
pub async fn init_database(database_url: &str) -> Result<DbPool, DatabaseError> {
    info!("Initializing database: {}", database_url);

    // Ensure data directory exists
    if let Some(db_path) = database_url.strip_prefix("sqlite://") {
        if let Some(parent) = Path::new(db_path).parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::ConnectionError(sqlx::Error::Configuration(Box::new(e)))
            })?;
        }
    }

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .disable_statement_logging();

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    info!("✓ Database initialized successfully");

    Ok(pool)
}

/// Run database migrations
async fn run_migrations(pool: &DbPool) -> Result<(), DatabaseError> {
    info!("Running database migrations...");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS transactions (
            id TEXT PRIMARY KEY,
            source TEXT NOT NULL CHECK(source IN ('ON_CHAIN', 'EXCHANGE')),
            signature TEXT UNIQUE,
            external_id TEXT,
            connection_id TEXT,
            wallet_address TEXT,
            transaction_type TEXT NOT NULL,
            category TEXT NOT NULL,
            timestamp DATETIME NOT NULL,
            slot INTEGER,
            block_time INTEGER,
            total_value_usd REAL,
            fee REAL,
            linked_transaction_id TEXT REFERENCES transactions(id),
            summary TEXT,
            raw_data TEXT,
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE(connection_id, external_id)
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| {
        DatabaseError::MigrationError(format!("Failed to create transactions table: {}", e))
    })?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS flows (
            id TEXT PRIMARY KEY,
            transaction_id TEXT NOT NULL REFERENCES transactions(id),
            mint TEXT NOT NULL,
            symbol TEXT NOT NULL,
            decimals INTEGER NOT NULL,
            network TEXT,
            amount REAL NOT NULL CHECK(amount > 0),
            direction TEXT NOT NULL CHECK(direction IN ('IN', 'OUT')),
            value_usd REAL,
            price_at_execution REAL,
            is_fee BOOLEAN NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| DatabaseError::MigrationError(format!("Failed to create flows table: {}", e)))?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS token_symbol_mappings (
            symbol TEXT NOT NULL,
            network TEXT,
            mint TEXT NOT NULL,
            decimals INTEGER NOT NULL,
            is_default BOOLEAN NOT NULL DEFAULT 0,
            UNIQUE(symbol, network)
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| {
        DatabaseError::MigrationError(format!(
            "Failed to create token_symbol_mappings table: {}",
            e
        ))
    })?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sync_cursors (
            connection_id TEXT NOT NULL,
            phase TEXT NOT NULL,
            window_end DATETIME NOT NULL,
            updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY(connection_id, phase)
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| {
        DatabaseError::MigrationError(format!("Failed to create sync_cursors table: {}", e))
    })?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS address_labels (
            address TEXT NOT NULL,
            source TEXT NOT NULL CHECK(source IN ('user', 'discovered')),
            label TEXT NOT NULL,
            PRIMARY KEY(address, source)
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| {
        DatabaseError::MigrationError(format!("Failed to create address_labels table: {}", e))
    })?;

    // At most one default row per symbol for the network-agnostic fallback.
    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_token_mappings_default \
         ON token_symbol_mappings(symbol) WHERE is_default = 1",
    )
    .execute(pool)
    .await
    .map_err(|e| DatabaseError::MigrationError(format!("Failed to create index: {}", e)))?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_transactions_wallet_type_time \
         ON transactions(wallet_address, transaction_type, timestamp)",
    )
    .execute(pool)
    .await
    .map_err(|e| DatabaseError::MigrationError(format!("Failed to create index: {}", e)))?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_transactions_connection \
         ON transactions(connection_id, transaction_type)",
    )
    .execute(pool)
    .await
    .map_err(|e| DatabaseError::MigrationError(format!("Failed to create index: {}", e)))?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_flows_transaction ON flows(transaction_id)")
        .execute(pool)
        .await
        .map_err(|e| DatabaseError::MigrationError(format!("Failed to create index: {}", e)))?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_flows_unpriced ON flows(price_at_execution, is_fee)")
        .execute(pool)
        .await
        .map_err(|e| DatabaseError::MigrationError(format!("Failed to create index: {}", e)))?;

    info!("✓ Database migrations completed successfully");

    Ok(())
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database URL (e.g., "sqlite://data/chainledger.db")
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://data/chainledger.db".to_string(),
            max_connections: 5,
        }
    }
}

impl DatabaseConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        let url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://data/chainledger.db".to_string());

        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        Self {
            url,
            max_connections,
        }
    }
}
