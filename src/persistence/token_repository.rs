//! Token Symbol Mapping Repository
//!
//! Seeds and loads the `(symbol, network)` → `(mint, decimals)` table. The
//! table grows via discovery: classification records mints it could not
//! resolve so later runs can.

use super::models::TokenSymbolMappingRecord;
use super::{DatabaseError, DbPool};
use crate::domain::entities::token_mapping::TokenSymbolMapping;
use tracing::{debug, error};

pub struct TokenRepository {
    pool: DbPool,
}

impl TokenRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert seed rows that are not present yet. Safe to call every run.
    pub async fn seed(&self, rows: &[TokenSymbolMapping]) -> Result<u64, DatabaseError> {
        let mut inserted = 0;
        for row in rows {
            let result = sqlx::query(
                r#"
                INSERT OR IGNORE INTO token_symbol_mappings
                    (symbol, network, mint, decimals, is_default)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(&row.symbol)
            .bind(&row.network)
            .bind(&row.mint)
            .bind(row.decimals as i64)
            .bind(row.is_default)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to seed token mapping {}: {}", row.symbol, e);
                DatabaseError::QueryError(format!("Failed to seed token mapping: {}", e))
            })?;
            inserted += result.rows_affected();
        }
        debug!("Seeded {} token symbol mappings", inserted);
        Ok(inserted)
    }

    /// Load every mapping row.
    pub async fn load_all(&self) -> Result<Vec<TokenSymbolMapping>, DatabaseError> {
        let records = sqlx::query_as::<_, TokenSymbolMappingRecord>(
            "SELECT * FROM token_symbol_mappings ORDER BY symbol, network",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to load token mappings: {}", e);
            DatabaseError::QueryError(format!("Failed to load token mappings: {}", e))
        })?;

        Ok(records
            .into_iter()
            .map(|r| TokenSymbolMapping {
                symbol: r.symbol,
                network: r.network,
                mint: r.mint,
                decimals: r.decimals.clamp(0, u8::MAX as i64) as u8,
                is_default: r.is_default,
            })
            .collect())
    }

    /// Record a mint discovered during classification, keyed by a shortened
    /// symbol placeholder. Ignored when the symbol/network pair exists.
    pub async fn record_discovery(
        &self,
        symbol: &str,
        network: &str,
        mint: &str,
        decimals: u8,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO token_symbol_mappings
                (symbol, network, mint, decimals, is_default)
            VALUES (?1, ?2, ?3, ?4, 0)
            "#,
        )
        .bind(symbol.to_uppercase())
        .bind(network.to_uppercase())
        .bind(mint)
        .bind(decimals as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to record discovered mint {}: {}", mint, e);
            DatabaseError::QueryError(format!("Failed to record discovery: {}", e))
        })?;
        Ok(result.rows_affected() > 0)
    }
}
