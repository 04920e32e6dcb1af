//! Transaction Repository
//!
//! Data access for canonical transactions and their flows. Ingestion is
//! expressed as insert-if-absent on the natural key (on-chain signature, or
//! `(connection_id, external_id)` for exchange rows) so re-ingesting the
//! same records is a true no-op. Reconciliation links are written through
//! `link_pair` only, which updates both sides inside one database
//! transaction; no API exists that can set a single side.

use super::models::{FlowRecord, TransactionRecord};
use super::{DatabaseError, DbPool};
use crate::domain::entities::flow::Flow;
use crate::domain::entities::transaction::{Transaction, TransactionType};
use chrono::{DateTime, Utc};
use tracing::{debug, error};

/// One unpriced non-fee flow with its parent context, for valuation backfill.
#[derive(Debug, Clone)]
pub struct UnpricedFlow {
    pub flow: Flow,
    pub transaction_id: String,
    pub transaction_type: TransactionType,
    pub timestamp: DateTime<Utc>,
}

pub struct TransactionRepository {
    pool: DbPool,
}

impl TransactionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert a transaction and its flows unless its natural key already
    /// exists. Returns `true` when the row was inserted, `false` when it was
    /// already present (skipped silently).
    pub async fn insert_if_absent(&self, transaction: &Transaction) -> Result<bool, DatabaseError> {
        if self.exists(transaction).await? {
            debug!(
                id = %transaction.id,
                signature = transaction.signature.as_deref().unwrap_or(""),
                external_id = transaction.external_id.as_deref().unwrap_or(""),
                "Transaction already ingested, skipped"
            );
            return Ok(false);
        }

        let record = TransactionRecord::from_entity(transaction);
        let mut db_tx = self.pool.begin().await.map_err(|e| {
            error!("Failed to begin insert transaction: {}", e);
            DatabaseError::QueryError(format!("Failed to begin insert: {}", e))
        })?;

        sqlx::query(
            r#"
            INSERT INTO transactions (
                id, source, signature, external_id, connection_id, wallet_address,
                transaction_type, category, timestamp, slot, block_time,
                total_value_usd, fee, linked_transaction_id, summary, raw_data,
                created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?17)
            "#,
        )
        .bind(&record.id)
        .bind(&record.source)
        .bind(&record.signature)
        .bind(&record.external_id)
        .bind(&record.connection_id)
        .bind(&record.wallet_address)
        .bind(&record.transaction_type)
        .bind(&record.category)
        .bind(record.timestamp)
        .bind(record.slot)
        .bind(record.block_time)
        .bind(record.total_value_usd)
        .bind(record.fee)
        .bind(&record.linked_transaction_id)
        .bind(&record.summary)
        .bind(&record.raw_data)
        .bind(record.created_at)
        .execute(&mut *db_tx)
        .await
        .map_err(|e| {
            error!("Failed to insert transaction: {}", e);
            DatabaseError::QueryError(format!("Failed to insert transaction: {}", e))
        })?;

        for flow in &transaction.flows {
            let flow_record = FlowRecord::from_entity(&transaction.id, flow);
            sqlx::query(
                r#"
                INSERT INTO flows (
                    id, transaction_id, mint, symbol, decimals, network,
                    amount, direction, value_usd, price_at_execution, is_fee
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                "#,
            )
            .bind(&flow_record.id)
            .bind(&flow_record.transaction_id)
            .bind(&flow_record.mint)
            .bind(&flow_record.symbol)
            .bind(flow_record.decimals)
            .bind(&flow_record.network)
            .bind(flow_record.amount)
            .bind(&flow_record.direction)
            .bind(flow_record.value_usd)
            .bind(flow_record.price_at_execution)
            .bind(flow_record.is_fee)
            .execute(&mut *db_tx)
            .await
            .map_err(|e| {
                error!("Failed to insert flow: {}", e);
                DatabaseError::QueryError(format!("Failed to insert flow: {}", e))
            })?;
        }

        db_tx.commit().await.map_err(|e| {
            error!("Failed to commit insert: {}", e);
            DatabaseError::QueryError(format!("Failed to commit insert: {}", e))
        })?;

        debug!(id = %transaction.id, "Inserted transaction with {} flows", transaction.flows.len());
        Ok(true)
    }

    async fn exists(&self, transaction: &Transaction) -> Result<bool, DatabaseError> {
        let count: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM transactions
            WHERE (?1 IS NOT NULL AND signature = ?1)
               OR (?2 IS NOT NULL AND connection_id = ?2 AND external_id = ?3)
            "#,
        )
        .bind(&transaction.signature)
        .bind(&transaction.connection_id)
        .bind(&transaction.external_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to check transaction existence: {}", e);
            DatabaseError::QueryError(format!("Failed to check existence: {}", e))
        })?;
        Ok(count.0 > 0)
    }

    /// Get a transaction with its flows.
    pub async fn get(&self, id: &str) -> Result<Option<Transaction>, DatabaseError> {
        let record = sqlx::query_as::<_, TransactionRecord>(
            "SELECT * FROM transactions WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to get transaction {}: {}", id, e);
            DatabaseError::QueryError(format!("Failed to get transaction: {}", e))
        })?;

        match record {
            Some(record) => {
                let flows = self.load_flows(&record.id).await?;
                Ok(Some(record.into_entity(flows)))
            }
            None => Ok(None),
        }
    }

    /// Find an exchange transaction by its per-connection external id.
    pub async fn find_by_external_id(
        &self,
        connection_id: &str,
        external_id: &str,
    ) -> Result<Option<Transaction>, DatabaseError> {
        let record = sqlx::query_as::<_, TransactionRecord>(
            "SELECT * FROM transactions WHERE connection_id = ?1 AND external_id = ?2",
        )
        .bind(connection_id)
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to find transaction by external id: {}", e);
            DatabaseError::QueryError(format!("Failed to find by external id: {}", e))
        })?;

        match record {
            Some(record) => {
                let flows = self.load_flows(&record.id).await?;
                Ok(Some(record.into_entity(flows)))
            }
            None => Ok(None),
        }
    }

    /// Find an on-chain transaction by its signature.
    pub async fn find_by_signature(
        &self,
        signature: &str,
    ) -> Result<Option<Transaction>, DatabaseError> {
        let record = sqlx::query_as::<_, TransactionRecord>(
            "SELECT * FROM transactions WHERE signature = ?1",
        )
        .bind(signature)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to find transaction by signature: {}", e);
            DatabaseError::QueryError(format!("Failed to find by signature: {}", e))
        })?;

        match record {
            Some(record) => {
                let flows = self.load_flows(&record.id).await?;
                Ok(Some(record.into_entity(flows)))
            }
            None => Ok(None),
        }
    }

    /// Unlinked exchange deposits/withdrawals for a connection, oldest first.
    pub async fn find_unlinked_exchange_transfers(
        &self,
        connection_id: &str,
    ) -> Result<Vec<Transaction>, DatabaseError> {
        let records = sqlx::query_as::<_, TransactionRecord>(
            r#"
            SELECT * FROM transactions
            WHERE connection_id = ?1
              AND linked_transaction_id IS NULL
              AND transaction_type IN ('EXCHANGE_DEPOSIT', 'EXCHANGE_WITHDRAWAL')
            ORDER BY timestamp ASC
            "#,
        )
        .bind(connection_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to get unlinked exchange transfers: {}", e);
            DatabaseError::QueryError(format!("Failed to get unlinked transfers: {}", e))
        })?;

        self.with_flows(records).await
    }

    /// Unlinked on-chain transfers of one type for a wallet inside a time
    /// window. `newest_first` controls scan order: deposits match the most
    /// recent send first, withdrawals the earliest receipt first.
    pub async fn find_unlinked_onchain_transfers(
        &self,
        wallet_address: &str,
        transaction_type: TransactionType,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        newest_first: bool,
    ) -> Result<Vec<Transaction>, DatabaseError> {
        let query = if newest_first {
            r#"
            SELECT * FROM transactions
            WHERE wallet_address = ?1 AND transaction_type = ?2
              AND source = 'ON_CHAIN' AND linked_transaction_id IS NULL
              AND timestamp >= ?3 AND timestamp <= ?4
            ORDER BY timestamp DESC
            "#
        } else {
            r#"
            SELECT * FROM transactions
            WHERE wallet_address = ?1 AND transaction_type = ?2
              AND source = 'ON_CHAIN' AND linked_transaction_id IS NULL
              AND timestamp >= ?3 AND timestamp <= ?4
            ORDER BY timestamp ASC
            "#
        };

        let records = sqlx::query_as::<_, TransactionRecord>(query)
            .bind(wallet_address)
            .bind(transaction_type.as_str())
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to get unlinked on-chain transfers: {}", e);
                DatabaseError::QueryError(format!("Failed to get on-chain transfers: {}", e))
            })?;

        self.with_flows(records).await
    }

    /// Link two transactions symmetrically.
    ///
    /// Both sides are written inside one database transaction; the call is
    /// rejected when the identifiers are equal, either row is missing, or
    /// either side is already linked. A half-linked state is never
    /// observable.
    pub async fn link_pair(&self, a: &str, b: &str) -> Result<(), DatabaseError> {
        if a == b {
            return Err(DatabaseError::QueryError(
                "Cannot link a transaction to itself".to_string(),
            ));
        }

        let mut db_tx = self.pool.begin().await.map_err(|e| {
            error!("Failed to begin link transaction: {}", e);
            DatabaseError::QueryError(format!("Failed to begin link: {}", e))
        })?;

        let rows: Vec<(String, Option<String>)> = sqlx::query_as(
            "SELECT id, linked_transaction_id FROM transactions WHERE id IN (?1, ?2)",
        )
        .bind(a)
        .bind(b)
        .fetch_all(&mut *db_tx)
        .await
        .map_err(|e| {
            error!("Failed to load link candidates: {}", e);
            DatabaseError::QueryError(format!("Failed to load link candidates: {}", e))
        })?;

        if rows.len() != 2 {
            return Err(DatabaseError::QueryError(format!(
                "Link rejected: transaction not found ({} of 2 rows)",
                rows.len()
            )));
        }
        if let Some((id, _)) = rows.iter().find(|(_, linked)| linked.is_some()) {
            return Err(DatabaseError::QueryError(format!(
                "Link rejected: transaction {} is already linked",
                id
            )));
        }

        let now = Utc::now();
        for (id, partner) in [(a, b), (b, a)] {
            sqlx::query(
                "UPDATE transactions SET linked_transaction_id = ?1, updated_at = ?2 WHERE id = ?3",
            )
            .bind(partner)
            .bind(now)
            .bind(id)
            .execute(&mut *db_tx)
            .await
            .map_err(|e| {
                error!("Failed to write link side {}: {}", id, e);
                DatabaseError::QueryError(format!("Failed to write link: {}", e))
            })?;
        }

        db_tx.commit().await.map_err(|e| {
            error!("Failed to commit link: {}", e);
            DatabaseError::QueryError(format!("Failed to commit link: {}", e))
        })?;

        debug!("Linked transactions {} <-> {}", a, b);
        Ok(())
    }

    /// Non-fee flows still lacking a price, oldest parent first.
    pub async fn find_unpriced_flows(
        &self,
        limit: i64,
    ) -> Result<Vec<UnpricedFlow>, DatabaseError> {
        #[derive(sqlx::FromRow)]
        struct UnpricedFlowRow {
            parent_id: String,
            parent_type: String,
            parent_timestamp: DateTime<Utc>,
            id: String,
            transaction_id: String,
            mint: String,
            symbol: String,
            decimals: i64,
            network: Option<String>,
            amount: f64,
            direction: String,
            value_usd: Option<f64>,
            price_at_execution: Option<f64>,
            is_fee: bool,
        }

        let rows = sqlx::query_as::<_, UnpricedFlowRow>(
            r#"
            SELECT t.id AS parent_id, t.transaction_type AS parent_type,
                   t.timestamp AS parent_timestamp,
                   f.id, f.transaction_id, f.mint, f.symbol, f.decimals, f.network,
                   f.amount, f.direction, f.value_usd, f.price_at_execution, f.is_fee
            FROM flows f
            JOIN transactions t ON t.id = f.transaction_id
            WHERE f.price_at_execution IS NULL AND f.is_fee = 0
            ORDER BY t.timestamp ASC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to get unpriced flows: {}", e);
            DatabaseError::QueryError(format!("Failed to get unpriced flows: {}", e))
        })?;

        Ok(rows
            .into_iter()
            .map(|row| UnpricedFlow {
                transaction_id: row.parent_id,
                transaction_type: TransactionType::parse(&row.parent_type),
                timestamp: row.parent_timestamp,
                flow: FlowRecord {
                    id: row.id,
                    transaction_id: row.transaction_id,
                    mint: row.mint,
                    symbol: row.symbol,
                    decimals: row.decimals,
                    network: row.network,
                    amount: row.amount,
                    direction: row.direction,
                    value_usd: row.value_usd,
                    price_at_execution: row.price_at_execution,
                    is_fee: row.is_fee,
                }
                .into_entity(),
            })
            .collect())
    }

    /// Write a backfilled price onto a flow.
    pub async fn update_flow_price(
        &self,
        flow_id: &str,
        price: f64,
        value_usd: f64,
    ) -> Result<(), DatabaseError> {
        let rows_affected = sqlx::query(
            "UPDATE flows SET price_at_execution = ?1, value_usd = ?2 WHERE id = ?3",
        )
        .bind(price)
        .bind(value_usd)
        .bind(flow_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to update flow price {}: {}", flow_id, e);
            DatabaseError::QueryError(format!("Failed to update flow price: {}", e))
        })?
        .rows_affected();

        if rows_affected == 0 {
            return Err(DatabaseError::QueryError(format!(
                "Flow not found: {}",
                flow_id
            )));
        }
        Ok(())
    }

    /// Set a transaction's notional value, only when it is still unset.
    pub async fn set_total_value_usd_if_unset(
        &self,
        transaction_id: &str,
        value_usd: f64,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            UPDATE transactions SET total_value_usd = ?1, updated_at = ?2
            WHERE id = ?3 AND total_value_usd IS NULL
            "#,
        )
        .bind(value_usd)
        .bind(Utc::now())
        .bind(transaction_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to set total value for {}: {}", transaction_id, e);
            DatabaseError::QueryError(format!("Failed to set total value: {}", e))
        })?;
        Ok(())
    }

    /// Administrative full re-sync for a connection: clear linkage on both
    /// sides first, then delete the connection's rows.
    pub async fn purge_connection(&self, connection_id: &str) -> Result<u64, DatabaseError> {
        let mut db_tx = self.pool.begin().await.map_err(|e| {
            error!("Failed to begin purge: {}", e);
            DatabaseError::QueryError(format!("Failed to begin purge: {}", e))
        })?;

        sqlx::query(
            r#"
            UPDATE transactions SET linked_transaction_id = NULL
            WHERE linked_transaction_id IN
                (SELECT id FROM transactions WHERE connection_id = ?1)
            "#,
        )
        .bind(connection_id)
        .execute(&mut *db_tx)
        .await
        .map_err(|e| DatabaseError::QueryError(format!("Failed to clear links: {}", e)))?;

        sqlx::query(
            "DELETE FROM flows WHERE transaction_id IN \
             (SELECT id FROM transactions WHERE connection_id = ?1)",
        )
        .bind(connection_id)
        .execute(&mut *db_tx)
        .await
        .map_err(|e| DatabaseError::QueryError(format!("Failed to delete flows: {}", e)))?;

        let deleted = sqlx::query("DELETE FROM transactions WHERE connection_id = ?1")
            .bind(connection_id)
            .execute(&mut *db_tx)
            .await
            .map_err(|e| DatabaseError::QueryError(format!("Failed to delete transactions: {}", e)))?
            .rows_affected();

        db_tx.commit().await.map_err(|e| {
            error!("Failed to commit purge: {}", e);
            DatabaseError::QueryError(format!("Failed to commit purge: {}", e))
        })?;

        debug!("Purged {} transactions for connection {}", deleted, connection_id);
        Ok(deleted)
    }

    async fn load_flows(&self, transaction_id: &str) -> Result<Vec<FlowRecord>, DatabaseError> {
        sqlx::query_as::<_, FlowRecord>(
            "SELECT * FROM flows WHERE transaction_id = ?1 ORDER BY rowid",
        )
        .bind(transaction_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to load flows for {}: {}", transaction_id, e);
            DatabaseError::QueryError(format!("Failed to load flows: {}", e))
        })
    }

    async fn with_flows(
        &self,
        records: Vec<TransactionRecord>,
    ) -> Result<Vec<Transaction>, DatabaseError> {
        let mut transactions = Vec::with_capacity(records.len());
        for record in records {
            let flows = self.load_flows(&record.id).await?;
            transactions.push(record.into_entity(flows));
        }
        Ok(transactions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::flow::{Flow, FlowDirection};
    use crate::domain::entities::transaction::TransactionSource;
    use crate::persistence::init_database;
    use chrono::TimeZone;

    fn onchain_tx(signature: &str, wallet: &str) -> Transaction {
        let mut tx = Transaction::new(
            TransactionSource::OnChain,
            TransactionType::TransferOut,
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        );
        tx.signature = Some(signature.to_string());
        tx.wallet_address = Some(wallet.to_string());
        tx.flows.push(
            Flow::new(
                "So11111111111111111111111111111111111111112",
                "SOL",
                9,
                5.0,
                FlowDirection::Out,
            )
            .unwrap(),
        );
        tx
    }

    fn exchange_tx(external_id: &str, connection_id: &str) -> Transaction {
        let mut tx = Transaction::new(
            TransactionSource::Exchange,
            TransactionType::ExchangeDeposit,
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap(),
        );
        tx.external_id = Some(external_id.to_string());
        tx.connection_id = Some(connection_id.to_string());
        tx.flows.push(
            Flow::new(
                "So11111111111111111111111111111111111111112",
                "SOL",
                9,
                5.0,
                FlowDirection::In,
            )
            .unwrap(),
        );
        tx
    }

    #[tokio::test]
    async fn test_insert_and_get_round_trip() {
        let pool = init_database("sqlite::memory:").await.unwrap();
        let repo = TransactionRepository::new(pool);

        let tx = onchain_tx("sig-1", "wallet-1");
        assert!(repo.insert_if_absent(&tx).await.unwrap());

        let fetched = repo.get(&tx.id).await.unwrap().unwrap();
        assert_eq!(fetched.signature.as_deref(), Some("sig-1"));
        assert_eq!(fetched.transaction_type, TransactionType::TransferOut);
        assert_eq!(fetched.flows.len(), 1);
        assert_eq!(fetched.flows[0].symbol, "SOL");
        assert_eq!(fetched.flows[0].direction, FlowDirection::Out);
    }

    #[tokio::test]
    async fn test_insert_if_absent_dedups_by_signature() {
        let pool = init_database("sqlite::memory:").await.unwrap();
        let repo = TransactionRepository::new(pool);

        let first = onchain_tx("sig-dup", "wallet-1");
        let second = onchain_tx("sig-dup", "wallet-1");
        assert!(repo.insert_if_absent(&first).await.unwrap());
        assert!(!repo.insert_if_absent(&second).await.unwrap());
    }

    #[tokio::test]
    async fn test_insert_if_absent_dedups_by_external_id() {
        let pool = init_database("sqlite::memory:").await.unwrap();
        let repo = TransactionRepository::new(pool);

        assert!(repo
            .insert_if_absent(&exchange_tx("ext-1", "conn-1"))
            .await
            .unwrap());
        assert!(!repo
            .insert_if_absent(&exchange_tx("ext-1", "conn-1"))
            .await
            .unwrap());
        // Same external id on another connection is a different record.
        assert!(repo
            .insert_if_absent(&exchange_tx("ext-1", "conn-2"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_link_pair_is_symmetric() {
        let pool = init_database("sqlite::memory:").await.unwrap();
        let repo = TransactionRepository::new(pool);

        let a = onchain_tx("sig-a", "wallet-1");
        let b = exchange_tx("ext-a", "conn-1");
        repo.insert_if_absent(&a).await.unwrap();
        repo.insert_if_absent(&b).await.unwrap();

        repo.link_pair(&a.id, &b.id).await.unwrap();

        let a_row = repo.get(&a.id).await.unwrap().unwrap();
        let b_row = repo.get(&b.id).await.unwrap().unwrap();
        assert_eq!(a_row.linked_transaction_id.as_deref(), Some(b.id.as_str()));
        assert_eq!(b_row.linked_transaction_id.as_deref(), Some(a.id.as_str()));
    }

    #[tokio::test]
    async fn test_link_pair_rejects_already_linked() {
        let pool = init_database("sqlite::memory:").await.unwrap();
        let repo = TransactionRepository::new(pool);

        let a = onchain_tx("sig-a", "wallet-1");
        let b = exchange_tx("ext-a", "conn-1");
        let c = exchange_tx("ext-b", "conn-1");
        repo.insert_if_absent(&a).await.unwrap();
        repo.insert_if_absent(&b).await.unwrap();
        repo.insert_if_absent(&c).await.unwrap();

        repo.link_pair(&a.id, &b.id).await.unwrap();
        // No third transaction may take either side of an existing pair.
        assert!(repo.link_pair(&c.id, &a.id).await.is_err());
        assert!(repo.link_pair(&b.id, &c.id).await.is_err());

        // The original pair is intact.
        let a_row = repo.get(&a.id).await.unwrap().unwrap();
        assert_eq!(a_row.linked_transaction_id.as_deref(), Some(b.id.as_str()));
        let c_row = repo.get(&c.id).await.unwrap().unwrap();
        assert!(c_row.linked_transaction_id.is_none());
    }

    #[tokio::test]
    async fn test_link_pair_rejects_self_link() {
        let pool = init_database("sqlite::memory:").await.unwrap();
        let repo = TransactionRepository::new(pool);
        let a = onchain_tx("sig-a", "wallet-1");
        repo.insert_if_absent(&a).await.unwrap();
        assert!(repo.link_pair(&a.id, &a.id).await.is_err());
    }

    #[tokio::test]
    async fn test_unlinked_queries_exclude_linked_rows() {
        let pool = init_database("sqlite::memory:").await.unwrap();
        let repo = TransactionRepository::new(pool);

        let a = onchain_tx("sig-a", "wallet-1");
        let b = exchange_tx("ext-a", "conn-1");
        repo.insert_if_absent(&a).await.unwrap();
        repo.insert_if_absent(&b).await.unwrap();

        assert_eq!(
            repo.find_unlinked_exchange_transfers("conn-1")
                .await
                .unwrap()
                .len(),
            1
        );

        repo.link_pair(&a.id, &b.id).await.unwrap();

        assert!(repo
            .find_unlinked_exchange_transfers("conn-1")
            .await
            .unwrap()
            .is_empty());
        let window_start = Utc.with_ymd_and_hms(2024, 5, 1, 11, 0, 0).unwrap();
        let window_end = Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 0).unwrap();
        assert!(repo
            .find_unlinked_onchain_transfers(
                "wallet-1",
                TransactionType::TransferOut,
                window_start,
                window_end,
                true,
            )
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_unpriced_flows_exclude_fee_and_priced() {
        let pool = init_database("sqlite::memory:").await.unwrap();
        let repo = TransactionRepository::new(pool);

        let mut tx = onchain_tx("sig-a", "wallet-1");
        tx.flows.push(
            Flow::new("mint-fee", "SOL", 9, 0.000005, FlowDirection::Out)
                .unwrap()
                .as_fee(),
        );
        tx.flows.push(
            Flow::new("mint-priced", "USDC", 6, 10.0, FlowDirection::In)
                .unwrap()
                .with_price(1.0),
        );
        repo.insert_if_absent(&tx).await.unwrap();

        let unpriced = repo.find_unpriced_flows(100).await.unwrap();
        assert_eq!(unpriced.len(), 1);
        assert_eq!(unpriced[0].flow.symbol, "SOL");
        assert!(!unpriced[0].flow.is_fee);
    }

    #[tokio::test]
    async fn test_update_flow_price_and_total_value() {
        let pool = init_database("sqlite::memory:").await.unwrap();
        let repo = TransactionRepository::new(pool);

        let tx = onchain_tx("sig-a", "wallet-1");
        repo.insert_if_absent(&tx).await.unwrap();

        repo.update_flow_price(&tx.flows[0].id, 150.0, 750.0)
            .await
            .unwrap();
        repo.set_total_value_usd_if_unset(&tx.id, 750.0)
            .await
            .unwrap();
        // A second write must not overwrite the derived value.
        repo.set_total_value_usd_if_unset(&tx.id, 999.0)
            .await
            .unwrap();

        let fetched = repo.get(&tx.id).await.unwrap().unwrap();
        assert_eq!(fetched.flows[0].price_at_execution, Some(150.0));
        assert_eq!(fetched.flows[0].value_usd, Some(750.0));
        assert_eq!(fetched.total_value_usd, Some(750.0));
    }

    #[tokio::test]
    async fn test_purge_connection_clears_partner_links() {
        let pool = init_database("sqlite::memory:").await.unwrap();
        let repo = TransactionRepository::new(pool);

        let a = onchain_tx("sig-a", "wallet-1");
        let b = exchange_tx("ext-a", "conn-1");
        repo.insert_if_absent(&a).await.unwrap();
        repo.insert_if_absent(&b).await.unwrap();
        repo.link_pair(&a.id, &b.id).await.unwrap();

        let deleted = repo.purge_connection("conn-1").await.unwrap();
        assert_eq!(deleted, 1);

        let a_row = repo.get(&a.id).await.unwrap().unwrap();
        assert!(a_row.linked_transaction_id.is_none());
        assert!(repo.get(&b.id).await.unwrap().is_none());
    }
}
