//! Sync Cursor Repository
//!
//! Per-(connection, phase) window-end timestamps enabling resumable
//! incremental sync. Cursors only advance; a forced full re-sync resets
//! them to empty.

use super::models::SyncCursorRecord;
use super::{DatabaseError, DbPool};
use chrono::{DateTime, Utc};
use tracing::{debug, error};

pub struct CursorRepository {
    pool: DbPool,
}

impl CursorRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Last synced window end for a phase, if any.
    pub async fn get(
        &self,
        connection_id: &str,
        phase: &str,
    ) -> Result<Option<DateTime<Utc>>, DatabaseError> {
        let record = sqlx::query_as::<_, SyncCursorRecord>(
            "SELECT * FROM sync_cursors WHERE connection_id = ?1 AND phase = ?2",
        )
        .bind(connection_id)
        .bind(phase)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to get cursor {}/{}: {}", connection_id, phase, e);
            DatabaseError::QueryError(format!("Failed to get cursor: {}", e))
        })?;
        Ok(record.map(|r| r.window_end))
    }

    /// Advance a phase cursor after the phase completed.
    pub async fn advance(
        &self,
        connection_id: &str,
        phase: &str,
        window_end: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO sync_cursors (connection_id, phase, window_end, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(connection_id, phase)
            DO UPDATE SET window_end = ?3, updated_at = ?4
            "#,
        )
        .bind(connection_id)
        .bind(phase)
        .bind(window_end)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to advance cursor {}/{}: {}", connection_id, phase, e);
            DatabaseError::QueryError(format!("Failed to advance cursor: {}", e))
        })?;
        debug!(
            "Advanced cursor {}/{} to {}",
            connection_id, phase, window_end
        );
        Ok(())
    }

    /// Reset all cursors for a connection (forced full re-sync).
    pub async fn reset(&self, connection_id: &str) -> Result<u64, DatabaseError> {
        let deleted = sqlx::query("DELETE FROM sync_cursors WHERE connection_id = ?1")
            .bind(connection_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to reset cursors for {}: {}", connection_id, e);
                DatabaseError::QueryError(format!("Failed to reset cursors: {}", e))
            })?
            .rows_affected();
        debug!("Reset {} cursors for {}", deleted, connection_id);
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::init_database;
    use chrono::TimeZone;

    #[tokio::test]
    async fn test_cursor_round_trip() {
        let pool = init_database("sqlite::memory:").await.unwrap();
        let repo = CursorRepository::new(pool);

        assert!(repo.get("conn-1", "records").await.unwrap().is_none());

        let first = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        repo.advance("conn-1", "records", first).await.unwrap();
        assert_eq!(repo.get("conn-1", "records").await.unwrap(), Some(first));

        let second = Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap();
        repo.advance("conn-1", "records", second).await.unwrap();
        assert_eq!(repo.get("conn-1", "records").await.unwrap(), Some(second));
    }

    #[tokio::test]
    async fn test_cursor_reset() {
        let pool = init_database("sqlite::memory:").await.unwrap();
        let repo = CursorRepository::new(pool);

        let t = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        repo.advance("conn-1", "records", t).await.unwrap();
        repo.advance("conn-1", "reconcile", t).await.unwrap();

        assert_eq!(repo.reset("conn-1").await.unwrap(), 2);
        assert!(repo.get("conn-1", "records").await.unwrap().is_none());
    }
}
