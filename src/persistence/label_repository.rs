//! Address Label Repository
//!
//! User-assigned and discovered counterparty labels backing summary
//! rendering.

use super::models::AddressLabelRecord;
use super::{DatabaseError, DbPool};
use crate::domain::entities::label::{AddressLabel, LabelSource};
use tracing::error;

pub struct LabelRepository {
    pool: DbPool,
}

impl LabelRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn load_all(&self) -> Result<Vec<AddressLabel>, DatabaseError> {
        let records = sqlx::query_as::<_, AddressLabelRecord>(
            "SELECT * FROM address_labels ORDER BY address",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to load address labels: {}", e);
            DatabaseError::QueryError(format!("Failed to load labels: {}", e))
        })?;

        Ok(records
            .into_iter()
            .filter_map(|r| {
                LabelSource::parse(&r.source).map(|source| AddressLabel {
                    address: r.address,
                    label: r.label,
                    source,
                })
            })
            .collect())
    }

    pub async fn upsert(&self, label: &AddressLabel) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO address_labels (address, source, label)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(address, source) DO UPDATE SET label = ?3
            "#,
        )
        .bind(&label.address)
        .bind(label.source.as_str())
        .bind(&label.label)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to upsert label for {}: {}", label.address, e);
            DatabaseError::QueryError(format!("Failed to upsert label: {}", e))
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::init_database;

    #[tokio::test]
    async fn test_upsert_and_load() {
        let pool = init_database("sqlite::memory:").await.unwrap();
        let repo = LabelRepository::new(pool);

        repo.upsert(&AddressLabel {
            address: "addr-1".to_string(),
            label: "Cold Storage".to_string(),
            source: LabelSource::User,
        })
        .await
        .unwrap();
        repo.upsert(&AddressLabel {
            address: "addr-1".to_string(),
            label: "Seen Exchange".to_string(),
            source: LabelSource::Discovered,
        })
        .await
        .unwrap();

        let labels = repo.load_all().await.unwrap();
        assert_eq!(labels.len(), 2);

        // Upsert replaces the label for the same (address, source).
        repo.upsert(&AddressLabel {
            address: "addr-1".to_string(),
            label: "Hardware Wallet".to_string(),
            source: LabelSource::User,
        })
        .await
        .unwrap();
        let labels = repo.load_all().await.unwrap();
        assert!(labels
            .iter()
            .any(|l| l.source == LabelSource::User && l.label == "Hardware Wallet"));
    }
}
