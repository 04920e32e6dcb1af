//! Record Source Trait
//!
//! Capability seam for fetching raw exchange records over a time window.
//! The production implementation paginates a signed REST API; tests supply
//! canned record batches.

use crate::domain::entities::exchange_record::ExchangeRecord;
use crate::domain::errors::IngestError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Identifier of the exchange connection these records belong to.
    fn connection_id(&self) -> &str;

    /// All records in `[from, to)`, in timestamp order.
    async fn fetch_records(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ExchangeRecord>, IngestError>;
}
