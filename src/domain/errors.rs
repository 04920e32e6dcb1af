use thiserror::Error;

/// Errors raised while turning raw source data into canonical transactions.
///
/// Malformed-but-well-typed input never produces one of these: unclassifiable
/// payloads resolve to `TransactionType::Unknown` and unrecognized exchange
/// record types are skipped. Ingestion errors are counted per phase and
/// surfaced in the sync report instead of aborting the run.
#[derive(Debug, Error, Clone)]
pub enum IngestError {
    #[error("Record {external_id} already ingested for connection {connection_id}")]
    DuplicateRecord {
        connection_id: String,
        external_id: String,
    },

    #[error("Payload missing required field: {0}")]
    MalformedPayload(String),

    #[error("Exchange API error: {0}")]
    SourceApi(String),

    #[error("Persistence error: {0}")]
    Persistence(String),
}

/// Errors from external price lookups.
///
/// A failed lookup is cached as "no price available" for the (asset, date)
/// pair and retried on a later run; it never fails the backfill phase.
#[derive(Debug, Error, Clone)]
pub enum PriceError {
    #[error("Price request failed: {0}")]
    RequestFailed(String),

    #[error("Unexpected response shape: {0}")]
    MalformedResponse(String),

    #[error("Rate limited by upstream")]
    RateLimited,
}

/// Domain value validation errors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Amount must be strictly positive")]
    NonPositiveAmount,

    #[error("Value must be finite")]
    MustBeFinite,

    #[error("Symbol must be non-empty")]
    EmptySymbol,
}

/// Errors from the reconciliation passes.
///
/// Only infrastructure-level failures surface here; a transaction with no
/// match simply stays unlinked and is retried on the next run.
#[derive(Debug, Error, Clone)]
pub enum ReconciliationError {
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Link rejected: {0}")]
    LinkRejected(String),
}

impl From<ValidationError> for String {
    fn from(error: ValidationError) -> Self {
        error.to_string()
    }
}
