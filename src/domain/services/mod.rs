pub mod classifier;
pub mod exchange_mapper;
pub mod reconciliation;
pub mod token_resolver;
pub mod valuation;
