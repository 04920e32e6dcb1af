pub mod price_source;
pub mod record_source;
