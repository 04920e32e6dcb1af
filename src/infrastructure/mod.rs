pub mod exchange_api;
pub mod price_client;
