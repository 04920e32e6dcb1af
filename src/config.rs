use crate::domain::services::reconciliation::matcher::MatchParams;
use chrono::Duration;

/// Engine tuning knobs for sync, reconciliation and valuation.
///
/// The fuzzy-match tolerance and time windows are empirically chosen
/// defaults, kept configurable rather than hard-coded.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Relative amount tolerance for fuzzy reconciliation (0.02 = 2%).
    pub recon_amount_tolerance: f64,
    /// Deposit look-back window in seconds (on-chain send before deposit).
    pub recon_deposit_lookback_secs: u64,
    /// Withdrawal look-ahead window in seconds (on-chain receipt after withdrawal).
    pub recon_withdrawal_lookahead_secs: u64,
    /// Flows priced per valuation batch.
    pub valuation_batch_limit: i64,
    /// Ceiling on upstream price requests per minute.
    pub price_requests_per_minute: u32,
    /// Delay between exchange record pages, in milliseconds.
    pub record_page_delay_millis: u64,
    /// Window scanned on a connection's first sync, in days.
    pub initial_sync_lookback_days: u64,
}

impl EngineConfig {
    /// Default configuration matching the original deployment.
    pub fn default() -> EngineConfig {
        EngineConfig {
            recon_amount_tolerance: 0.02,
            recon_deposit_lookback_secs: 3600,       // 1 hour
            recon_withdrawal_lookahead_secs: 7200,   // 2 hours
            valuation_batch_limit: 500,
            price_requests_per_minute: 60,
            record_page_delay_millis: 250,
            initial_sync_lookback_days: 365,
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> EngineConfig {
        let mut config = EngineConfig::default();

        if let Ok(tolerance) = std::env::var("RECON_AMOUNT_TOLERANCE") {
            match tolerance.parse::<f64>() {
                Ok(value) if (0.0..=0.25).contains(&value) => {
                    config.recon_amount_tolerance = value;
                }
                Ok(value) => {
                    tracing::warn!(
                        "Invalid RECON_AMOUNT_TOLERANCE value: {} (must be between 0.0 and 0.25), using default: {}",
                        value, config.recon_amount_tolerance
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to parse RECON_AMOUNT_TOLERANCE '{}': {}, using default: {}",
                        tolerance,
                        e,
                        config.recon_amount_tolerance
                    );
                }
            }
        }

        if let Ok(lookback) = std::env::var("RECON_DEPOSIT_LOOKBACK_SECS") {
            if let Ok(value) = lookback.parse::<u64>() {
                if value >= 60 && value <= 86400 {
                    config.recon_deposit_lookback_secs = value;
                }
            }
        }

        if let Ok(lookahead) = std::env::var("RECON_WITHDRAWAL_LOOKAHEAD_SECS") {
            if let Ok(value) = lookahead.parse::<u64>() {
                if value >= 60 && value <= 86400 {
                    config.recon_withdrawal_lookahead_secs = value;
                }
            }
        }

        if let Ok(limit) = std::env::var("VALUATION_BATCH_LIMIT") {
            if let Ok(value) = limit.parse::<i64>() {
                if value > 0 && value <= 10000 {
                    config.valuation_batch_limit = value;
                }
            }
        }

        if let Ok(rpm) = std::env::var("PRICE_REQUESTS_PER_MINUTE") {
            if let Ok(value) = rpm.parse::<u32>() {
                if value > 0 && value <= 1200 {
                    config.price_requests_per_minute = value;
                }
            }
        }

        if let Ok(delay) = std::env::var("RECORD_PAGE_DELAY_MILLIS") {
            if let Ok(value) = delay.parse::<u64>() {
                if value <= 10000 {
                    config.record_page_delay_millis = value;
                }
            }
        }

        if let Ok(days) = std::env::var("INITIAL_SYNC_LOOKBACK_DAYS") {
            if let Ok(value) = days.parse::<u64>() {
                if value >= 1 && value <= 3650 {
                    config.initial_sync_lookback_days = value;
                }
            }
        }

        config
    }

    /// Reconciliation parameters derived from this configuration.
    pub fn match_params(&self) -> MatchParams {
        MatchParams {
            amount_tolerance: self.recon_amount_tolerance,
            deposit_lookback: Duration::seconds(self.recon_deposit_lookback_secs as i64),
            withdrawal_lookahead: Duration::seconds(self.recon_withdrawal_lookahead_secs as i64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.recon_amount_tolerance, 0.02);
        assert_eq!(config.recon_deposit_lookback_secs, 3600);
        assert_eq!(config.recon_withdrawal_lookahead_secs, 7200);
    }

    #[test]
    fn test_match_params_derivation() {
        let config = EngineConfig::default();
        let params = config.match_params();
        assert_eq!(params.amount_tolerance, 0.02);
        assert_eq!(params.deposit_lookback, Duration::hours(1));
        assert_eq!(params.withdrawal_lookahead, Duration::hours(2));
    }
}
