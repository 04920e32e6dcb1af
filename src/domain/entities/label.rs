//! Address labels used when rendering transaction summaries.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LabelSource {
    /// Assigned by the user; highest priority.
    User,
    /// Learned from repeated counterparty activity.
    Discovered,
}

impl LabelSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            LabelSource::User => "user",
            LabelSource::Discovered => "discovered",
        }
    }

    pub fn parse(s: &str) -> Option<LabelSource> {
        match s {
            "user" => Some(LabelSource::User),
            "discovered" => Some(LabelSource::Discovered),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressLabel {
    pub address: String,
    pub label: String,
    pub source: LabelSource,
}

/// Shorten a raw address for display: first 4 + ellipsis + last 4.
pub fn shorten_address(address: &str) -> String {
    if address.len() <= 10 {
        return address.to_string();
    }
    format!("{}...{}", &address[..4], &address[address.len() - 4..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shorten_address_long() {
        let addr = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";
        assert_eq!(shorten_address(addr), "9WzD...AWWM");
    }

    #[test]
    fn test_shorten_address_short_passthrough() {
        assert_eq!(shorten_address("abc"), "abc");
    }

    #[test]
    fn test_label_source_round_trip() {
        assert_eq!(LabelSource::parse("user"), Some(LabelSource::User));
        assert_eq!(
            LabelSource::parse("discovered"),
            Some(LabelSource::Discovered)
        );
        assert_eq!(LabelSource::parse("x"), None);
    }
}
