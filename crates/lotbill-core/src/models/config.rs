//! Configuration structures for the ledger pipeline.

use std::path::Path;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ledger::mapper::TaxCodeTable;
use crate::retry::RetryPolicy;

/// Main configuration for lotbill.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LotbillConfig {
    /// Ledger mapping and transport configuration.
    pub ledger: LedgerConfig,

    /// Retry tuning for outbound calls.
    pub retry: RetryConfig,
}

/// Ledger configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Currency code used when the invoice has none.
    pub default_currency: String,

    /// Ledger tax-type codes.
    pub tax_codes: TaxCodeTable,

    /// Allowed difference between the invoice total and the bill total.
    pub tolerance: Decimal,

    /// Base URL of the ledger API.
    pub base_url: String,

    /// Header carrying the tenant id on ledger requests.
    pub tenant_header: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            default_currency: "GBP".to_string(),
            tax_codes: TaxCodeTable::default(),
            tolerance: Decimal::new(5, 2),
            base_url: "https://api.xero.com/api.xro/2.0".to_string(),
            tenant_header: "xero-tenant-id".to_string(),
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts including the first try.
    pub max_attempts: u32,

    /// Base backoff delay in milliseconds.
    pub base_delay_ms: u64,

    /// Extra HTTP statuses to retry.
    pub extra_transient_statuses: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 300,
            extra_transient_statuses: Vec::new(),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        RetryPolicy::new()
            .with_max_attempts(config.max_attempts)
            .with_base_delay(Duration::from_millis(config.base_delay_ms))
            .with_transient_statuses(config.extra_transient_statuses.iter().copied())
    }
}

impl LotbillConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, content)
    }

    /// Retry policy built from the retry section.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from(&self.retry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = LotbillConfig::default();
        assert_eq!(config.ledger.default_currency, "GBP");
        assert_eq!(config.ledger.tax_codes.vat20, "vat20");
        assert_eq!(config.ledger.tolerance, Decimal::new(5, 2));
        assert_eq!(config.retry.max_attempts, 5);

        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.base_delay, Duration::from_millis(300));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: LotbillConfig = serde_json::from_str(
            r#"{"ledger": {"default_currency": "EUR"}, "retry": {"extra_transient_statuses": [500]}}"#,
        )
        .unwrap();

        assert_eq!(config.ledger.default_currency, "EUR");
        assert_eq!(config.ledger.tax_codes, TaxCodeTable::default());
        assert_eq!(config.retry.base_delay_ms, 300);
        assert!(config.retry_policy().extra_transient_statuses.contains(&500));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = LotbillConfig::default();
        config.ledger.tax_codes.vat20 = "INPUT2".to_string();
        config.retry.max_attempts = 2;
        config.save(&path).unwrap();

        let loaded = LotbillConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
