//! Service configuration.
//!
//! Loaded from environment variables with fallback to defaults.

use serde::{Deserialize, Serialize};
use std::env;

use invoicer_core::validation::{validate_currency, validate_invoice_prefix};
use invoicer_core::{DEFAULT_CURRENCY, DEFAULT_INVOICE_PREFIX};

/// Behaviour of [`crate::InvoiceService`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Extra attempts after a version conflict before giving up.
    pub max_conflict_retries: u32,

    /// Currency for invoices created without one.
    pub default_currency: String,

    /// Invoice number prefix for users without their own.
    pub default_invoice_prefix: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            max_conflict_retries: 1,
            default_currency: DEFAULT_CURRENCY.to_string(),
            default_invoice_prefix: DEFAULT_INVOICE_PREFIX.to_string(),
        }
    }
}

impl LedgerConfig {
    /// Sets the number of conflict retries.
    pub fn max_conflict_retries(mut self, retries: u32) -> Self {
        self.max_conflict_retries = retries;
        self
    }

    /// Load configuration from environment variables.
    ///
    /// - `INVOICER_CONFLICT_RETRIES` (default 1)
    /// - `INVOICER_DEFAULT_CURRENCY` (default `USD`)
    /// - `INVOICER_INVOICE_PREFIX` (default `INV`)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = LedgerConfig::default();

        let config = LedgerConfig {
            max_conflict_retries: match env::var("INVOICER_CONFLICT_RETRIES") {
                Ok(value) => value
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("INVOICER_CONFLICT_RETRIES".to_string()))?,
                Err(_) => defaults.max_conflict_retries,
            },

            default_currency: env::var("INVOICER_DEFAULT_CURRENCY")
                .unwrap_or(defaults.default_currency),

            default_invoice_prefix: env::var("INVOICER_INVOICE_PREFIX")
                .unwrap_or(defaults.default_invoice_prefix),
        };

        config.validate()?;
        Ok(config)
    }

    /// Checks currency and prefix formats.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_currency(&self.default_currency)
            .map_err(|_| ConfigError::InvalidValue("INVOICER_DEFAULT_CURRENCY".to_string()))?;
        validate_invoice_prefix(&self.default_invoice_prefix)
            .map_err(|_| ConfigError::InvalidValue("INVOICER_INVOICE_PREFIX".to_string()))?;
        Ok(())
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LedgerConfig::default();
        assert_eq!(config.max_conflict_retries, 1);
        assert_eq!(config.default_currency, "USD");
        assert_eq!(config.default_invoice_prefix, "INV");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = LedgerConfig {
            default_currency: "dollars".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue(key)) if key == "INVOICER_DEFAULT_CURRENCY"
        ));

        let config = LedgerConfig {
            default_invoice_prefix: "bad prefix".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
