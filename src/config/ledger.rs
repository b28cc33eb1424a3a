//! Ledger configuration loading from config.toml
//!
//! Holds the salary policy and notification settings. Every field has a default,
//! so a missing file or a partial file is valid; a malformed file is not.

use crate::core::money::Money;
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Scheduled salary settings
    pub salary: SalaryConfig,
    /// Notification settings
    pub notifications: NotificationConfig,
}

/// Settings for the scheduled salary distribution
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SalaryConfig {
    /// Whether the scheduler runs at all
    pub enabled: bool,
    /// Salary per period, as a decimal string (e.g. `"5000.00"`)
    pub monthly_amount: Money,
    /// Number of daily payments the monthly amount is spread over
    pub period_days: u32,
    /// How often the scheduler checks whether today's run is due
    pub check_interval_secs: u64,
}

impl Default for SalaryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            monthly_amount: Money::from_cents(500_000),
            period_days: 30,
            check_interval_secs: 3600,
        }
    }
}

/// Settings for transaction notifications
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Deliver notifications to Discord; when false they are only logged
    pub enabled: bool,
    /// Currency label used in notification text
    pub currency: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            currency: "ILS".to_string(),
        }
    }
}

/// Loads the ledger configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - A field has the wrong type or an amount is malformed
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<LedgerConfig> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    parse_config(&contents)
}

/// Parses the ledger configuration from TOML text and validates it.
pub fn parse_config(contents: &str) -> Result<LedgerConfig> {
    let config: LedgerConfig = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;

    if config.salary.period_days == 0 {
        return Err(Error::Config {
            message: "salary.period_days must be at least 1".to_string(),
        });
    }
    if !config.salary.monthly_amount.is_positive() {
        return Err(Error::Config {
            message: "salary.monthly_amount must be greater than zero".to_string(),
        });
    }
    if config.salary.check_interval_secs == 0 {
        return Err(Error::Config {
            message: "salary.check_interval_secs must be at least 1".to_string(),
        });
    }

    Ok(config)
}

/// Loads ./config.toml, falling back to defaults when the file does not exist.
pub fn load_default_config() -> Result<LedgerConfig> {
    let path = Path::new("config.toml");
    if !path.exists() {
        warn!("config.toml not found, using default ledger configuration");
        return Ok(LedgerConfig::default());
    }
    let config = load_config(path)?;
    info!("Loaded ledger configuration from {}", path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::errors::ErrorKind;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
            [salary]
            enabled = false
            monthly_amount = "3000.00"
            period_days = 31
            check_interval_secs = 60

            [notifications]
            enabled = false
            currency = "EUR"
        "#;

        let config = parse_config(toml_str).unwrap();
        assert!(!config.salary.enabled);
        assert_eq!(config.salary.monthly_amount, Money::from_cents(300_000));
        assert_eq!(config.salary.period_days, 31);
        assert_eq!(config.salary.check_interval_secs, 60);
        assert!(!config.notifications.enabled);
        assert_eq!(config.notifications.currency, "EUR");
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config = parse_config("[notifications]\ncurrency = \"USD\"\n").unwrap();
        assert!(config.salary.enabled);
        assert_eq!(config.salary.monthly_amount.to_string(), "5000.00");
        assert_eq!(config.salary.period_days, 30);
        assert!(config.notifications.enabled);
        assert_eq!(config.notifications.currency, "USD");
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        let zero_days = parse_config("[salary]\nperiod_days = 0\n").unwrap_err();
        assert!(matches!(zero_days, Error::Config { .. }));
        assert_eq!(zero_days.kind(), ErrorKind::Internal);

        assert!(parse_config("[salary]\nmonthly_amount = \"0\"\n").is_err());
        assert!(parse_config("[salary]\nmonthly_amount = \"1.999\"\n").is_err());
        assert!(parse_config("salary = 5").is_err());
    }
}
