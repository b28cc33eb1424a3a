/// Database configuration and connection management
pub mod database;

/// Ledger settings loading from config.toml
pub mod ledger;

pub use ledger::{LedgerConfig, NotificationConfig, SalaryConfig};
