//! Core business logic, independent of the Discord layer.

/// Authorization gate
pub mod auth;
/// Account ledger: the only writer of balances
pub mod ledger;
/// Fixed-point money type
pub mod money;
/// Notification dispatcher contract
pub mod notify;
/// Read-only reporting
pub mod report;
/// Salary distribution and scheduler
pub mod salary;
/// Transaction engine
pub mod transaction;
/// User management
pub mod user;
