//! Notification dispatcher contract.
//!
//! The ledger informs a [`Notifier`] about committed transactions. Delivery is
//! best-effort: [`dispatch`] runs after the storage commit, logs any failure and never
//! reports it back to the caller of the mutation.

use crate::{
    core::money::Money,
    entities::{Category, transaction},
    errors::Result,
};
use chrono::{DateTime, Utc};
use std::fmt::Write;
use std::future::Future;
use tracing::{info, warn};

/// What happened to the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Credit recorded directly on the account
    Income,
    /// Debit recorded directly on the account
    Expense,
    /// Debit leg of a transfer
    TransferSent,
    /// Credit leg of a transfer
    TransferReceived,
    /// Salary credit
    SalaryCredited,
}

impl EventKind {
    /// Heading used in notification text.
    #[must_use]
    pub const fn heading(self) -> &'static str {
        match self {
            Self::Income => "Income Received",
            Self::Expense => "Expense Recorded",
            Self::TransferSent => "Transfer Sent",
            Self::TransferReceived => "Transfer Received",
            Self::SalaryCredited => "Salary Credited",
        }
    }
}

/// A committed transaction, as told to the owning user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Recipient of the notification (owner of the transaction)
    pub user_id: i64,
    /// Event kind
    pub kind: EventKind,
    /// The committed transaction
    pub transaction_id: i64,
    /// Transaction amount
    pub amount: Money,
    /// Transaction title
    pub title: String,
    /// Transaction description
    pub description: Option<String>,
    /// Transaction category
    pub category: Category,
    /// Name of the transfer counterparty
    pub counterparty: Option<String>,
    /// Balance of the recipient right after the commit
    pub balance_after: Money,
    /// Commit time
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Builds the notification for a committed transaction.
    #[must_use]
    pub fn for_transaction(
        kind: EventKind,
        txn: &transaction::Model,
        counterparty: Option<String>,
        balance_after: Money,
    ) -> Self {
        Self {
            user_id: txn.user_id,
            kind,
            transaction_id: txn.id,
            amount: txn.amount(),
            title: txn.title.clone(),
            description: txn.description.clone(),
            category: txn.category,
            counterparty,
            balance_after,
            created_at: txn.created_at,
        }
    }
}

/// Delivery channel for notifications.
pub trait Notifier: Send + Sync + 'static {
    /// Delivers one notification.
    fn notify(&self, notification: &Notification) -> impl Future<Output = Result<()>> + Send;
}

/// Notifier that only writes the formatted message to the log.
#[derive(Debug, Clone)]
pub struct LogNotifier {
    currency: String,
}

impl LogNotifier {
    /// Creates a log notifier that formats amounts with `currency`.
    #[must_use]
    pub fn new(currency: impl Into<String>) -> Self {
        Self {
            currency: currency.into(),
        }
    }
}

impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        info!(
            "Notification for user {}:\n{}",
            notification.user_id,
            format_notification(notification, &self.currency)
        );
        Ok(())
    }
}

/// Delivers every notification, logging and swallowing failures.
///
/// Returns the number of notifications that were delivered.
pub async fn dispatch<N>(notifier: &N, notifications: &[Notification]) -> usize
where
    N: Notifier,
{
    let mut delivered = 0;
    for notification in notifications {
        match notifier.notify(notification).await {
            Ok(()) => delivered += 1,
            Err(e) => warn!(
                "Notification {:?} for transaction {} to user {} failed but the transaction is committed: {}",
                notification.kind, notification.transaction_id, notification.user_id, e
            ),
        }
    }
    delivered
}

/// Renders the message text for a notification.
#[must_use]
pub fn format_notification(notification: &Notification, currency: &str) -> String {
    let mut text = format!("**{}**\n\n", notification.kind.heading());
    let description = notification
        .description
        .as_deref()
        .unwrap_or("No description");

    // write! is infallible when writing to String
    let _ = writeln!(text, "Amount: **{} {currency}**", notification.amount);
    match (notification.kind, notification.counterparty.as_deref()) {
        (EventKind::TransferSent, Some(name)) => {
            let _ = writeln!(text, "To: {name}");
        }
        (EventKind::TransferReceived, Some(name)) => {
            let _ = writeln!(text, "From: {name}");
        }
        _ => {
            let _ = writeln!(text, "Title: {}", notification.title);
            let _ = writeln!(text, "Category: {}", notification.category);
        }
    }
    let _ = writeln!(text, "Description: {description}");
    let _ = writeln!(
        text,
        "Date: {}",
        notification.created_at.format("%Y-%m-%d %H:%M")
    );

    let balance_label = match notification.kind {
        EventKind::Expense => "Remaining Balance",
        _ => "New Balance",
    };
    let _ = write!(
        text,
        "\n{balance_label}: **{} {currency}**",
        notification.balance_after
    );
    text
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::errors::Error;
    use chrono::TimeZone;

    fn sample(kind: EventKind, counterparty: Option<&str>) -> Notification {
        Notification {
            user_id: 1,
            kind,
            transaction_id: 10,
            amount: Money::from_cents(3_000),
            title: "Transfer to Bob".to_string(),
            description: None,
            category: Category::Transfer,
            counterparty: counterparty.map(str::to_string),
            balance_after: Money::from_cents(7_000),
            created_at: Utc.with_ymd_and_hms(2025, 5, 2, 10, 30, 0).unwrap(),
        }
    }

    #[test]
    fn test_format_transfer_sent() {
        let text = format_notification(&sample(EventKind::TransferSent, Some("Bob")), "ILS");
        assert!(text.starts_with("**Transfer Sent**"));
        assert!(text.contains("Amount: **30.00 ILS**"));
        assert!(text.contains("To: Bob"));
        assert!(text.contains("Description: No description"));
        assert!(text.contains("Date: 2025-05-02 10:30"));
        assert!(text.ends_with("New Balance: **70.00 ILS**"));
    }

    #[test]
    fn test_format_expense_uses_remaining_balance() {
        let mut expense = sample(EventKind::Expense, None);
        expense.title = "Groceries".to_string();
        expense.category = Category::Food;
        expense.description = Some("weekly".to_string());
        let text = format_notification(&expense, "EUR");
        assert!(text.contains("Title: Groceries"));
        assert!(text.contains("Category: food"));
        assert!(text.contains("Description: weekly"));
        assert!(text.contains("Remaining Balance: **70.00 EUR**"));
    }

    struct FlakyNotifier;

    impl Notifier for FlakyNotifier {
        async fn notify(&self, notification: &Notification) -> Result<()> {
            if notification.user_id == 1 {
                Err(Error::Notification {
                    message: "chat unreachable".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn test_dispatch_swallows_failures() {
        let mut second = sample(EventKind::TransferReceived, Some("Alice"));
        second.user_id = 2;
        let delivered = dispatch(
            &FlakyNotifier,
            &[sample(EventKind::TransferSent, Some("Bob")), second],
        )
        .await;
        assert_eq!(delivered, 1);
    }

    #[tokio::test]
    async fn test_log_notifier_never_fails() {
        let notifier = LogNotifier::new("ILS");
        assert_eq!(
            dispatch(&notifier, &[sample(EventKind::SalaryCredited, None)]).await,
            1
        );
    }
}
