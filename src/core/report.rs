//! Report generation business logic.
//!
//! Read-only aggregations over a user's transaction history. Every function takes a
//! [`Grant`] and only ever looks at transactions owned by the granted user. Results are
//! returned as structured data; the `format_*` helpers render them for the bot layer.

use crate::{
    core::{auth::Grant, money::Money},
    entities::{Category, EntryType, Transaction, transaction},
    errors::{Error, Result},
};
use chrono::{Datelike, NaiveDate, NaiveTime};
use sea_orm::{QueryOrder, prelude::*};
use std::collections::BTreeMap;
use std::fmt::Write;
use tracing::debug;

/// Number of categories listed in [`SpendingAnalytics::top_categories`].
pub const TOP_CATEGORIES: usize = 5;

/// Debit total of one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTotal {
    /// The category
    pub category: Category,
    /// Sum of debit amounts
    pub total: Money,
    /// Number of debits
    pub count: u64,
}

/// Total of one entry type on one day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyTotal {
    /// The day (UTC)
    pub date: NaiveDate,
    /// Credit or debit
    pub entry_type: EntryType,
    /// Sum of amounts
    pub total: Money,
    /// Number of transactions
    pub count: u64,
}

/// Debit total of one calendar month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlyTotal {
    /// Year
    pub year: i32,
    /// Month, 1-12
    pub month: u32,
    /// Sum of debit amounts
    pub total: Money,
}

/// Spending over time and by category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpendingAnalytics {
    /// Monthly debit totals, oldest first
    pub monthly: Vec<MonthlyTotal>,
    /// The largest debit categories, largest first
    pub top_categories: Vec<CategoryTotal>,
}

/// Every valid category.
#[must_use]
pub const fn categories() -> &'static [Category] {
    &Category::ALL
}

fn add(total: Money, amount: Money) -> Result<Money> {
    total
        .checked_add(amount)
        .ok_or_else(|| Error::validation("report total out of range"))
}

async fn debits_for(db: &DatabaseConnection, grant: &Grant) -> Result<Vec<transaction::Model>> {
    Transaction::find()
        .filter(transaction::Column::UserId.eq(grant.user_id()))
        .filter(transaction::Column::EntryType.eq(EntryType::Debit))
        .order_by_asc(transaction::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

fn totals_by_category(debits: &[transaction::Model]) -> Result<Vec<CategoryTotal>> {
    let mut grouped: BTreeMap<Category, (Money, u64)> = BTreeMap::new();
    for debit in debits {
        let entry = grouped.entry(debit.category).or_insert((Money::ZERO, 0));
        entry.0 = add(entry.0, debit.amount())?;
        entry.1 += 1;
    }
    let mut totals: Vec<CategoryTotal> = grouped
        .into_iter()
        .map(|(category, (total, count))| CategoryTotal {
            category,
            total,
            count,
        })
        .collect();
    // Largest first; ties keep category order.
    totals.sort_by(|a, b| b.total.cmp(&a.total));
    Ok(totals)
}

/// Debit totals and counts grouped by category, largest total first.
pub async fn category_summary(db: &DatabaseConnection, grant: &Grant) -> Result<Vec<CategoryTotal>> {
    let debits = debits_for(db, grant).await?;
    debug!(
        "Category summary for user {} over {} debits",
        grant.user_id(),
        debits.len()
    );
    totals_by_category(&debits)
}

/// Per-day totals grouped by entry type between `start` and `end`, both inclusive.
///
/// # Errors
/// [`Error::Validation`] if `start` is after `end`.
pub async fn date_summary(
    db: &DatabaseConnection,
    grant: &Grant,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<DailyTotal>> {
    if start > end {
        return Err(Error::validation(format!(
            "start date {start} is after end date {end}"
        )));
    }
    let from = start.and_time(NaiveTime::MIN).and_utc();
    let until = end
        .succ_opt()
        .ok_or_else(|| Error::validation(format!("end date {end} is out of range")))?
        .and_time(NaiveTime::MIN)
        .and_utc();

    let transactions = Transaction::find()
        .filter(transaction::Column::UserId.eq(grant.user_id()))
        .filter(transaction::Column::CreatedAt.gte(from))
        .filter(transaction::Column::CreatedAt.lt(until))
        .all(db)
        .await?;

    let mut grouped: BTreeMap<(NaiveDate, &'static str), (EntryType, Money, u64)> =
        BTreeMap::new();
    for txn in &transactions {
        let key = (txn.created_at.date_naive(), txn.entry_type.as_str());
        let entry = grouped
            .entry(key)
            .or_insert((txn.entry_type, Money::ZERO, 0));
        entry.1 = add(entry.1, txn.amount())?;
        entry.2 += 1;
    }

    Ok(grouped
        .into_iter()
        .map(|((date, _), (entry_type, total, count))| DailyTotal {
            date,
            entry_type,
            total,
            count,
        })
        .collect())
}

/// Monthly debit totals and the top debit categories.
pub async fn spending_analytics(
    db: &DatabaseConnection,
    grant: &Grant,
) -> Result<SpendingAnalytics> {
    let debits = debits_for(db, grant).await?;

    let mut by_month: BTreeMap<(i32, u32), Money> = BTreeMap::new();
    for debit in &debits {
        let key = (debit.created_at.year(), debit.created_at.month());
        let total = by_month.entry(key).or_insert(Money::ZERO);
        *total = add(*total, debit.amount())?;
    }

    let mut top_categories = totals_by_category(&debits)?;
    top_categories.truncate(TOP_CATEGORIES);

    Ok(SpendingAnalytics {
        monthly: by_month
            .into_iter()
            .map(|((year, month), total)| MonthlyTotal { year, month, total })
            .collect(),
        top_categories,
    })
}

/// Formats a transaction amount with a sign by entry type.
///
/// Returns a string like `"+50.00 ILS"` or `"-25.50 ILS"`.
#[must_use]
pub fn format_transaction_amount(entry_type: EntryType, amount: Money, currency: &str) -> String {
    match entry_type {
        EntryType::Credit => format!("+{amount} {currency}"),
        EntryType::Debit => format!("-{amount} {currency}"),
    }
}

/// One history line for a transaction.
#[must_use]
pub fn format_transaction_summary(transaction: &transaction::Model, currency: &str) -> String {
    let amount = format_transaction_amount(transaction.entry_type, transaction.amount(), currency);
    format!(
        "`#{}` {} | {} | {} | {}",
        transaction.id,
        transaction.created_at.format("%Y-%m-%d"),
        amount,
        transaction.category,
        transaction.title
    )
}

/// Renders a category summary.
#[must_use]
pub fn format_category_summary(totals: &[CategoryTotal], currency: &str) -> String {
    if totals.is_empty() {
        return "No spending recorded yet.".to_string();
    }
    let mut text = String::from("**Spending by category**\n");
    for total in totals {
        // write! is infallible when writing to String
        let _ = writeln!(
            text,
            "• {}: {} {currency} ({} transactions)",
            total.category, total.total, total.count
        );
    }
    text
}

/// Renders a date summary.
#[must_use]
pub fn format_date_summary(
    totals: &[DailyTotal],
    start: NaiveDate,
    end: NaiveDate,
    currency: &str,
) -> String {
    let mut text = format!("**Transactions from {start} to {end}**\n");
    if totals.is_empty() {
        text.push_str("No transactions in this period.");
        return text;
    }
    for total in totals {
        let _ = writeln!(
            text,
            "• {} {}: {} ({} transactions)",
            total.date,
            total.entry_type.as_str(),
            format_transaction_amount(total.entry_type, total.total, currency),
            total.count
        );
    }
    text
}

/// Renders spending analytics.
#[must_use]
pub fn format_spending_analytics(analytics: &SpendingAnalytics, currency: &str) -> String {
    if analytics.monthly.is_empty() {
        return "No spending recorded yet.".to_string();
    }
    let mut text = String::from("**Monthly spending**\n");
    for month in &analytics.monthly {
        let _ = writeln!(
            text,
            "• {}-{:02}: {} {currency}",
            month.year, month.month, month.total
        );
    }
    text.push_str("\n**Top categories**\n");
    for (rank, total) in analytics.top_categories.iter().enumerate() {
        let _ = writeln!(
            text,
            "{}. {}: {} {currency}",
            rank + 1,
            total.category,
            total.total
        );
    }
    text
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::transaction::NewTransaction;
    use crate::errors::ErrorKind;
    use crate::test_utils::*;
    use chrono::{Duration, Utc};

    async fn spend(
        engine: &crate::core::transaction::TransactionEngine<RecordingNotifier>,
        user_id: i64,
        cents: i64,
        category: Category,
    ) -> Result<()> {
        let entry = NewTransaction::debit(Money::from_cents(cents), category, "Spend");
        engine.record_transaction(&user_grant(user_id), entry).await?;
        Ok(())
    }

    #[test]
    fn test_categories_lists_all() {
        assert_eq!(categories().len(), 13);
        assert!(categories().contains(&Category::Healthcare));
    }

    #[test]
    fn test_format_transaction_amount() {
        assert_eq!(
            format_transaction_amount(EntryType::Credit, Money::from_cents(5_000), "ILS"),
            "+50.00 ILS"
        );
        assert_eq!(
            format_transaction_amount(EntryType::Debit, Money::from_cents(2_550), "ILS"),
            "-25.50 ILS"
        );
    }

    #[tokio::test]
    async fn test_category_summary_counts_debits_only() -> Result<()> {
        let (db, user) = setup_with_user("Alice").await?;
        seed_balance(&db, user.id, Money::from_cents(100_000)).await?;
        let (engine, _rx) = recording_engine(db.clone());

        spend(&engine, user.id, 1_000, Category::Food).await?;
        spend(&engine, user.id, 500, Category::Food).await?;
        spend(&engine, user.id, 10_000, Category::Rent).await?;
        engine
            .record_income(&user_grant(user.id), Money::from_cents(99_900), None, "Pay", None)
            .await?;

        let summary = category_summary(&db, &user_grant(user.id)).await?;
        assert_eq!(
            summary,
            vec![
                CategoryTotal {
                    category: Category::Rent,
                    total: Money::from_cents(10_000),
                    count: 1,
                },
                CategoryTotal {
                    category: Category::Food,
                    total: Money::from_cents(1_500),
                    count: 2,
                },
            ]
        );

        let text = format_category_summary(&summary, "ILS");
        assert!(text.contains("food: 15.00 ILS (2 transactions)"));
        Ok(())
    }

    #[tokio::test]
    async fn test_date_summary_range() -> Result<()> {
        let (db, user) = setup_with_user("Alice").await?;
        seed_balance(&db, user.id, Money::from_cents(10_000)).await?;
        let (engine, _rx) = recording_engine(db.clone());
        spend(&engine, user.id, 700, Category::Transport).await?;
        spend(&engine, user.id, 300, Category::Food).await?;

        let grant = user_grant(user.id);
        let today = Utc::now().date_naive();

        let totals = date_summary(&db, &grant, today, today).await?;
        assert_eq!(
            totals,
            vec![DailyTotal {
                date: today,
                entry_type: EntryType::Debit,
                total: Money::from_cents(1_000),
                count: 2,
            }]
        );

        let last_week = today - Duration::days(7);
        let yesterday = today - Duration::days(1);
        assert!(date_summary(&db, &grant, last_week, yesterday).await?.is_empty());

        let err = date_summary(&db, &grant, today, yesterday).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        Ok(())
    }

    #[tokio::test]
    async fn test_reports_are_scoped_to_grant() -> Result<()> {
        let db = setup_test_db().await?;
        let alice = create_test_user(&db, "Alice").await?;
        let bob = create_test_user(&db, "Bob").await?;
        seed_balance(&db, alice.id, Money::from_cents(5_000)).await?;
        let (engine, _rx) = recording_engine(db.clone());
        spend(&engine, alice.id, 2_000, Category::Shopping).await?;

        assert!(category_summary(&db, &user_grant(bob.id)).await?.is_empty());
        let analytics = spending_analytics(&db, &user_grant(bob.id)).await?;
        assert!(analytics.monthly.is_empty());
        assert_eq!(
            format_spending_analytics(&analytics, "ILS"),
            "No spending recorded yet."
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_spending_analytics_top_five() -> Result<()> {
        let (db, user) = setup_with_user("Alice").await?;
        seed_balance(&db, user.id, Money::from_cents(100_000)).await?;
        let (engine, _rx) = recording_engine(db.clone());

        let spending = [
            (Category::Rent, 40_000),
            (Category::Food, 9_000),
            (Category::Transport, 3_000),
            (Category::Entertainment, 2_000),
            (Category::Utilities, 1_500),
            (Category::Other, 100),
        ];
        for (category, cents) in spending {
            spend(&engine, user.id, cents, category).await?;
        }

        let analytics = spending_analytics(&db, &user_grant(user.id)).await?;
        let now = Utc::now();
        assert_eq!(
            analytics.monthly,
            vec![MonthlyTotal {
                year: now.year(),
                month: now.month(),
                total: Money::from_cents(55_600),
            }]
        );
        assert_eq!(analytics.top_categories.len(), TOP_CATEGORIES);
        assert_eq!(analytics.top_categories[0].category, Category::Rent);
        assert!(
            analytics
                .top_categories
                .iter()
                .all(|t| t.category != Category::Other)
        );

        let text = format_spending_analytics(&analytics, "ILS");
        assert!(text.contains("1. rent: 400.00 ILS"));
        Ok(())
    }
}
