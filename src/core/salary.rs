//! Salary distribution business logic
//!
//! Credits every user with a daily salary derived from the configured monthly amount.
//! Each credit is an independent ledger transaction: a failure for one user is
//! collected in the result and logged, and never undoes or blocks the others. The
//! date of the last run is kept in the `system_state` table so that a restart on the
//! same day does not pay twice.

use crate::{
    config::SalaryConfig,
    core::{
        auth::AdminGrant,
        money::Money,
        notify::Notifier,
        transaction::{NewTransaction, TransactionEngine},
        user,
    },
    entities::{Category, SystemState, system_state, transaction},
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{Set, prelude::*};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

const LAST_SALARY_RUN_KEY: &str = "last_salary_run";

/// Title of scheduled salary credits.
pub const DAILY_SALARY_TITLE: &str = "Daily Salary";
/// Description of scheduled salary credits.
pub const DAILY_SALARY_DESCRIPTION: &str = "Automatic daily salary distribution";
/// Title of salary credits issued by an admin.
pub const MANUAL_SALARY_TITLE: &str = "Manual Salary";
/// Description of salary credits issued by an admin.
pub const MANUAL_SALARY_DESCRIPTION: &str = "Admin manual salary distribution";

/// Salary settings resolved from the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SalaryPolicy {
    /// Whether the scheduler pays salaries at all
    pub enabled: bool,
    /// Amount credited to each user per run
    pub daily_amount: Money,
    /// Time between scheduler checks
    pub check_interval: Duration,
}

impl SalaryPolicy {
    /// Derives the daily amount as `monthly_amount / period_days`, rounded to cents.
    ///
    /// # Errors
    /// [`Error::Config`] if the period is zero or the daily amount rounds to zero.
    pub fn from_config(config: &SalaryConfig) -> Result<Self> {
        if config.period_days == 0 {
            return Err(Error::Config {
                message: "salary.period_days must be at least 1".to_string(),
            });
        }
        let daily = config.monthly_amount.to_decimal() / Decimal::from(config.period_days);
        let daily_amount = Money::from_decimal_rounded(daily)?;
        if !daily_amount.is_positive() {
            return Err(Error::Config {
                message: format!(
                    "salary of {} over {} days rounds to zero per day",
                    config.monthly_amount, config.period_days
                ),
            });
        }
        Ok(Self {
            enabled: config.enabled,
            daily_amount,
            check_interval: Duration::from_secs(config.check_interval_secs),
        })
    }
}

/// A salary credit that failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalaryFailure {
    /// User that was not paid
    pub user_id: i64,
    /// Why the credit failed
    pub reason: String,
}

/// Outcome of one salary run.
#[derive(Debug, Clone)]
pub struct SalaryRunResult {
    /// Date of the run
    pub date: NaiveDate,
    /// Amount credited to each user
    pub amount: Money,
    /// Committed salary transactions
    pub credited: Vec<transaction::Model>,
    /// Users whose credit failed
    pub failed: Vec<SalaryFailure>,
}

/// Credits `amount` to each of `user_ids`, one independent transaction per user.
async fn credit_users<N: Notifier>(
    engine: &TransactionEngine<N>,
    admin: &AdminGrant,
    user_ids: &[i64],
    amount: Money,
) -> SalaryRunResult {
    let mut result = SalaryRunResult {
        date: Utc::now().date_naive(),
        amount,
        credited: Vec::with_capacity(user_ids.len()),
        failed: Vec::new(),
    };

    for &user_id in user_ids {
        let entry = NewTransaction::credit(amount, Category::Salary, DAILY_SALARY_TITLE)
            .with_description(Some(DAILY_SALARY_DESCRIPTION.to_string()));
        match engine
            .record_transaction(&admin.grant_for(user_id), entry)
            .await
        {
            Ok(txn) => result.credited.push(txn),
            Err(e) => {
                warn!("Salary credit for user {} failed: {}", user_id, e);
                result.failed.push(SalaryFailure {
                    user_id,
                    reason: e.to_string(),
                });
            }
        }
    }
    result
}

/// Credits `amount` to every user.
///
/// # Errors
/// Only if the user list cannot be loaded; individual credit failures are reported in
/// [`SalaryRunResult::failed`].
pub async fn distribute_salaries<N: Notifier>(
    engine: &TransactionEngine<N>,
    admin: &AdminGrant,
    amount: Money,
) -> Result<SalaryRunResult> {
    let user_ids: Vec<i64> = user::get_users(engine.database(), admin)
        .await?
        .into_iter()
        .map(|u| u.id)
        .collect();

    let result = credit_users(engine, admin, &user_ids, amount).await;
    info!(
        "Salary run on {}: {} of {} users credited {}",
        result.date,
        result.credited.len(),
        user_ids.len(),
        amount
    );
    Ok(result)
}

/// Credits a one-off salary to a single user.
pub async fn manual_salary<N: Notifier>(
    engine: &TransactionEngine<N>,
    admin: &AdminGrant,
    user_id: i64,
    amount: Money,
) -> Result<transaction::Model> {
    let entry = NewTransaction::credit(amount, Category::Salary, MANUAL_SALARY_TITLE)
        .with_description(Some(MANUAL_SALARY_DESCRIPTION.to_string()));
    engine.record_transaction(&admin.grant_for(user_id), entry).await
}

/// Retrieves the date of the last salary run from the `system_state` table.
pub async fn get_last_salary_run_date<C>(db: &C) -> Result<Option<NaiveDate>>
where
    C: ConnectionTrait,
{
    let state = SystemState::find()
        .filter(system_state::Column::Key.eq(LAST_SALARY_RUN_KEY))
        .one(db)
        .await?;

    match state {
        Some(s) => NaiveDate::parse_from_str(&s.value, "%Y-%m-%d")
            .map(Some)
            .map_err(|e| Error::Config {
                message: format!("Failed to parse last salary run date: {e}"),
            }),
        None => Ok(None),
    }
}

async fn set_last_salary_run_date<C>(db: &C, date: NaiveDate) -> Result<()>
where
    C: ConnectionTrait,
{
    let date_str = date.format("%Y-%m-%d").to_string();
    let now = Utc::now().naive_utc();

    let existing = SystemState::find()
        .filter(system_state::Column::Key.eq(LAST_SALARY_RUN_KEY))
        .one(db)
        .await?;

    if let Some(state) = existing {
        let mut active_model: system_state::ActiveModel = state.into();
        active_model.value = Set(date_str);
        active_model.updated_at = Set(now);
        active_model.update(db).await?;
    } else {
        system_state::ActiveModel {
            key: Set(LAST_SALARY_RUN_KEY.to_string()),
            value: Set(date_str),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }

    Ok(())
}

/// True if no salary run has been recorded for today.
pub async fn is_salary_run_needed<C>(db: &C) -> Result<bool>
where
    C: ConnectionTrait,
{
    let today = Utc::now().date_naive();
    Ok(get_last_salary_run_date(db)
        .await?
        .is_none_or(|last| last < today))
}

/// Runs the daily distribution unless it already ran today.
///
/// The run date is recorded before paying, so a crash mid-run skips the rest of the
/// day rather than paying anyone twice.
pub async fn run_salaries_if_needed<N: Notifier>(
    engine: &TransactionEngine<N>,
    policy: &SalaryPolicy,
) -> Result<Option<SalaryRunResult>> {
    let db = engine.database();
    if !is_salary_run_needed(db).await? {
        return Ok(None);
    }
    set_last_salary_run_date(db, Utc::now().date_naive()).await?;
    distribute_salaries(engine, &AdminGrant::system(), policy.daily_amount)
        .await
        .map(Some)
}

/// Starts the background task that pays the daily salary.
///
/// Returns `None` when salaries are disabled.
pub fn spawn_salary_scheduler<N: Notifier>(
    engine: TransactionEngine<N>,
    policy: SalaryPolicy,
) -> Option<JoinHandle<()>> {
    if !policy.enabled {
        info!("Salary scheduler disabled");
        return None;
    }
    info!(
        "Salary scheduler started: {} per day, checking every {:?}",
        policy.daily_amount, policy.check_interval
    );
    Some(tokio::spawn(async move {
        let mut interval = tokio::time::interval(policy.check_interval);
        loop {
            interval.tick().await;
            match run_salaries_if_needed(&engine, &policy).await {
                Ok(Some(result)) if !result.failed.is_empty() => warn!(
                    "Salary run on {} finished with {} failures",
                    result.date,
                    result.failed.len()
                ),
                Ok(_) => {}
                Err(e) => error!("Salary run failed: {}", e),
            }
        }
    }))
}

/// Formats a salary run result into a human-readable summary string.
#[must_use]
pub fn format_salary_run_summary(result: &SalaryRunResult, currency: &str) -> String {
    use std::fmt::Write;

    let mut summary = format!(
        "**Salary run - {}**\nCredited {} {currency} to {} users",
        result.date.format("%Y-%m-%d"),
        result.amount,
        result.credited.len()
    );
    if !result.failed.is_empty() {
        // write! is infallible when writing to String
        let _ = write!(summary, "\nFailed for {} users:", result.failed.len());
        for failure in &result.failed {
            let _ = write!(summary, "\n• user {}: {}", failure.user_id, failure.reason);
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::ledger::get_balance;
    use crate::core::notify::EventKind;
    use crate::test_utils::*;

    fn policy(daily_cents: i64) -> SalaryPolicy {
        SalaryPolicy {
            enabled: true,
            daily_amount: Money::from_cents(daily_cents),
            check_interval: Duration::from_secs(3600),
        }
    }

    #[test]
    fn test_policy_from_config() {
        let config = SalaryConfig::default();
        let policy = SalaryPolicy::from_config(&config).unwrap();
        assert_eq!(policy.daily_amount.to_string(), "166.67");
        assert_eq!(policy.check_interval, Duration::from_secs(3600));

        let tiny = SalaryConfig {
            monthly_amount: Money::from_cents(1),
            period_days: 30,
            ..SalaryConfig::default()
        };
        assert!(matches!(
            SalaryPolicy::from_config(&tiny),
            Err(Error::Config { .. })
        ));
    }

    #[tokio::test]
    async fn test_distribute_salaries_scenario() -> Result<()> {
        let db = setup_test_db().await?;
        let first = create_test_user(&db, "First").await?;
        let second = create_test_user(&db, "Second").await?;
        let third = create_test_user(&db, "Third").await?;
        seed_balance(&db, second.id, Money::from_cents(5_000)).await?;
        let (engine, mut rx) = recording_engine(db.clone());

        let daily = SalaryPolicy::from_config(&SalaryConfig::default())?.daily_amount;
        let result = distribute_salaries(&engine, &admin_grant(), daily).await?;

        assert_eq!(result.credited.len(), 3);
        assert!(result.failed.is_empty());
        assert_eq!(get_balance(&db, first.id).await?.to_string(), "166.67");
        assert_eq!(get_balance(&db, second.id).await?.to_string(), "216.67");
        assert_eq!(get_balance(&db, third.id).await?.to_string(), "166.67");

        for txn in &result.credited {
            assert_eq!(txn.category, Category::Salary);
            assert_eq!(txn.title, DAILY_SALARY_TITLE);
            assert_eq!(txn.description.as_deref(), Some(DAILY_SALARY_DESCRIPTION));
        }
        assert_eq!(count_transactions(&db).await?, 3);

        let notification = rx.recv().await.unwrap();
        assert_eq!(notification.kind, EventKind::SalaryCredited);
        Ok(())
    }

    #[tokio::test]
    async fn test_one_failed_credit_does_not_stop_the_batch() -> Result<()> {
        let db = setup_test_db().await?;
        let first = create_test_user(&db, "First").await?;
        let second = create_test_user(&db, "Second").await?;
        let (engine, _rx) = recording_engine(db.clone());

        let result = credit_users(
            &engine,
            &admin_grant(),
            &[first.id, 999, second.id],
            Money::from_cents(1_000),
        )
        .await;

        assert_eq!(result.credited.len(), 2);
        assert_eq!(result.failed.len(), 1);
        assert_eq!(result.failed[0].user_id, 999);
        assert_eq!(get_balance(&db, second.id).await?, Money::from_cents(1_000));

        let summary = format_salary_run_summary(&result, "ILS");
        assert!(summary.contains("Credited 10.00 ILS to 2 users"));
        assert!(summary.contains("user 999"));
        Ok(())
    }

    #[tokio::test]
    async fn test_manual_salary() -> Result<()> {
        let (db, user) = setup_with_user("Alice").await?;
        let (engine, _rx) = recording_engine(db.clone());

        let txn = manual_salary(&engine, &admin_grant(), user.id, Money::from_cents(25_000)).await?;
        assert_eq!(txn.title, MANUAL_SALARY_TITLE);
        assert_eq!(txn.description.as_deref(), Some(MANUAL_SALARY_DESCRIPTION));
        assert_eq!(get_balance(&db, user.id).await?, Money::from_cents(25_000));

        let err = manual_salary(&engine, &admin_grant(), user.id, Money::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_last_salary_run_date_roundtrip() -> Result<()> {
        let db = setup_test_db().await?;
        assert!(get_last_salary_run_date(&db).await?.is_none());
        assert!(is_salary_run_needed(&db).await?);

        let first = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        set_last_salary_run_date(&db, first).await?;
        assert_eq!(get_last_salary_run_date(&db).await?, Some(first));
        assert!(is_salary_run_needed(&db).await?);

        set_last_salary_run_date(&db, Utc::now().date_naive()).await?;
        assert!(!is_salary_run_needed(&db).await?);

        let count = SystemState::find()
            .filter(system_state::Column::Key.eq(LAST_SALARY_RUN_KEY))
            .count(&db)
            .await?;
        assert_eq!(count, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_run_salaries_once_per_day() -> Result<()> {
        let (db, user) = setup_with_user("Alice").await?;
        let (engine, _rx) = recording_engine(db.clone());

        let first = run_salaries_if_needed(&engine, &policy(16_667)).await?;
        assert_eq!(first.unwrap().credited.len(), 1);
        let second = run_salaries_if_needed(&engine, &policy(16_667)).await?;
        assert!(second.is_none());

        assert_eq!(get_balance(&db, user.id).await?, Money::from_cents(16_667));
        Ok(())
    }

    #[tokio::test]
    async fn test_disabled_scheduler_does_not_start() -> Result<()> {
        let db = setup_test_db().await?;
        let (engine, _rx) = recording_engine(db);
        let disabled = SalaryPolicy {
            enabled: false,
            ..policy(100)
        };
        assert!(spawn_salary_scheduler(engine, disabled).is_none());
        Ok(())
    }
}
