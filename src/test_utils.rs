//! Shared test utilities for `LedgerBuddy`.
//!
//! This module provides common helper functions for setting up test databases,
//! creating users with sensible defaults and building engines with test notifiers.

#![allow(clippy::expect_used)]

use crate::{
    core::{
        auth::{self, Actor, AdminGrant, Grant},
        ledger,
        money::Money,
        notify::{Notification, Notifier},
        transaction::TransactionEngine,
        user::{self, NewUser},
    },
    entities::{self, Role, Transaction},
    errors::{Error, Result},
};
use sea_orm::{ConnectOptions, DatabaseConnection, EntityTrait, PaginatorTrait};
use std::sync::atomic::{AtomicU64, Ordering};
use tempfile::TempDir;
use tokio::sync::mpsc;

static NEXT_TEST_USER: AtomicU64 = AtomicU64::new(1);

/// Creates an in-memory `SQLite` database with all tables initialized.
///
/// The pool holds a single connection: every `sqlite::memory:` connection is its own
/// database.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = sea_orm::Database::connect(options).await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a file-backed `SQLite` database in a fresh temporary directory, pooled over
/// `connections` connections so that storage transactions really run side by side.
///
/// The database lives as long as the returned [`TempDir`].
pub async fn setup_file_test_db(connections: u32) -> Result<(TempDir, DatabaseConnection)> {
    let dir = tempfile::tempdir()?;
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("ledger.sqlite").display());
    let mut options = ConnectOptions::new(url);
    options
        .max_connections(connections)
        .min_connections(connections)
        .sqlx_logging(false);
    let db = sea_orm::Database::connect(options).await?;
    crate::config::database::create_tables(&db).await?;
    Ok((dir, db))
}

/// Installs a test-writer tracing subscriber; safe to call from every test.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("ledger_buddy=debug")
        .with_test_writer()
        .try_init();
}

/// The in-process administrator.
pub const fn admin_grant() -> AdminGrant {
    AdminGrant::system()
}

/// A grant for a regular user acting on its own account.
pub fn user_grant(user_id: i64) -> Grant {
    auth::authorize_self(Some(&Actor::new(user_id, Role::User)))
        .expect("an actor may always act on its own account")
}

/// Creates a regular user with a unique email and username.
///
/// # Defaults
/// * `email`: `"<name>.<n>@example.com"`
/// * `username`: `"<name>_<n>"`
/// * `role`: `user`, no age, no Discord account
pub async fn create_test_user(
    db: &DatabaseConnection,
    name: &str,
) -> Result<entities::user::Model> {
    let n = NEXT_TEST_USER.fetch_add(1, Ordering::Relaxed);
    let slug = name.to_lowercase().replace(' ', "_");
    let new_user = NewUser::new(
        name,
        format!("{slug}.{n}@example.com"),
        format!("{slug}_{n}"),
    );
    user::create_user(db, &admin_grant(), new_user)
        .await
        .map(|profile| profile.user)
}

/// Sets up a database with one user.
pub async fn setup_with_user(name: &str) -> Result<(DatabaseConnection, entities::user::Model)> {
    init_test_tracing();
    let db = setup_test_db().await?;
    let user = create_test_user(&db, name).await?;
    Ok((db, user))
}

/// Credits a balance directly through the ledger, without a transaction row.
pub async fn seed_balance(db: &DatabaseConnection, user_id: i64, amount: Money) -> Result<()> {
    ledger::credit(db, user_id, amount).await
}

/// Number of transaction rows.
pub async fn count_transactions(db: &DatabaseConnection) -> Result<u64> {
    Transaction::find().count(db).await.map_err(Into::into)
}

/// Notifier that forwards every notification into a channel.
#[derive(Debug, Clone)]
pub struct RecordingNotifier {
    sender: mpsc::UnboundedSender<Notification>,
}

impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        self.sender
            .send(notification.clone())
            .map_err(|e| Error::Notification {
                message: e.to_string(),
            })
    }
}

/// Notifier that always fails.
#[derive(Debug, Clone, Copy)]
pub struct FailingNotifier;

impl Notifier for FailingNotifier {
    async fn notify(&self, _notification: &Notification) -> Result<()> {
        Err(Error::Notification {
            message: "delivery channel unavailable".to_string(),
        })
    }
}

/// An engine whose notifications can be read from the returned receiver.
pub fn recording_engine(
    db: DatabaseConnection,
) -> (
    TransactionEngine<RecordingNotifier>,
    mpsc::UnboundedReceiver<Notification>,
) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (
        TransactionEngine::new(db, RecordingNotifier { sender }),
        receiver,
    )
}

/// Runs `n` concurrent debits of `amount` against one account.
pub async fn run_concurrent_debits<N: Notifier>(
    engine: &TransactionEngine<N>,
    user_id: i64,
    n: i64,
    amount: Money,
) -> Vec<Result<entities::transaction::Model>> {
    let handles: Vec<_> = (0..n)
        .map(|i| {
            let engine = engine.clone();
            tokio::spawn(async move {
                engine
                    .record_expense(&user_grant(user_id), amount, None, &format!("Debit {i}"), None)
                    .await
            })
        })
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        results.push(handle.await.expect("debit task panicked"));
    }
    results
}
