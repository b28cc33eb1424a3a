//! Transaction engine - Creates ledger entries together with their balance change.
//!
//! Every mutation runs inside one storage transaction: the ledger credit/debit and the
//! insert of the matching transaction row either both commit or both roll back. A
//! transfer applies both legs inside the same storage transaction, issuing the two
//! balance updates in ascending user-id order so that opposing transfers between the
//! same pair of accounts lock in the same order.
//!
//! Entry points take a [`Grant`] produced by the authorization gate; the engine itself
//! never decides who may act. Notifications are dispatched on a spawned task after the
//! commit and cannot fail or roll back the mutation.
//!
//! The ledger is append-only: amounts of committed transactions cannot be edited and
//! transactions cannot be deleted. Only the description may be corrected.

use crate::{
    core::{
        auth::{self, Actor, AdminGrant, Grant},
        ledger,
        money::Money,
        notify::{self, EventKind, Notification, Notifier},
    },
    entities::{Category, EntryType, User, transaction, user},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{PaginatorTrait, QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*};
use std::sync::Arc;
use tracing::{debug, info};

/// Maximum title length in characters.
pub const MAX_TITLE_LEN: usize = 100;
/// Maximum description length in characters.
pub const MAX_DESCRIPTION_LEN: usize = 200;

/// A transaction to record against the granted account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    /// Amount, must be strictly positive
    pub amount: Money,
    /// Credit or debit
    pub entry_type: EntryType,
    /// Category tag
    pub category: Category,
    /// Title, 1-100 characters after trimming
    pub title: String,
    /// Optional description, up to 200 characters
    pub description: Option<String>,
    /// Optional counterparty
    pub related_user_id: Option<i64>,
}

impl NewTransaction {
    /// A credit of `amount`.
    pub fn credit(amount: Money, category: Category, title: impl Into<String>) -> Self {
        Self {
            amount,
            entry_type: EntryType::Credit,
            category,
            title: title.into(),
            description: None,
            related_user_id: None,
        }
    }

    /// A debit of `amount`.
    pub fn debit(amount: Money, category: Category, title: impl Into<String>) -> Self {
        Self {
            entry_type: EntryType::Debit,
            ..Self::credit(amount, category, title)
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    /// Sets the counterparty.
    #[must_use]
    pub const fn with_related_user(mut self, related_user_id: i64) -> Self {
        self.related_user_id = Some(related_user_id);
        self
    }

    /// Checks amount, title and description, normalizing the text fields.
    fn validated(mut self) -> Result<Self> {
        if !self.amount.is_positive() {
            return Err(Error::validation(format!(
                "amount must be greater than zero, got {}",
                self.amount
            )));
        }
        self.title = validate_title(&self.title)?;
        self.description = normalize_description(self.description)?;
        Ok(self)
    }
}

fn validate_title(title: &str) -> Result<String> {
    let title = title.trim();
    let len = title.chars().count();
    if len == 0 || len > MAX_TITLE_LEN {
        return Err(Error::validation(format!(
            "title must be 1-{MAX_TITLE_LEN} characters, got {len}"
        )));
    }
    Ok(title.to_string())
}

fn normalize_description(description: Option<String>) -> Result<Option<String>> {
    let Some(description) = description else {
        return Ok(None);
    };
    let description = description.trim();
    if description.is_empty() {
        return Ok(None);
    }
    let len = description.chars().count();
    if len > MAX_DESCRIPTION_LEN {
        return Err(Error::validation(format!(
            "description must be at most {MAX_DESCRIPTION_LEN} characters, got {len}"
        )));
    }
    Ok(Some(description.to_string()))
}

fn transfer_title(prefix: &str, name: &str) -> String {
    format!("{prefix} {name}").chars().take(MAX_TITLE_LEN).collect()
}

/// Which notification a single recorded entry produces.
///
/// Transfer notifications name a counterparty and are only sent by
/// [`TransactionEngine::transfer`]; an entry merely tagged `transfer` is reported as
/// plain income or expense.
const fn event_kind(entry_type: EntryType, category: Category) -> EventKind {
    match (entry_type, category) {
        (EntryType::Credit, Category::Salary) => EventKind::SalaryCredited,
        (EntryType::Credit, _) => EventKind::Income,
        (EntryType::Debit, _) => EventKind::Expense,
    }
}

fn rename_not_found(err: Error, what: &'static str) -> Error {
    match err {
        Error::NotFound { id, .. } => Error::NotFound { what, id },
        other => other,
    }
}

async fn find_user<C>(db: &C, user_id: i64, what: &'static str) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    User::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or(Error::NotFound { what, id: user_id })
}

async fn insert_entry<C>(db: &C, user_id: i64, entry: &NewTransaction) -> Result<transaction::Model>
where
    C: ConnectionTrait,
{
    let model = transaction::ActiveModel {
        amount_cents: Set(entry.amount.cents()),
        entry_type: Set(entry.entry_type),
        category: Set(entry.category),
        title: Set(entry.title.clone()),
        description: Set(entry.description.clone()),
        user_id: Set(user_id),
        related_user_id: Set(entry.related_user_id),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    model.insert(db).await.map_err(Into::into)
}

/// Applies one entry to an account: balance change first, then the transaction row.
///
/// Must run inside a storage transaction.
async fn apply_entry<C>(
    db: &C,
    user_id: i64,
    entry: &NewTransaction,
) -> Result<(transaction::Model, user::Model)>
where
    C: ConnectionTrait,
{
    match entry.entry_type {
        EntryType::Credit => ledger::credit(db, user_id, entry.amount).await?,
        EntryType::Debit => ledger::debit(db, user_id, entry.amount).await?,
    }
    if let Some(related) = entry.related_user_id {
        find_user(db, related, "user").await?;
    }
    let model = insert_entry(db, user_id, entry).await?;
    let owner = find_user(db, user_id, "user").await?;
    Ok((model, owner))
}

async fn debit_sender<C: ConnectionTrait>(db: &C, sender_id: i64, amount: Money) -> Result<()> {
    ledger::debit(db, sender_id, amount)
        .await
        .map_err(|e| rename_not_found(e, "sender"))
}

async fn credit_receiver<C: ConnectionTrait>(db: &C, receiver_id: i64, amount: Money) -> Result<()> {
    ledger::credit(db, receiver_id, amount)
        .await
        .map_err(|e| rename_not_found(e, "receiver"))
}

/// Applies both balance changes of a transfer, lower account id first whichever side
/// of the transfer it is on.
async fn apply_transfer_legs<C>(db: &C, sender_id: i64, receiver_id: i64, amount: Money) -> Result<()>
where
    C: ConnectionTrait,
{
    if sender_id < receiver_id {
        debit_sender(db, sender_id, amount).await?;
        credit_receiver(db, receiver_id, amount).await
    } else {
        credit_receiver(db, receiver_id, amount).await?;
        debit_sender(db, sender_id, amount).await
    }
}

/// The transaction engine.
///
/// Holds the storage handle and the notifier; clone it freely, clones share both.
pub struct TransactionEngine<N> {
    db: DatabaseConnection,
    notifier: Arc<N>,
}

impl<N> Clone for TransactionEngine<N> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            notifier: Arc::clone(&self.notifier),
        }
    }
}

impl<N: Notifier> TransactionEngine<N> {
    /// Creates an engine over `db` that reports committed transactions to `notifier`.
    pub fn new(db: DatabaseConnection, notifier: N) -> Self {
        Self {
            db,
            notifier: Arc::new(notifier),
        }
    }

    /// The underlying storage handle, for read-only queries.
    #[must_use]
    pub const fn database(&self) -> &DatabaseConnection {
        &self.db
    }

    fn notify_after_commit(&self, notifications: Vec<Notification>) {
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            notify::dispatch(notifier.as_ref(), &notifications).await;
        });
    }

    /// Current balance of the granted account.
    pub async fn balance(&self, grant: &Grant) -> Result<Money> {
        ledger::get_balance(&self.db, grant.user_id()).await
    }

    /// Records one transaction on the granted account and applies its balance change.
    ///
    /// # Errors
    /// * [`Error::Validation`] for a non-positive amount or bad title/description,
    ///   before anything touches storage
    /// * [`Error::NotFound`] if the account or the related user does not exist
    /// * [`Error::InsufficientFunds`] if a debit exceeds the balance
    ///
    /// On any error neither the balance nor the transaction history changes.
    pub async fn record_transaction(
        &self,
        grant: &Grant,
        entry: NewTransaction,
    ) -> Result<transaction::Model> {
        let entry = entry.validated()?;
        let user_id = grant.user_id();

        let txn = self.db.begin().await?;
        let (model, owner) = apply_entry(&txn, user_id, &entry).await?;
        txn.commit().await?;

        info!(
            "Recorded transaction {} for user {} by actor {}: {} {} ({}), balance now {}",
            model.id,
            user_id,
            grant.actor().id,
            model.entry_type.as_str(),
            model.amount(),
            model.category,
            owner.balance()
        );

        self.notify_after_commit(vec![Notification::for_transaction(
            event_kind(model.entry_type, model.category),
            &model,
            None,
            owner.balance(),
        )]);
        Ok(model)
    }

    /// Records a credit, category `income` unless another is given.
    pub async fn record_income(
        &self,
        grant: &Grant,
        amount: Money,
        category: Option<Category>,
        title: &str,
        description: Option<String>,
    ) -> Result<transaction::Model> {
        let entry = NewTransaction::credit(amount, category.unwrap_or(Category::Income), title)
            .with_description(description);
        self.record_transaction(grant, entry).await
    }

    /// Records a debit, category `expense` unless another is given.
    pub async fn record_expense(
        &self,
        grant: &Grant,
        amount: Money,
        category: Option<Category>,
        title: &str,
        description: Option<String>,
    ) -> Result<transaction::Model> {
        let entry = NewTransaction::debit(amount, category.unwrap_or(Category::Expense), title)
            .with_description(description);
        self.record_transaction(grant, entry).await
    }

    /// Moves `amount` from the granted account to `receiver_id`.
    ///
    /// Returns the sender's debit and the receiver's credit. Both legs commit together
    /// or not at all.
    ///
    /// # Errors
    /// * [`Error::Validation`] for a non-positive amount, a too long description or a
    ///   transfer to oneself
    /// * [`Error::NotFound`] with `what` set to `"sender"` or `"receiver"`; a missing
    ///   receiver is reported first, and either one before a short balance
    /// * [`Error::InsufficientFunds`] if the sender cannot cover the amount
    pub async fn transfer(
        &self,
        grant: &Grant,
        receiver_id: i64,
        amount: Money,
        description: Option<String>,
    ) -> Result<(transaction::Model, transaction::Model)> {
        let sender_id = grant.user_id();
        if !amount.is_positive() {
            return Err(Error::validation(format!(
                "amount must be greater than zero, got {amount}"
            )));
        }
        if sender_id == receiver_id {
            return Err(Error::validation("cannot transfer to the same account"));
        }
        let description = normalize_description(description)?;

        let txn = self.db.begin().await?;

        if let Err(err) = apply_transfer_legs(&txn, sender_id, receiver_id, amount).await {
            // A missing party outranks a short balance.
            find_user(&txn, receiver_id, "receiver").await?;
            find_user(&txn, sender_id, "sender").await?;
            return Err(err);
        }

        let sender = find_user(&txn, sender_id, "sender").await?;
        let receiver = find_user(&txn, receiver_id, "receiver").await?;

        let debit_entry = NewTransaction::debit(
            amount,
            Category::Transfer,
            transfer_title("Transfer to", &receiver.name),
        )
        .with_description(description.clone())
        .with_related_user(receiver_id);
        let credit_entry = NewTransaction::credit(
            amount,
            Category::Transfer,
            transfer_title("Transfer from", &sender.name),
        )
        .with_description(description)
        .with_related_user(sender_id);

        let debit = insert_entry(&txn, sender_id, &debit_entry).await?;
        let credit = insert_entry(&txn, receiver_id, &credit_entry).await?;

        txn.commit().await?;

        info!(
            "Transferred {} from user {} to user {} (transactions {} and {}) by actor {}",
            amount,
            sender_id,
            receiver_id,
            debit.id,
            credit.id,
            grant.actor().id
        );

        self.notify_after_commit(vec![
            Notification::for_transaction(
                EventKind::TransferSent,
                &debit,
                Some(receiver.name.clone()),
                sender.balance(),
            ),
            Notification::for_transaction(
                EventKind::TransferReceived,
                &credit,
                Some(sender.name),
                receiver.balance(),
            ),
        ]);

        Ok((debit, credit))
    }

    /// Transactions owned by the granted account, newest first.
    pub async fn get_transactions_for_user(&self, grant: &Grant) -> Result<Vec<transaction::Model>> {
        let transactions = crate::entities::Transaction::find()
            .filter(transaction::Column::UserId.eq(grant.user_id()))
            .order_by_desc(transaction::Column::CreatedAt)
            .order_by_desc(transaction::Column::Id)
            .all(&self.db)
            .await?;
        debug!(
            "Fetched {} transactions for user {}",
            transactions.len(),
            grant.user_id()
        );
        Ok(transactions)
    }

    /// The `limit` newest transactions of the granted account, with the account's total
    /// number of transactions.
    pub async fn get_recent_transactions(
        &self,
        grant: &Grant,
        limit: u64,
    ) -> Result<(Vec<transaction::Model>, u64)> {
        let owned = crate::entities::Transaction::find()
            .filter(transaction::Column::UserId.eq(grant.user_id()));
        let total = owned.clone().count(&self.db).await?;
        let transactions = owned
            .order_by_desc(transaction::Column::CreatedAt)
            .order_by_desc(transaction::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await?;
        debug!(
            "Fetched {} of {} transactions for user {}",
            transactions.len(),
            total,
            grant.user_id()
        );
        Ok((transactions, total))
    }

    /// Every transaction in the ledger, newest first.
    pub async fn get_all_transactions(&self, _admin: &AdminGrant) -> Result<Vec<transaction::Model>> {
        crate::entities::Transaction::find()
            .order_by_desc(transaction::Column::CreatedAt)
            .order_by_desc(transaction::Column::Id)
            .all(&self.db)
            .await
            .map_err(Into::into)
    }

    /// Transactions visible to the actor: all of them for an admin, otherwise its own.
    pub async fn get_transactions(&self, actor: Option<&Actor>) -> Result<Vec<transaction::Model>> {
        let grant = auth::authorize_self(actor)?;
        if auth::is_admin(grant.actor()) {
            let admin = auth::require_admin(actor)?;
            return self.get_all_transactions(&admin).await;
        }
        self.get_transactions_for_user(&grant).await
    }

    /// Loads a transaction and passes the gate for its owner.
    async fn find_authorized(
        &self,
        actor: Option<&Actor>,
        transaction_id: i64,
    ) -> Result<(transaction::Model, Grant)> {
        let actor = actor.ok_or(Error::Authentication)?;
        let model = crate::entities::Transaction::find_by_id(transaction_id)
            .one(&self.db)
            .await?
            .ok_or(Error::NotFound {
                what: "transaction",
                id: transaction_id,
            })?;
        let grant = auth::authorize(Some(actor), model.user_id)?;
        Ok((model, grant))
    }

    /// One transaction, if the actor may see it.
    pub async fn get_transaction(
        &self,
        actor: Option<&Actor>,
        transaction_id: i64,
    ) -> Result<transaction::Model> {
        self.find_authorized(actor, transaction_id)
            .await
            .map(|(model, _)| model)
    }

    /// Corrects the description of a committed transaction.
    ///
    /// This is the only permitted edit; it never touches balances.
    pub async fn update_transaction_description(
        &self,
        actor: Option<&Actor>,
        transaction_id: i64,
        description: Option<String>,
    ) -> Result<transaction::Model> {
        let description = normalize_description(description)?;
        let (model, grant) = self.find_authorized(actor, transaction_id).await?;

        let mut active: transaction::ActiveModel = model.into();
        active.description = Set(description);
        let updated = active.update(&self.db).await?;

        info!(
            "Updated description of transaction {} by actor {}",
            transaction_id,
            grant.actor().id
        );
        Ok(updated)
    }

    /// Amounts of committed transactions cannot be edited; always fails once the
    /// transaction is found and the actor is allowed to see it.
    pub async fn update_transaction_amount(
        &self,
        actor: Option<&Actor>,
        transaction_id: i64,
        _amount: Money,
    ) -> Result<transaction::Model> {
        self.find_authorized(actor, transaction_id).await?;
        Err(Error::validation(
            "ledger entries are append-only; record a new transaction to correct an amount",
        ))
    }

    /// Transactions cannot be deleted; always fails once the transaction is found and
    /// the actor is allowed to see it.
    pub async fn delete_transaction(&self, actor: Option<&Actor>, transaction_id: i64) -> Result<()> {
        self.find_authorized(actor, transaction_id).await?;
        Err(Error::validation(
            "ledger entries are append-only and cannot be deleted",
        ))
    }
}
