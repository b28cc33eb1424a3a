//! Account ledger - the only writer of user balances.
//!
//! [`credit`] and [`debit`] are single conditional `UPDATE` statements, so two concurrent
//! debits can never both pass the balance check against the same stale value:
//! `UPDATE users SET balance_cents = balance_cents - :amt WHERE id = :id AND balance_cents >= :amt`.
//! When no row is affected the account is re-read to tell a missing user apart from
//! an insufficient balance.
//!
//! Both primitives are crate-private. They are meant to run inside the storage
//! transaction that also inserts the matching ledger entry.

use crate::{
    core::money::Money,
    entities::{User, user},
    errors::{Error, Result},
};
use sea_orm::{prelude::*, sea_query::Expr};
use tracing::{debug, trace};

/// Reads the current balance of a user.
pub async fn get_balance<C>(db: &C, user_id: i64) -> Result<Money>
where
    C: ConnectionTrait,
{
    let user = User::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or(Error::NotFound {
            what: "user",
            id: user_id,
        })?;
    debug!("Balance of user {}: {}", user_id, user.balance());
    Ok(user.balance())
}

fn require_positive(amount: Money) -> Result<()> {
    if amount.is_positive() {
        Ok(())
    } else {
        Err(Error::validation(format!(
            "amount must be greater than zero, got {amount}"
        )))
    }
}

/// Increases the balance of `user_id` by `amount`.
pub(crate) async fn credit<C>(db: &C, user_id: i64, amount: Money) -> Result<()>
where
    C: ConnectionTrait,
{
    require_positive(amount)?;

    let result = User::update_many()
        .col_expr(
            user::Column::BalanceCents,
            Expr::col(user::Column::BalanceCents).add(amount.cents()),
        )
        .filter(user::Column::Id.eq(user_id))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error::NotFound {
            what: "user",
            id: user_id,
        });
    }
    trace!("Credited {} to user {}", amount, user_id);
    Ok(())
}

/// Decreases the balance of `user_id` by `amount`, failing with
/// [`Error::InsufficientFunds`] instead of going below zero.
pub(crate) async fn debit<C>(db: &C, user_id: i64, amount: Money) -> Result<()>
where
    C: ConnectionTrait,
{
    require_positive(amount)?;

    let result = User::update_many()
        .col_expr(
            user::Column::BalanceCents,
            Expr::col(user::Column::BalanceCents).sub(amount.cents()),
        )
        .filter(user::Column::Id.eq(user_id))
        .filter(user::Column::BalanceCents.gte(amount.cents()))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        let balance = get_balance(db, user_id).await?;
        return Err(Error::InsufficientFunds {
            user_id,
            balance,
            requested: amount,
        });
    }
    trace!("Debited {} from user {}", amount, user_id);
    Ok(())
}
