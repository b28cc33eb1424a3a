//! Transaction entity - One immutable ledger entry.
//!
//! Each transaction has an owning `user_id`, a strictly positive `amount_cents`,
//! an `entry_type` (credit/debit), a `category`, a title, an optional description,
//! an optional `related_user_id` (the counterparty of a transfer) and `created_at`.
//! Rows are only created by the transaction engine, in the same storage
//! transaction that applies the balance change.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Direction of a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(8))")]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    /// Balance increase
    #[sea_orm(string_value = "credit")]
    Credit,
    /// Balance decrease
    #[sea_orm(string_value = "debit")]
    Debit,
}

impl EntryType {
    /// Lowercase name as stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Credit => "credit",
            Self::Debit => "debit",
        }
    }
}

/// Category tag of a ledger entry
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum Category {
    #[sea_orm(string_value = "salary")]
    Salary,
    #[sea_orm(string_value = "transfer")]
    Transfer,
    #[sea_orm(string_value = "payment")]
    Payment,
    #[sea_orm(string_value = "expense")]
    Expense,
    #[sea_orm(string_value = "income")]
    Income,
    #[sea_orm(string_value = "food")]
    Food,
    #[sea_orm(string_value = "rent")]
    Rent,
    #[sea_orm(string_value = "transport")]
    Transport,
    #[sea_orm(string_value = "entertainment")]
    Entertainment,
    #[sea_orm(string_value = "healthcare")]
    Healthcare,
    #[sea_orm(string_value = "shopping")]
    Shopping,
    #[sea_orm(string_value = "utilities")]
    Utilities,
    #[sea_orm(string_value = "other")]
    Other,
}

impl Category {
    /// Every category, in declaration order.
    pub const ALL: [Self; 13] = [
        Self::Salary,
        Self::Transfer,
        Self::Payment,
        Self::Expense,
        Self::Income,
        Self::Food,
        Self::Rent,
        Self::Transport,
        Self::Entertainment,
        Self::Healthcare,
        Self::Shopping,
        Self::Utilities,
        Self::Other,
    ];

    /// Lowercase name as stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Salary => "salary",
            Self::Transfer => "transfer",
            Self::Payment => "payment",
            Self::Expense => "expense",
            Self::Income => "income",
            Self::Food => "food",
            Self::Rent => "rent",
            Self::Transport => "transport",
            Self::Entertainment => "entertainment",
            Self::Healthcare => "healthcare",
            Self::Shopping => "shopping",
            Self::Utilities => "utilities",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = crate::errors::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| crate::errors::Error::validation(format!("unknown category '{s}'")))
    }
}

/// Transaction database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    /// Unique identifier for the transaction
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Amount in cents, always strictly positive
    pub amount_cents: i64,
    /// Credit or debit
    pub entry_type: EntryType,
    /// Category tag
    pub category: Category,
    /// Short title, 1-100 characters
    pub title: String,
    /// Optional description, up to 200 characters
    pub description: Option<String>,
    /// Owning user
    pub user_id: i64,
    /// Counterparty for transfers
    pub related_user_id: Option<i64>,
    /// When the transaction was committed
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Transaction and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each transaction is owned by one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Owner,
    /// Optional non-owning reference to the transfer counterparty
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::RelatedUserId",
        to = "super::user::Column::Id",
        on_delete = "SetNull"
    )]
    RelatedUser,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// The amount as [`Money`](crate::core::money::Money).
    #[must_use]
    pub const fn amount(&self) -> crate::core::money::Money {
        crate::core::money::Money::from_cents(self.amount_cents)
    }
}
