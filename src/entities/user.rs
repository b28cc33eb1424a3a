//! User entity - A ledger account holder.
//!
//! Each user carries a role and the authoritative current balance. The balance
//! column is only ever written by the ledger's credit/debit primitives.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Role claim carried by an actor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// May act on every account
    #[sea_orm(string_value = "admin")]
    Admin,
    /// May act on its own account only
    #[sea_orm(string_value = "user")]
    User,
}

impl Role {
    /// Lowercase name as stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = crate::errors::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "user" => Ok(Self::User),
            other => Err(crate::errors::Error::validation(format!(
                "unknown role '{other}'"
            ))),
        }
    }
}

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier for the user
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name
    pub name: String,
    /// Email address, unique across users
    #[sea_orm(unique)]
    pub email: String,
    /// Optional age in years
    pub age: Option<i32>,
    /// Role claim (`admin` or `user`)
    pub role: Role,
    /// Current balance in cents, never negative
    pub balance_cents: i64,
}

/// Defines relationships between User and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One user owns many transactions
    #[sea_orm(has_many = "super::transaction::Entity")]
    Transactions,
    /// One user has one set of credentials
    #[sea_orm(has_one = "super::credential::Entity")]
    Credential,
}

impl Related<super::transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl Related<super::credential::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Credential.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// The balance as [`Money`](crate::core::money::Money).
    #[must_use]
    pub const fn balance(&self) -> crate::core::money::Money {
        crate::core::money::Money::from_cents(self.balance_cents)
    }
}
