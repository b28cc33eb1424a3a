//! Credential entity - Login identity attached to a user.
//!
//! Holds the unique username and the optional Discord account the user is
//! authenticated through.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Credential database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_credentials")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning user, one credential per user
    #[sea_orm(unique)]
    pub user_id: i64,
    /// Login name, unique across users
    #[sea_orm(unique)]
    pub username: String,
    /// Linked Discord user ID, if any
    #[sea_orm(unique)]
    pub discord_user_id: Option<String>,
}

/// Defines relationships between Credential and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each credential belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
