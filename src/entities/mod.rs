//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod credential;
pub mod system_state;
pub mod transaction;
pub mod user;

// Re-export specific types to avoid conflicts
pub use credential::{
    Column as CredentialColumn, Entity as Credential, Model as CredentialModel,
};
pub use system_state::{
    Column as SystemStateColumn, Entity as SystemState, Model as SystemStateModel,
};
pub use transaction::{
    Category, Column as TransactionColumn, Entity as Transaction, EntryType,
    Model as TransactionModel,
};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel, Role};
