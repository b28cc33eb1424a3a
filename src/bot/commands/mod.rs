//! Discord command implementations organized by category.

#![allow(clippy::too_long_first_doc_paragraph)]

/// Admin-only commands
pub mod admin;

/// General utility commands
pub mod general;

/// Report commands
pub mod report;

/// Transaction commands
pub mod transaction;

use crate::{bot::BotData, errors::Error};

// Export commands
pub use admin::*;
pub use general::*;
pub use report::*;
pub use transaction::*;

/// Every command the bot registers.
#[must_use]
pub fn all() -> Vec<poise::Command<BotData, Error>> {
    vec![
        ping(),
        help(),
        balance(),
        income(),
        expense(),
        transfer(),
        history(),
        edit_description(),
        categories(),
        category_report(),
        date_report(),
        spending_report(),
        create_user(),
        delete_user(),
        users(),
        pay_salary(),
        run_salaries(),
    ]
}
