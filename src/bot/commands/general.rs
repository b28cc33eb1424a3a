//! General Discord commands - ping and help.
//! This module contains simple commands that don't require database operations
//! and provide basic bot functionality and user assistance.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::BotData,
        errors::{Error, Result},
    };

    /// Responds with "Pong!" to test bot connectivity.
    #[poise::command(slash_command, prefix_command)]
    pub async fn ping(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        ctx.say("Pong!").await?;
        Ok(())
    }

    /// Displays help information about available commands.
    #[poise::command(slash_command, prefix_command)]
    pub async fn help(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "**LedgerBuddy Help**\n\
        Here is a summary of all available commands.\n\n\
        **Money**\n\
        • `/balance [user]` - Shows your balance (admins may name another user).\n\
        • `/income <amount> <title> [category] [description]` - Records income.\n\
        • `/expense <amount> <title> [category] [description]` - Records an expense.\n\
        • `/transfer <recipient> <amount> [description]` - Sends money to another user.\n\
        • `/history [limit]` - Lists your latest transactions.\n\
        • `/edit_description <id> [description]` - Corrects a transaction description.\n\n\
        **Reports**\n\
        • `/categories` - Lists the transaction categories.\n\
        • `/category_report` - Spending by category.\n\
        • `/date_report [start] [end]` - Daily totals, dates as YYYY-MM-DD.\n\
        • `/spending_report` - Monthly spending and top categories.\n\n\
        **Admin**\n\
        • `/create_user`, `/delete_user`, `/users` - Manage ledger users.\n\
        • `/pay_salary <user_id> <amount>` - Pays a one-off salary.\n\
        • `/run_salaries [amount]` - Pays the daily salary to every user now.\n\n\
        **Utility**\n\
        • `/ping` - Checks if the bot is responsive.\n\
        • `/help` - Shows this help message.\n\n\
        Every command also works as a text command, e.g. `!balance`. \
        Amounts are decimal numbers with up to two decimal places, e.g. `12.50`. \
        Committed transactions cannot be deleted or changed, only their description.";

        ctx.say(help_text).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
