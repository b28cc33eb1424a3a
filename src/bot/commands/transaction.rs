//! Transaction Discord commands - balance, income, expense, transfer and history.
//!
//! Each command resolves the author to a ledger actor, passes the authorization gate
//! and hands the resulting grant to the transaction engine.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{self, BotData, handlers::autocomplete},
        core::{auth, report},
        entities::Category,
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;

    const DEFAULT_HISTORY_LIMIT: u32 = 10;
    const MAX_HISTORY_LIMIT: u32 = 50;

    fn parse_category(category: Option<&str>) -> Result<Option<Category>> {
        category.map(str::parse).transpose()
    }

    /// Shows the current balance.
    ///
    /// Admins may look at another linked user's balance.
    #[poise::command(slash_command, prefix_command)]
    pub async fn balance(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "User to look up (admins only)"] user: Option<serenity::User>,
    ) -> Result<()> {
        let actor = bot::current_actor(ctx).await?;
        let grant = match &user {
            Some(target) => {
                let Some(target_actor) = bot::resolve_discord_user(ctx, target.id).await? else {
                    ctx.say(format!("❌ {} is not linked to a ledger user.", target.name))
                        .await?;
                    return Ok(());
                };
                auth::authorize(actor.as_ref(), target_actor.id)?
            }
            None => auth::authorize_self(actor.as_ref())?,
        };

        let balance = ctx.data().engine.balance(&grant).await?;
        let whose = user
            .as_ref()
            .map_or_else(|| "Your".to_string(), |u| format!("{}'s", u.name));
        ctx.say(format!(
            "💰 {whose} balance: **{balance} {}**",
            ctx.data().currency()
        ))
        .await?;
        Ok(())
    }

    /// Records income on your account.
    #[poise::command(slash_command, prefix_command)]
    pub async fn income(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Amount, e.g. 100.00"] amount: String,
        #[description = "Short title"] title: String,
        #[description = "Category (default: income)"]
        #[autocomplete = "autocomplete::autocomplete_category"]
        category: Option<String>,
        #[description = "Optional description"] description: Option<String>,
    ) -> Result<()> {
        let amount = bot::parse_amount(&amount)?;
        let category = parse_category(category.as_deref())?;
        let actor = bot::current_actor(ctx).await?;
        let grant = auth::authorize_self(actor.as_ref())?;

        let txn = ctx
            .data()
            .engine
            .record_income(&grant, amount, category, &title, description)
            .await?;

        ctx.say(format!(
            "✅ Recorded income of {} {} - {} (Transaction ID: {})",
            txn.amount(),
            ctx.data().currency(),
            txn.title,
            txn.id
        ))
        .await?;
        Ok(())
    }

    /// Records an expense on your account.
    #[poise::command(slash_command, prefix_command)]
    pub async fn expense(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Amount, e.g. 25.50"] amount: String,
        #[description = "Short title"] title: String,
        #[description = "Category (default: expense)"]
        #[autocomplete = "autocomplete::autocomplete_category"]
        category: Option<String>,
        #[description = "Optional description"] description: Option<String>,
    ) -> Result<()> {
        let amount = bot::parse_amount(&amount)?;
        let category = parse_category(category.as_deref())?;
        let actor = bot::current_actor(ctx).await?;
        let grant = auth::authorize_self(actor.as_ref())?;

        let txn = ctx
            .data()
            .engine
            .record_expense(&grant, amount, category, &title, description)
            .await?;

        ctx.say(format!(
            "✅ Recorded expense of {} {} - {} (Transaction ID: {})",
            txn.amount(),
            ctx.data().currency(),
            txn.title,
            txn.id
        ))
        .await?;
        Ok(())
    }

    /// Sends money to another user.
    #[poise::command(slash_command, prefix_command)]
    pub async fn transfer(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Who receives the money"] recipient: serenity::User,
        #[description = "Amount, e.g. 30.00"] amount: String,
        #[description = "Optional description"] description: Option<String>,
    ) -> Result<()> {
        let amount = bot::parse_amount(&amount)?;
        let actor = bot::current_actor(ctx).await?;
        let grant = auth::authorize_self(actor.as_ref())?;

        let Some(receiver) = bot::resolve_discord_user(ctx, recipient.id).await? else {
            ctx.say(format!(
                "❌ {} is not linked to a ledger user.",
                recipient.name
            ))
            .await?;
            return Ok(());
        };

        let (debit, _credit) = ctx
            .data()
            .engine
            .transfer(&grant, receiver.id, amount, description)
            .await?;

        ctx.say(format!(
            "✅ Sent {} {} to {} (Transaction ID: {})",
            debit.amount(),
            ctx.data().currency(),
            recipient.name,
            debit.id
        ))
        .await?;
        Ok(())
    }

    /// Lists your latest transactions.
    #[poise::command(slash_command, prefix_command)]
    pub async fn history(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "How many transactions to show (default 10, max 50)"] limit: Option<u32>,
    ) -> Result<()> {
        let actor = bot::current_actor(ctx).await?;
        let grant = auth::authorize_self(actor.as_ref())?;
        let limit = limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT);

        let (transactions, total) = ctx
            .data()
            .engine
            .get_recent_transactions(&grant, u64::from(limit))
            .await?;
        if transactions.is_empty() {
            ctx.say("No transactions yet.").await?;
            return Ok(());
        }

        let currency = ctx.data().currency();
        let lines: Vec<String> = transactions
            .iter()
            .map(|txn| report::format_transaction_summary(txn, currency))
            .collect();
        let text = format!(
            "**Latest {} of {} transactions**\n{}",
            lines.len(),
            total,
            lines.join("\n")
        );
        bot::say_chunked(ctx, &text).await
    }

    /// Corrects the description of one of your transactions.
    #[poise::command(slash_command, prefix_command)]
    pub async fn edit_description(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Transaction ID"] transaction_id: i64,
        #[description = "New description (leave empty to clear)"] description: Option<String>,
    ) -> Result<()> {
        let actor = bot::current_actor(ctx).await?;
        let txn = ctx
            .data()
            .engine
            .update_transaction_description(actor.as_ref(), transaction_id, description)
            .await?;

        ctx.say(format!(
            "✅ Updated transaction {}: {}",
            txn.id,
            txn.description.as_deref().unwrap_or("(no description)")
        ))
        .await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
