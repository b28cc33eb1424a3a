//! Report Discord commands - categories, category, date and spending reports.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{self, BotData},
        core::{auth, report},
        errors::{Error, Result},
    };
    use chrono::{Datelike, NaiveDate, Utc};

    fn parse_date(value: &str) -> Result<NaiveDate> {
        NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|e| {
            Error::validation(format!("'{value}' is not a YYYY-MM-DD date: {e}"))
        })
    }

    /// Lists the transaction categories.
    #[poise::command(slash_command, prefix_command)]
    pub async fn categories(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let names: Vec<&str> = report::categories().iter().map(|c| c.as_str()).collect();
        ctx.say(format!("**Categories**\n{}", names.join(", "))).await?;
        Ok(())
    }

    /// Shows your spending by category.
    #[poise::command(slash_command, prefix_command)]
    pub async fn category_report(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let actor = bot::current_actor(ctx).await?;
        let grant = auth::authorize_self(actor.as_ref())?;

        let totals = report::category_summary(&ctx.data().database, &grant).await?;
        let text = report::format_category_summary(&totals, ctx.data().currency());
        bot::say_chunked(ctx, &text).await
    }

    /// Shows your daily totals between two dates.
    #[poise::command(slash_command, prefix_command)]
    pub async fn date_report(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "First day, YYYY-MM-DD (default: first of this month)"] start: Option<
            String,
        >,
        #[description = "Last day, YYYY-MM-DD (default: today)"] end: Option<String>,
    ) -> Result<()> {
        let today = Utc::now().date_naive();
        let start = match start.as_deref() {
            Some(value) => parse_date(value)?,
            None => today.with_day(1).unwrap_or(today),
        };
        let end = end.as_deref().map(parse_date).transpose()?.unwrap_or(today);

        let actor = bot::current_actor(ctx).await?;
        let grant = auth::authorize_self(actor.as_ref())?;

        let totals = report::date_summary(&ctx.data().database, &grant, start, end).await?;
        let text = report::format_date_summary(&totals, start, end, ctx.data().currency());
        bot::say_chunked(ctx, &text).await
    }

    /// Shows your monthly spending and top categories.
    #[poise::command(slash_command, prefix_command)]
    pub async fn spending_report(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let actor = bot::current_actor(ctx).await?;
        let grant = auth::authorize_self(actor.as_ref())?;

        let analytics = report::spending_analytics(&ctx.data().database, &grant).await?;
        let text = report::format_spending_analytics(&analytics, ctx.data().currency());
        bot::say_chunked(ctx, &text).await
    }
}

// Re-export all commands
pub use inner::*;
