//! Admin Discord commands - user management and salaries.
//!
//! Every command here passes `require_admin` before doing anything.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{self, BotData},
        core::{
            auth,
            salary::{self, SalaryPolicy},
            user::{self, NewUser},
        },
        entities::Role,
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;

    /// Creates a ledger user, optionally linked to a Discord account.
    #[poise::command(slash_command, prefix_command)]
    pub async fn create_user(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Display name"] name: String,
        #[description = "Email address"] email: String,
        #[description = "Login name"] username: String,
        #[description = "Discord account to link"] discord: Option<serenity::User>,
        #[description = "Age"] age: Option<i32>,
        #[description = "Role: user or admin (default user)"] role: Option<String>,
    ) -> Result<()> {
        let actor = bot::current_actor(ctx).await?;
        let admin = auth::require_admin(actor.as_ref())?;
        let role = role
            .as_deref()
            .map(str::parse::<Role>)
            .transpose()?
            .unwrap_or(Role::User);

        let new_user = NewUser {
            age,
            role,
            discord_user_id: discord.as_ref().map(|u| u.id.to_string()),
            ..NewUser::new(name, email, username)
        };
        let profile = user::create_user(&ctx.data().database, &admin, new_user).await?;

        ctx.say(format!(
            "✅ Created user **{}** (ID: {}, role: {})",
            profile.user.name,
            profile.user.id,
            profile.user.role.as_str()
        ))
        .await?;
        Ok(())
    }

    /// Deletes a user together with its transactions.
    #[poise::command(slash_command, prefix_command)]
    pub async fn delete_user(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Ledger user ID"] user_id: i64,
    ) -> Result<()> {
        let actor = bot::current_actor(ctx).await?;
        let admin = auth::require_admin(actor.as_ref())?;

        user::delete_user(&ctx.data().database, &admin, user_id).await?;
        ctx.say(format!("✅ Deleted user {user_id}")).await?;
        Ok(())
    }

    /// Lists every ledger user with its balance.
    #[poise::command(slash_command, prefix_command)]
    pub async fn users(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let actor = bot::current_actor(ctx).await?;
        let admin = auth::require_admin(actor.as_ref())?;

        let users = user::get_users(&ctx.data().database, &admin).await?;
        if users.is_empty() {
            ctx.say("No users yet.").await?;
            return Ok(());
        }
        let currency = ctx.data().currency();
        let lines: Vec<String> = users
            .iter()
            .map(|u| {
                format!(
                    "• `{}` **{}** ({}) {} - {} {currency}",
                    u.id,
                    u.name,
                    u.role.as_str(),
                    u.email,
                    u.balance()
                )
            })
            .collect();
        bot::say_chunked(ctx, &format!("**Users**\n{}", lines.join("\n"))).await
    }

    /// Pays a one-off salary to one user.
    #[poise::command(slash_command, prefix_command)]
    pub async fn pay_salary(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Ledger user ID"] user_id: i64,
        #[description = "Amount, e.g. 500.00"] amount: String,
    ) -> Result<()> {
        let amount = bot::parse_amount(&amount)?;
        let actor = bot::current_actor(ctx).await?;
        let admin = auth::require_admin(actor.as_ref())?;

        let txn = salary::manual_salary(&ctx.data().engine, &admin, user_id, amount).await?;
        ctx.say(format!(
            "✅ Paid {} {} salary to user {} (Transaction ID: {})",
            txn.amount(),
            ctx.data().currency(),
            user_id,
            txn.id
        ))
        .await?;
        Ok(())
    }

    /// Pays the daily salary to every user now.
    #[poise::command(slash_command, prefix_command)]
    pub async fn run_salaries(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Amount per user (default: configured daily salary)"] amount: Option<
            String,
        >,
    ) -> Result<()> {
        let amount = match amount.as_deref() {
            Some(value) => bot::parse_amount(value)?,
            None => SalaryPolicy::from_config(&ctx.data().config.salary)?.daily_amount,
        };
        let actor = bot::current_actor(ctx).await?;
        let admin = auth::require_admin(actor.as_ref())?;

        ctx.defer().await?;
        let result = salary::distribute_salaries(&ctx.data().engine, &admin, amount).await?;
        let text = salary::format_salary_run_summary(&result, ctx.data().currency());
        bot::say_chunked(ctx, &text).await
    }
}

// Re-export all commands
pub use inner::*;
