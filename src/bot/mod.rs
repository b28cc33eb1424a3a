//! Bot layer - Discord-specific interface and command handlers
//!
//! This module provides the Discord interface for the `LedgerBuddy` application,
//! including all slash commands, autocomplete handlers, notification delivery and bot
//! context management. Commands translate Discord input into core calls; every
//! ledger rule lives in [`crate::core`].

/// Discord command implementations (general, transaction, report, admin)
pub mod commands;
/// Discord interaction handlers (autocomplete, etc.)
pub mod handlers;
/// Notification delivery through Discord direct messages
pub mod notifier;

use crate::{
    config::LedgerConfig,
    core::{auth::Actor, money::Money, salary, transaction::TransactionEngine, user},
    errors::{Error, Result},
};
use poise::serenity_prelude as serenity;
use sea_orm::DatabaseConnection;
use tracing::{error, info, warn};

pub use notifier::{BotNotifier, DiscordNotifier};

/// Discord message length limit, with room for code fences and markers.
const MAX_MESSAGE_LEN: usize = 1900;

/// Shared data available to all bot commands.
/// This structure holds the database connection, the transaction engine and the
/// ledger configuration.
pub struct BotData {
    /// Database connection for read-only queries
    pub database: DatabaseConnection,
    /// Transaction engine for every balance-affecting operation
    pub engine: TransactionEngine<BotNotifier>,
    /// Ledger settings
    pub config: LedgerConfig,
}

impl BotData {
    /// Creates a new `BotData` instance.
    #[must_use]
    pub const fn new(
        database: DatabaseConnection,
        engine: TransactionEngine<BotNotifier>,
        config: LedgerConfig,
    ) -> Self {
        Self {
            database,
            engine,
            config,
        }
    }

    /// Currency label for replies.
    #[must_use]
    pub fn currency(&self) -> &str {
        &self.config.notifications.currency
    }
}

/// Resolves the ledger actor linked to the command author.
///
/// Returns `None` for an unlinked Discord account; the authorization gate turns that
/// into an authentication error.
pub async fn current_actor(ctx: poise::Context<'_, BotData, Error>) -> Result<Option<Actor>> {
    resolve_discord_user(ctx, ctx.author().id).await
}

/// Resolves the ledger actor linked to any Discord user.
pub async fn resolve_discord_user(
    ctx: poise::Context<'_, BotData, Error>,
    discord_user: serenity::UserId,
) -> Result<Option<Actor>> {
    user::find_actor_by_discord_id(&ctx.data().database, &discord_user.to_string()).await
}

/// Parses a user-supplied amount such as `"12.50"`.
pub fn parse_amount(amount: &str) -> Result<Money> {
    amount.parse()
}

/// Sends a long text as several messages, splitting on line boundaries.
pub async fn say_chunked(ctx: poise::Context<'_, BotData, Error>, text: &str) -> Result<()> {
    for chunk in split_message(text, MAX_MESSAGE_LEN) {
        ctx.say(chunk).await?;
    }
    Ok(())
}

fn split_message(text: &str, max_len: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    for line in text.lines() {
        if !current.is_empty() && current.len() + line.len() + 1 > max_len {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(line);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

async fn on_error(error: poise::FrameworkError<'_, BotData, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => {
            error!("Failed to start bot: {}", error);
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            let kind = error.kind();
            if kind.status_code() >= 500 {
                error!("Error in command `{}`: {}", ctx.command().name, error);
            } else {
                warn!(
                    "Command `{}` by {} rejected ({:?}): {}",
                    ctx.command().name,
                    ctx.author().id,
                    kind,
                    error
                );
            }
            if let Err(e) = ctx.say(format!("❌ {}", kind.user_message())).await {
                error!("Failed to send error message: {}", e);
            }
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {}", e);
            }
        }
    }
}

/// Prefix for the text form of every command, e.g. `!balance`.
pub const COMMAND_PREFIX: &str = "!";

/// Framework options: all commands, reachable as slash commands and with
/// [`COMMAND_PREFIX`].
fn framework_options() -> poise::FrameworkOptions<BotData, Error> {
    poise::FrameworkOptions {
        commands: commands::all(),
        prefix_options: poise::PrefixFrameworkOptions {
            prefix: Some(COMMAND_PREFIX.to_string()),
            ..Default::default()
        },
        on_error: |error| Box::pin(on_error(error)),
        ..Default::default()
    }
}

/// Gateway intents; prefix commands need message content.
fn gateway_intents() -> serenity::GatewayIntents {
    serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::DIRECT_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT
}

/// Builds the framework, starts the salary scheduler and runs the Discord client
/// until it stops.
pub async fn run_bot(token: &str, config: LedgerConfig, database: DatabaseConnection) -> Result<()> {
    let policy = salary::SalaryPolicy::from_config(&config.salary)?;

    let framework = poise::Framework::builder()
        .options(framework_options())
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Logged in as {}", ready.user.name);
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                info!("Registered {} commands globally", framework.options().commands.len());

                let currency = config.notifications.currency.clone();
                let notifier = if config.notifications.enabled {
                    BotNotifier::Discord(DiscordNotifier::new(
                        std::sync::Arc::clone(&ctx.http),
                        database.clone(),
                        currency,
                    ))
                } else {
                    BotNotifier::log(currency)
                };
                let engine = TransactionEngine::new(database.clone(), notifier);
                salary::spawn_salary_scheduler(engine.clone(), policy);

                Ok(BotData::new(database, engine, config))
            })
        })
        .build();

    let intents = gateway_intents();

    info!("Setting up Serenity client for Poise framework...");
    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await?;

    info!("Starting bot client...");
    client.start().await?;
    Ok(())
}
