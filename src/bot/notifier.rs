//! Notification delivery through Discord direct messages.

use crate::{
    core::{
        notify::{LogNotifier, Notification, Notifier, format_notification},
        user,
    },
    errors::{Error, Result},
};
use poise::serenity_prelude as serenity;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tracing::debug;

/// Sends each notification as a direct message to the owner's linked Discord account.
///
/// Users without a linked account are skipped.
#[derive(Clone)]
pub struct DiscordNotifier {
    http: Arc<serenity::Http>,
    database: DatabaseConnection,
    currency: String,
}

impl DiscordNotifier {
    /// Creates a notifier that sends through `http`.
    #[must_use]
    pub const fn new(
        http: Arc<serenity::Http>,
        database: DatabaseConnection,
        currency: String,
    ) -> Self {
        Self {
            http,
            database,
            currency,
        }
    }
}

impl Notifier for DiscordNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        let Some(discord_id) =
            user::find_discord_id(&self.database, notification.user_id).await?
        else {
            debug!(
                "User {} has no linked Discord account, skipping notification",
                notification.user_id
            );
            return Ok(());
        };
        let recipient = discord_id
            .parse::<u64>()
            .ok()
            .filter(|&id| id != 0)
            .map(serenity::UserId::new)
            .ok_or_else(|| Error::Notification {
                message: format!(
                    "invalid Discord id '{discord_id}' for user {}",
                    notification.user_id
                ),
            })?;

        let text = format_notification(notification, &self.currency);
        recipient
            .direct_message(self.http.as_ref(), serenity::CreateMessage::new().content(text))
            .await?;
        debug!(
            "Sent {:?} notification for transaction {} to user {}",
            notification.kind, notification.transaction_id, notification.user_id
        );
        Ok(())
    }
}

/// The notifier the bot runs with, picked from the configuration.
#[derive(Clone)]
pub enum BotNotifier {
    /// Direct messages on Discord
    Discord(DiscordNotifier),
    /// Log output only
    Log(LogNotifier),
}

impl BotNotifier {
    /// A notifier that only logs.
    #[must_use]
    pub fn log(currency: impl Into<String>) -> Self {
        Self::Log(LogNotifier::new(currency))
    }
}

impl Notifier for BotNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        match self {
            Self::Discord(discord) => discord.notify(notification).await,
            Self::Log(log) => log.notify(notification).await,
        }
    }
}
