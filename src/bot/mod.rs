//! Bot layer - Telegram-specific interface and update handlers
//!
//! This module provides the Telegram interface for the shop: commands,
//! inline-button callbacks, dialogue storage and message formatting. All shop
//! logic lives in [`crate::core`]; handlers only translate updates into service
//! calls and results into messages.

/// Inline button payloads
pub mod callback;
/// Slash commands
pub mod commands;
/// Active dialogue storage
pub mod dialogues;
/// Message texts
pub mod format;
/// Update handlers (callbacks, text messages, notifications)
pub mod handlers;
/// Inline keyboards
pub mod keyboards;

use crate::{
    config::Settings,
    core::{backup::BackupConfig, cart::CartService},
    errors::Result,
};
use commands::Command;
use dialogues::DialogueStore;
use sea_orm::DatabaseConnection;
use std::{sync::Arc, time::Duration};
use teloxide::{prelude::*, types::UserId, utils::command::BotCommands};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Shared data available to all handlers.
///
/// Built once in `main` and cloned into every handler closure.
#[derive(Clone)]
pub struct ShopContext {
    /// Database connection for all database operations
    pub db: DatabaseConnection,
    /// Cart service with its per-line lock registry
    pub cart: CartService,
    /// Active checkout and admin dialogues
    pub dialogues: DialogueStore,
    /// Application settings
    pub settings: Arc<Settings>,
    /// Backup configuration, `None` when the database is not a SQLite file
    pub backup: Option<BackupConfig>,
}

impl ShopContext {
    /// Creates the context from its parts.
    #[must_use]
    pub fn new(db: DatabaseConnection, settings: Arc<Settings>, backup: Option<BackupConfig>) -> Self {
        Self {
            cart: CartService::new(db.clone()),
            dialogues: DialogueStore::new(settings.dialogue_ttl),
            db,
            settings,
            backup,
        }
    }

    /// Whether the Telegram user is a configured admin.
    #[must_use]
    pub fn is_admin(&self, user: UserId) -> bool {
        i64::try_from(user.0).is_ok_and(|id| self.settings.is_admin(id))
    }
}

/// Starts the bot and blocks until it is stopped (Ctrl+C).
pub async fn run_bot(token: String, ctx: ShopContext) -> Result<()> {
    let bot = Bot::new(token);

    bot.set_my_commands(Command::bot_commands()).await?;
    info!("Bot commands registered, starting dispatcher");

    Dispatcher::builder(bot, handlers::schema(ctx))
        .default_handler(|update| async move {
            debug!("Unhandled update: {:?}", update.id);
        })
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Dispatcher stopped");
    Ok(())
}

/// Periodically drops expired dialogues until `shutdown` fires.
pub async fn prune_dialogues(store: DialogueStore, shutdown: CancellationToken) {
    let mut interval = tokio::time::interval(Duration::from_secs(60));
    loop {
        tokio::select! {
            _ = interval.tick() => {
                let dropped = store.prune_expired();
                if dropped > 0 {
                    debug!("Dropped {} expired dialogue(s)", dropped);
                }
            }
            () = shutdown.cancelled() => break,
        }
    }
}

/// Key under which a Telegram user is stored in the database.
#[must_use]
pub fn user_key(user: UserId) -> String {
    user.0.to_string()
}
