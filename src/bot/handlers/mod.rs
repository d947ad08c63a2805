//! Telegram update handlers
//!
//! This module wires commands, inline button presses and free text into the
//! dispatcher and maps service errors onto replies.

/// Inline button presses
pub mod callbacks;
/// Checkout and admin wizards driven by text and buttons
pub mod dialogue;
/// Messages pushed to admins and customers
pub mod notify;

use crate::{
    bot::{commands, commands::Command, format, ShopContext},
    errors::{Error, Result},
};
use teloxide::{
    dispatching::UpdateHandler,
    prelude::*,
    types::{InlineKeyboardMarkup, MessageId},
    ApiError, RequestError,
};
use tracing::{debug, error, warn};

/// Error type returned by dispatcher endpoints.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Builds the dispatcher tree: commands first, then plain text, then buttons.
pub fn schema(ctx: ShopContext) -> UpdateHandler<HandlerError> {
    let command_ctx = ctx.clone();
    let text_ctx = ctx.clone();
    let callback_ctx = ctx;

    dptree::entry()
        .branch(
            Update::filter_message().branch(dptree::entry().filter_command::<Command>().endpoint(
                move |bot: Bot, msg: Message, cmd: Command| {
                    let ctx = command_ctx.clone();
                    async move {
                        let result = commands::handle_command(&bot, &msg, cmd, &ctx).await;
                        report(&bot, msg.chat.id, &ctx, result).await;
                        Ok(())
                    }
                },
            )),
        )
        .branch(Update::filter_message().endpoint(move |bot: Bot, msg: Message| {
            let ctx = text_ctx.clone();
            async move {
                let result = dialogue::handle_text(&bot, &msg, &ctx).await;
                report(&bot, msg.chat.id, &ctx, result).await;
                Ok(())
            }
        }))
        .branch(
            Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
                let ctx = callback_ctx.clone();
                async move {
                    callbacks::handle_callback(&bot, &q, &ctx).await;
                    Ok(())
                }
            }),
        )
}

/// Shows a screen: edits `edit` in place when given, otherwise sends a new message.
///
/// Falls back to a new message when the original can no longer be edited.
pub async fn show(
    bot: &Bot,
    chat: ChatId,
    edit: Option<MessageId>,
    text: String,
    markup: Option<InlineKeyboardMarkup>,
) -> Result<()> {
    if let Some(message_id) = edit {
        let mut request = bot.edit_message_text(chat, message_id, text.clone());
        if let Some(markup) = markup.clone() {
            request = request.reply_markup(markup);
        }
        match request.await {
            Ok(_) | Err(RequestError::Api(ApiError::MessageNotModified)) => return Ok(()),
            Err(e) => debug!("Cannot edit message {} in chat {}: {}", message_id.0, chat, e),
        }
    }

    let mut request = bot.send_message(chat, text);
    if let Some(markup) = markup {
        request = request.reply_markup(markup);
    }
    request.await?;
    Ok(())
}

/// Logs a failed handler and tells the user what happened.
///
/// Errors not caused by the user also drop the chat's dialogue.
pub async fn report(bot: &Bot, chat: ChatId, ctx: &ShopContext, result: Result<()>) {
    let Err(err) = result else {
        return;
    };

    if err.is_user_facing() {
        warn!("Request in chat {} rejected: {}", chat, err);
    } else {
        error!("Handler failed in chat {}: {}", chat, err);
        ctx.dialogues.clear(chat);
    }

    if matches!(err, Error::Telegram(_)) {
        return;
    }
    if let Err(e) = bot.send_message(chat, format::error_text(&err)).await {
        error!("Failed to send error reply to chat {}: {}", chat, e);
    }
}
