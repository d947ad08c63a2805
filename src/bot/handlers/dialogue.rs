//! Drives checkout and admin wizards.
//!
//! The state machine itself lives in [`crate::core::dialogue`]; this module
//! stores the state per chat, renders prompts and applies finished dialogues.

use crate::{
    bot::{
        commands::admin,
        format,
        handlers::{notify, show},
        keyboards, user_key, ShopContext,
    },
    core::{
        catalog,
        dialogue::{Dialogue, DialogueInput, EditField, Outcome, Prompt, Transition},
        order::{self, CheckoutDetails},
        stock,
        user as users,
    },
    errors::{Error, Result},
};
use teloxide::{prelude::*, types::User};
use tracing::{info, warn};

/// Plain text message: feeds the active dialogue, if any.
pub async fn handle_text(bot: &Bot, msg: &Message, ctx: &ShopContext) -> Result<()> {
    let (Some(text), Some(user)) = (msg.text(), msg.from.as_ref()) else {
        return Ok(());
    };
    let chat = msg.chat.id;

    if text.starts_with('/') {
        bot.send_message(chat, "Unknown command. See /help.").await?;
        return Ok(());
    }

    if ctx.dialogues.get(chat).is_none() {
        bot.send_message(chat, "Use /start to browse the catalog or /help for the command list.")
            .await?;
        return Ok(());
    }

    feed(bot, chat, user, DialogueInput::Text(text), ctx).await
}

/// Stores a new dialogue for the chat and asks its first question.
pub async fn begin(bot: &Bot, chat: ChatId, dialogue: Dialogue, ctx: &ShopContext) -> Result<()> {
    if ctx.dialogues.get(chat).is_some() {
        info!("Replacing the active dialogue in chat {}", chat);
    }
    ctx.dialogues.set(chat, dialogue.clone());
    ask(bot, chat, None, &dialogue, ctx).await
}

/// Feeds one input to the chat's dialogue and acts on the transition.
pub async fn feed(
    bot: &Bot,
    chat: ChatId,
    user: &User,
    input: DialogueInput<'_>,
    ctx: &ShopContext,
) -> Result<()> {
    let is_admin = ctx.is_admin(user.id);
    let Some(current) = ctx
        .dialogues
        .take_if(chat, |dialogue| dialogue.is_checkout() || is_admin)
    else {
        if ctx.dialogues.get(chat).is_some() {
            warn!("User {} fed an admin dialogue in chat {}", user.id, chat);
            return Ok(());
        }
        bot.send_message(chat, "This step has expired. Please start again.")
            .await?;
        return Ok(());
    };

    let user_id = user_key(user.id);
    match current.advance(input) {
        Transition::Next(next) => {
            ctx.dialogues.set(chat, next.clone());
            ask(bot, chat, Some(&user_id), &next, ctx).await
        }
        Transition::Invalid(state, message) => {
            ctx.dialogues.set(chat, state.clone());
            bot.send_message(chat, format!("⚠️ {message}")).await?;
            ask(bot, chat, Some(&user_id), &state, ctx).await
        }
        Transition::Done(outcome) => apply(bot, chat, user, outcome, ctx).await,
    }
}

/// Sends the question for the dialogue's current step with matching buttons.
async fn ask(
    bot: &Bot,
    chat: ChatId,
    user_id: Option<&str>,
    dialogue: &Dialogue,
    ctx: &ShopContext,
) -> Result<()> {
    let prompt = dialogue.prompt();
    let text = format::prompt_text(&prompt);

    let (text, markup) = match &prompt {
        Prompt::AskAddress | Prompt::AskPhone => (text, Some(keyboards::checkout_cancel_keyboard())),
        Prompt::ConfirmOrder { address, phone } => {
            let text = match user_id {
                Some(id) => format::checkout_summary(&ctx.cart.get_cart(id).await?, address, phone),
                None => text,
            };
            (text, Some(keyboards::checkout_confirm_keyboard()))
        }
        Prompt::AskUnit | Prompt::AskEditValue(EditField::Unit) => {
            (text, Some(keyboards::unit_keyboard()))
        }
        Prompt::AskCategory | Prompt::AskEditValue(EditField::Category) => {
            let categories = catalog::get_all_categories(&ctx.db).await?;
            (text, Some(keyboards::category_choice_keyboard(&categories)))
        }
        Prompt::AskEditConfirm(_) => (text, Some(keyboards::yes_no_keyboard())),
        _ => (text, None),
    };

    show(bot, chat, None, text, markup).await
}

/// Carries out a finished dialogue.
async fn apply(
    bot: &Bot,
    chat: ChatId,
    user: &User,
    outcome: Outcome,
    ctx: &ShopContext,
) -> Result<()> {
    match outcome {
        Outcome::Cancelled => {
            bot.send_message(chat, "Cancelled.").await?;
            Ok(())
        }
        Outcome::PlaceOrder { address, phone } => {
            checkout(bot, chat, user, address, phone, ctx).await
        }
        Outcome::CreateCategory(name) => match catalog::create_category(&ctx.db, name).await {
            Ok(category) => {
                bot.send_message(chat, format!("✅ Category '{}' created.", category.name))
                    .await?;
                admin::categories(bot, chat, None, ctx).await
            }
            Err(Error::Validation { message }) => {
                ctx.dialogues.set(chat, Dialogue::AddCategory);
                bot.send_message(chat, format!("⚠️ {message}")).await?;
                ask(bot, chat, None, &Dialogue::AddCategory, ctx).await
            }
            Err(e) => Err(e),
        },
        Outcome::CreateProduct(new) => {
            let product = catalog::create_product(&ctx.db, new).await?;
            bot.send_message(chat, format!("✅ Product '{}' created.", product.name))
                .await?;
            admin::product_card(bot, chat, None, product.id, ctx).await
        }
        Outcome::UpdateProduct { product_id, update } => {
            if update.is_empty() {
                bot.send_message(chat, "Nothing changed.").await?;
            } else {
                let before = catalog::require_product(&ctx.db, product_id).await?;
                let updated = catalog::update_product(&ctx.db, product_id, update).await?;
                if updated.unit() == before.unit() {
                    bot.send_message(chat, "✅ Product updated.").await?;
                } else {
                    bot.send_message(
                        chat,
                        "✅ Product updated. The unit changed, so stock was reset to zero and \
                         open cart lines were removed. Set the stock to show it again.",
                    )
                    .await?;
                }
            }
            admin::product_card(bot, chat, None, product_id, ctx).await
        }
        Outcome::SetStock {
            product_id,
            stock_units,
        } => {
            stock::update_stock(&ctx.db, product_id, stock_units, None).await?;
            bot.send_message(chat, "✅ Stock updated.").await?;
            admin::product_card(bot, chat, None, product_id, ctx).await
        }
    }
}

async fn checkout(
    bot: &Bot,
    chat: ChatId,
    user: &User,
    address: String,
    phone: String,
    ctx: &ShopContext,
) -> Result<()> {
    let user_id = user_key(user.id);
    let details = CheckoutDetails {
        customer_name: Some(user.full_name()),
        address: address.clone(),
        phone: phone.clone(),
        comment: None,
    };

    let placed = order::place_order(&ctx.db, &user_id, details).await?;
    info!(
        "User {} placed order {} for {:.2}",
        user_id, placed.order.id, placed.order.total
    );

    if let Err(e) = users::update_contact(&ctx.db, &user_id, Some(address), Some(phone)).await {
        warn!("Could not save contact details of user {}: {}", user_id, e);
    }

    bot.send_message(
        chat,
        format!(
            "✅ Thank you! Your order is placed.\n\n{}\n\nWe will contact you to confirm delivery.",
            format::order_text(&placed.order, &placed.items)
        ),
    )
    .await?;

    notify::notify_admins_new_order(bot, ctx, &placed).await;
    Ok(())
}
