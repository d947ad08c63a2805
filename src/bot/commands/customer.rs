//! Customer screens: welcome, catalog, cart, order history.
//!
//! Every screen takes an optional message to edit so the same code serves
//! both slash commands (new message) and inline buttons (edit in place).

use crate::{
    bot::{commands::Command, format, handlers::show, keyboards, user_key, ShopContext},
    core::{catalog, order, user as users, user::TelegramProfile},
    errors::{Error, Result},
};
use std::fmt::Write;
use teloxide::{
    prelude::*,
    types::{MessageId, User},
    utils::command::BotCommands,
};

/// How many past orders `/orders` lists.
const HISTORY_LIMIT: usize = 10;

fn profile_of(user: &User) -> TelegramProfile {
    TelegramProfile {
        username: user.username.clone(),
        first_name: Some(user.first_name.clone()),
    }
}

/// `/start`: registers the user and shows the catalog.
pub async fn start(bot: &Bot, chat: ChatId, user: &User, ctx: &ShopContext) -> Result<()> {
    let profile = users::get_or_create_user(&ctx.db, &user_key(user.id), profile_of(user)).await?;
    let categories = catalog::get_categories_with_available_products(&ctx.db).await?;

    let mut text = format::welcome_text(profile.first_name.as_deref(), profile.pet_name.as_deref());
    if categories.is_empty() {
        text.push_str("\n\nThe shelves are empty right now, please check back soon.");
    }
    show(
        bot,
        chat,
        None,
        text,
        Some(keyboards::categories_keyboard(&categories)),
    )
    .await
}

/// `/help`
pub async fn help(bot: &Bot, chat: ChatId, is_admin: bool) -> Result<()> {
    let mut text = Command::descriptions().to_string();
    if !is_admin {
        text = text
            .lines()
            .filter(|line| !line.contains("admin:"))
            .collect::<Vec<_>>()
            .join("\n");
    }
    bot.send_message(chat, text).await?;
    Ok(())
}

/// Category list with products in stock.
pub async fn catalog(
    bot: &Bot,
    chat: ChatId,
    edit: Option<MessageId>,
    ctx: &ShopContext,
) -> Result<()> {
    let categories = catalog::get_categories_with_available_products(&ctx.db).await?;
    let text = if categories.is_empty() {
        "Nothing in stock right now, please check back soon.".to_string()
    } else {
        "🐾 Choose a category:".to_string()
    };
    show(bot, chat, edit, text, Some(keyboards::categories_keyboard(&categories))).await
}

/// Available products of one category.
pub async fn category(
    bot: &Bot,
    chat: ChatId,
    edit: Option<MessageId>,
    name: &str,
    ctx: &ShopContext,
) -> Result<()> {
    let category = catalog::get_category_by_name(&ctx.db, name)
        .await?
        .ok_or_else(|| Error::CategoryNotFound {
            name: name.to_string(),
        })?;
    let products = catalog::get_products_in_category(&ctx.db, category.id, true).await?;

    let text = if products.is_empty() {
        format!("{}\n\nNothing in stock here right now.", category.name)
    } else {
        format!("{}\n\nChoose a treat:", category.name)
    };
    show(
        bot,
        chat,
        edit,
        text,
        Some(keyboards::products_keyboard(&products, &category.name)),
    )
    .await
}

/// Which product card to render.
#[derive(Debug, Clone, Copy)]
pub struct CardRequest<'a> {
    /// Product to show
    pub product_id: i64,
    /// Category the customer came from, for the back button
    pub category: &'a str,
    /// Stepper value; one measurement step when `None`
    pub qty: Option<i64>,
}

/// Product card with the stepper.
pub async fn product(
    bot: &Bot,
    chat: ChatId,
    edit: Option<MessageId>,
    user: &User,
    request: CardRequest<'_>,
    ctx: &ShopContext,
) -> Result<()> {
    let CardRequest {
        product_id,
        category,
        qty,
    } = request;
    let product = catalog::require_product(&ctx.db, product_id).await?;
    let in_cart = ctx
        .cart
        .get_line_quantity(&user_key(user.id), product_id)
        .await?;
    let qty = qty.unwrap_or_else(|| product.unit().measurement_step());

    show(
        bot,
        chat,
        edit,
        format::product_card(&product, qty, in_cart),
        Some(keyboards::product_card_keyboard(&product, category, qty)),
    )
    .await
}

/// `/cart` and the cart screen.
pub async fn cart(bot: &Bot, chat: ChatId, user: &User, ctx: &ShopContext) -> Result<()> {
    cart_screen(bot, chat, None, user, ctx).await
}

/// Cart contents with per-line buttons.
pub async fn cart_screen(
    bot: &Bot,
    chat: ChatId,
    edit: Option<MessageId>,
    user: &User,
    ctx: &ShopContext,
) -> Result<()> {
    let cart = ctx.cart.get_cart(&user_key(user.id)).await?;
    show(
        bot,
        chat,
        edit,
        format::cart_text(&cart),
        Some(keyboards::cart_keyboard(&cart)),
    )
    .await
}

/// `/orders` for customers: the latest orders with their items.
pub async fn order_history(bot: &Bot, chat: ChatId, user: &User, ctx: &ShopContext) -> Result<()> {
    let orders = order::get_orders_for_user(&ctx.db, &user_key(user.id)).await?;
    if orders.is_empty() {
        bot.send_message(chat, "You have no orders yet. /start to browse the catalog.")
            .await?;
        return Ok(());
    }

    let mut text = String::from("📜 Your orders:\n");
    for placed in orders.iter().take(HISTORY_LIMIT) {
        let items = order::get_order_items(&ctx.db, placed.id).await?;
        let _ = write!(text, "\n{}\n", format::order_text(placed, &items));
    }
    bot.send_message(chat, text).await?;
    Ok(())
}

/// `/pet <name>`
pub async fn pet(bot: &Bot, chat: ChatId, user: &User, name: &str, ctx: &ShopContext) -> Result<()> {
    let updated = users::set_pet_name(&ctx.db, &user_key(user.id), name).await?;
    let pet = updated.pet_name.unwrap_or_default();
    bot.send_message(chat, format!("🐶 Nice to meet {pet}! We'll keep the best treats in mind."))
        .await?;
    Ok(())
}

/// `/cancel`
pub async fn cancel(bot: &Bot, chat: ChatId, ctx: &ShopContext) -> Result<()> {
    let text = if ctx.dialogues.clear(chat) {
        "Cancelled."
    } else {
        "Nothing to cancel."
    };
    bot.send_message(chat, text).await?;
    Ok(())
}
