//! Admin panel screens and commands.
//!
//! Callers check admin rights before reaching anything in this module.

use crate::{
    bot::{
        format,
        handlers::{dialogue, notify, show},
        keyboards, ShopContext,
    },
    core::{
        backup::run_backup,
        catalog,
        dialogue::Dialogue,
        order::{self, OrderStatus},
        stock,
    },
    errors::{Error, Result},
};
use std::{collections::HashSet, fmt::Write};
use teloxide::{prelude::*, types::MessageId};
use tracing::{error, info};

/// How many orders the orders screen lists.
const RECENT_ORDERS: u64 = 10;

/// `/admin`
pub async fn menu(bot: &Bot, chat: ChatId, edit: Option<MessageId>) -> Result<()> {
    show(
        bot,
        chat,
        edit,
        "🛠 Admin panel".to_string(),
        Some(keyboards::admin_menu_keyboard()),
    )
    .await
}

/// `/stock`: every product with its stock.
pub async fn stock_overview(
    bot: &Bot,
    chat: ChatId,
    edit: Option<MessageId>,
    ctx: &ShopContext,
) -> Result<()> {
    let products = catalog::get_all_products(&ctx.db).await?;
    show(
        bot,
        chat,
        edit,
        format::stock_list_text("📦 Stock", &products),
        Some(keyboards::admin_products_keyboard(&products)),
    )
    .await
}

/// Low-stock and out-of-stock dashboard.
pub async fn low_stock(
    bot: &Bot,
    chat: ChatId,
    edit: Option<MessageId>,
    ctx: &ShopContext,
) -> Result<()> {
    let low = stock::get_low_stock_products(&ctx.db, ctx.settings.low_stock_steps).await?;
    let out = stock::get_out_of_stock_products(&ctx.db).await?;

    let text = format!(
        "{}\n\n{}",
        format::stock_list_text("⚠️ Running low", &low),
        format::stock_list_text("🚫 Out of stock or switched off", &out)
    );

    let mut seen = HashSet::new();
    let products: Vec<_> = low
        .into_iter()
        .chain(out)
        .filter(|p| seen.insert(p.id))
        .collect();

    show(
        bot,
        chat,
        edit,
        text,
        Some(keyboards::admin_products_keyboard(&products)),
    )
    .await
}

/// Category list with delete buttons.
pub async fn categories(
    bot: &Bot,
    chat: ChatId,
    edit: Option<MessageId>,
    ctx: &ShopContext,
) -> Result<()> {
    let categories = catalog::get_all_categories(&ctx.db).await?;
    let mut text = String::from("🗂 Categories");
    if categories.is_empty() {
        text.push_str("\n\nNo categories yet.");
    }
    show(
        bot,
        chat,
        edit,
        text,
        Some(keyboards::admin_categories_keyboard(&categories)),
    )
    .await
}

/// All products of a category, including switched-off ones.
pub async fn category_products(
    bot: &Bot,
    chat: ChatId,
    edit: Option<MessageId>,
    category_id: i64,
    ctx: &ShopContext,
) -> Result<()> {
    let category = catalog::get_category_by_id(&ctx.db, category_id)
        .await?
        .ok_or_else(|| Error::CategoryNotFound {
            name: category_id.to_string(),
        })?;
    let products = catalog::get_products_in_category(&ctx.db, category.id, false).await?;

    show(
        bot,
        chat,
        edit,
        format::stock_list_text(&format!("🗂 {}", category.name), &products),
        Some(keyboards::admin_products_keyboard(&products)),
    )
    .await
}

/// Admin product card.
pub async fn product_card(
    bot: &Bot,
    chat: ChatId,
    edit: Option<MessageId>,
    product_id: i64,
    ctx: &ShopContext,
) -> Result<()> {
    let info = stock::get_product_stock(&ctx.db, product_id).await?;
    show(
        bot,
        chat,
        edit,
        format::admin_product_text(&info.product, info.category_name.as_deref()),
        Some(keyboards::admin_product_keyboard(&info.product)),
    )
    .await
}

/// Recent orders, one message each with its status buttons.
pub async fn recent_orders(bot: &Bot, chat: ChatId, ctx: &ShopContext) -> Result<()> {
    let orders = order::get_recent_orders(&ctx.db, RECENT_ORDERS).await?;
    if orders.is_empty() {
        bot.send_message(chat, "No orders yet.").await?;
        return Ok(());
    }

    for placed in orders.iter().rev() {
        let items = order::get_order_items(&ctx.db, placed.id).await?;
        let mut text = format::order_text(placed, &items);
        let _ = write!(text, "\n📍 {}\n📞 {}", placed.address, placed.phone);

        let markup = OrderStatus::from_db(&placed.status)
            .ok()
            .and_then(|status| keyboards::order_status_keyboard(placed.id, status));
        show(bot, chat, None, text, markup).await?;
    }
    Ok(())
}

/// `/backup`: copies the database now.
pub async fn backup(bot: &Bot, chat: ChatId, ctx: &ShopContext) -> Result<()> {
    let Some(config) = ctx.backup.clone() else {
        bot.send_message(chat, "Backups are only available for a file-based SQLite database.")
            .await?;
        return Ok(());
    };

    let text = match run_backup(config).await {
        Ok(report) => {
            info!("Manual backup written to {}", report.path.display());
            format::backup_report_text(&report)
        }
        Err(e) => {
            error!("Manual backup failed: {}", e);
            format!("❌ Backup failed: {e}")
        }
    };
    bot.send_message(chat, text).await?;
    Ok(())
}

/// `/add_product`
pub async fn start_add_product(bot: &Bot, chat: ChatId, ctx: &ShopContext) -> Result<()> {
    let categories = catalog::get_all_categories(&ctx.db).await?;
    if categories.is_empty() {
        bot.send_message(chat, "Create a category first with /add_category.")
            .await?;
        return Ok(());
    }
    dialogue::begin(bot, chat, Dialogue::start_add_product(), ctx).await
}

/// `/add_category`
pub async fn start_add_category(bot: &Bot, chat: ChatId, ctx: &ShopContext) -> Result<()> {
    dialogue::begin(bot, chat, Dialogue::AddCategory, ctx).await
}

/// `/set_status <order> <status>`: moves an order to any status.
pub async fn force_status(
    bot: &Bot,
    chat: ChatId,
    order_id: i64,
    status: &str,
    ctx: &ShopContext,
) -> Result<()> {
    let status = OrderStatus::from_db(&status.trim().to_lowercase())?;
    let updated = order::override_order_status(&ctx.db, order_id, status).await?;
    info!("Order {} forced to {}", order_id, status);

    let items = order::get_order_items(&ctx.db, updated.id).await?;
    show(
        bot,
        chat,
        None,
        format::order_text(&updated, &items),
        keyboards::order_status_keyboard(updated.id, status),
    )
    .await?;
    notify::notify_customer_status(bot, &updated, status).await;
    Ok(())
}
