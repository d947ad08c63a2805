//! Messages pushed outside the current conversation.
//!
//! Delivery failures are logged and never reach the user who triggered them.

use crate::{
    bot::{format, keyboards, ShopContext},
    core::order::{OrderStatus, PlacedOrder},
    entities::order,
};
use teloxide::prelude::*;
use tracing::{error, info, warn};

/// Sends a new order to every admin with buttons for its next statuses.
pub async fn notify_admins_new_order(bot: &Bot, ctx: &ShopContext, placed: &PlacedOrder) {
    if ctx.settings.admin_ids.is_empty() {
        warn!("Order {} placed but no admins are configured", placed.order.id);
        return;
    }

    let text = format::new_order_notification(&placed.order, &placed.items);
    let markup = keyboards::order_status_keyboard(placed.order.id, OrderStatus::Pending);

    for &admin in &ctx.settings.admin_ids {
        let mut request = bot.send_message(ChatId(admin), text.clone());
        if let Some(markup) = markup.clone() {
            request = request.reply_markup(markup);
        }
        match request.await {
            Ok(_) => info!("Admin {} notified about order {}", admin, placed.order.id),
            Err(e) => error!(
                "Failed to notify admin {} about order {}: {}",
                admin, placed.order.id, e
            ),
        }
    }
}

/// Tells the customer that their order moved to `status`.
pub async fn notify_customer_status(bot: &Bot, order: &order::Model, status: OrderStatus) {
    let Ok(chat) = order.user_id.parse::<i64>().map(ChatId) else {
        warn!(
            "Order {} has a non-numeric user id '{}', customer not notified",
            order.id, order.user_id
        );
        return;
    };

    if let Err(e) = bot
        .send_message(chat, format::status_changed_text(order, status))
        .await
    {
        error!(
            "Failed to notify user {} about order {}: {}",
            order.user_id, order.id, e
        );
    }
}
