//! Inline button presses.
//!
//! Every press is answered exactly once, either silently, with a short toast
//! or with an alert carrying the error text.

use crate::{
    bot::{
        callback::{CallbackAction, Step},
        commands::{
            admin,
            customer::{self, CardRequest},
        },
        format,
        handlers::{dialogue, notify, show},
        keyboards, user_key, ShopContext,
    },
    core::{
        catalog,
        dialogue::{Dialogue, DialogueInput},
        order::{self, OrderStatus},
        stock, user as users,
    },
    errors::{Error, Result},
};
use std::fmt::Write;
use teloxide::{
    prelude::*,
    types::{MessageId, User},
};
use tracing::{debug, error, warn};

/// How a callback query is answered.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Notice {
    /// Short text at the top of the chat
    Toast(String),
    /// Modal popup
    Alert(String),
}

/// Handles one button press and answers the callback query.
pub async fn handle_callback(bot: &Bot, q: &CallbackQuery, ctx: &ShopContext) {
    let notice = match route(bot, q, ctx).await {
        Ok(notice) => notice,
        Err(err) => {
            let chat = q.message.as_ref().map(|m| m.chat().id);
            if err.is_user_facing() {
                warn!("Button {:?} from user {} rejected: {}", q.data, q.from.id, err);
            } else {
                error!("Button {:?} from user {} failed: {}", q.data, q.from.id, err);
                if let Some(chat) = chat {
                    ctx.dialogues.clear(chat);
                }
            }
            Some(Notice::Alert(format::error_text(&err)))
        }
    };

    let mut answer = bot.answer_callback_query(q.id.clone());
    match notice {
        Some(Notice::Toast(text)) => answer = answer.text(text),
        Some(Notice::Alert(text)) => answer = answer.text(text).show_alert(true),
        None => {}
    }
    if let Err(e) = answer.await {
        debug!("Failed to answer callback query {:?}: {}", q.id, e);
    }
}

async fn route(bot: &Bot, q: &CallbackQuery, ctx: &ShopContext) -> Result<Option<Notice>> {
    let Some(data) = q.data.as_deref() else {
        return Ok(None);
    };
    let Some(message) = q.message.as_ref() else {
        return Ok(Some(Notice::Alert(
            "This message is too old. Please use /start.".to_string(),
        )));
    };
    let Some(action) = CallbackAction::parse(data) else {
        warn!("Unknown callback payload '{}' from user {}", data, q.from.id);
        return Ok(Some(Notice::Toast(
            "This button is no longer supported.".to_string(),
        )));
    };
    debug!("Callback {:?} from user {}", action, q.from.id);

    let chat = message.chat().id;
    let edit = Some(message.id());

    if !action.is_admin_only() {
        return customer_action(bot, chat, edit, &q.from, action, ctx).await;
    }
    if !ctx.is_admin(q.from.id) {
        warn!("Non-admin user {} pressed admin button '{}'", q.from.id, data);
        return Ok(Some(Notice::Alert(
            "⛔ This button is for shop admins only.".to_string(),
        )));
    }
    admin_action(bot, chat, edit, &q.from, action, ctx).await
}

async fn customer_action(
    bot: &Bot,
    chat: ChatId,
    edit: Option<MessageId>,
    user: &User,
    action: CallbackAction,
    ctx: &ShopContext,
) -> Result<Option<Notice>> {
    let user_id = user_key(user.id);

    match action {
        CallbackAction::Catalog => customer::catalog(bot, chat, edit, ctx).await?,
        CallbackAction::Category(name) => customer::category(bot, chat, edit, &name, ctx).await?,
        CallbackAction::Product { id, category } => {
            let request = CardRequest {
                product_id: id,
                category: &category,
                qty: None,
            };
            customer::product(bot, chat, edit, user, request, ctx).await?;
        }
        CallbackAction::Quantity {
            id,
            step,
            category,
            qty,
        } => {
            let product = catalog::require_product(&ctx.db, id).await?;
            let next = keyboards::next_stepper_qty(qty, step, product.unit(), product.stock_units);
            if next == qty {
                let text = match step {
                    Step::Inc => "That's all we have in stock.",
                    Step::Dec => "That's the smallest portion.",
                };
                return Ok(Some(Notice::Toast(text.to_string())));
            }
            let request = CardRequest {
                product_id: id,
                category: &category,
                qty: Some(next),
            };
            customer::product(bot, chat, edit, user, request, ctx).await?;
        }
        CallbackAction::CartAdd { id, qty, category } => {
            let line = ctx.cart.add_to_cart(&user_id, id, qty).await?;
            let product = catalog::require_product(&ctx.db, id).await?;
            let request = CardRequest {
                product_id: id,
                category: &category,
                qty: Some(qty),
            };
            customer::product(bot, chat, edit, user, request, ctx).await?;
            return Ok(Some(Notice::Toast(format!(
                "🛒 {} of {} in your cart",
                product.unit().format_quantity(line.quantity),
                product.name
            ))));
        }
        CallbackAction::CartView => customer::cart_screen(bot, chat, edit, user, ctx).await?,
        CallbackAction::CartClear => {
            ctx.cart.clear_cart(&user_id).await?;
            customer::cart_screen(bot, chat, edit, user, ctx).await?;
            return Ok(Some(Notice::Toast("Cart cleared".to_string())));
        }
        CallbackAction::CartInc(id) => {
            return step_cart_line(bot, chat, edit, user, id, Step::Inc, ctx).await;
        }
        CallbackAction::CartDec(id) => {
            return step_cart_line(bot, chat, edit, user, id, Step::Dec, ctx).await;
        }
        CallbackAction::CartDelete(id) => {
            ctx.cart.remove_from_cart(&user_id, id).await?;
            customer::cart_screen(bot, chat, edit, user, ctx).await?;
            return Ok(Some(Notice::Toast("Removed".to_string())));
        }
        CallbackAction::CheckoutStart => {
            if ctx.cart.get_cart(&user_id).await?.is_empty() {
                return Err(Error::EmptyCart);
            }
            let saved_phone = users::get_user(&ctx.db, &user_id)
                .await?
                .and_then(|profile| profile.phone);
            dialogue::begin(bot, chat, Dialogue::start_checkout(saved_phone), ctx).await?;
        }
        CallbackAction::CheckoutConfirm => {
            dialogue::feed(bot, chat, user, DialogueInput::Confirm, ctx).await?;
        }
        CallbackAction::CheckoutCancel => {
            dialogue::feed(bot, chat, user, DialogueInput::Cancel, ctx).await?;
        }
        other => warn!("Admin action {:?} routed to the customer handler", other),
    }
    Ok(None)
}

/// Moves a cart line by one measurement step and redraws the cart.
async fn step_cart_line(
    bot: &Bot,
    chat: ChatId,
    edit: Option<MessageId>,
    user: &User,
    product_id: i64,
    direction: Step,
    ctx: &ShopContext,
) -> Result<Option<Notice>> {
    let product = catalog::require_product(&ctx.db, product_id).await?;
    let unit = product.unit();
    let delta = match direction {
        Step::Inc => unit.measurement_step(),
        Step::Dec => -unit.measurement_step(),
    };

    let change = ctx
        .cart
        .update_cart_quantity(&user_key(user.id), product_id, delta)
        .await?;
    customer::cart_screen(bot, chat, edit, user, ctx).await?;

    Ok(change.clamped.then(|| {
        Notice::Toast(format!(
            "Only {} in stock",
            unit.format_quantity(product.stock_units)
        ))
    }))
}

async fn admin_action(
    bot: &Bot,
    chat: ChatId,
    edit: Option<MessageId>,
    user: &User,
    action: CallbackAction,
    ctx: &ShopContext,
) -> Result<Option<Notice>> {
    match action {
        CallbackAction::AdminMenu => admin::menu(bot, chat, edit).await?,
        CallbackAction::AdminStock => admin::stock_overview(bot, chat, edit, ctx).await?,
        CallbackAction::AdminLowStock => admin::low_stock(bot, chat, edit, ctx).await?,
        CallbackAction::AdminOrders => admin::recent_orders(bot, chat, ctx).await?,
        CallbackAction::AdminBackup => admin::backup(bot, chat, ctx).await?,
        CallbackAction::AdminCategories => admin::categories(bot, chat, edit, ctx).await?,
        CallbackAction::AdminCategory(id) => {
            admin::category_products(bot, chat, edit, id, ctx).await?;
        }
        CallbackAction::AdminDeleteCategory(id) => {
            catalog::delete_category(&ctx.db, id).await?;
            admin::categories(bot, chat, edit, ctx).await?;
            return Ok(Some(Notice::Toast("Category deleted".to_string())));
        }
        CallbackAction::AdminNewCategory => {
            dialogue::begin(bot, chat, Dialogue::AddCategory, ctx).await?;
        }
        CallbackAction::AdminNewProduct => admin::start_add_product(bot, chat, ctx).await?,
        CallbackAction::StockView(id) => admin::product_card(bot, chat, edit, id, ctx).await?,
        CallbackAction::StockToggle(id) => {
            let product = catalog::require_product(&ctx.db, id).await?;
            if !product.available && !stock::can_enable(&product) {
                let unit = product.unit();
                return Ok(Some(Notice::Alert(format!(
                    "Not enough stock to switch on: need at least {}.",
                    unit.format_quantity(unit.availability_threshold())
                ))));
            }
            stock::set_availability(&ctx.db, id, !product.available).await?;
            admin::product_card(bot, chat, edit, id, ctx).await?;
        }
        CallbackAction::StockAdd { id, delta } => {
            stock::add_stock(&ctx.db, id, delta).await?;
            admin::product_card(bot, chat, edit, id, ctx).await?;
        }
        CallbackAction::StockSub { id, delta } => {
            stock::subtract_stock(&ctx.db, id, delta).await?;
            admin::product_card(bot, chat, edit, id, ctx).await?;
        }
        CallbackAction::StockSet(id) => {
            let product = catalog::require_product(&ctx.db, id).await?;
            let dialogue = Dialogue::SetStock {
                product_id: id,
                unit_type: product.unit(),
            };
            dialogue::begin(bot, chat, dialogue, ctx).await?;
        }
        CallbackAction::Edit(id) => {
            let product = catalog::require_product(&ctx.db, id).await?;
            bot.send_message(chat, format!("📝 Editing '{}'", product.name))
                .await?;
            dialogue::begin(bot, chat, Dialogue::start_edit_product(id), ctx).await?;
        }
        CallbackAction::Delete(id) => {
            let deleted = catalog::delete_product(&ctx.db, id).await?;
            admin::category_products(bot, chat, edit, deleted.category_id, ctx).await?;
            return Ok(Some(Notice::Toast(format!("'{}' deleted", deleted.name))));
        }
        CallbackAction::Order { id, status } => {
            return change_order_status(bot, chat, edit, id, status, ctx).await;
        }
        CallbackAction::WizardYes => {
            dialogue::feed(bot, chat, user, DialogueInput::Yes, ctx).await?;
        }
        CallbackAction::WizardNo => dialogue::feed(bot, chat, user, DialogueInput::No, ctx).await?,
        CallbackAction::WizardUnit(unit) => {
            dialogue::feed(bot, chat, user, DialogueInput::Unit(unit), ctx).await?;
        }
        CallbackAction::WizardCategory(id) => {
            dialogue::feed(bot, chat, user, DialogueInput::Category(id), ctx).await?;
        }
        other => warn!("Customer action {:?} routed to the admin handler", other),
    }
    Ok(None)
}

async fn change_order_status(
    bot: &Bot,
    chat: ChatId,
    edit: Option<MessageId>,
    order_id: i64,
    status: OrderStatus,
    ctx: &ShopContext,
) -> Result<Option<Notice>> {
    let updated = order::update_order_status(&ctx.db, order_id, status).await?;
    let items = order::get_order_items(&ctx.db, updated.id).await?;

    let mut text = format::order_text(&updated, &items);
    let _ = write!(text, "\n📍 {}\n📞 {}", updated.address, updated.phone);
    show(
        bot,
        chat,
        edit,
        text,
        keyboards::order_status_keyboard(updated.id, status),
    )
    .await?;

    notify::notify_customer_status(bot, &updated, status).await;
    Ok(Some(Notice::Toast(format!(
        "Order #{}: {}",
        updated.id,
        format::status_label(status)
    ))))
}
