//! Message texts.
//!
//! Everything the bot says is built here from plain models so it can be
//! tested without Telegram. Prices always go through [`UnitType::line_price`].

use crate::{
    core::{
        backup::BackupReport,
        cart::Cart,
        dialogue::{EditField, Prompt},
        order::OrderStatus,
        units::UnitType,
    },
    entities::{order, order_item, product},
    errors::Error,
};
use std::fmt::Write;

/// Currency sign appended to every amount.
pub const CURRENCY: &str = "₽";

/// Generic reply for errors that are not the user's fault.
pub const GENERIC_FAILURE: &str = "❌ Something went wrong. Please try again later.";

/// `750.00 ₽`
#[must_use]
pub fn format_money(amount: f64) -> String {
    format!("{amount:.2} {CURRENCY}")
}

/// `300.00 ₽ per 100 g`
#[must_use]
pub fn format_list_price(price: f64, unit: UnitType) -> String {
    format!("{} {}", format_money(price), unit.price_label())
}

/// Human label for an order status.
#[must_use]
pub const fn status_label(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Pending => "🕐 Pending",
        OrderStatus::Confirmed => "✅ Confirmed",
        OrderStatus::Processing => "📦 Processing",
        OrderStatus::Completed => "🎉 Completed",
        OrderStatus::Cancelled => "❌ Cancelled",
    }
}

/// Button label for moving an order to `status`.
#[must_use]
pub const fn status_action_label(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Pending => "↩️ Back to pending",
        OrderStatus::Confirmed => "✅ Confirm",
        OrderStatus::Processing => "📦 Start processing",
        OrderStatus::Completed => "🎉 Complete",
        OrderStatus::Cancelled => "❌ Cancel",
    }
}

/// Reply text for a failed operation.
///
/// User-facing errors are shown as-is; anything else becomes a generic message.
#[must_use]
pub fn error_text(err: &Error) -> String {
    match err {
        Error::InsufficientStock {
            name,
            available,
            shortfall,
            ..
        } => format!(
            "⚠️ Not enough '{name}' in stock: only {available} left ({shortfall} short)."
        ),
        Error::EmptyCart => "🛒 Your cart is empty.".to_string(),
        err if err.is_user_facing() => format!("⚠️ {err}"),
        _ => GENERIC_FAILURE.to_string(),
    }
}

/// Greeting for `/start`.
#[must_use]
pub fn welcome_text(first_name: Option<&str>, pet_name: Option<&str>) -> String {
    let mut text = match first_name {
        Some(name) => format!("🐾 Hi, {name}!"),
        None => "🐾 Hi!".to_string(),
    };
    match pet_name {
        Some(pet) => {
            let _ = write!(text, " What shall we get {pet} today?");
        }
        None => text.push_str(" Welcome to the treat shop."),
    }
    text.push_str("\n\nPick a category to browse our natural treats.");
    text
}

/// Product card shown to customers with the current stepper value.
#[must_use]
pub fn product_card(product: &product::Model, qty: i64, in_cart: Option<i64>) -> String {
    let unit = product.unit();
    let mut text = format!("🦴 {}\n", product.name);
    if !product.description.is_empty() {
        let _ = writeln!(text, "\n{}", product.description);
    }
    let _ = writeln!(text, "\n💰 {}", format_list_price(product.price, unit));

    if product.available && product.stock_units > 0 {
        let _ = writeln!(text, "📦 In stock: {}", unit.format_quantity(product.stock_units));
    } else {
        text.push_str("🚫 Out of stock\n");
    }

    if let Some(in_cart) = in_cart {
        let _ = writeln!(text, "🛒 In your cart: {}", unit.format_quantity(in_cart));
    }

    let _ = write!(
        text,
        "\nSelected: {} = {}",
        unit.format_quantity(qty),
        format_money(unit.line_price(product.price, qty))
    );
    text
}

/// Cart contents with line prices and total.
#[must_use]
pub fn cart_text(cart: &Cart) -> String {
    if cart.is_empty() {
        return "🛒 Your cart is empty.".to_string();
    }

    let mut text = String::from("🛒 Your cart:\n\n");
    for line in &cart.lines {
        let _ = writeln!(
            text,
            "• {}: {} × {} = {}",
            line.name,
            line.unit_type.format_quantity(line.quantity),
            format_list_price(line.unit_price, line.unit_type),
            format_money(line.line_total)
        );
        if !line.available {
            text.push_str("   ⚠️ currently unavailable\n");
        } else if line.quantity > line.stock_units {
            let _ = writeln!(
                text,
                "   ⚠️ only {} left",
                line.unit_type.format_quantity(line.stock_units)
            );
        }
    }
    let _ = write!(text, "\nTotal: {}", format_money(cart.total));
    text
}

/// Final summary shown before the customer confirms.
#[must_use]
pub fn checkout_summary(cart: &Cart, address: &str, phone: &str) -> String {
    format!(
        "{}\n\n📍 Address: {}\n📞 Phone: {}\n\nConfirm the order?",
        cart_text(cart),
        address,
        phone
    )
}

/// Full order description for admins and order history.
#[must_use]
pub fn order_text(order: &order::Model, items: &[order_item::Model]) -> String {
    let status = OrderStatus::from_db(&order.status)
        .map_or_else(|_| order.status.clone(), |s| status_label(s).to_string());

    let mut text = format!(
        "🧾 Order #{} from {}\nStatus: {}\n\n",
        order.id,
        order.created_at.format("%Y-%m-%d %H:%M"),
        status
    );
    for item in items {
        let unit = UnitType::from_db(&item.unit_type);
        let _ = writeln!(
            text,
            "• {}: {} = {}",
            item.product_name,
            unit.format_quantity(item.quantity),
            format_money(item.line_total)
        );
    }
    let _ = write!(text, "\nTotal: {}", format_money(order.total));
    text
}

/// Notification sent to admins for a new order.
#[must_use]
pub fn new_order_notification(order: &order::Model, items: &[order_item::Model]) -> String {
    let customer = order
        .customer_name
        .as_deref()
        .map_or_else(|| order.user_id.clone(), |name| format!("{name} ({})", order.user_id));

    let mut text = format!("🔔 New order!\n\n{}\n\n", order_text(order, items));
    let _ = write!(
        text,
        "👤 Customer: {}\n📍 Address: {}\n📞 Phone: {}",
        customer, order.address, order.phone
    );
    if let Some(comment) = &order.comment {
        let _ = write!(text, "\n💬 {comment}");
    }
    text
}

/// Message sent to the customer after an admin changed the status.
#[must_use]
pub fn status_changed_text(order: &order::Model, status: OrderStatus) -> String {
    format!("Your order #{} is now: {}", order.id, status_label(status))
}

/// Admin view of a product.
#[must_use]
pub fn admin_product_text(product: &product::Model, category_name: Option<&str>) -> String {
    let unit = product.unit();
    format!(
        "🛠 {} (#{})\nCategory: {}\nPrice: {}\nStock: {}\nAvailable: {}",
        product.name,
        product.id,
        category_name.unwrap_or("—"),
        format_list_price(product.price, unit),
        unit.format_quantity(product.stock_units),
        if product.available { "yes" } else { "no" }
    )
}

/// One line per product with its stock, under a title.
#[must_use]
pub fn stock_list_text(title: &str, products: &[product::Model]) -> String {
    if products.is_empty() {
        return format!("{title}\n\nNothing here.");
    }

    let mut text = format!("{title}\n\n");
    for product in products {
        let mark = if product.available { "🟢" } else { "🔴" };
        let _ = writeln!(
            text,
            "{} {}: {}",
            mark,
            product.name,
            product.unit().format_quantity(product.stock_units)
        );
    }
    text
}

/// Result of a backup run.
#[must_use]
pub fn backup_report_text(report: &BackupReport) -> String {
    let mut text = format!("💾 Backup saved: {}", report.path.display());
    if let Some(mirror) = &report.mirrored {
        let _ = write!(text, "\nMirrored to: {}", mirror.display());
    }
    if report.removed > 0 {
        let _ = write!(text, "\nRemoved {} expired backup(s)", report.removed);
    }
    text
}

/// Question text for a dialogue prompt.
///
/// `ConfirmOrder` needs the cart and is rendered with [`checkout_summary`].
#[must_use]
pub fn prompt_text(prompt: &Prompt) -> String {
    match prompt {
        Prompt::AskAddress => "📍 Please send your delivery address.".to_string(),
        Prompt::AskPhone => "📞 Please send a contact phone number.".to_string(),
        Prompt::ConfirmOrder { address, phone } => {
            format!("📍 {address}\n📞 {phone}\n\nConfirm the order?")
        }
        Prompt::AskCategoryName => "Send the name of the new category.".to_string(),
        Prompt::AskProductName => "Send the product name.".to_string(),
        Prompt::AskDescription => "Send a description (or - to skip).".to_string(),
        Prompt::AskUnit => "How is it sold?".to_string(),
        Prompt::AskPrice(unit) => format!("Send the price {}.", unit.price_label()),
        Prompt::AskStock(unit) | Prompt::AskStockValue { unit_type: unit, .. } => {
            let what = match unit {
                UnitType::Grams => "grams",
                UnitType::Pieces => "pieces",
            };
            format!("Send the stock in {what}.")
        }
        Prompt::AskCategory => "Choose a category.".to_string(),
        Prompt::AskEditConfirm(field) => format!("Change the {}?", field.label()),
        Prompt::AskEditValue(field) => match field {
            EditField::Unit => "Choose the new unit.".to_string(),
            EditField::Category => "Choose the new category.".to_string(),
            EditField::Description => "Send the new description (or - to clear).".to_string(),
            _ => format!("Send the new {}.", field.label()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cart::CartLine;
    use chrono::NaiveDate;

    fn timestamp() -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 9)
            .and_then(|d| d.and_hms_opt(12, 30, 0))
            .unwrap_or_default()
    }

    fn product(unit: UnitType, stock: i64, available: bool) -> product::Model {
        product::Model {
            id: 1,
            name: "Beef jerky".to_string(),
            description: "Air-dried".to_string(),
            price: 300.0,
            unit_type: unit.as_str().to_string(),
            measurement_step: unit.measurement_step(),
            stock_units: stock,
            available,
            category_id: 1,
            created_at: timestamp(),
            updated_at: timestamp(),
        }
    }

    #[test]
    fn test_money_and_list_price() {
        assert_eq!(format_money(750.0), "750.00 ₽");
        assert_eq!(
            format_list_price(300.0, UnitType::Grams),
            "300.00 ₽ per 100 g"
        );
    }

    #[test]
    fn test_product_card_uses_unit_pricing() {
        let text = product_card(&product(UnitType::Grams, 1000, true), 250, Some(100));
        assert!(text.contains("Selected: 250 g = 750.00 ₽"));
        assert!(text.contains("In stock: 1000 g"));
        assert!(text.contains("In your cart: 100 g"));

        let text = product_card(&product(UnitType::Pieces, 0, false), 3, None);
        assert!(text.contains("Selected: 3 pcs = 900.00 ₽"));
        assert!(text.contains("Out of stock"));
    }

    #[test]
    fn test_cart_text() {
        let cart = Cart {
            user_id: "1".to_string(),
            lines: vec![CartLine {
                product_id: 1,
                name: "Beef jerky".to_string(),
                unit_type: UnitType::Grams,
                unit_price: 300.0,
                quantity: 250,
                stock_units: 200,
                available: true,
                line_total: 750.0,
            }],
            total: 750.0,
        };

        let text = cart_text(&cart);
        assert!(text.contains("Beef jerky: 250 g × 300.00 ₽ per 100 g = 750.00 ₽"));
        assert!(text.contains("only 200 g left"));
        assert!(text.ends_with("Total: 750.00 ₽"));

        let empty = Cart {
            user_id: "1".to_string(),
            lines: Vec::new(),
            total: 0.0,
        };
        assert_eq!(cart_text(&empty), "🛒 Your cart is empty.");
    }

    #[test]
    fn test_new_order_notification() {
        let order = order::Model {
            id: 17,
            user_id: "42".to_string(),
            customer_name: Some("Alice".to_string()),
            address: "12 Bark Street".to_string(),
            phone: "+15550100".to_string(),
            comment: None,
            status: "pending".to_string(),
            total: 900.0,
            created_at: timestamp(),
            updated_at: timestamp(),
        };
        let items = vec![order_item::Model {
            id: 1,
            order_id: 17,
            product_id: 3,
            product_name: "Bully stick".to_string(),
            unit_type: "pieces".to_string(),
            unit_price: 300.0,
            quantity: 3,
            line_total: 900.0,
        }];

        let text = new_order_notification(&order, &items);
        assert!(text.contains("Order #17"));
        assert!(text.contains("Status: 🕐 Pending"));
        assert!(text.contains("Bully stick: 3 pcs = 900.00 ₽"));
        assert!(text.contains("Alice (42)"));
        assert!(text.contains("12 Bark Street"));
    }

    #[test]
    fn test_error_text_hides_internal_errors() {
        let internal = Error::Database(sea_orm::DbErr::Custom("disk I/O".to_string()));
        assert_eq!(error_text(&internal), GENERIC_FAILURE);

        let stock = Error::InsufficientStock {
            name: "Beef jerky".to_string(),
            available: 200,
            requested: 300,
            shortfall: 100,
        };
        assert!(error_text(&stock).contains("only 200 left (100 short)"));
    }

    #[test]
    fn test_prompt_texts() {
        assert_eq!(
            prompt_text(&Prompt::AskPrice(UnitType::Pieces)),
            "Send the price per piece."
        );
        assert_eq!(
            prompt_text(&Prompt::AskEditConfirm(EditField::Price)),
            "Change the price?"
        );
    }
}
