//! Inline keyboards.
//!
//! Buttons are built from [`CallbackAction`] values, never from raw strings.

use crate::{
    bot::{
        callback::{CallbackAction, Step},
        format::status_action_label,
    },
    core::{cart::Cart, order::OrderStatus, stock::can_enable, units::UnitType},
    entities::{category, product},
};
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

fn button(label: impl Into<String>, action: &CallbackAction) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(label, action.to_string())
}

/// Stepper value after a tap: moves by one measurement step and stays within
/// `[step, max(stock, step)]`.
#[must_use]
pub fn next_stepper_qty(current: i64, direction: Step, unit: UnitType, stock: i64) -> i64 {
    let step = unit.measurement_step();
    let upper = stock.max(step);
    let next = match direction {
        Step::Inc => current.saturating_add(step),
        Step::Dec => current.saturating_sub(step),
    };
    next.clamp(step, upper)
}

/// Category list for customers.
#[must_use]
pub fn categories_keyboard(categories: &[category::Model]) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = categories
        .iter()
        .map(|c| vec![button(&c.name, &CallbackAction::Category(c.name.clone()))])
        .collect();
    rows.push(vec![button("🛒 Cart", &CallbackAction::CartView)]);
    InlineKeyboardMarkup::new(rows)
}

/// Products of one category for customers.
#[must_use]
pub fn products_keyboard(products: &[product::Model], category: &str) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = products
        .iter()
        .map(|p| {
            let label = format!(
                "{} · {}",
                p.name,
                super::format::format_list_price(p.price, p.unit())
            );
            vec![button(
                label,
                &CallbackAction::Product {
                    id: p.id,
                    category: category.to_string(),
                },
            )]
        })
        .collect();
    rows.push(vec![
        button("⬅️ Categories", &CallbackAction::Catalog),
        button("🛒 Cart", &CallbackAction::CartView),
    ]);
    InlineKeyboardMarkup::new(rows)
}

/// Product card stepper: `-` / `+`, add to cart, back.
#[must_use]
pub fn product_card_keyboard(
    product: &product::Model,
    category: &str,
    qty: i64,
) -> InlineKeyboardMarkup {
    let unit = product.unit();
    let stepper = |step| CallbackAction::Quantity {
        id: product.id,
        step,
        category: category.to_string(),
        qty,
    };

    let mut rows = vec![vec![
        button(format!("➖ {}", unit.format_quantity(unit.measurement_step())), &stepper(Step::Dec)),
        button(format!("➕ {}", unit.format_quantity(unit.measurement_step())), &stepper(Step::Inc)),
    ]];
    if product.available && product.stock_units > 0 {
        rows.push(vec![button(
            format!("🛒 Add {} to cart", unit.format_quantity(qty)),
            &CallbackAction::CartAdd {
                id: product.id,
                qty,
                category: category.to_string(),
            },
        )]);
    }
    rows.push(vec![
        button("⬅️ Back", &CallbackAction::Category(category.to_string())),
        button("🛒 Cart", &CallbackAction::CartView),
    ]);
    InlineKeyboardMarkup::new(rows)
}

/// Cart screen: per-line `-` / `+` / remove, then checkout and clear.
#[must_use]
pub fn cart_keyboard(cart: &Cart) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = cart
        .lines
        .iter()
        .map(|line| {
            vec![
                button(format!("➖ {}", line.name), &CallbackAction::CartDec(line.product_id)),
                button("➕", &CallbackAction::CartInc(line.product_id)),
                button("❌", &CallbackAction::CartDelete(line.product_id)),
            ]
        })
        .collect();

    if !cart.is_empty() {
        rows.push(vec![
            button("✅ Checkout", &CallbackAction::CheckoutStart),
            button("🗑 Clear", &CallbackAction::CartClear),
        ]);
    }
    rows.push(vec![button("⬅️ Catalog", &CallbackAction::Catalog)]);
    InlineKeyboardMarkup::new(rows)
}

/// Confirm / cancel at the end of checkout.
#[must_use]
pub fn checkout_confirm_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        button("✅ Confirm", &CallbackAction::CheckoutConfirm),
        button("❌ Cancel", &CallbackAction::CheckoutCancel),
    ]])
}

/// Cancel button shown while checkout waits for text.
#[must_use]
pub fn checkout_cancel_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![button(
        "❌ Cancel",
        &CallbackAction::CheckoutCancel,
    )]])
}

/// Admin main menu.
#[must_use]
pub fn admin_menu_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![
            button("📦 Stock", &CallbackAction::AdminStock),
            button("⚠️ Low stock", &CallbackAction::AdminLowStock),
        ],
        vec![
            button("🧾 Orders", &CallbackAction::AdminOrders),
            button("🗂 Categories", &CallbackAction::AdminCategories),
        ],
        vec![
            button("➕ Product", &CallbackAction::AdminNewProduct),
            button("➕ Category", &CallbackAction::AdminNewCategory),
        ],
        vec![button("💾 Backup now", &CallbackAction::AdminBackup)],
    ])
}

/// Admin category list: open or delete each category.
#[must_use]
pub fn admin_categories_keyboard(categories: &[category::Model]) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = categories
        .iter()
        .map(|c| {
            vec![
                button(&c.name, &CallbackAction::AdminCategory(c.id)),
                button("🗑", &CallbackAction::AdminDeleteCategory(c.id)),
            ]
        })
        .collect();
    rows.push(vec![
        button("➕ Category", &CallbackAction::AdminNewCategory),
        button("⬅️ Menu", &CallbackAction::AdminMenu),
    ]);
    InlineKeyboardMarkup::new(rows)
}

/// Admin product list leading to each product's stock card.
#[must_use]
pub fn admin_products_keyboard(products: &[product::Model]) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = products
        .iter()
        .map(|p| {
            let mark = if p.available { "🟢" } else { "🔴" };
            vec![button(
                format!("{mark} {} · {}", p.name, p.unit().format_quantity(p.stock_units)),
                &CallbackAction::StockView(p.id),
            )]
        })
        .collect();
    rows.push(vec![button("⬅️ Menu", &CallbackAction::AdminMenu)]);
    InlineKeyboardMarkup::new(rows)
}

/// Admin product card: quick stock changes, toggle, edit, delete.
///
/// The "switch on" button only appears when stock covers one measurement step.
#[must_use]
pub fn admin_product_keyboard(product: &product::Model) -> InlineKeyboardMarkup {
    let unit = product.unit();
    let step = unit.measurement_step();
    let big = step * 10;
    let id = product.id;

    let mut rows = vec![
        vec![
            button(format!("−{}", unit.format_quantity(big)), &CallbackAction::StockSub { id, delta: big }),
            button(format!("−{}", unit.format_quantity(step)), &CallbackAction::StockSub { id, delta: step }),
            button(format!("+{}", unit.format_quantity(step)), &CallbackAction::StockAdd { id, delta: step }),
            button(format!("+{}", unit.format_quantity(big)), &CallbackAction::StockAdd { id, delta: big }),
        ],
        vec![button("✏️ Set stock", &CallbackAction::StockSet(id))],
    ];

    if product.available {
        rows.push(vec![button("🔴 Switch off", &CallbackAction::StockToggle(id))]);
    } else if can_enable(product) {
        rows.push(vec![button("🟢 Switch on", &CallbackAction::StockToggle(id))]);
    }

    rows.push(vec![
        button("📝 Edit", &CallbackAction::Edit(id)),
        button("🗑 Delete", &CallbackAction::Delete(id)),
    ]);
    rows.push(vec![
        button("⬅️ Category", &CallbackAction::AdminCategory(product.category_id)),
        button("⬅️ Menu", &CallbackAction::AdminMenu),
    ]);
    InlineKeyboardMarkup::new(rows)
}

/// Buttons for the legal next statuses of an order. `None` when there are none.
#[must_use]
pub fn order_status_keyboard(order_id: i64, status: OrderStatus) -> Option<InlineKeyboardMarkup> {
    let buttons: Vec<InlineKeyboardButton> = status
        .next_statuses()
        .iter()
        .map(|next| {
            button(
                status_action_label(*next),
                &CallbackAction::Order {
                    id: order_id,
                    status: *next,
                },
            )
        })
        .collect();

    if buttons.is_empty() {
        None
    } else {
        Some(InlineKeyboardMarkup::new(vec![buttons]))
    }
}

/// Yes / no for the edit wizard.
#[must_use]
pub fn yes_no_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        button("Yes", &CallbackAction::WizardYes),
        button("No", &CallbackAction::WizardNo),
    ]])
}

/// Unit choice for the product wizards.
#[must_use]
pub fn unit_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        button("⚖️ By weight (per 100 g)", &CallbackAction::WizardUnit(UnitType::Grams)),
        button("🔢 By piece", &CallbackAction::WizardUnit(UnitType::Pieces)),
    ]])
}

/// Category choice for the product wizards.
#[must_use]
pub fn category_choice_keyboard(categories: &[category::Model]) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(
        categories
            .iter()
            .map(|c| vec![button(&c.name, &CallbackAction::WizardCategory(c.id))]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use teloxide::types::InlineKeyboardButtonKind;

    fn callback_data(markup: &InlineKeyboardMarkup) -> Vec<String> {
        markup
            .inline_keyboard
            .iter()
            .flatten()
            .filter_map(|b| match &b.kind {
                InlineKeyboardButtonKind::CallbackData(data) => Some(data.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_next_stepper_qty() {
        assert_eq!(next_stepper_qty(100, Step::Inc, UnitType::Grams, 1000), 200);
        assert_eq!(next_stepper_qty(1000, Step::Inc, UnitType::Grams, 1000), 1000);
        assert_eq!(next_stepper_qty(100, Step::Dec, UnitType::Grams, 1000), 100);
        assert_eq!(next_stepper_qty(3, Step::Dec, UnitType::Pieces, 10), 2);
        // Stock below one step still allows the minimum selection
        assert_eq!(next_stepper_qty(100, Step::Inc, UnitType::Grams, 50), 100);
    }

    #[test]
    fn test_order_status_keyboard() {
        let markup = order_status_keyboard(5, OrderStatus::Pending).unwrap_or_else(|| {
            panic!("pending orders have next statuses");
        });
        assert_eq!(
            callback_data(&markup),
            vec!["order:5:confirmed", "order:5:cancelled"]
        );
        assert!(order_status_keyboard(5, OrderStatus::Completed).is_none());
    }

    #[test]
    fn test_payloads_parse_back() {
        let markup = admin_menu_keyboard();
        for data in callback_data(&markup) {
            let action = CallbackAction::parse(&data);
            assert!(action.is_some_and(|a| a.is_admin_only()), "{data}");
        }
    }
}
