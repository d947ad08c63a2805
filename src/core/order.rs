//! Order business logic - Checkout and the order status lifecycle.
//!
//! Placing an order freezes the cart into order items (name, unit price,
//! quantity and line total are copied), deducts the ordered stock and clears
//! the cart, all inside one database transaction. Cancelling gives the stock
//! back.

use crate::{
    core::{
        cart::{clear_cart_lines, load_cart_rows},
        stock::adjust_stock,
    },
    entities::{Order, OrderItem, Product, order, order_item},
    errors::{Error, Result},
};
use sea_orm::{DatabaseTransaction, QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*};
use strum::{Display, EnumIter, EnumString};
use tracing::{info, instrument, warn};

/// Lifecycle of an order.
///
/// `pending → confirmed → processing → completed`, and any of the first three
/// can be cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum OrderStatus {
    /// Placed by the customer, not yet seen by the shop
    Pending,
    /// Accepted by an admin
    Confirmed,
    /// Being packed or delivered
    Processing,
    /// Delivered
    Completed,
    /// Cancelled; its stock has been returned
    Cancelled,
}

impl OrderStatus {
    /// Parses the value stored in the `status` column.
    pub fn from_db(value: &str) -> Result<Self> {
        value.parse().map_err(|_| Error::Validation {
            message: format!("Unknown order status '{value}'"),
        })
    }

    /// Statuses reachable from this one through the normal flow.
    #[must_use]
    pub const fn next_statuses(self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::Confirmed, Self::Cancelled],
            Self::Confirmed => &[Self::Processing, Self::Cancelled],
            Self::Processing => &[Self::Completed, Self::Cancelled],
            Self::Completed | Self::Cancelled => &[],
        }
    }

    /// Whether `next` is a legal move from this status.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.next_statuses().contains(&next)
    }

    /// Whether an order in this status keeps its stock deducted.
    #[must_use]
    pub const fn holds_stock(self) -> bool {
        !matches!(self, Self::Cancelled)
    }

    /// No further moves are possible.
    #[must_use]
    pub const fn is_final(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

/// Delivery details collected by the checkout dialogue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutDetails {
    /// Telegram display name of the customer
    pub customer_name: Option<String>,
    /// Delivery address
    pub address: String,
    /// Contact phone
    pub phone: String,
    /// Optional note for the shop
    pub comment: Option<String>,
}

/// A freshly placed order with its frozen items.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedOrder {
    /// The order row
    pub order: order::Model,
    /// One item per former cart line
    pub items: Vec<order_item::Model>,
}

/// Turns the user's cart into an order.
///
/// Runs in one transaction: nothing is written unless every line still exists,
/// is available and has enough stock.
///
/// # Errors
/// - `Validation` if the address or phone is blank
/// - `EmptyCart` if the cart has no lines
/// - `ProductNotFound` / `ProductUnavailable` / `InsufficientStock` for the
///   first line that can no longer be fulfilled
#[instrument(skip(db, details))]
pub async fn place_order(
    db: &DatabaseConnection,
    user_id: &str,
    details: CheckoutDetails,
) -> Result<PlacedOrder> {
    let address = details.address.trim().to_string();
    let phone = details.phone.trim().to_string();
    if address.is_empty() || phone.is_empty() {
        return Err(Error::Validation {
            message: "Address and phone are required".to_string(),
        });
    }

    let txn = db.begin().await?;

    let rows = load_cart_rows(&txn, user_id).await?;
    if rows.is_empty() {
        return Err(Error::EmptyCart);
    }

    let mut lines = Vec::with_capacity(rows.len());
    for (item, product) in rows {
        let Some(product) = product else {
            return Err(Error::ProductNotFound {
                id: item.product_id,
            });
        };
        if !product.available {
            return Err(Error::ProductUnavailable { name: product.name });
        }
        if item.quantity > product.stock_units {
            return Err(Error::InsufficientStock {
                shortfall: item.quantity - product.stock_units,
                available: product.stock_units,
                requested: item.quantity,
                name: product.name,
            });
        }
        lines.push((item, product));
    }

    let total: f64 = lines
        .iter()
        .map(|(item, product)| product.unit().line_price(product.price, item.quantity))
        .sum();

    let now = chrono::Utc::now().naive_utc();
    let order = order::ActiveModel {
        user_id: Set(user_id.to_string()),
        customer_name: Set(details.customer_name),
        address: Set(address),
        phone: Set(phone),
        comment: Set(details
            .comment
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())),
        status: Set(OrderStatus::Pending.to_string()),
        total: Set(total),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let mut items = Vec::with_capacity(lines.len());
    for (cart_line, product) in lines {
        let unit = product.unit();
        let item = order_item::ActiveModel {
            order_id: Set(order.id),
            product_id: Set(product.id),
            product_name: Set(product.name.clone()),
            unit_type: Set(unit.as_str().to_string()),
            unit_price: Set(product.price),
            quantity: Set(cart_line.quantity),
            line_total: Set(unit.line_price(product.price, cart_line.quantity)),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        adjust_stock(&txn, product, -cart_line.quantity).await?;
        items.push(item);
    }

    clear_cart_lines(&txn, user_id).await?;
    txn.commit().await?;

    info!(
        "Order {} placed by {} ({} items, total {:.2})",
        order.id,
        user_id,
        items.len(),
        order.total
    );
    Ok(PlacedOrder { order, items })
}

/// Moves an order along the status graph.
///
/// # Errors
/// - `OrderNotFound` if the order does not exist
/// - `InvalidStatusTransition` if the move is not allowed
#[instrument(skip(db))]
pub async fn update_order_status(
    db: &DatabaseConnection,
    order_id: i64,
    new_status: OrderStatus,
) -> Result<order::Model> {
    let txn = db.begin().await?;
    let order = require_order(&txn, order_id).await?;
    let current = OrderStatus::from_db(&order.status)?;

    if !current.can_transition_to(new_status) {
        return Err(Error::InvalidStatusTransition {
            from: current.to_string(),
            to: new_status.to_string(),
        });
    }

    let updated = apply_status(&txn, order, current, new_status).await?;
    txn.commit().await?;
    Ok(updated)
}

/// Sets any status, bypassing the status graph.
///
/// Stock stays consistent: entering `cancelled` returns it, leaving
/// `cancelled` deducts it again (clamped at zero).
#[instrument(skip(db))]
pub async fn override_order_status(
    db: &DatabaseConnection,
    order_id: i64,
    new_status: OrderStatus,
) -> Result<order::Model> {
    let txn = db.begin().await?;
    let order = require_order(&txn, order_id).await?;
    let current = OrderStatus::from_db(&order.status)?;

    if current == new_status {
        return Ok(order);
    }

    warn!(
        "Order {} status overridden: {} -> {}",
        order_id, current, new_status
    );
    let updated = apply_status(&txn, order, current, new_status).await?;
    txn.commit().await?;
    Ok(updated)
}

async fn require_order(txn: &DatabaseTransaction, order_id: i64) -> Result<order::Model> {
    Order::find_by_id(order_id)
        .one(txn)
        .await?
        .ok_or(Error::OrderNotFound { id: order_id })
}

async fn apply_status(
    txn: &DatabaseTransaction,
    order: order::Model,
    current: OrderStatus,
    new_status: OrderStatus,
) -> Result<order::Model> {
    match (current.holds_stock(), new_status.holds_stock()) {
        (true, false) => move_order_stock(txn, order.id, 1).await?,
        (false, true) => move_order_stock(txn, order.id, -1).await?,
        _ => {}
    }

    let mut active: order::ActiveModel = order.into();
    active.status = Set(new_status.to_string());
    active.updated_at = Set(chrono::Utc::now().naive_utc());
    let updated = active.update(txn).await?;

    info!("Order {} is now {}", updated.id, new_status);
    Ok(updated)
}

/// Returns (`direction = 1`) or takes back (`direction = -1`) the stock of
/// every item. Items whose product was deleted are skipped.
async fn move_order_stock(txn: &DatabaseTransaction, order_id: i64, direction: i64) -> Result<()> {
    let items = OrderItem::find()
        .filter(order_item::Column::OrderId.eq(order_id))
        .all(txn)
        .await?;

    for item in items {
        match Product::find_by_id(item.product_id).one(txn).await? {
            Some(product) => {
                adjust_stock(txn, product, direction * item.quantity).await?;
            }
            None => warn!(
                "Order {}: product {} ('{}') no longer exists, stock not moved",
                order_id, item.product_id, item.product_name
            ),
        }
    }
    Ok(())
}

/// Retrieves an order by ID.
pub async fn get_order_by_id(db: &DatabaseConnection, order_id: i64) -> Result<Option<order::Model>> {
    Order::find_by_id(order_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Items of an order in insertion order.
pub async fn get_order_items(
    db: &DatabaseConnection,
    order_id: i64,
) -> Result<Vec<order_item::Model>> {
    OrderItem::find()
        .filter(order_item::Column::OrderId.eq(order_id))
        .order_by_asc(order_item::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// A customer's orders, newest first.
pub async fn get_orders_for_user(
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<Vec<order::Model>> {
    Order::find()
        .filter(order::Column::UserId.eq(user_id))
        .order_by_desc(order::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Orders currently in `status`, oldest first.
pub async fn get_orders_by_status(
    db: &DatabaseConnection,
    status: OrderStatus,
) -> Result<Vec<order::Model>> {
    Order::find()
        .filter(order::Column::Status.eq(status.to_string()))
        .order_by_asc(order::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// The `limit` most recent orders, newest first.
pub async fn get_recent_orders(db: &DatabaseConnection, limit: u64) -> Result<Vec<order::Model>> {
    Order::find()
        .order_by_desc(order::Column::Id)
        .limit(limit)
        .all(db)
        .await
        .map_err(Into::into)
}
