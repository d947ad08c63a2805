//! Cart business logic - One cart per Telegram user, one line per product.
//!
//! Quantities are stored in the product's unit (grams or pieces). Requests from
//! the product card carry an absolute quantity (the stepper value), so
//! [`CartService::add_to_cart`] sets the line instead of adding to it; the cart
//! screen's +/- buttons go through [`CartService::update_cart_quantity`].
//!
//! Rapid taps arrive as independent tasks, so every mutation of a line runs
//! under a per-(user, product) async mutex. The lock lives in this process
//! only; it is not a database-level guarantee.

use crate::{
    core::{catalog::require_product, units::UnitType},
    entities::{CartItem, Product, cart_item, product},
    errors::{Error, Result},
};
use dashmap::DashMap;
use sea_orm::{QueryOrder, Set, prelude::*};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

type LineKey = (String, i64);

/// One line of a cart joined with the live product.
#[derive(Debug, Clone, PartialEq)]
pub struct CartLine {
    /// Product ID
    pub product_id: i64,
    /// Current product name
    pub name: String,
    /// How the product is measured
    pub unit_type: UnitType,
    /// Current list price (per 100 g or per piece)
    pub unit_price: f64,
    /// Quantity in the cart
    pub quantity: i64,
    /// Current stock of the product
    pub stock_units: i64,
    /// Whether the product can currently be bought
    pub available: bool,
    /// Unit-aware price of this line
    pub line_total: f64,
}

impl CartLine {
    fn from_parts(item: &cart_item::Model, product: &product::Model) -> Self {
        let unit_type = product.unit();
        Self {
            product_id: product.id,
            name: product.name.clone(),
            unit_type,
            unit_price: product.price,
            quantity: item.quantity,
            stock_units: product.stock_units,
            available: product.available,
            line_total: unit_type.line_price(product.price, item.quantity),
        }
    }
}

/// A user's cart with computed total.
#[derive(Debug, Clone, PartialEq)]
pub struct Cart {
    /// Owner of the cart
    pub user_id: String,
    /// Lines ordered by product name
    pub lines: Vec<CartLine>,
    /// Sum of all line totals
    pub total: f64,
}

impl Cart {
    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Result of a +/- adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantityChange {
    /// Quantity before the change (0 if there was no line)
    pub previous: i64,
    /// Quantity after the change (0 means the line was removed)
    pub current: i64,
    /// Whether the requested value was cut to fit `[0, stock]`
    pub clamped: bool,
}

/// Cart operations with per-line locking.
///
/// Cheap to clone; clones share the database handle and the lock registry.
#[derive(Clone)]
pub struct CartService {
    db: DatabaseConnection,
    locks: Arc<DashMap<LineKey, Arc<Mutex<()>>>>,
}

impl CartService {
    /// Creates a cart service on top of an existing connection.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            locks: Arc::new(DashMap::new()),
        }
    }

    /// The underlying database connection.
    #[must_use]
    pub const fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    fn line_lock(&self, key: &LineKey) -> Arc<Mutex<()>> {
        Arc::clone(&self.locks.entry(key.clone()).or_default())
    }

    /// Drops the registry entry once no other task holds or waits on it.
    fn release_line_lock(&self, key: &LineKey) {
        self.locks
            .remove_if(key, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// Sets the quantity of a cart line, creating it if needed.
    ///
    /// # Errors
    /// - `ProductNotFound` if the product does not exist
    /// - `ProductUnavailable` if it is switched off
    /// - `InvalidQuantity` if `quantity` is not positive
    /// - `InsufficientStock` (with the shortfall) if `quantity` exceeds stock
    #[instrument(skip(self))]
    pub async fn add_to_cart(
        &self,
        user_id: &str,
        product_id: i64,
        quantity: i64,
    ) -> Result<cart_item::Model> {
        let key = (user_id.to_string(), product_id);
        let lock = self.line_lock(&key);
        let guard = lock.lock().await;

        let result = self.set_line(user_id, product_id, quantity).await;

        drop(guard);
        drop(lock);
        self.release_line_lock(&key);
        result
    }

    async fn set_line(
        &self,
        user_id: &str,
        product_id: i64,
        quantity: i64,
    ) -> Result<cart_item::Model> {
        let product = require_product(&self.db, product_id).await?;

        if !product.available {
            return Err(Error::ProductUnavailable { name: product.name });
        }
        if quantity <= 0 {
            return Err(Error::InvalidQuantity { quantity });
        }
        if quantity > product.stock_units {
            return Err(Error::InsufficientStock {
                shortfall: quantity - product.stock_units,
                available: product.stock_units,
                requested: quantity,
                name: product.name,
            });
        }

        let saved = self.write_line(user_id, product_id, quantity).await?;
        debug!(
            "Cart line ({}, {}) set to {}",
            user_id, product_id, saved.quantity
        );
        Ok(saved)
    }

    /// Adjusts a cart line by a signed delta, clamped to `[0, stock]`.
    ///
    /// Reaching zero deletes the line. A positive delta on a missing line
    /// creates it; a non-positive delta on a missing line is a no-op.
    ///
    /// # Errors
    /// - `ProductNotFound` if the product does not exist
    /// - `ProductUnavailable` when increasing a switched-off product
    #[instrument(skip(self))]
    pub async fn update_cart_quantity(
        &self,
        user_id: &str,
        product_id: i64,
        delta: i64,
    ) -> Result<QuantityChange> {
        let key = (user_id.to_string(), product_id);
        let lock = self.line_lock(&key);
        let guard = lock.lock().await;

        let result = self.adjust_line(user_id, product_id, delta).await;

        drop(guard);
        drop(lock);
        self.release_line_lock(&key);
        result
    }

    async fn adjust_line(
        &self,
        user_id: &str,
        product_id: i64,
        delta: i64,
    ) -> Result<QuantityChange> {
        let product = require_product(&self.db, product_id).await?;
        let existing = self.find_line(user_id, product_id).await?;
        let previous = existing.as_ref().map_or(0, |line| line.quantity);

        if delta > 0 && !product.available {
            return Err(Error::ProductUnavailable { name: product.name });
        }

        let target = previous.saturating_add(delta);
        let current = target.clamp(0, product.stock_units.max(0));
        let change = QuantityChange {
            previous,
            current,
            clamped: current != target,
        };

        match existing {
            Some(line) if current == 0 => {
                line.delete(&self.db).await?;
            }
            None if current == 0 => {}
            _ => {
                self.write_line(user_id, product_id, current).await?;
            }
        }

        debug!(
            "Cart line ({}, {}) {} -> {}",
            user_id, product_id, previous, current
        );
        Ok(change)
    }

    async fn find_line(&self, user_id: &str, product_id: i64) -> Result<Option<cart_item::Model>> {
        CartItem::find_by_id((user_id.to_string(), product_id))
            .one(&self.db)
            .await
            .map_err(Into::into)
    }

    async fn write_line(
        &self,
        user_id: &str,
        product_id: i64,
        quantity: i64,
    ) -> Result<cart_item::Model> {
        let now = chrono::Utc::now().naive_utc();

        if let Some(line) = self.find_line(user_id, product_id).await? {
            let mut active: cart_item::ActiveModel = line.into();
            active.quantity = Set(quantity);
            active.updated_at = Set(now);
            return active.update(&self.db).await.map_err(Into::into);
        }

        cart_item::ActiveModel {
            user_id: Set(user_id.to_string()),
            product_id: Set(product_id),
            quantity: Set(quantity),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await
        .map_err(Into::into)
    }

    /// Removes one line from the cart. Returns whether a line existed.
    #[instrument(skip(self))]
    pub async fn remove_from_cart(&self, user_id: &str, product_id: i64) -> Result<bool> {
        let key = (user_id.to_string(), product_id);
        let lock = self.line_lock(&key);
        let guard = lock.lock().await;

        let result = CartItem::delete_by_id((user_id.to_string(), product_id))
            .exec(&self.db)
            .await
            .map(|res| res.rows_affected > 0)
            .map_err(Into::into);

        drop(guard);
        drop(lock);
        self.release_line_lock(&key);
        result
    }

    /// Quantity of one product in the user's cart, if any.
    pub async fn get_line_quantity(&self, user_id: &str, product_id: i64) -> Result<Option<i64>> {
        Ok(self
            .find_line(user_id, product_id)
            .await?
            .map(|line| line.quantity))
    }

    /// Returns the cart with live product data and a unit-aware total.
    ///
    /// Lines whose product no longer exists are skipped.
    pub async fn get_cart(&self, user_id: &str) -> Result<Cart> {
        let rows = load_cart_rows(&self.db, user_id).await?;

        let mut lines: Vec<CartLine> = rows
            .iter()
            .filter_map(|(item, product)| {
                product
                    .as_ref()
                    .map(|product| CartLine::from_parts(item, product))
            })
            .collect();
        lines.sort_by(|a, b| a.name.cmp(&b.name));

        let total = lines.iter().map(|line| line.line_total).sum();
        Ok(Cart {
            user_id: user_id.to_string(),
            lines,
            total,
        })
    }

    /// Deletes every line of the user's cart. Returns the number of lines removed.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self, user_id: &str) -> Result<u64> {
        clear_cart_lines(&self.db, user_id).await
    }
}

/// Cart lines of a user joined with their product (if it still exists).
pub async fn load_cart_rows<C>(
    db: &C,
    user_id: &str,
) -> Result<Vec<(cart_item::Model, Option<product::Model>)>>
where
    C: ConnectionTrait,
{
    CartItem::find()
        .filter(cart_item::Column::UserId.eq(user_id))
        .order_by_asc(cart_item::Column::ProductId)
        .find_also_related(Product)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Deletes every cart line of a user on any connection or transaction.
pub async fn clear_cart_lines<C>(db: &C, user_id: &str) -> Result<u64>
where
    C: ConnectionTrait,
{
    let result = CartItem::delete_many()
        .filter(cart_item::Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::stock;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_add_to_cart_sets_absolute_quantity() -> Result<()> {
        let (db, _category, product) = setup_with_product().await?;
        let cart = CartService::new(db);

        cart.add_to_cart("1", product.id, 300).await?;
        cart.add_to_cart("1", product.id, 200).await?;

        assert_eq!(cart.get_line_quantity("1", product.id).await?, Some(200));
        assert_eq!(cart.get_cart("1").await?.lines.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_add_to_cart_reports_shortfall() -> Result<()> {
        let (db, category) = setup_with_category().await?;
        let product =
            create_custom_product(&db, "Beef jerky", UnitType::Grams, 300.0, 250, category.id)
                .await?;
        let cart = CartService::new(db);

        let result = cart.add_to_cart("1", product.id, 400).await;
        match result {
            Err(Error::InsufficientStock {
                available,
                requested,
                shortfall,
                ..
            }) => {
                assert_eq!(available, 250);
                assert_eq!(requested, 400);
                assert_eq!(shortfall, 150);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
        assert_eq!(cart.get_line_quantity("1", product.id).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_add_to_cart_validation() -> Result<()> {
        let (db, _category, product) = setup_with_product().await?;
        let cart = CartService::new(db.clone());

        let result = cart.add_to_cart("1", 999, 100).await;
        assert!(matches!(result.unwrap_err(), Error::ProductNotFound { id: 999 }));

        let result = cart.add_to_cart("1", product.id, 0).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidQuantity { quantity: 0 }));

        stock::set_availability(&db, product.id, false).await?;
        let result = cart.add_to_cart("1", product.id, 100).await;
        assert!(matches!(result.unwrap_err(), Error::ProductUnavailable { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_update_cart_quantity_clamps_to_stock() -> Result<()> {
        let (db, category) = setup_with_category().await?;
        let product =
            create_custom_product(&db, "Bully stick", UnitType::Pieces, 150.0, 5, category.id)
                .await?;
        let cart = CartService::new(db);

        cart.add_to_cart("1", product.id, 4).await?;
        let change = cart.update_cart_quantity("1", product.id, 3).await?;
        assert_eq!(
            change,
            QuantityChange {
                previous: 4,
                current: 5,
                clamped: true
            }
        );

        let change = cart.update_cart_quantity("1", product.id, -2).await?;
        assert_eq!(change.current, 3);
        assert!(!change.clamped);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_cart_quantity_removes_line_at_zero() -> Result<()> {
        let (db, _category, product) = setup_with_product().await?;
        let cart = CartService::new(db);

        cart.add_to_cart("1", product.id, 100).await?;
        let change = cart.update_cart_quantity("1", product.id, -500).await?;
        assert_eq!(change.current, 0);
        assert!(change.clamped);
        assert_eq!(cart.get_line_quantity("1", product.id).await?, None);

        // Decreasing a missing line is a no-op, never negative
        let change = cart.update_cart_quantity("1", product.id, -100).await?;
        assert_eq!(change.current, 0);
        assert_eq!(cart.get_line_quantity("1", product.id).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_quantity_never_exceeds_stock_or_goes_negative() -> Result<()> {
        let (db, category) = setup_with_category().await?;
        let product =
            create_custom_product(&db, "Beef jerky", UnitType::Grams, 300.0, 700, category.id)
                .await?;
        let cart = CartService::new(db);

        let deltas = [100, 300, 500, -200, -900, 100, 100, 800, -50];
        for delta in deltas {
            cart.update_cart_quantity("1", product.id, delta).await?;
            let quantity = cart.get_line_quantity("1", product.id).await?.unwrap_or(0);
            assert!((0..=700).contains(&quantity), "quantity {quantity} out of range");
        }
        let _ = cart.add_to_cart("1", product.id, 800).await;
        let quantity = cart.get_line_quantity("1", product.id).await?.unwrap_or(0);
        assert!(quantity <= 700);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_increments_are_not_lost() -> Result<()> {
        let (db, _category, product) = setup_with_product().await?;
        let cart = CartService::new(db);
        let n = 25;

        let mut handles = Vec::new();
        for _ in 0..n {
            let cart = cart.clone();
            let product_id = product.id;
            handles.push(tokio::spawn(async move {
                cart.update_cart_quantity("7", product_id, 1).await
            }));
        }
        for handle in handles {
            handle.await.unwrap()?;
        }

        assert_eq!(cart.get_line_quantity("7", product.id).await?, Some(n));
        assert!(cart.locks.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_get_cart_computes_unit_aware_total() -> Result<()> {
        let (db, category) = setup_with_category().await?;
        let jerky =
            create_custom_product(&db, "Beef jerky", UnitType::Grams, 300.0, 1000, category.id)
                .await?;
        let sticks =
            create_custom_product(&db, "Bully stick", UnitType::Pieces, 300.0, 10, category.id)
                .await?;
        let cart = CartService::new(db);

        cart.add_to_cart("1", jerky.id, 250).await?;
        cart.add_to_cart("1", sticks.id, 3).await?;

        let contents = cart.get_cart("1").await?;
        assert_eq!(contents.lines.len(), 2);
        assert_eq!(contents.lines[0].name, "Beef jerky");
        assert_eq!(contents.lines[0].line_total, 750.0);
        assert_eq!(contents.lines[1].line_total, 900.0);
        assert_eq!(contents.total, 1650.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_clear_cart_then_get_cart_is_empty() -> Result<()> {
        let (db, _category, product) = setup_with_product().await?;
        let cart = CartService::new(db);

        cart.add_to_cart("1", product.id, 100).await?;
        cart.add_to_cart("2", product.id, 100).await?;
        assert_eq!(cart.clear_cart("1").await?, 1);

        assert!(cart.get_cart("1").await?.is_empty());
        assert!(!cart.get_cart("2").await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_remove_from_cart() -> Result<()> {
        let (db, _category, product) = setup_with_product().await?;
        let cart = CartService::new(db);

        cart.add_to_cart("1", product.id, 100).await?;
        assert!(cart.remove_from_cart("1", product.id).await?);
        assert!(!cart.remove_from_cart("1", product.id).await?);
        Ok(())
    }
}
