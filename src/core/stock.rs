//! Stock business logic - Inventory levels and availability.
//!
//! Stock is kept in `stock_units` (grams or pieces, depending on the product's
//! unit type). Every mutation here keeps the availability flag consistent:
//! stock at or below zero always switches a product off, and stock coming back
//! from zero switches it on again. [`set_availability`] is the only way to
//! override the flag without touching stock.

use crate::{
    core::catalog::require_product,
    entities::{Category, Product, product},
    errors::{Error, Result},
};
use sea_orm::{Condition, QueryOrder, Set, prelude::*};
use tracing::{info, instrument, warn};

/// Stock snapshot for one product.
#[derive(Debug, Clone)]
pub struct StockInfo {
    /// The product with its current `stock_units` and `available` values
    pub product: product::Model,
    /// Name of the product's category, if it still exists
    pub category_name: Option<String>,
}

impl StockInfo {
    /// Current stock in the product's unit.
    #[must_use]
    pub const fn stock_units(&self) -> i64 {
        self.product.stock_units
    }

    /// Whether customers can currently buy the product.
    #[must_use]
    pub const fn available(&self) -> bool {
        self.product.available
    }
}

/// Availability after a stock change made by add/subtract/checkout/cancel.
///
/// Stock at or below zero disables the product; stock becoming positive from
/// zero re-enables it; otherwise the current flag (possibly a manual override)
/// is kept.
#[must_use]
pub const fn availability_after_change(available: bool, old_stock: i64, new_stock: i64) -> bool {
    if new_stock <= 0 {
        false
    } else if old_stock <= 0 {
        true
    } else {
        available
    }
}

/// Whether an admin may switch the product on: stock must cover at least one
/// measurement step (100 g or 1 piece).
///
/// This only gates the toggle button; [`set_availability`] itself always obeys.
#[must_use]
pub fn can_enable(product: &product::Model) -> bool {
    product.stock_units >= product.unit().availability_threshold()
}

/// Returns the product's stock, availability and category name.
pub async fn get_product_stock(db: &DatabaseConnection, product_id: i64) -> Result<StockInfo> {
    let product = require_product(db, product_id).await?;
    let category_name = Category::find_by_id(product.category_id)
        .one(db)
        .await?
        .map(|c| c.name);

    Ok(StockInfo {
        product,
        category_name,
    })
}

/// Sets the stock to an absolute value, clamped to zero.
///
/// Without an explicit `available`, the product becomes available exactly
/// when the new stock is positive.
#[instrument(skip(db))]
pub async fn update_stock(
    db: &DatabaseConnection,
    product_id: i64,
    new_value: i64,
    available: Option<bool>,
) -> Result<product::Model> {
    let product = require_product(db, product_id).await?;
    let new_value = new_value.max(0);
    let available = available.unwrap_or(new_value > 0);

    let mut active: product::ActiveModel = product.into();
    active.stock_units = Set(new_value);
    active.available = Set(available);
    active.updated_at = Set(chrono::Utc::now().naive_utc());

    let updated = active.update(db).await?;
    info!(
        "Stock of product {} set to {} (available: {})",
        product_id, updated.stock_units, updated.available
    );
    Ok(updated)
}

/// Adds `delta` units of stock.
#[instrument(skip(db))]
pub async fn add_stock(
    db: &DatabaseConnection,
    product_id: i64,
    delta: i64,
) -> Result<product::Model> {
    if delta < 0 {
        return Err(Error::InvalidQuantity { quantity: delta });
    }
    let product = require_product(db, product_id).await?;
    adjust_stock(db, product, delta).await
}

/// Removes `delta` units of stock, clamping at zero.
#[instrument(skip(db))]
pub async fn subtract_stock(
    db: &DatabaseConnection,
    product_id: i64,
    delta: i64,
) -> Result<product::Model> {
    if delta < 0 {
        return Err(Error::InvalidQuantity { quantity: delta });
    }
    let product = require_product(db, product_id).await?;
    adjust_stock(db, product, -delta).await
}

/// Applies a signed stock change to an already loaded product.
///
/// Shared by the add/subtract operations and by order placement and
/// cancellation, which run it inside their own database transaction.
pub async fn adjust_stock<C>(db: &C, product: product::Model, delta: i64) -> Result<product::Model>
where
    C: ConnectionTrait,
{
    let old_stock = product.stock_units;
    let raw_stock = old_stock.saturating_add(delta);
    let new_stock = raw_stock.max(0);
    if raw_stock < 0 {
        warn!(
            "Stock of product {} clamped at 0 (had {}, change {})",
            product.id, old_stock, delta
        );
    }
    let available = availability_after_change(product.available, old_stock, new_stock);

    let mut active: product::ActiveModel = product.into();
    active.stock_units = Set(new_stock);
    active.available = Set(available);
    active.updated_at = Set(chrono::Utc::now().naive_utc());

    active.update(db).await.map_err(Into::into)
}

/// Switches a product on or off regardless of stock (admin override).
#[instrument(skip(db))]
pub async fn set_availability(
    db: &DatabaseConnection,
    product_id: i64,
    available: bool,
) -> Result<product::Model> {
    let product = require_product(db, product_id).await?;
    if available && !can_enable(&product) {
        warn!(
            "Product {} enabled manually with only {} units in stock",
            product_id, product.stock_units
        );
    }

    let mut active: product::ActiveModel = product.into();
    active.available = Set(available);
    active.updated_at = Set(chrono::Utc::now().naive_utc());

    active.update(db).await.map_err(Into::into)
}

/// In-stock products with fewer than `threshold_steps` measurement steps left.
///
/// The threshold is unit-aware: `3` means under 300 g for weighed products and
/// under 3 pieces for counted ones. Sorted by stock ascending.
pub async fn get_low_stock_products(
    db: &DatabaseConnection,
    threshold_steps: i64,
) -> Result<Vec<product::Model>> {
    let in_stock = Product::find()
        .filter(product::Column::StockUnits.gt(0))
        .order_by_asc(product::Column::StockUnits)
        .all(db)
        .await?;

    Ok(in_stock
        .into_iter()
        .filter(|p| p.stock_units < threshold_steps.saturating_mul(p.measurement_step))
        .collect())
}

/// Products with no stock left or switched off.
pub async fn get_out_of_stock_products(db: &DatabaseConnection) -> Result<Vec<product::Model>> {
    Product::find()
        .filter(
            Condition::any()
                .add(product::Column::StockUnits.lte(0))
                .add(product::Column::Available.eq(false)),
        )
        .order_by_asc(product::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::units::UnitType;
    use crate::test_utils::*;

    #[test]
    fn test_availability_after_change() {
        // Reaching zero always disables
        assert!(!availability_after_change(true, 100, 0));
        // Coming back from zero enables
        assert!(availability_after_change(false, 0, 100));
        // Manual "off" survives a restock while stock was already positive
        assert!(!availability_after_change(false, 500, 600));
        assert!(availability_after_change(true, 500, 400));
    }

    #[tokio::test]
    async fn test_get_product_stock() -> Result<()> {
        let (db, category, product) = setup_with_product().await?;

        let info = get_product_stock(&db, product.id).await?;
        assert_eq!(info.stock_units(), product.stock_units);
        assert!(info.available());
        assert_eq!(info.category_name.as_deref(), Some(category.name.as_str()));

        let result = get_product_stock(&db, 999).await;
        assert!(matches!(result.unwrap_err(), Error::ProductNotFound { id: 999 }));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_stock_to_zero_disables() -> Result<()> {
        let (db, _category, product) = setup_with_product().await?;

        let updated = update_stock(&db, product.id, 0, None).await?;
        assert_eq!(updated.stock_units, 0);
        assert!(!updated.available);

        let updated = update_stock(&db, product.id, 500, None).await?;
        assert!(updated.available);

        Ok(())
    }

    #[tokio::test]
    async fn test_update_stock_clamps_and_respects_override() -> Result<()> {
        let (db, _category, product) = setup_with_product().await?;

        let updated = update_stock(&db, product.id, -50, None).await?;
        assert_eq!(updated.stock_units, 0);
        assert!(!updated.available);

        let updated = update_stock(&db, product.id, 0, Some(true)).await?;
        assert_eq!(updated.stock_units, 0);
        assert!(updated.available);

        Ok(())
    }

    #[tokio::test]
    async fn test_add_and_subtract_stock() -> Result<()> {
        let (db, _category, product) = setup_with_product().await?;
        let start = product.stock_units;

        let updated = add_stock(&db, product.id, 250).await?;
        assert_eq!(updated.stock_units, start + 250);

        let updated = subtract_stock(&db, product.id, start + 1000).await?;
        assert_eq!(updated.stock_units, 0);
        assert!(!updated.available);

        let updated = add_stock(&db, product.id, 100).await?;
        assert_eq!(updated.stock_units, 100);
        assert!(updated.available);

        let result = add_stock(&db, product.id, -1).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidQuantity { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_set_availability_is_unconditional() -> Result<()> {
        let (db, _category, product) = setup_with_product().await?;
        update_stock(&db, product.id, 50, None).await?;

        let updated = set_availability(&db, product.id, false).await?;
        assert!(!updated.available);
        assert_eq!(updated.stock_units, 50);

        // 50 g is below the 100 g threshold, so the button would be hidden,
        // but the service method still obeys the admin.
        assert!(!can_enable(&updated));
        let updated = set_availability(&db, product.id, true).await?;
        assert!(updated.available);

        Ok(())
    }

    #[tokio::test]
    async fn test_can_enable_thresholds() -> Result<()> {
        let (db, category) = setup_with_category().await?;
        let jerky =
            create_custom_product(&db, "Beef jerky", UnitType::Grams, 300.0, 99, category.id)
                .await?;
        let sticks =
            create_custom_product(&db, "Bully stick", UnitType::Pieces, 150.0, 1, category.id)
                .await?;

        assert!(!can_enable(&jerky));
        assert!(can_enable(&sticks));
        Ok(())
    }

    #[tokio::test]
    async fn test_low_and_out_of_stock_queries() -> Result<()> {
        let (db, category) = setup_with_category().await?;
        create_custom_product(&db, "Beef jerky", UnitType::Grams, 300.0, 250, category.id).await?;
        create_custom_product(&db, "Lamb lung", UnitType::Grams, 200.0, 5000, category.id).await?;
        create_custom_product(&db, "Bully stick", UnitType::Pieces, 150.0, 2, category.id).await?;
        create_custom_product(&db, "Duck neck", UnitType::Pieces, 90.0, 0, category.id).await?;

        let low = get_low_stock_products(&db, 3).await?;
        let names: Vec<&str> = low.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Bully stick", "Beef jerky"]);

        let out = get_out_of_stock_products(&db).await?;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "Duck neck");

        Ok(())
    }
}
