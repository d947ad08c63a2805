//! Catalog business logic - Handles categories and products.
//!
//! This module provides functions for creating, retrieving, updating, and deleting
//! categories and products. Stock levels are managed separately in
//! [`crate::core::stock`]; here the stock is only set once, at creation time.
//! All functions are async and return Result types for error handling.

use crate::{
    config::catalog::CatalogConfig,
    core::units::UnitType,
    entities::{CartItem, Category, Product, cart_item, category, product},
    errors::{Error, Result},
};
use sea_orm::{PaginatorTrait, QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{info, instrument};

/// Shortest accepted name for categories and products.
pub const MIN_NAME_LEN: usize = 2;

/// Longest category name in bytes. Names travel inside Telegram callback data,
/// which is capped at 64 bytes.
pub const MAX_CATEGORY_NAME_BYTES: usize = 40;

/// Fields needed to create a product.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    /// Product name
    pub name: String,
    /// Description shown on the product card
    pub description: String,
    /// Price per 100 g or per piece
    pub price: f64,
    /// How the product is measured
    pub unit_type: UnitType,
    /// Initial stock in grams or pieces
    pub stock_units: i64,
    /// Category the product belongs to
    pub category_id: i64,
}

/// Partial product update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductUpdate {
    /// New name
    pub name: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New price
    pub price: Option<f64>,
    /// New unit type; also resets the measurement step
    pub unit_type: Option<UnitType>,
    /// New category
    pub category_id: Option<i64>,
}

impl ProductUpdate {
    /// Whether the update would change nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.unit_type.is_none()
            && self.category_id.is_none()
    }
}

/// Validates and normalizes a category or product name.
pub fn validate_name(name: &str, what: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.chars().count() < MIN_NAME_LEN {
        return Err(Error::Validation {
            message: format!("{what} name must be at least {MIN_NAME_LEN} characters long"),
        });
    }
    Ok(trimmed.to_string())
}

/// Validates a list price.
pub fn validate_price(price: f64) -> Result<f64> {
    if !price.is_finite() || price < 0.0 {
        return Err(Error::InvalidPrice { price });
    }
    Ok(price)
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

/// Retrieves all categories ordered alphabetically by name.
pub async fn get_all_categories(db: &DatabaseConnection) -> Result<Vec<category::Model>> {
    Category::find()
        .order_by_asc(category::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves categories that have at least one available product.
///
/// This is the list customers see; empty or sold-out categories are hidden.
pub async fn get_categories_with_available_products(
    db: &DatabaseConnection,
) -> Result<Vec<category::Model>> {
    let categories = get_all_categories(db).await?;
    let mut visible = Vec::with_capacity(categories.len());

    for cat in categories {
        let available = Product::find()
            .filter(product::Column::CategoryId.eq(cat.id))
            .filter(product::Column::Available.eq(true))
            .count(db)
            .await?;
        if available > 0 {
            visible.push(cat);
        }
    }

    Ok(visible)
}

/// Finds a category by its unique ID.
pub async fn get_category_by_id(
    db: &DatabaseConnection,
    category_id: i64,
) -> Result<Option<category::Model>> {
    Category::find_by_id(category_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a category by its exact name.
pub async fn get_category_by_name(
    db: &DatabaseConnection,
    name: &str,
) -> Result<Option<category::Model>> {
    Category::find()
        .filter(category::Column::Name.eq(name.trim()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Creates a new category after validating the name and checking it is unique.
///
/// # Errors
/// Returns an error if:
/// - The name is shorter than [`MIN_NAME_LEN`] characters
/// - A category with the same name exists
/// - The database insert fails
#[instrument(skip(db))]
pub async fn create_category(db: &DatabaseConnection, name: String) -> Result<category::Model> {
    let name = validate_name(&name, "Category")?;
    if name.len() > MAX_CATEGORY_NAME_BYTES {
        return Err(Error::Validation {
            message: "Category name is too long".to_string(),
        });
    }

    if get_category_by_name(db, &name).await?.is_some() {
        return Err(Error::Validation {
            message: format!("Category '{name}' already exists"),
        });
    }

    let category = category::ActiveModel {
        name: Set(name),
        created_at: Set(chrono::Utc::now().naive_utc()),
        ..Default::default()
    };
    let created = category.insert(db).await?;
    info!("Created category {} ({})", created.name, created.id);
    Ok(created)
}

/// Counts all products in a category, available or not.
pub async fn count_products_in_category(db: &DatabaseConnection, category_id: i64) -> Result<u64> {
    Product::find()
        .filter(product::Column::CategoryId.eq(category_id))
        .count(db)
        .await
        .map_err(Into::into)
}

/// Deletes an empty category.
///
/// # Errors
/// Returns `CategoryNotFound` if it does not exist and `CategoryNotEmpty` if
/// products still reference it.
#[instrument(skip(db))]
pub async fn delete_category(db: &DatabaseConnection, category_id: i64) -> Result<()> {
    let category = get_category_by_id(db, category_id)
        .await?
        .ok_or_else(|| Error::CategoryNotFound {
            name: category_id.to_string(),
        })?;

    let product_count = count_products_in_category(db, category_id).await?;
    if product_count > 0 {
        return Err(Error::CategoryNotEmpty {
            name: category.name,
            product_count,
        });
    }

    Category::delete_by_id(category_id).exec(db).await?;
    info!("Deleted category {}", category.name);
    Ok(())
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

/// Retrieves a specific product by its unique ID.
pub async fn get_product_by_id(
    db: &DatabaseConnection,
    product_id: i64,
) -> Result<Option<product::Model>> {
    Product::find_by_id(product_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a product or fails with `ProductNotFound`.
pub async fn require_product<C>(db: &C, product_id: i64) -> Result<product::Model>
where
    C: ConnectionTrait,
{
    Product::find_by_id(product_id)
        .one(db)
        .await?
        .ok_or(Error::ProductNotFound { id: product_id })
}

/// Retrieves the products of a category ordered by name.
///
/// With `only_available` set, switched-off products are left out (customer view).
pub async fn get_products_in_category(
    db: &DatabaseConnection,
    category_id: i64,
    only_available: bool,
) -> Result<Vec<product::Model>> {
    let mut query = Product::find().filter(product::Column::CategoryId.eq(category_id));
    if only_available {
        query = query.filter(product::Column::Available.eq(true));
    }
    query
        .order_by_asc(product::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves every product ordered by name.
pub async fn get_all_products(db: &DatabaseConnection) -> Result<Vec<product::Model>> {
    Product::find()
        .order_by_asc(product::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Creates a new product, performing input validation.
///
/// The measurement step comes from the unit type, and the product starts
/// available only if it has stock.
///
/// # Errors
/// Returns an error if:
/// - The name is too short
/// - The price is negative or not finite
/// - The stock is negative
/// - The category does not exist
/// - The database insert fails
#[instrument(skip(db))]
pub async fn create_product(db: &DatabaseConnection, new: NewProduct) -> Result<product::Model> {
    let name = validate_name(&new.name, "Product")?;
    let price = validate_price(new.price)?;

    if new.stock_units < 0 {
        return Err(Error::Validation {
            message: "Stock cannot be negative".to_string(),
        });
    }

    if get_category_by_id(db, new.category_id).await?.is_none() {
        return Err(Error::CategoryNotFound {
            name: new.category_id.to_string(),
        });
    }

    let now = chrono::Utc::now().naive_utc();
    let product = product::ActiveModel {
        name: Set(name),
        description: Set(new.description.trim().to_string()),
        price: Set(price),
        unit_type: Set(new.unit_type.as_str().to_string()),
        measurement_step: Set(new.unit_type.measurement_step()),
        stock_units: Set(new.stock_units),
        available: Set(new.stock_units > 0),
        category_id: Set(new.category_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let created = product.insert(db).await?;
    info!("Created product {} ({})", created.name, created.id);
    Ok(created)
}

/// Applies a partial update to a product.
///
/// Switching to a different unit type drops every cart line for the product
/// and zeroes its stock, since quantities in the old unit mean nothing in the
/// new one. The product stays hidden until stock is set again.
///
/// # Errors
/// Returns an error if the product or new category does not exist, or if a
/// new name or price fails validation.
#[instrument(skip(db))]
pub async fn update_product(
    db: &DatabaseConnection,
    product_id: i64,
    update: ProductUpdate,
) -> Result<product::Model> {
    let txn = db.begin().await?;

    let existing = require_product(&txn, product_id).await?;
    if update.is_empty() {
        return Ok(existing);
    }

    let unit_changed = update
        .unit_type
        .is_some_and(|unit_type| unit_type != existing.unit());
    let mut active: product::ActiveModel = existing.into();

    if let Some(name) = update.name {
        active.name = Set(validate_name(&name, "Product")?);
    }
    if let Some(description) = update.description {
        active.description = Set(description.trim().to_string());
    }
    if let Some(price) = update.price {
        active.price = Set(validate_price(price)?);
    }
    if let Some(unit_type) = update.unit_type {
        active.unit_type = Set(unit_type.as_str().to_string());
        active.measurement_step = Set(unit_type.measurement_step());
    }
    if let Some(category_id) = update.category_id {
        if Category::find_by_id(category_id).one(&txn).await?.is_none() {
            return Err(Error::CategoryNotFound {
                name: category_id.to_string(),
            });
        }
        active.category_id = Set(category_id);
    }
    if unit_changed {
        let dropped = CartItem::delete_many()
            .filter(cart_item::Column::ProductId.eq(product_id))
            .exec(&txn)
            .await?;
        active.stock_units = Set(0);
        active.available = Set(false);
        info!(
            "Unit of product {} changed: stock reset, {} cart lines dropped",
            product_id, dropped.rows_affected
        );
    }
    active.updated_at = Set(chrono::Utc::now().naive_utc());

    let updated = active.update(&txn).await?;
    txn.commit().await?;
    Ok(updated)
}

/// Deletes a product and every cart line that references it.
///
/// Order items keep their frozen copy, so order history is unaffected.
#[instrument(skip(db))]
pub async fn delete_product(db: &DatabaseConnection, product_id: i64) -> Result<product::Model> {
    let txn = db.begin().await?;

    let product = require_product(&txn, product_id).await?;

    CartItem::delete_many()
        .filter(cart_item::Column::ProductId.eq(product_id))
        .exec(&txn)
        .await?;
    Product::delete_by_id(product_id).exec(&txn).await?;

    txn.commit().await?;
    info!("Deleted product {} ({})", product.name, product.id);
    Ok(product)
}

/// Inserts the seed catalog when the database has no categories yet.
///
/// Returns the number of products created. Seed products pointing at an
/// unknown category are skipped with a warning.
pub async fn seed_catalog(db: &DatabaseConnection, seed: &CatalogConfig) -> Result<usize> {
    if Category::find().count(db).await? > 0 {
        info!("Catalog already populated, skipping seed");
        return Ok(0);
    }

    for cat in &seed.categories {
        create_category(db, cat.name.clone()).await?;
    }

    let mut created = 0;
    for item in &seed.products {
        let Some(cat) = get_category_by_name(db, &item.category).await? else {
            tracing::warn!(
                "Seed product '{}' references unknown category '{}'",
                item.name,
                item.category
            );
            continue;
        };
        create_product(
            db,
            NewProduct {
                name: item.name.clone(),
                description: item.description.clone(),
                price: item.price,
                unit_type: item.unit_type,
                stock_units: item.stock,
                category_id: cat.id,
            },
        )
        .await?;
        created += 1;
    }

    info!(
        "Seeded {} categories and {} products",
        seed.categories.len(),
        created
    );
    Ok(created)
}
