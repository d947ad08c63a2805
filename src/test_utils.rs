//! Shared test utilities for the shop.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    core::{
        catalog::{self, NewProduct},
        units::UnitType,
    },
    entities,
    errors::Result,
};
use sea_orm::DatabaseConnection;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a test category with the given name.
pub async fn create_test_category(
    db: &DatabaseConnection,
    name: &str,
) -> Result<entities::category::Model> {
    catalog::create_category(db, name.to_string()).await
}

/// Creates a test product with sensible defaults.
///
/// # Defaults
/// * `unit_type`: grams
/// * `price`: 300.0 per 100 g
/// * `stock_units`: 1000 g (so it starts available)
pub async fn create_test_product(
    db: &DatabaseConnection,
    name: &str,
    category_id: i64,
) -> Result<entities::product::Model> {
    create_custom_product(db, name, UnitType::Grams, 300.0, 1000, category_id).await
}

/// Creates a test product with custom unit, price and stock.
pub async fn create_custom_product(
    db: &DatabaseConnection,
    name: &str,
    unit_type: UnitType,
    price: f64,
    stock_units: i64,
    category_id: i64,
) -> Result<entities::product::Model> {
    catalog::create_product(
        db,
        NewProduct {
            name: name.to_string(),
            description: format!("{name} for good dogs"),
            price,
            unit_type,
            stock_units,
            category_id,
        },
    )
    .await
}

/// Sets up a test environment with one category.
/// Returns (db, category).
pub async fn setup_with_category() -> Result<(DatabaseConnection, entities::category::Model)> {
    let db = setup_test_db().await?;
    let category = create_test_category(&db, "Dried treats").await?;
    Ok((db, category))
}

/// Sets up a test environment with a category and a default product.
/// Returns (db, category, product) for cart, stock and order tests.
pub async fn setup_with_product() -> Result<(
    DatabaseConnection,
    entities::category::Model,
    entities::product::Model,
)> {
    let (db, category) = setup_with_category().await?;
    let product = create_test_product(&db, "Chicken hearts", category.id).await?;
    Ok((db, category, product))
}
