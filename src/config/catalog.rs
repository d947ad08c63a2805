//! Catalog seed loading from catalog.toml
//!
//! The file is optional. When present and the database has no categories yet,
//! its categories and products are inserted on startup.

use crate::core::units::UnitType;
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Configuration structure representing the entire catalog.toml file
#[derive(Debug, Deserialize, Default)]
pub struct CatalogConfig {
    /// Categories to create
    #[serde(default)]
    pub categories: Vec<CategoryConfig>,
    /// Products to create; each names an existing or seeded category
    #[serde(default)]
    pub products: Vec<ProductConfig>,
}

/// Seed entry for a category
#[derive(Debug, Deserialize, Clone)]
pub struct CategoryConfig {
    /// Category name
    pub name: String,
}

/// Seed entry for a product
#[derive(Debug, Deserialize, Clone)]
pub struct ProductConfig {
    /// Product name
    pub name: String,
    /// Category name
    pub category: String,
    /// Description shown on the product card
    #[serde(default)]
    pub description: String,
    /// How the product is measured
    pub unit_type: UnitType,
    /// Price per 100 g or per piece
    pub price: f64,
    /// Initial stock in grams or pieces
    #[serde(default)]
    pub stock: i64,
}

/// Loads the catalog seed from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - Required fields are missing
pub fn load_catalog<P: AsRef<Path>>(path: P) -> Result<CatalogConfig> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!(
            "Failed to read catalog file {}: {e}",
            path.as_ref().display()
        ),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse catalog.toml: {e}"),
    })
}

/// Loads the catalog seed if the file exists, returning `None` otherwise.
pub fn load_catalog_if_present<P: AsRef<Path>>(path: P) -> Result<Option<CatalogConfig>> {
    if path.as_ref().exists() {
        load_catalog(path).map(Some)
    } else {
        tracing::debug!("No catalog seed at {}", path.as_ref().display());
        Ok(None)
    }
}
