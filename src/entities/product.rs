//! Product entity - A treat sold either by weight or by the piece.
//!
//! `price` is per 100 g for weighed products and per piece otherwise; `unit_type`
//! holds the string form of [`crate::core::units::UnitType`]. `stock_units` is
//! grams for weighed products and a piece count for counted ones.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::core::units::UnitType;

/// Product database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    /// Unique identifier for the product
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Name of the product (e.g., "Beef jerky", "Duck neck")
    pub name: String,
    /// Free-form description shown on the product card
    pub description: String,
    /// Price per 100 g (`grams`) or per piece (`pieces`)
    pub price: f64,
    /// `"grams"` or `"pieces"`
    pub unit_type: String,
    /// Increment used by the +/- stepper (100 for grams, 1 for pieces)
    pub measurement_step: i64,
    /// Current stock in the product's unit
    pub stock_units: i64,
    /// Whether customers can see and buy the product
    pub available: bool,
    /// ID of the category this product belongs to
    pub category_id: i64,
    /// When the product was created
    pub created_at: DateTime,
    /// When the product was last modified
    pub updated_at: DateTime,
}

impl Model {
    /// Parsed unit type. Unknown strings fall back to grams.
    #[must_use]
    pub fn unit(&self) -> UnitType {
        UnitType::from_db(&self.unit_type)
    }
}

/// Defines relationships between Product and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each product belongs to one category
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id"
    )]
    Category,
    /// One product appears in many cart lines
    #[sea_orm(has_many = "super::cart_item::Entity")]
    CartItems,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::cart_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CartItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
