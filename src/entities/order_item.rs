//! Order item entity - Frozen copy of one cart line at checkout.
//!
//! Name, price and quantity are copied so later catalog edits do not change
//! order history. `product_id` deliberately has no foreign key: products may be
//! deleted while their orders remain.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Order item database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "order_items")]
pub struct Model {
    /// Unique identifier for the item
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Order this item belongs to
    pub order_id: i64,
    /// Product the item was copied from
    pub product_id: i64,
    /// Product name at checkout time
    pub product_name: String,
    /// `"grams"` or `"pieces"`
    pub unit_type: String,
    /// Price per 100 g or per piece at checkout time
    pub unit_price: f64,
    /// Quantity in the product's unit
    pub quantity: i64,
    /// Price of this line at checkout time
    pub line_total: f64,
}

/// Defines relationships between `OrderItem` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each item belongs to one order
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id"
    )]
    Order,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
