//! Cart item entity - One line of a user's cart.
//!
//! The composite primary key (`user_id`, `product_id`) guarantees at most one
//! line per user per product.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Cart line database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cart_items")]
pub struct Model {
    /// Telegram user ID of the cart owner
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,
    /// Product in the cart
    #[sea_orm(primary_key, auto_increment = false)]
    pub product_id: i64,
    /// Quantity in the product's unit (grams or pieces)
    pub quantity: i64,
    /// When the line was last changed
    pub updated_at: DateTime,
}

/// Defines relationships between `CartItem` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each cart line references one product
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
