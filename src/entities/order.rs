//! Order entity - A confirmed checkout.
//!
//! `status` holds the string form of [`crate::core::order::OrderStatus`].

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Order database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    /// Unique identifier for the order
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Telegram user ID of the customer
    pub user_id: String,
    /// Customer display name at checkout time
    pub customer_name: Option<String>,
    /// Delivery address
    pub address: String,
    /// Contact phone
    pub phone: String,
    /// Optional note from the customer
    pub comment: Option<String>,
    /// `pending`, `confirmed`, `processing`, `completed` or `cancelled`
    pub status: String,
    /// Sum of all line totals
    pub total: f64,
    /// When the order was placed
    pub created_at: DateTime,
    /// When the status last changed
    pub updated_at: DateTime,
}

/// Defines relationships between Order and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One order has many items
    #[sea_orm(has_many = "super::order_item::Entity")]
    Items,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
