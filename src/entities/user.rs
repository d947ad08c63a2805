//! User entity - A Telegram user who talked to the bot.
//!
//! The Telegram ID is stored as text so every table uses the same key type.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Telegram user ID rendered as a string
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Telegram @username, if any
    pub username: Option<String>,
    /// Telegram first name
    pub first_name: Option<String>,
    /// Contact phone saved at checkout
    pub phone: Option<String>,
    /// Name of the customer's pet
    pub pet_name: Option<String>,
    /// Last delivery address used
    pub address: Option<String>,
    /// First contact
    pub created_at: DateTime,
    /// Last profile change
    pub updated_at: DateTime,
}

/// `User` has no declared relationships; carts and orders reference it by ID only
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
