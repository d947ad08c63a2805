//! Unified error type for the shop.
//!
//! Service functions in [`crate::core`] return these errors; the bot layer decides
//! whether a variant is shown to the user (validation, stock, not found) or logged
//! and replaced with a generic failure message.

use thiserror::Error;

/// All errors produced by the crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or missing configuration
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Error returned by `SeaORM`
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or unreadable environment variable
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// Telegram Bot API request failed
    #[error("Telegram request error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    /// User input failed validation (bad number, too-short name, ...)
    #[error("{message}")]
    Validation {
        /// Message that can be shown to the user as-is
        message: String,
    },

    /// No product with this ID
    #[error("Product not found: {id}")]
    ProductNotFound {
        /// Requested product ID
        id: i64,
    },

    /// No category with this name or ID
    #[error("Category not found: {name}")]
    CategoryNotFound {
        /// Requested category name or ID
        name: String,
    },

    /// Category still has products and cannot be deleted
    #[error("Category '{name}' still has {product_count} product(s)")]
    CategoryNotEmpty {
        /// Category name
        name: String,
        /// Number of products still attached
        product_count: u64,
    },

    /// No order with this ID
    #[error("Order not found: {id}")]
    OrderNotFound {
        /// Requested order ID
        id: i64,
    },

    /// Product exists but is switched off
    #[error("Product '{name}' is not available")]
    ProductUnavailable {
        /// Product name
        name: String,
    },

    /// Requested more than the current stock
    #[error("Not enough stock for '{name}': requested {requested}, available {available}")]
    InsufficientStock {
        /// Product name
        name: String,
        /// Units currently in stock
        available: i64,
        /// Units requested
        requested: i64,
        /// How many units are missing
        shortfall: i64,
    },

    /// Quantity must be positive
    #[error("Invalid quantity: {quantity}")]
    InvalidQuantity {
        /// Offending quantity
        quantity: i64,
    },

    /// Price must be finite and non-negative
    #[error("Invalid price: {price}")]
    InvalidPrice {
        /// Offending price
        price: f64,
    },

    /// Checkout requested with nothing in the cart
    #[error("Cart is empty")]
    EmptyCart,

    /// Order status change not allowed by the status graph
    #[error("Cannot move order from {from} to {to}")]
    InvalidStatusTransition {
        /// Current status
        from: String,
        /// Requested status
        to: String,
    },

    /// Backup job failure
    #[error("Backup error: {message}")]
    Backup {
        /// What went wrong
        message: String,
    },
}

impl Error {
    /// Whether the error is caused by the user's request rather than by the system.
    ///
    /// User-caused errors are shown verbatim; everything else is logged and
    /// answered with a generic message.
    #[must_use]
    pub const fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. }
                | Self::ProductNotFound { .. }
                | Self::CategoryNotFound { .. }
                | Self::CategoryNotEmpty { .. }
                | Self::OrderNotFound { .. }
                | Self::ProductUnavailable { .. }
                | Self::InsufficientStock { .. }
                | Self::InvalidQuantity { .. }
                | Self::InvalidPrice { .. }
                | Self::EmptyCart
                | Self::InvalidStatusTransition { .. }
        )
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_facing_classification() {
        assert!(Error::EmptyCart.is_user_facing());
        assert!(
            Error::InsufficientStock {
                name: "Beef jerky".to_string(),
                available: 200,
                requested: 300,
                shortfall: 100,
            }
            .is_user_facing()
        );
        assert!(
            !Error::Backup {
                message: "disk full".to_string()
            }
            .is_user_facing()
        );
        assert!(!Error::Database(sea_orm::DbErr::Custom("boom".to_string())).is_user_facing());
    }

    #[test]
    fn test_insufficient_stock_message_mentions_amounts() {
        let err = Error::InsufficientStock {
            name: "Chicken hearts".to_string(),
            available: 250,
            requested: 400,
            shortfall: 150,
        };
        let text = err.to_string();
        assert!(text.contains("400"));
        assert!(text.contains("250"));
    }
}
