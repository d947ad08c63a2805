//! Core business logic - framework-agnostic shop operations.
//!
//! Nothing in here knows about Telegram. Every function takes the database
//! connection (or a service holding it) explicitly.

/// SQLite file backups and the daily scheduler
pub mod backup;
/// Shopping cart lines with per-line locking
pub mod cart;
/// Categories and products
pub mod catalog;
/// Checkout and admin wizard state machines
pub mod dialogue;
/// Order placement and status changes
pub mod order;
/// Stock levels and availability
pub mod stock;
/// Grams/pieces pricing and formatting
pub mod units;
/// Telegram user profiles
pub mod user;
