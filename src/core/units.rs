//! Unit handling - the single place that knows how weighed and counted products differ.
//!
//! Weighed products are priced per 100 g and stepped in 100 g increments;
//! counted products are priced per piece and stepped one at a time. Every price
//! shown or stored anywhere in the crate goes through [`UnitType::line_price`].

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// How a product is measured and priced.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum UnitType {
    /// Sold by weight, price is per 100 g
    Grams,
    /// Sold by count, price is per piece
    Pieces,
}

impl UnitType {
    /// String stored in the `unit_type` column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Grams => "grams",
            Self::Pieces => "pieces",
        }
    }

    /// Parses a stored value. Unknown values are treated as grams, the historical default.
    #[must_use]
    pub fn from_db(value: &str) -> Self {
        value.parse().unwrap_or_else(|_| {
            tracing::warn!("Unknown unit_type '{}', treating as grams", value);
            Self::Grams
        })
    }

    /// Increment used by the +/- stepper.
    #[must_use]
    pub const fn measurement_step(self) -> i64 {
        match self {
            Self::Grams => 100,
            Self::Pieces => 1,
        }
    }

    /// Minimum stock needed before an admin may switch the product back on.
    #[must_use]
    pub const fn availability_threshold(self) -> i64 {
        self.measurement_step()
    }

    /// Price of `quantity` units given the product's list price.
    ///
    /// `grams`: `price / 100 * quantity`; `pieces`: `price * quantity`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn line_price(self, price: f64, quantity: i64) -> f64 {
        match self {
            Self::Grams => price / 100.0 * quantity as f64,
            Self::Pieces => price * quantity as f64,
        }
    }

    /// Human-readable quantity, e.g. `250 g` or `3 pcs`.
    #[must_use]
    pub fn format_quantity(self, quantity: i64) -> String {
        match self {
            Self::Grams => format!("{quantity} g"),
            Self::Pieces => format!("{quantity} pcs"),
        }
    }

    /// Suffix for list prices, e.g. `per 100 g`.
    #[must_use]
    pub const fn price_label(self) -> &'static str {
        match self {
            Self::Grams => "per 100 g",
            Self::Pieces => "per piece",
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;

    #[test]
    fn test_line_price_is_unit_aware() {
        assert_eq!(UnitType::Grams.line_price(300.0, 250), 750.0);
        assert_eq!(UnitType::Pieces.line_price(300.0, 3), 900.0);
        assert_eq!(UnitType::Grams.line_price(300.0, 0), 0.0);
    }

    #[test]
    fn test_steps_and_thresholds() {
        assert_eq!(UnitType::Grams.measurement_step(), 100);
        assert_eq!(UnitType::Pieces.measurement_step(), 1);
        assert_eq!(UnitType::Grams.availability_threshold(), 100);
        assert_eq!(UnitType::Pieces.availability_threshold(), 1);
    }

    #[test]
    fn test_string_forms() {
        assert_eq!(UnitType::Grams.to_string(), "grams");
        assert_eq!("pieces".parse::<UnitType>().ok(), Some(UnitType::Pieces));
        assert_eq!(UnitType::from_db("pieces"), UnitType::Pieces);
        assert_eq!(UnitType::from_db("kilograms"), UnitType::Grams);
        assert_eq!(UnitType::Pieces.as_str(), "pieces");
    }

    #[test]
    fn test_format_quantity() {
        assert_eq!(UnitType::Grams.format_quantity(250), "250 g");
        assert_eq!(UnitType::Pieces.format_quantity(3), "3 pcs");
    }
}
