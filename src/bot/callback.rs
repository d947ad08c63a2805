//! Inline button payloads.
//!
//! Every `callback_data` string the bot emits is produced by formatting a
//! [`CallbackAction`] and parsed back with [`CallbackAction::parse`]. Payloads
//! are colon-delimited; category names may themselves contain colons, so they
//! are always either the last field or located from the right.

use crate::core::{order::OrderStatus, units::UnitType};
use std::fmt;

/// Direction of a stepper tap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// `+`
    Inc,
    /// `-`
    Dec,
}

impl Step {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Inc => "inc",
            Self::Dec => "dec",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "inc" => Some(Self::Inc),
            "dec" => Some(Self::Dec),
            _ => None,
        }
    }
}

/// A decoded button press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    /// `catalog`
    Catalog,
    /// `category:<name>`
    Category(String),
    /// `product:<id>:<category>`
    Product { id: i64, category: String },
    /// `qty:<id>:<inc|dec>:<category>:<qty>`
    Quantity {
        id: i64,
        step: Step,
        category: String,
        qty: i64,
    },
    /// `cart:add:<id>:<qty>:<category>`
    CartAdd { id: i64, qty: i64, category: String },
    /// `cart:view`
    CartView,
    /// `cart:clear`
    CartClear,
    /// `cart:inc:<id>`
    CartInc(i64),
    /// `cart:dec:<id>`
    CartDec(i64),
    /// `cart:del:<id>`
    CartDelete(i64),
    /// `checkout:start`
    CheckoutStart,
    /// `checkout:confirm`
    CheckoutConfirm,
    /// `checkout:cancel`
    CheckoutCancel,
    /// `admin:menu`
    AdminMenu,
    /// `admin:stock`
    AdminStock,
    /// `admin:low`
    AdminLowStock,
    /// `admin:orders`
    AdminOrders,
    /// `admin:backup`
    AdminBackup,
    /// `admin:categories`
    AdminCategories,
    /// `admin:cat:<id>`
    AdminCategory(i64),
    /// `admin:catdel:<id>`
    AdminDeleteCategory(i64),
    /// `admin:newcat`
    AdminNewCategory,
    /// `admin:newproduct`
    AdminNewProduct,
    /// `stock:view:<id>`
    StockView(i64),
    /// `stock:toggle:<id>`
    StockToggle(i64),
    /// `stock:add:<id>:<delta>`
    StockAdd { id: i64, delta: i64 },
    /// `stock:sub:<id>:<delta>`
    StockSub { id: i64, delta: i64 },
    /// `stock:set:<id>`
    StockSet(i64),
    /// `edit:<id>`
    Edit(i64),
    /// `del:<id>`
    Delete(i64),
    /// `order:<id>:<status>`
    Order { id: i64, status: OrderStatus },
    /// `wiz:yes`
    WizardYes,
    /// `wiz:no`
    WizardNo,
    /// `wiz:unit:<grams|pieces>`
    WizardUnit(UnitType),
    /// `wiz:cat:<id>`
    WizardCategory(i64),
}

impl CallbackAction {
    /// Parses `callback_data`. Unknown or malformed payloads yield `None`.
    #[must_use]
    pub fn parse(data: &str) -> Option<Self> {
        let (head, rest) = match data.split_once(':') {
            Some((head, rest)) => (head, Some(rest)),
            None => (data, None),
        };

        match (head, rest) {
            ("catalog", None) => Some(Self::Catalog),
            ("category", Some(name)) if !name.is_empty() => Some(Self::Category(name.to_string())),
            ("product", Some(rest)) => {
                let (id, category) = rest.split_once(':')?;
                Some(Self::Product {
                    id: id.parse().ok()?,
                    category: category.to_string(),
                })
            }
            ("qty", Some(rest)) => {
                let (id, rest) = rest.split_once(':')?;
                let (step, rest) = rest.split_once(':')?;
                let (category, qty) = rest.rsplit_once(':')?;
                Some(Self::Quantity {
                    id: id.parse().ok()?,
                    step: Step::parse(step)?,
                    category: category.to_string(),
                    qty: qty.parse().ok()?,
                })
            }
            ("cart", Some(rest)) => Self::parse_cart(rest),
            ("checkout", Some("start")) => Some(Self::CheckoutStart),
            ("checkout", Some("confirm")) => Some(Self::CheckoutConfirm),
            ("checkout", Some("cancel")) => Some(Self::CheckoutCancel),
            ("admin", Some(rest)) => Self::parse_admin(rest),
            ("stock", Some(rest)) => Self::parse_stock(rest),
            ("edit", Some(id)) => Some(Self::Edit(id.parse().ok()?)),
            ("del", Some(id)) => Some(Self::Delete(id.parse().ok()?)),
            ("order", Some(rest)) => {
                let (id, status) = rest.split_once(':')?;
                Some(Self::Order {
                    id: id.parse().ok()?,
                    status: status.parse().ok()?,
                })
            }
            ("wiz", Some(rest)) => match rest.split_once(':') {
                None if rest == "yes" => Some(Self::WizardYes),
                None if rest == "no" => Some(Self::WizardNo),
                Some(("unit", unit)) => Some(Self::WizardUnit(unit.parse().ok()?)),
                Some(("cat", id)) => Some(Self::WizardCategory(id.parse().ok()?)),
                _ => None,
            },
            _ => None,
        }
    }

    fn parse_cart(rest: &str) -> Option<Self> {
        match rest.split_once(':') {
            None if rest == "view" => Some(Self::CartView),
            None if rest == "clear" => Some(Self::CartClear),
            Some(("add", rest)) => {
                let (id, rest) = rest.split_once(':')?;
                let (qty, category) = rest.split_once(':')?;
                Some(Self::CartAdd {
                    id: id.parse().ok()?,
                    qty: qty.parse().ok()?,
                    category: category.to_string(),
                })
            }
            Some(("inc", id)) => Some(Self::CartInc(id.parse().ok()?)),
            Some(("dec", id)) => Some(Self::CartDec(id.parse().ok()?)),
            Some(("del", id)) => Some(Self::CartDelete(id.parse().ok()?)),
            _ => None,
        }
    }

    fn parse_admin(rest: &str) -> Option<Self> {
        match rest.split_once(':') {
            None => match rest {
                "menu" => Some(Self::AdminMenu),
                "stock" => Some(Self::AdminStock),
                "low" => Some(Self::AdminLowStock),
                "orders" => Some(Self::AdminOrders),
                "backup" => Some(Self::AdminBackup),
                "categories" => Some(Self::AdminCategories),
                "newcat" => Some(Self::AdminNewCategory),
                "newproduct" => Some(Self::AdminNewProduct),
                _ => None,
            },
            Some(("cat", id)) => Some(Self::AdminCategory(id.parse().ok()?)),
            Some(("catdel", id)) => Some(Self::AdminDeleteCategory(id.parse().ok()?)),
            _ => None,
        }
    }

    fn parse_stock(rest: &str) -> Option<Self> {
        let (verb, rest) = rest.split_once(':')?;
        match verb {
            "view" => Some(Self::StockView(rest.parse().ok()?)),
            "toggle" => Some(Self::StockToggle(rest.parse().ok()?)),
            "set" => Some(Self::StockSet(rest.parse().ok()?)),
            "add" | "sub" => {
                let (id, delta) = rest.split_once(':')?;
                let id = id.parse().ok()?;
                let delta: i64 = delta.parse().ok()?;
                if delta <= 0 {
                    return None;
                }
                if verb == "add" {
                    Some(Self::StockAdd { id, delta })
                } else {
                    Some(Self::StockSub { id, delta })
                }
            }
            _ => None,
        }
    }

    /// Whether the action belongs to the admin panel.
    #[must_use]
    pub const fn is_admin_only(&self) -> bool {
        matches!(
            self,
            Self::AdminMenu
                | Self::AdminStock
                | Self::AdminLowStock
                | Self::AdminOrders
                | Self::AdminBackup
                | Self::AdminCategories
                | Self::AdminCategory(_)
                | Self::AdminDeleteCategory(_)
                | Self::AdminNewCategory
                | Self::AdminNewProduct
                | Self::StockView(_)
                | Self::StockToggle(_)
                | Self::StockAdd { .. }
                | Self::StockSub { .. }
                | Self::StockSet(_)
                | Self::Edit(_)
                | Self::Delete(_)
                | Self::Order { .. }
                | Self::WizardYes
                | Self::WizardNo
                | Self::WizardUnit(_)
                | Self::WizardCategory(_)
        )
    }
}

impl fmt::Display for CallbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Catalog => write!(f, "catalog"),
            Self::Category(name) => write!(f, "category:{name}"),
            Self::Product { id, category } => write!(f, "product:{id}:{category}"),
            Self::Quantity {
                id,
                step,
                category,
                qty,
            } => write!(f, "qty:{id}:{}:{category}:{qty}", step.as_str()),
            Self::CartAdd { id, qty, category } => write!(f, "cart:add:{id}:{qty}:{category}"),
            Self::CartView => write!(f, "cart:view"),
            Self::CartClear => write!(f, "cart:clear"),
            Self::CartInc(id) => write!(f, "cart:inc:{id}"),
            Self::CartDec(id) => write!(f, "cart:dec:{id}"),
            Self::CartDelete(id) => write!(f, "cart:del:{id}"),
            Self::CheckoutStart => write!(f, "checkout:start"),
            Self::CheckoutConfirm => write!(f, "checkout:confirm"),
            Self::CheckoutCancel => write!(f, "checkout:cancel"),
            Self::AdminMenu => write!(f, "admin:menu"),
            Self::AdminStock => write!(f, "admin:stock"),
            Self::AdminLowStock => write!(f, "admin:low"),
            Self::AdminOrders => write!(f, "admin:orders"),
            Self::AdminBackup => write!(f, "admin:backup"),
            Self::AdminCategories => write!(f, "admin:categories"),
            Self::AdminCategory(id) => write!(f, "admin:cat:{id}"),
            Self::AdminDeleteCategory(id) => write!(f, "admin:catdel:{id}"),
            Self::AdminNewCategory => write!(f, "admin:newcat"),
            Self::AdminNewProduct => write!(f, "admin:newproduct"),
            Self::StockView(id) => write!(f, "stock:view:{id}"),
            Self::StockToggle(id) => write!(f, "stock:toggle:{id}"),
            Self::StockAdd { id, delta } => write!(f, "stock:add:{id}:{delta}"),
            Self::StockSub { id, delta } => write!(f, "stock:sub:{id}:{delta}"),
            Self::StockSet(id) => write!(f, "stock:set:{id}"),
            Self::Edit(id) => write!(f, "edit:{id}"),
            Self::Delete(id) => write!(f, "del:{id}"),
            Self::Order { id, status } => write!(f, "order:{id}:{status}"),
            Self::WizardYes => write!(f, "wiz:yes"),
            Self::WizardNo => write!(f, "wiz:no"),
            Self::WizardUnit(unit) => write!(f, "wiz:unit:{unit}"),
            Self::WizardCategory(id) => write!(f, "wiz:cat:{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_customer_payloads() {
        assert_eq!(CallbackAction::parse("catalog"), Some(CallbackAction::Catalog));
        assert_eq!(
            CallbackAction::parse("category:Dried treats"),
            Some(CallbackAction::Category("Dried treats".to_string()))
        );
        assert_eq!(
            CallbackAction::parse("product:12:Dried treats"),
            Some(CallbackAction::Product {
                id: 12,
                category: "Dried treats".to_string()
            })
        );
        assert_eq!(
            CallbackAction::parse("qty:12:inc:Dried treats:300"),
            Some(CallbackAction::Quantity {
                id: 12,
                step: Step::Inc,
                category: "Dried treats".to_string(),
                qty: 300
            })
        );
        assert_eq!(
            CallbackAction::parse("cart:add:12:300:Dried treats"),
            Some(CallbackAction::CartAdd {
                id: 12,
                qty: 300,
                category: "Dried treats".to_string()
            })
        );
        assert_eq!(CallbackAction::parse("cart:dec:5"), Some(CallbackAction::CartDec(5)));
        assert_eq!(
            CallbackAction::parse("checkout:confirm"),
            Some(CallbackAction::CheckoutConfirm)
        );
    }

    #[test]
    fn test_category_names_with_colons() {
        let action = CallbackAction::Quantity {
            id: 3,
            step: Step::Dec,
            category: "Chews: large".to_string(),
            qty: 2,
        };
        assert_eq!(CallbackAction::parse(&action.to_string()), Some(action));

        let action = CallbackAction::CartAdd {
            id: 3,
            qty: 2,
            category: "a:b:c".to_string(),
        };
        assert_eq!(CallbackAction::parse(&action.to_string()), Some(action));
    }

    #[test]
    fn test_parse_admin_payloads() {
        assert_eq!(
            CallbackAction::parse("stock:sub:7:100"),
            Some(CallbackAction::StockSub { id: 7, delta: 100 })
        );
        assert_eq!(
            CallbackAction::parse("order:9:processing"),
            Some(CallbackAction::Order {
                id: 9,
                status: OrderStatus::Processing
            })
        );
        assert_eq!(
            CallbackAction::parse("wiz:unit:pieces"),
            Some(CallbackAction::WizardUnit(UnitType::Pieces))
        );
        assert_eq!(
            CallbackAction::parse("admin:cat:4"),
            Some(CallbackAction::AdminCategory(4))
        );
        assert!(CallbackAction::parse("admin:low").unwrap().is_admin_only());
        assert!(!CallbackAction::parse("cart:view").unwrap().is_admin_only());
    }

    #[test]
    fn test_rejects_malformed_payloads() {
        for data in [
            "",
            "catalog:extra",
            "category:",
            "product:abc:Jerky",
            "qty:1:up:Jerky:100",
            "qty:1:inc:Jerky",
            "cart:add:1:x:Jerky",
            "cart:view:1",
            "stock:add:1:-100",
            "order:1:shipped",
            "wiz:unit:kilograms",
            "something",
        ] {
            assert_eq!(CallbackAction::parse(data), None, "accepted {data:?}");
        }
    }

    #[test]
    fn test_display_matches_wire_format() {
        assert_eq!(CallbackAction::AdminLowStock.to_string(), "admin:low");
        assert_eq!(
            CallbackAction::Order {
                id: 2,
                status: OrderStatus::Cancelled
            }
            .to_string(),
            "order:2:cancelled"
        );
        assert_eq!(
            CallbackAction::WizardUnit(UnitType::Grams).to_string(),
            "wiz:unit:grams"
        );
    }
}
