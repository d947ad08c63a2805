//! Multi-step conversations - Checkout and the admin wizards.
//!
//! Each conversation is a [`Dialogue`] value. Feeding it a [`DialogueInput`]
//! consumes it and yields a [`Transition`]: the next state, the same state with
//! a validation message, or a finished [`Outcome`] for the bot layer to act on.
//! Nothing here touches the database or Telegram.

use crate::core::{
    catalog::{NewProduct, ProductUpdate, validate_name, validate_price},
    units::UnitType,
    user::normalize_phone,
};

/// Shortest accepted delivery address.
pub const MIN_ADDRESS_LEN: usize = 5;

/// Something the user sent while a dialogue is active.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DialogueInput<'a> {
    /// A text message
    Text(&'a str),
    /// "Yes" button
    Yes,
    /// "No" button
    No,
    /// Unit type button
    Unit(UnitType),
    /// Category button
    Category(i64),
    /// Confirm button at the end of checkout
    Confirm,
    /// Cancel button or `/cancel`
    Cancel,
}

/// Checkout progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutStep {
    /// Asking for the delivery address. A phone already on the profile skips
    /// the phone step.
    WaitingAddress {
        /// Phone from the user profile
        saved_phone: Option<String>,
    },
    /// Asking for the contact phone
    WaitingPhone {
        /// Address given in the previous step
        address: String,
    },
    /// Showing the summary, waiting for confirm or cancel
    Confirmation {
        /// Delivery address
        address: String,
        /// Contact phone
        phone: String,
    },
}

/// Add-product wizard progress. Each step carries the answers so far.
#[derive(Debug, Clone, PartialEq)]
pub enum AddProductStep {
    /// Waiting for the name
    Name,
    /// Waiting for the description (`-` for none)
    Description { name: String },
    /// Waiting for the unit button
    Unit { name: String, description: String },
    /// Waiting for the price
    Price {
        name: String,
        description: String,
        unit_type: UnitType,
    },
    /// Waiting for the initial stock
    Stock {
        name: String,
        description: String,
        unit_type: UnitType,
        price: f64,
    },
    /// Waiting for the category button
    Category {
        name: String,
        description: String,
        unit_type: UnitType,
        price: f64,
        stock_units: i64,
    },
}

/// Product fields the edit wizard walks through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditField {
    /// Product name
    Name,
    /// Description
    Description,
    /// List price
    Price,
    /// Grams or pieces
    Unit,
    /// Category
    Category,
}

impl EditField {
    /// First field of the wizard.
    pub const FIRST: Self = Self::Name;

    /// Field after this one, `None` at the end of the table.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Name => Some(Self::Description),
            Self::Description => Some(Self::Price),
            Self::Price => Some(Self::Unit),
            Self::Unit => Some(Self::Category),
            Self::Category => None,
        }
    }

    /// Lowercase label used in prompts.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Description => "description",
            Self::Price => "price",
            Self::Unit => "unit type",
            Self::Category => "category",
        }
    }
}

/// Edit wizard progress for one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditStep {
    /// Asking whether to change the field
    Confirm(EditField),
    /// Collecting the new value
    Value(EditField),
}

/// An active conversation.
#[derive(Debug, Clone, PartialEq)]
pub enum Dialogue {
    /// Customer checkout
    Checkout(CheckoutStep),
    /// Admin: waiting for a new category name
    AddCategory,
    /// Admin: creating a product
    AddProduct(AddProductStep),
    /// Admin: editing an existing product
    EditProduct {
        /// Product being edited
        product_id: i64,
        /// Current field and phase
        step: EditStep,
        /// Changes collected so far
        update: ProductUpdate,
    },
    /// Admin: waiting for an absolute stock value
    SetStock {
        /// Product being restocked
        product_id: i64,
        /// Unit used to phrase the prompt
        unit_type: UnitType,
    },
}

/// What the bot should ask for next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    /// Delivery address
    AskAddress,
    /// Contact phone
    AskPhone,
    /// Order summary with confirm/cancel buttons
    ConfirmOrder { address: String, phone: String },
    /// Name for a new category
    AskCategoryName,
    /// Name for a new product
    AskProductName,
    /// Product description
    AskDescription,
    /// Grams or pieces buttons
    AskUnit,
    /// Price for the given unit
    AskPrice(UnitType),
    /// Initial stock in the given unit
    AskStock(UnitType),
    /// Category buttons
    AskCategory,
    /// Yes/no: change this field?
    AskEditConfirm(EditField),
    /// New value for this field
    AskEditValue(EditField),
    /// Absolute stock value
    AskStockValue { product_id: i64, unit_type: UnitType },
}

/// A finished dialogue, ready to be applied.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Checkout confirmed
    PlaceOrder { address: String, phone: String },
    /// Create a category with this name
    CreateCategory(String),
    /// Create this product
    CreateProduct(NewProduct),
    /// Apply these changes to the product
    UpdateProduct { product_id: i64, update: ProductUpdate },
    /// Set the product's stock
    SetStock { product_id: i64, stock_units: i64 },
    /// The user gave up
    Cancelled,
}

/// Result of feeding input to a dialogue.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Moved on; ask for the next thing
    Next(Dialogue),
    /// Input rejected; the state is unchanged and the message explains why
    Invalid(Dialogue, String),
    /// Conversation over
    Done(Outcome),
}

impl Dialogue {
    /// Starts checkout, remembering the phone saved on the profile.
    #[must_use]
    pub const fn start_checkout(saved_phone: Option<String>) -> Self {
        Self::Checkout(CheckoutStep::WaitingAddress { saved_phone })
    }

    /// Starts the add-product wizard.
    #[must_use]
    pub const fn start_add_product() -> Self {
        Self::AddProduct(AddProductStep::Name)
    }

    /// Starts the edit wizard at the first field.
    #[must_use]
    pub fn start_edit_product(product_id: i64) -> Self {
        Self::EditProduct {
            product_id,
            step: EditStep::Confirm(EditField::FIRST),
            update: ProductUpdate::default(),
        }
    }

    /// Whether this is the customer checkout (as opposed to an admin wizard).
    #[must_use]
    pub const fn is_checkout(&self) -> bool {
        matches!(self, Self::Checkout(_))
    }

    /// What the current state is waiting for.
    #[must_use]
    pub fn prompt(&self) -> Prompt {
        match self {
            Self::Checkout(CheckoutStep::WaitingAddress { .. }) => Prompt::AskAddress,
            Self::Checkout(CheckoutStep::WaitingPhone { .. }) => Prompt::AskPhone,
            Self::Checkout(CheckoutStep::Confirmation { address, phone }) => {
                Prompt::ConfirmOrder {
                    address: address.clone(),
                    phone: phone.clone(),
                }
            }
            Self::AddCategory => Prompt::AskCategoryName,
            Self::AddProduct(step) => match step {
                AddProductStep::Name => Prompt::AskProductName,
                AddProductStep::Description { .. } => Prompt::AskDescription,
                AddProductStep::Unit { .. } => Prompt::AskUnit,
                AddProductStep::Price { unit_type, .. } => Prompt::AskPrice(*unit_type),
                AddProductStep::Stock { unit_type, .. } => Prompt::AskStock(*unit_type),
                AddProductStep::Category { .. } => Prompt::AskCategory,
            },
            Self::EditProduct { step, .. } => match step {
                EditStep::Confirm(field) => Prompt::AskEditConfirm(*field),
                EditStep::Value(field) => Prompt::AskEditValue(*field),
            },
            Self::SetStock {
                product_id,
                unit_type,
            } => Prompt::AskStockValue {
                product_id: *product_id,
                unit_type: *unit_type,
            },
        }
    }

    /// Feeds one input to the dialogue.
    #[must_use]
    pub fn advance(self, input: DialogueInput<'_>) -> Transition {
        if input == DialogueInput::Cancel {
            return Transition::Done(Outcome::Cancelled);
        }

        match self {
            Self::Checkout(step) => advance_checkout(step, input),
            Self::AddCategory => match input {
                DialogueInput::Text(text) => match validate_name(text, "Category") {
                    Ok(name) => Transition::Done(Outcome::CreateCategory(name)),
                    Err(e) => Transition::Invalid(Self::AddCategory, e.to_string()),
                },
                _ => Transition::Invalid(Self::AddCategory, "Please send the category name".into()),
            },
            Self::AddProduct(step) => advance_add_product(step, input),
            Self::EditProduct {
                product_id,
                step,
                update,
            } => advance_edit_product(product_id, step, update, input),
            Self::SetStock {
                product_id,
                unit_type,
            } => {
                let state = Self::SetStock {
                    product_id,
                    unit_type,
                };
                match input {
                    DialogueInput::Text(text) => match parse_stock(text) {
                        Ok(stock_units) => Transition::Done(Outcome::SetStock {
                            product_id,
                            stock_units,
                        }),
                        Err(message) => Transition::Invalid(state, message),
                    },
                    _ => Transition::Invalid(state, "Please send a number".into()),
                }
            }
        }
    }
}

fn advance_checkout(step: CheckoutStep, input: DialogueInput<'_>) -> Transition {
    match (step, input) {
        (CheckoutStep::WaitingAddress { saved_phone }, DialogueInput::Text(text)) => {
            match validate_address(text) {
                Ok(address) => Transition::Next(Dialogue::Checkout(match saved_phone {
                    Some(phone) => CheckoutStep::Confirmation { address, phone },
                    None => CheckoutStep::WaitingPhone { address },
                })),
                Err(message) => Transition::Invalid(
                    Dialogue::Checkout(CheckoutStep::WaitingAddress { saved_phone }),
                    message,
                ),
            }
        }
        (CheckoutStep::WaitingPhone { address }, DialogueInput::Text(text)) => {
            match normalize_phone(text) {
                Ok(phone) => Transition::Next(Dialogue::Checkout(CheckoutStep::Confirmation {
                    address,
                    phone,
                })),
                Err(e) => Transition::Invalid(
                    Dialogue::Checkout(CheckoutStep::WaitingPhone { address }),
                    e.to_string(),
                ),
            }
        }
        (CheckoutStep::Confirmation { address, phone }, DialogueInput::Confirm) => {
            Transition::Done(Outcome::PlaceOrder { address, phone })
        }
        (step @ CheckoutStep::Confirmation { .. }, _) => Transition::Invalid(
            Dialogue::Checkout(step),
            "Please confirm or cancel the order".into(),
        ),
        (step, _) => Transition::Invalid(Dialogue::Checkout(step), "Please send a text message".into()),
    }
}

fn advance_add_product(step: AddProductStep, input: DialogueInput<'_>) -> Transition {
    use AddProductStep as S;

    let next = |step| Transition::Next(Dialogue::AddProduct(step));
    let invalid = |step, message: String| Transition::Invalid(Dialogue::AddProduct(step), message);

    match (step, input) {
        (S::Name, DialogueInput::Text(text)) => match validate_name(text, "Product") {
            Ok(name) => next(S::Description { name }),
            Err(e) => invalid(S::Name, e.to_string()),
        },
        (S::Description { name }, DialogueInput::Text(text)) => {
            let text = text.trim();
            let description = if text == "-" { String::new() } else { text.to_string() };
            next(S::Unit { name, description })
        }
        (S::Unit { name, description }, DialogueInput::Unit(unit_type)) => next(S::Price {
            name,
            description,
            unit_type,
        }),
        (
            S::Price {
                name,
                description,
                unit_type,
            },
            DialogueInput::Text(text),
        ) => match parse_price(text) {
            Ok(price) => next(S::Stock {
                name,
                description,
                unit_type,
                price,
            }),
            Err(message) => invalid(
                S::Price {
                    name,
                    description,
                    unit_type,
                },
                message,
            ),
        },
        (
            S::Stock {
                name,
                description,
                unit_type,
                price,
            },
            DialogueInput::Text(text),
        ) => match parse_stock(text) {
            Ok(stock_units) => next(S::Category {
                name,
                description,
                unit_type,
                price,
                stock_units,
            }),
            Err(message) => invalid(
                S::Stock {
                    name,
                    description,
                    unit_type,
                    price,
                },
                message,
            ),
        },
        (
            S::Category {
                name,
                description,
                unit_type,
                price,
                stock_units,
            },
            DialogueInput::Category(category_id),
        ) => Transition::Done(Outcome::CreateProduct(NewProduct {
            name,
            description,
            price,
            unit_type,
            stock_units,
            category_id,
        })),
        (step, _) => {
            let message = match step {
                S::Unit { .. } => "Please choose a unit with the buttons",
                S::Category { .. } => "Please choose a category with the buttons",
                _ => "Please send a text message",
            };
            invalid(step, message.to_string())
        }
    }
}

fn advance_edit_product(
    product_id: i64,
    step: EditStep,
    mut update: ProductUpdate,
    input: DialogueInput<'_>,
) -> Transition {
    let field = match step {
        EditStep::Confirm(field) | EditStep::Value(field) => field,
    };

    match (step, input) {
        (EditStep::Confirm(_), DialogueInput::Yes) => Transition::Next(Dialogue::EditProduct {
            product_id,
            step: EditStep::Value(field),
            update,
        }),
        (EditStep::Confirm(_), DialogueInput::No) => next_edit_field(product_id, field, update),
        (EditStep::Value(EditField::Name), DialogueInput::Text(text)) => {
            match validate_name(text, "Product") {
                Ok(name) => {
                    update.name = Some(name);
                    next_edit_field(product_id, field, update)
                }
                Err(e) => edit_invalid(product_id, step, update, e.to_string()),
            }
        }
        (EditStep::Value(EditField::Description), DialogueInput::Text(text)) => {
            let text = text.trim();
            update.description = Some(if text == "-" { String::new() } else { text.to_string() });
            next_edit_field(product_id, field, update)
        }
        (EditStep::Value(EditField::Price), DialogueInput::Text(text)) => match parse_price(text) {
            Ok(price) => {
                update.price = Some(price);
                next_edit_field(product_id, field, update)
            }
            Err(message) => edit_invalid(product_id, step, update, message),
        },
        (EditStep::Value(EditField::Unit), DialogueInput::Unit(unit_type)) => {
            update.unit_type = Some(unit_type);
            next_edit_field(product_id, field, update)
        }
        (EditStep::Value(EditField::Category), DialogueInput::Category(category_id)) => {
            update.category_id = Some(category_id);
            next_edit_field(product_id, field, update)
        }
        (EditStep::Confirm(_), _) => {
            edit_invalid(product_id, step, update, "Please answer yes or no".into())
        }
        (EditStep::Value(_), _) => {
            let message = match field {
                EditField::Unit => "Please choose a unit with the buttons",
                EditField::Category => "Please choose a category with the buttons",
                _ => "Please send a text message",
            };
            edit_invalid(product_id, step, update, message.to_string())
        }
    }
}

fn next_edit_field(product_id: i64, field: EditField, update: ProductUpdate) -> Transition {
    match field.next() {
        Some(next) => Transition::Next(Dialogue::EditProduct {
            product_id,
            step: EditStep::Confirm(next),
            update,
        }),
        None => Transition::Done(Outcome::UpdateProduct { product_id, update }),
    }
}

fn edit_invalid(product_id: i64, step: EditStep, update: ProductUpdate, message: String) -> Transition {
    Transition::Invalid(
        Dialogue::EditProduct {
            product_id,
            step,
            update,
        },
        message,
    )
}

/// Trims an address and checks its length.
pub fn validate_address(text: &str) -> Result<String, String> {
    let address = text.trim();
    if address.chars().count() < MIN_ADDRESS_LEN {
        return Err(format!(
            "Address must be at least {MIN_ADDRESS_LEN} characters long"
        ));
    }
    Ok(address.to_string())
}

/// Parses a price, accepting a decimal comma.
pub fn parse_price(text: &str) -> Result<f64, String> {
    let price: f64 = text
        .trim()
        .replace(',', ".")
        .parse()
        .map_err(|_| "Please send the price as a number, e.g. 350 or 99.5".to_string())?;
    validate_price(price).map_err(|e| e.to_string())
}

/// Parses a non-negative whole stock amount.
pub fn parse_stock(text: &str) -> Result<i64, String> {
    match text.trim().parse::<i64>() {
        Ok(value) if value >= 0 => Ok(value),
        Ok(_) => Err("Stock cannot be negative".to_string()),
        Err(_) => Err("Please send a whole number".to_string()),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    fn expect_next(transition: Transition) -> Dialogue {
        match transition {
            Transition::Next(dialogue) => dialogue,
            other => panic!("expected Next, got {other:?}"),
        }
    }

    fn expect_done(transition: Transition) -> Outcome {
        match transition {
            Transition::Done(outcome) => outcome,
            other => panic!("expected Done, got {other:?}"),
        }
    }

    #[test]
    fn test_checkout_asks_for_phone_when_none_saved() {
        let dialogue = Dialogue::start_checkout(None);
        assert_eq!(dialogue.prompt(), Prompt::AskAddress);

        let dialogue = expect_next(dialogue.advance(DialogueInput::Text("12 Bark Street")));
        assert_eq!(dialogue.prompt(), Prompt::AskPhone);

        let dialogue = expect_next(dialogue.advance(DialogueInput::Text("+1 555 0100")));
        assert_eq!(
            dialogue.prompt(),
            Prompt::ConfirmOrder {
                address: "12 Bark Street".to_string(),
                phone: "+15550100".to_string()
            }
        );

        let outcome = expect_done(dialogue.advance(DialogueInput::Confirm));
        assert!(matches!(outcome, Outcome::PlaceOrder { .. }));
    }

    #[test]
    fn test_checkout_skips_phone_when_saved() {
        let dialogue = Dialogue::start_checkout(Some("+15550100".to_string()));
        let dialogue = expect_next(dialogue.advance(DialogueInput::Text("12 Bark Street")));
        assert!(matches!(dialogue.prompt(), Prompt::ConfirmOrder { .. }));
    }

    #[test]
    fn test_checkout_invalid_input_keeps_state() {
        let dialogue = Dialogue::start_checkout(None);
        match dialogue.clone().advance(DialogueInput::Text("abc")) {
            Transition::Invalid(state, message) => {
                assert_eq!(state, dialogue);
                assert!(message.contains("Address"));
            }
            other => panic!("expected Invalid, got {other:?}"),
        }

        let waiting_phone = expect_next(dialogue.advance(DialogueInput::Text("12 Bark Street")));
        assert!(matches!(
            waiting_phone.advance(DialogueInput::Text("not a phone")),
            Transition::Invalid(..)
        ));
    }

    #[test]
    fn test_cancel_from_any_state() {
        let states = [
            Dialogue::start_checkout(None),
            Dialogue::AddCategory,
            Dialogue::start_add_product(),
            Dialogue::start_edit_product(1),
            Dialogue::SetStock {
                product_id: 1,
                unit_type: UnitType::Grams,
            },
        ];
        for state in states {
            assert_eq!(
                state.advance(DialogueInput::Cancel),
                Transition::Done(Outcome::Cancelled)
            );
        }
    }

    #[test]
    fn test_add_product_wizard() {
        let mut dialogue = Dialogue::start_add_product();
        let inputs = [
            DialogueInput::Text("Beef jerky"),
            DialogueInput::Text("-"),
            DialogueInput::Unit(UnitType::Grams),
            DialogueInput::Text("350,5"),
            DialogueInput::Text("2000"),
        ];
        for input in inputs {
            dialogue = expect_next(dialogue.advance(input));
        }
        assert_eq!(dialogue.prompt(), Prompt::AskCategory);

        let outcome = expect_done(dialogue.advance(DialogueInput::Category(3)));
        assert_eq!(
            outcome,
            Outcome::CreateProduct(NewProduct {
                name: "Beef jerky".to_string(),
                description: String::new(),
                price: 350.5,
                unit_type: UnitType::Grams,
                stock_units: 2000,
                category_id: 3,
            })
        );
    }

    #[test]
    fn test_add_product_rejects_bad_values() {
        let dialogue = expect_next(Dialogue::start_add_product().advance(DialogueInput::Text("Jerky")));
        let dialogue = expect_next(dialogue.advance(DialogueInput::Text("Tasty")));

        // Unit must come from a button
        let dialogue = match dialogue.advance(DialogueInput::Text("grams")) {
            Transition::Invalid(state, _) => state,
            other => panic!("expected Invalid, got {other:?}"),
        };
        let dialogue = expect_next(dialogue.advance(DialogueInput::Unit(UnitType::Pieces)));
        assert_eq!(dialogue.prompt(), Prompt::AskPrice(UnitType::Pieces));

        assert!(matches!(
            dialogue.clone().advance(DialogueInput::Text("-5")),
            Transition::Invalid(..)
        ));
        let dialogue = expect_next(dialogue.advance(DialogueInput::Text("120")));
        assert!(matches!(
            dialogue.advance(DialogueInput::Text("1.5")),
            Transition::Invalid(..)
        ));
    }

    #[test]
    fn test_edit_wizard_walks_field_table() {
        let mut dialogue = Dialogue::start_edit_product(9);
        let inputs = [
            DialogueInput::No,                      // name
            DialogueInput::Yes,                     // description
            DialogueInput::Text("Crunchy"),
            DialogueInput::Yes,                     // price
            DialogueInput::Text("410"),
            DialogueInput::No,                      // unit
        ];
        for input in inputs {
            dialogue = expect_next(dialogue.advance(input));
        }
        assert_eq!(dialogue.prompt(), Prompt::AskEditConfirm(EditField::Category));

        let outcome = expect_done(dialogue.advance(DialogueInput::No));
        assert_eq!(
            outcome,
            Outcome::UpdateProduct {
                product_id: 9,
                update: ProductUpdate {
                    description: Some("Crunchy".to_string()),
                    price: Some(410.0),
                    ..Default::default()
                }
            }
        );
    }

    #[test]
    fn test_edit_wizard_all_no_is_empty_update() {
        let mut dialogue = Dialogue::start_edit_product(1);
        for _ in 0..4 {
            dialogue = expect_next(dialogue.advance(DialogueInput::No));
        }
        match expect_done(dialogue.advance(DialogueInput::No)) {
            Outcome::UpdateProduct { update, .. } => assert!(update.is_empty()),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_set_stock_and_add_category() {
        let dialogue = Dialogue::SetStock {
            product_id: 4,
            unit_type: UnitType::Pieces,
        };
        assert!(matches!(
            dialogue.clone().advance(DialogueInput::Text("-1")),
            Transition::Invalid(..)
        ));
        assert_eq!(
            dialogue.advance(DialogueInput::Text(" 12 ")),
            Transition::Done(Outcome::SetStock {
                product_id: 4,
                stock_units: 12
            })
        );

        assert_eq!(
            Dialogue::AddCategory.advance(DialogueInput::Text(" Chews ")),
            Transition::Done(Outcome::CreateCategory("Chews".to_string()))
        );
        assert!(matches!(
            Dialogue::AddCategory.advance(DialogueInput::Text("x")),
            Transition::Invalid(..)
        ));
    }
}
