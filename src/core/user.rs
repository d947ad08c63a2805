//! User profiles - Telegram users and their saved contact details.

use crate::{
    entities::{User, user},
    errors::{Error, Result},
};
use sea_orm::{Set, prelude::*};
use tracing::{debug, instrument};

/// Telegram identity fields refreshed on every contact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TelegramProfile {
    /// @username without the `@`
    pub username: Option<String>,
    /// First name as shown in Telegram
    pub first_name: Option<String>,
}

/// Returns the user, creating the row on first contact.
///
/// Username and first name are refreshed when Telegram reports new values.
#[instrument(skip(db, profile))]
pub async fn get_or_create_user(
    db: &DatabaseConnection,
    user_id: &str,
    profile: TelegramProfile,
) -> Result<user::Model> {
    let now = chrono::Utc::now().naive_utc();

    let Some(existing) = get_user(db, user_id).await? else {
        let created = user::ActiveModel {
            id: Set(user_id.to_string()),
            username: Set(profile.username),
            first_name: Set(profile.first_name),
            phone: Set(None),
            pet_name: Set(None),
            address: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await?;
        debug!("Registered user {}", user_id);
        return Ok(created);
    };

    if existing.username == profile.username && existing.first_name == profile.first_name {
        return Ok(existing);
    }

    let mut active: user::ActiveModel = existing.into();
    active.username = Set(profile.username);
    active.first_name = Set(profile.first_name);
    active.updated_at = Set(now);
    active.update(db).await.map_err(Into::into)
}

/// Loads the user without touching the Telegram fields, inserting a blank row if needed.
async fn find_or_insert(db: &DatabaseConnection, user_id: &str) -> Result<user::Model> {
    match get_user(db, user_id).await? {
        Some(existing) => Ok(existing),
        None => get_or_create_user(db, user_id, TelegramProfile::default()).await,
    }
}

/// Retrieves a user by Telegram ID.
pub async fn get_user(db: &DatabaseConnection, user_id: &str) -> Result<Option<user::Model>> {
    User::find_by_id(user_id.to_string())
        .one(db)
        .await
        .map_err(Into::into)
}

/// Saves the address and phone used at checkout. `None` keeps the stored value.
#[instrument(skip(db))]
pub async fn update_contact(
    db: &DatabaseConnection,
    user_id: &str,
    address: Option<String>,
    phone: Option<String>,
) -> Result<user::Model> {
    let existing = find_or_insert(db, user_id).await?;
    let mut active: user::ActiveModel = existing.into();

    if let Some(address) = address {
        active.address = Set(Some(address.trim().to_string()));
    }
    if let Some(phone) = phone {
        active.phone = Set(Some(normalize_phone(&phone)?));
    }
    active.updated_at = Set(chrono::Utc::now().naive_utc());

    active.update(db).await.map_err(Into::into)
}

/// Stores the name of the customer's pet (used in greetings).
#[instrument(skip(db))]
pub async fn set_pet_name(
    db: &DatabaseConnection,
    user_id: &str,
    pet_name: &str,
) -> Result<user::Model> {
    let pet_name = pet_name.trim();
    if pet_name.is_empty() {
        return Err(Error::Validation {
            message: "Pet name cannot be empty".to_string(),
        });
    }

    let existing = find_or_insert(db, user_id).await?;
    let mut active: user::ActiveModel = existing.into();
    active.pet_name = Set(Some(pet_name.to_string()));
    active.updated_at = Set(chrono::Utc::now().naive_utc());

    active.update(db).await.map_err(Into::into)
}

/// Checks that a phone number has 7 to 15 digits and strips the formatting.
///
/// A leading `+` is kept; spaces, dashes and parentheses are dropped.
pub fn normalize_phone(input: &str) -> Result<String> {
    let trimmed = input.trim();
    let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();
    let only_formatting = trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-' | '(' | ')'));

    if !only_formatting || !(7..=15).contains(&digits.len()) {
        return Err(Error::Validation {
            message: "Please send a phone number with 7 to 15 digits".to_string(),
        });
    }

    if trimmed.starts_with('+') {
        Ok(format!("+{digits}"))
    } else {
        Ok(digits)
    }
}
