//! Telegram slash commands organized by audience.

/// Admin panel commands
pub mod admin;

/// Customer commands
pub mod customer;

use crate::{bot::ShopContext, errors::Result};
use teloxide::{prelude::*, utils::command::BotCommands};
use tracing::info;

/// Commands shown in the Telegram menu.
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "snake_case", description = "Treat shop commands:")]
pub enum Command {
    /// Welcome screen and catalog
    #[command(description = "browse the catalog")]
    Start,
    /// Command list
    #[command(description = "show this help")]
    Help,
    /// Cart screen
    #[command(description = "show your cart")]
    Cart,
    /// Order history (admins: recent orders)
    #[command(description = "show your orders")]
    Orders,
    /// Remember the pet's name for greetings
    #[command(description = "tell us your pet's name, e.g. /pet Rex")]
    Pet(String),
    /// Abort the running dialogue
    #[command(description = "cancel the current step")]
    Cancel,
    /// Admin panel
    #[command(description = "admin: open the admin panel")]
    Admin,
    /// Stock overview
    #[command(description = "admin: stock overview")]
    Stock,
    /// Back up the database now
    #[command(description = "admin: back up the database")]
    Backup,
    /// Start the add-product wizard
    #[command(description = "admin: add a product")]
    AddProduct,
    /// Start the add-category wizard
    #[command(description = "admin: add a category")]
    AddCategory,
    /// Force an order into any status, e.g. `/set_status 12 confirmed`
    #[command(description = "admin: force an order status", parse_with = "split")]
    SetStatus(i64, String),
}

impl Command {
    /// Whether the command is reserved for admins.
    #[must_use]
    pub const fn is_admin_only(&self) -> bool {
        matches!(
            self,
            Self::Admin
                | Self::Stock
                | Self::Backup
                | Self::AddProduct
                | Self::AddCategory
                | Self::SetStatus(..)
        )
    }
}

/// Routes a parsed command to its implementation.
pub async fn handle_command(bot: &Bot, msg: &Message, cmd: Command, ctx: &ShopContext) -> Result<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    let is_admin = ctx.is_admin(user.id);
    info!("Command {:?} from user {} (admin: {})", cmd, user.id, is_admin);

    if cmd.is_admin_only() && !is_admin {
        bot.send_message(msg.chat.id, "⛔ This command is for shop admins only.")
            .await?;
        return Ok(());
    }

    match cmd {
        Command::Start => customer::start(bot, msg.chat.id, user, ctx).await,
        Command::Help => customer::help(bot, msg.chat.id, is_admin).await,
        Command::Cart => customer::cart(bot, msg.chat.id, user, ctx).await,
        Command::Orders if is_admin => admin::recent_orders(bot, msg.chat.id, ctx).await,
        Command::Orders => customer::order_history(bot, msg.chat.id, user, ctx).await,
        Command::Pet(name) => customer::pet(bot, msg.chat.id, user, &name, ctx).await,
        Command::Cancel => customer::cancel(bot, msg.chat.id, ctx).await,
        Command::Admin => admin::menu(bot, msg.chat.id, None).await,
        Command::Stock => admin::stock_overview(bot, msg.chat.id, None, ctx).await,
        Command::Backup => admin::backup(bot, msg.chat.id, ctx).await,
        Command::AddProduct => admin::start_add_product(bot, msg.chat.id, ctx).await,
        Command::AddCategory => admin::start_add_category(bot, msg.chat.id, ctx).await,
        Command::SetStatus(order_id, status) => {
            admin::force_status(bot, msg.chat.id, order_id, &status, ctx).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("/start", "shop_bot").ok(), Some(Command::Start));
        assert_eq!(
            Command::parse("/add_product", "shop_bot").ok(),
            Some(Command::AddProduct)
        );
        assert_eq!(
            Command::parse("/set_status 12 confirmed", "shop_bot").ok(),
            Some(Command::SetStatus(12, "confirmed".to_string()))
        );
        assert_eq!(
            Command::parse("/pet Rex", "shop_bot").ok(),
            Some(Command::Pet("Rex".to_string()))
        );
        assert!(Command::parse("/set_status twelve", "shop_bot").is_err());
    }

    #[test]
    fn test_admin_only_commands() {
        assert!(Command::Backup.is_admin_only());
        assert!(Command::SetStatus(1, "completed".to_string()).is_admin_only());
        assert!(!Command::Orders.is_admin_only());
        assert!(!Command::Cancel.is_admin_only());
    }
}
