#![allow(clippy::result_large_err)]

use dotenvy::dotenv;
use std::{env, sync::Arc};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use treat_shop_bot::{
    bot::{self, ShopContext},
    config::{
        catalog::load_catalog_if_present,
        database::{create_connection, create_tables},
        Settings,
    },
    core::{
        backup::{BackupConfig, BackupScheduler},
        catalog::seed_catalog,
    },
    errors::{Error, Result},
};

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; variables can also come from the environment
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Settings
    let settings = Settings::from_env()
        .inspect_err(|e| error!("Invalid configuration: {}", e))?;
    if settings.admin_ids.is_empty() {
        warn!("ADMIN_ID is not set, nobody can open the admin panel");
    }

    // 4. Database
    let db = create_connection(&settings.database_url)
        .await
        .inspect(|_| info!("Database connection established."))
        .inspect_err(|e| error!("Failed to connect to the database: {}", e))?;
    create_tables(&db)
        .await
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Seed the catalog on first start
    if let Some(seed) = load_catalog_if_present(&settings.catalog_path)? {
        seed_catalog(&db, &seed)
            .await
            .inspect(|created| info!("Catalog seed applied ({} products created).", created))
            .inspect_err(|e| error!("Failed to seed the catalog: {}", e))?;
    }

    // 6. Background jobs
    let shutdown = CancellationToken::new();
    let backup = match BackupConfig::from_settings(&settings) {
        Ok(config) => {
            tokio::spawn(BackupScheduler::new(config.clone(), shutdown.clone()).run());
            Some(config)
        }
        Err(e) => {
            warn!("Scheduled backups disabled: {}", e);
            None
        }
    };

    let ctx = ShopContext::new(db, Arc::new(settings), backup);
    tokio::spawn(bot::prune_dialogues(ctx.dialogues.clone(), shutdown.clone()));

    // 7. Run the bot; BOT_TOKEN is read right before use
    let token = env::var("BOT_TOKEN")
        .inspect_err(|e| error!("BOT_TOKEN not found: {}", e))
        .map_err(Error::EnvVar)?;

    let result = bot::run_bot(token, ctx).await;
    shutdown.cancel();
    result
}
