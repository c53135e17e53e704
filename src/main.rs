#![allow(clippy::result_large_err)]

use coffee_mustache::{
    Engine,
    config::{cafes::seed_cafes, database, load_config},
    engine::notifier_for,
    errors::Result,
};
use dotenvy::dotenv;
use std::env;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load the application configuration
    let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    let app_config = load_config(&config_path)
        .inspect_err(|e| error!("Failed to load {}: {}", config_path, e))?;
    info!("Loaded configuration from {}", config_path);

    // 4. Connect and create the schema
    let database_url = database::get_database_url();
    let db = database::create_connection(&database_url).await?;
    database::create_tables(&db)
        .await
        .inspect(|()| info!("Database schema ready."))
        .inspect_err(|e| error!("Failed to create schema: {}", e))?;

    // 5. Seed cafes and tables from config.toml
    let created = seed_cafes(&db, &app_config.cafes)
        .await
        .inspect_err(|e| error!("Failed to seed cafes: {}", e))?;
    info!("Seeded {} new cafe and table rows.", created);

    // 6. Assemble the engine
    let notifier = notifier_for(&app_config.notifications);
    let engine = Engine::new(db, app_config.settings, notifier);
    info!(
        "Ordering engine ready (utc offset {} min, placement deadline {} ms).",
        engine.settings.utc_offset_minutes, engine.settings.place_order_timeout_ms
    );

    Ok(())
}
