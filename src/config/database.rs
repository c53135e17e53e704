//! Database configuration module for the ordering engine.
//!
//! This module handles the database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with
//! `Schema::create_table_from_entity`, so the schema always matches the Rust
//! structs. Constraints that entities cannot express (the one-active-session
//! rule) are added as raw statements afterwards.

use crate::entities::{
    Advertisement, Cafe, Cart, CartItem, CategoryPopularity, DeviceToken, DiningTable, Discount,
    ItemCustomization, ItemFavorite, MenuItem, Order, RewardTransaction, Session, UpgradeSuggestion,
    UpsellOffer, User, UserSession,
};
use crate::errors::{Error, Result};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/coffee_mustache.sqlite?mode=rwc";

/// Enforces at most one active session per table at the store level.
const ONE_ACTIVE_SESSION_PER_TABLE: &str = "CREATE UNIQUE INDEX IF NOT EXISTS \
     idx_one_active_session_per_table ON sessions (cafe_id, table_name) \
     WHERE status = 'active'";

const INDEXES: [&str; 4] = [
    ONE_ACTIVE_SESSION_PER_TABLE,
    "CREATE INDEX IF NOT EXISTS idx_cart_items_cart ON cart_items (cart_id, status)",
    "CREATE INDEX IF NOT EXISTS idx_orders_session ON orders (session_id, payment_status)",
    "CREATE INDEX IF NOT EXISTS idx_reward_transactions_user ON reward_transactions (user_id, transaction_type)",
];

/// Gets the database URL from environment variable or returns default `SQLite` path.
///
/// This function looks for `DATABASE_URL` in the environment and falls back to
/// a default local `SQLite` file if not found.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database at `database_url`.
///
/// For file-backed `SQLite` URLs the parent directory is created first, since
/// `mode=rwc` creates the file but not its directory.
#[instrument]
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    if let Some(parent) = sqlite_parent_dir(database_url) {
        std::fs::create_dir_all(&parent).map_err(|e| Error::Config {
            message: format!("Cannot create database directory {parent:?}: {e}"),
        })?;
    }
    debug!("Connecting to database");
    Database::connect(database_url).await.map_err(Into::into)
}

fn sqlite_parent_dir(database_url: &str) -> Option<PathBuf> {
    let path = database_url.strip_prefix("sqlite://")?;
    let path = path.split('?').next()?;
    Path::new(path)
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
}

async fn create_table<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<()>
where
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

/// Creates all tables and indexes if they do not exist yet.
///
/// Tables referenced by foreign keys are created before the tables that
/// reference them.
#[instrument(skip(db))]
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let schema = Schema::new(db.get_database_backend());

    create_table(db, &schema, Cafe).await?;
    create_table(db, &schema, DiningTable).await?;
    create_table(db, &schema, User).await?;
    create_table(db, &schema, MenuItem).await?;
    create_table(db, &schema, ItemCustomization).await?;
    create_table(db, &schema, Session).await?;
    create_table(db, &schema, UserSession).await?;
    create_table(db, &schema, Cart).await?;
    create_table(db, &schema, CartItem).await?;
    create_table(db, &schema, Order).await?;
    create_table(db, &schema, Discount).await?;
    create_table(db, &schema, UpsellOffer).await?;
    create_table(db, &schema, RewardTransaction).await?;
    create_table(db, &schema, ItemFavorite).await?;
    create_table(db, &schema, DeviceToken).await?;
    create_table(db, &schema, UpgradeSuggestion).await?;
    create_table(db, &schema, CategoryPopularity).await?;
    create_table(db, &schema, Advertisement).await?;

    for index in INDEXES {
        db.execute_unprepared(index).await?;
    }

    info!("Database tables ensured");
    Ok(())
}
