//! Shared test utilities for the ordering engine.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    config::Settings,
    core::cart::NewCartItem,
    core::notify::{Delivery, Notifier},
    entities::{
        cafe, cart, cart_item, device_token, dining_table, item_customization, item_favorite,
        menu_item, order, reward_transaction, session, upgrade_suggestion, user,
        sea_orm_active_enums::{
            AddedVia, CartItemStatus, CartStatus, OrderStatus, PaymentStatus, RewardType,
            SessionStatus, SuggestionAction,
        },
    },
    errors::Result,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use tokio::sync::RwLock;

/// Cafe used by most tests
pub const TEST_CAFE: i64 = 1;
/// Table registered for [`TEST_CAFE`]
pub const TEST_TABLE: &str = "T1";

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Settings with a UTC café clock so date arithmetic in tests is readable.
pub fn test_settings() -> Settings {
    Settings {
        utc_offset_minutes: 0,
        ..Settings::default()
    }
}

/// Sets up a database with [`TEST_CAFE`] (complete POS) and [`TEST_TABLE`].
pub async fn setup_with_cafe() -> Result<DatabaseConnection> {
    let db = setup_test_db().await?;
    create_cafe(&db, TEST_CAFE, true).await?;
    create_table(&db, TEST_CAFE, TEST_TABLE).await?;
    Ok(db)
}

/// Creates a cafe row.
pub async fn create_cafe(
    db: &DatabaseConnection,
    id: i64,
    complete_pos: bool,
) -> Result<cafe::Model> {
    Ok(cafe::ActiveModel {
        id: Set(id),
        name: Set(format!("Cafe {id}")),
        complete_pos: Set(complete_pos),
    }
    .insert(db)
    .await?)
}

/// Registers a table for a cafe.
pub async fn create_table(
    db: &DatabaseConnection,
    cafe_id: i64,
    name: &str,
) -> Result<dining_table::Model> {
    Ok(dining_table::ActiveModel {
        cafe_id: Set(cafe_id),
        name: Set(name.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await?)
}

/// Creates a user named after its id.
pub async fn create_user(db: &DatabaseConnection, id: i64) -> Result<user::Model> {
    create_user_at(db, id, Utc::now()).await
}

/// Creates a user with a specific registration time.
pub async fn create_user_at(
    db: &DatabaseConnection,
    id: i64,
    created_at: DateTime<Utc>,
) -> Result<user::Model> {
    Ok(user::ActiveModel {
        id: Set(id),
        name: Set(format!("Diner {id}")),
        phone: Set(format!("+9190000000{id:02}")),
        created_at: Set(created_at),
    }
    .insert(db)
    .await?)
}

/// Creates a menu item.
///
/// # Defaults
/// * `cafe_id`: [`TEST_CAFE`]
/// * `image_url`: `None`
/// * `is_customizable`: false
pub async fn create_menu_item(
    db: &DatabaseConnection,
    id: i64,
    name: &str,
    category: &str,
    price: f64,
) -> Result<menu_item::Model> {
    Ok(menu_item::ActiveModel {
        id: Set(id),
        cafe_id: Set(TEST_CAFE),
        category: Set(category.to_string()),
        name: Set(name.to_string()),
        price: Set(price),
        image_url: Set(None),
        is_customizable: Set(false),
    }
    .insert(db)
    .await?)
}

/// Creates a customization option for a menu item.
pub async fn create_customization(
    db: &DatabaseConnection,
    id: i64,
    menu_item_id: i64,
    option_name: &str,
) -> Result<item_customization::Model> {
    Ok(item_customization::ActiveModel {
        id: Set(id),
        menu_item_id: Set(menu_item_id),
        customization_type: Set("Milk".to_string()),
        option_name: Set(option_name.to_string()),
        additional_cost: Set(20.0),
    }
    .insert(db)
    .await?)
}

/// Creates a session row directly, bypassing check-in.
pub async fn create_session(
    db: &DatabaseConnection,
    session_id: &str,
    table_name: &str,
    status: SessionStatus,
    created_by: i64,
) -> Result<session::Model> {
    Ok(session::ActiveModel {
        session_id: Set(session_id.to_string()),
        cafe_id: Set(TEST_CAFE),
        table_name: Set(table_name.to_string()),
        table_code: Set(None),
        status: Set(status),
        created_by: Set(created_by),
        start_time: Set(Utc::now()),
        end_time: Set(None),
    }
    .insert(db)
    .await?)
}

/// Creates a cart row directly.
pub async fn create_cart(
    db: &DatabaseConnection,
    cart_id: &str,
    session_id: &str,
    user_id: i64,
    total_amount: f64,
) -> Result<cart::Model> {
    let now = Utc::now();
    Ok(cart::ActiveModel {
        cart_id: Set(cart_id.to_string()),
        session_id: Set(session_id.to_string()),
        user_id: Set(user_id),
        cafe_id: Set(TEST_CAFE),
        status: Set(CartStatus::Active),
        total_amount: Set(total_amount),
        discount_amount: Set(0.0),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?)
}

/// Creates a cart line directly with the given status.
pub async fn create_cart_line(
    db: &DatabaseConnection,
    cart_item_id: &str,
    cart_id: &str,
    item_id: i64,
    status: CartItemStatus,
) -> Result<cart_item::Model> {
    let now = Utc::now();
    Ok(cart_item::ActiveModel {
        cart_item_id: Set(cart_item_id.to_string()),
        cart_id: Set(cart_id.to_string()),
        item_id: Set(item_id),
        quantity: Set(1),
        price: Set(100.0),
        status: Set(status),
        added_via: Set(AddedVia::Direct),
        special_request: Set(None),
        customization_ids: Set(serde_json::json!([])),
        cross_sell_item_ids: Set(serde_json::json!([])),
        added_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?)
}

/// Creates a placed order row directly with a chosen time.
pub async fn create_order_at(
    db: &DatabaseConnection,
    order_id: &str,
    cart_id: &str,
    session_id: &str,
    user_id: i64,
    order_time: DateTime<Utc>,
) -> Result<order::Model> {
    Ok(order::ActiveModel {
        order_id: Set(order_id.to_string()),
        cafe_id: Set(TEST_CAFE),
        cart_id: Set(cart_id.to_string()),
        session_id: Set(session_id.to_string()),
        user_id: Set(user_id),
        special_request: Set(None),
        status: Set(OrderStatus::Placed),
        payment_status: Set(PaymentStatus::Pending),
        total_amount: Set(100.0),
        order_time: Set(order_time),
    }
    .insert(db)
    .await?)
}

/// Appends a loyalty ledger entry.
pub async fn create_reward(
    db: &DatabaseConnection,
    user_id: i64,
    transaction_type: RewardType,
    mustaches: i64,
    earned_date: DateTime<Utc>,
) -> Result<reward_transaction::Model> {
    Ok(reward_transaction::ActiveModel {
        user_id: Set(user_id),
        cafe_id: Set(TEST_CAFE),
        session_id: Set("seeded".to_string()),
        transaction_type: Set(transaction_type),
        mustaches: Set(mustaches),
        earned_date: Set(earned_date),
        ..Default::default()
    }
    .insert(db)
    .await?)
}

/// Favorites a menu item at a chosen time.
pub async fn create_favorite(
    db: &DatabaseConnection,
    user_id: i64,
    item_id: i64,
    created_at: DateTime<Utc>,
) -> Result<item_favorite::Model> {
    Ok(item_favorite::ActiveModel {
        user_id: Set(user_id),
        cafe_id: Set(TEST_CAFE),
        item_id: Set(item_id),
        created_at: Set(created_at),
        ..Default::default()
    }
    .insert(db)
    .await?)
}

/// Records a pending upgrade-cart suggestion.
pub async fn create_suggestion(
    db: &DatabaseConnection,
    cart_id: &str,
    item_id: i64,
) -> Result<upgrade_suggestion::Model> {
    Ok(upgrade_suggestion::ActiveModel {
        cart_id: Set(cart_id.to_string()),
        suggested_item_id: Set(item_id),
        user_action: Set(SuggestionAction::Pending),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?)
}

/// Registers a staff device for [`TEST_CAFE`].
pub async fn create_device(db: &DatabaseConnection, token: &str) -> Result<device_token::Model> {
    Ok(device_token::ActiveModel {
        cafe_id: Set(TEST_CAFE),
        token: Set(token.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await?)
}

/// A directly added cart line.
///
/// # Defaults
/// * `quantity`: 1
/// * `added_via`: [`AddedVia::Direct`]
/// * no customizations, cross-sells or special request
pub fn line(item_id: i64, price: f64) -> NewCartItem {
    NewCartItem {
        cart_item_id: None,
        item_id,
        quantity: 1,
        price,
        added_via: AddedVia::Direct,
        special_request: None,
        customization_ids: Vec::new(),
        cross_sell_item_ids: Vec::new(),
    }
}

/// A push that was handed to [`RecordingNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentPush {
    /// Target tokens
    pub tokens: Vec<String>,
    /// Title
    pub title: String,
    /// Body
    pub body: String,
}

/// Notifier double that records pushes and fails for chosen tokens.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: RwLock<Vec<SentPush>>,
    failing_tokens: Vec<String>,
}

impl RecordingNotifier {
    /// A notifier that accepts every token.
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier that reports failure for the listed tokens.
    pub fn failing_for(tokens: &[&str]) -> Self {
        Self {
            sent: RwLock::default(),
            failing_tokens: tokens.iter().map(ToString::to_string).collect(),
        }
    }

    /// Everything sent so far.
    pub async fn sent(&self) -> Vec<SentPush> {
        self.sent.read().await.clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, tokens: &[String], title: &str, body: &str) -> Vec<Delivery> {
        self.sent.write().await.push(SentPush {
            tokens: tokens.to_vec(),
            title: title.to_string(),
            body: body.to_string(),
        });
        tokens
            .iter()
            .map(|token| Delivery {
                token: token.clone(),
                error: self
                    .failing_tokens
                    .contains(token)
                    .then(|| "token unregistered".to_string()),
            })
            .collect()
    }
}
