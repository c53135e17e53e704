//! Engine - The in-process entry point of the dine-in workflow.
//!
//! Holds the collaborators every operation needs and forwards to the free
//! functions in [`crate::core`]. Handlers of an outer layer (HTTP, jobs) keep
//! one `Engine` and call its methods.

use crate::{
    config::{NotificationConfig, Settings},
    core::{
        cart::{self, AddItemsOutcome, AddItemsRequest, CartLine, CartUpdate},
        loyalty::{self, LoyaltyProfile},
        notify::{ExpoNotifier, LogNotifier, Notifier},
        order::{self, PlaceOrderRequest, PlacedOrder, SessionOrders},
        personalisation::{self, MenuItemSummary, PersonalisedFeed},
        session::{self, CheckIn},
        upsell,
    },
    entities::{cart_item, order as order_entity, session as session_entity, upsell_offer},
    errors::Result,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tracing::info;

/// Picks the notifier configured for staff pushes.
#[must_use]
pub fn notifier_for(config: &NotificationConfig) -> Arc<dyn Notifier> {
    match &config.expo_endpoint {
        Some(endpoint) => {
            info!("Staff pushes go to {}", endpoint);
            Arc::new(ExpoNotifier::new(endpoint.clone()))
        }
        None => {
            info!("No push endpoint configured, staff pushes are only logged");
            Arc::new(LogNotifier)
        }
    }
}

/// Shared context for all operations.
pub struct Engine {
    /// Store connection for all operations
    pub database: DatabaseConnection,
    /// Behaviour switches, fixed at startup
    pub settings: Arc<Settings>,
    /// Staff push collaborator
    pub notifier: Arc<dyn Notifier>,
}

impl Engine {
    /// Creates an engine over the given collaborators.
    #[must_use]
    pub fn new(database: DatabaseConnection, settings: Settings, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            database,
            settings: Arc::new(settings),
            notifier,
        }
    }

    /// Checks a diner into a table.
    pub async fn check_in(&self, table_name: &str, cafe_id: i64, user_id: i64) -> Result<CheckIn> {
        session::check_in(&self.database, &self.settings, table_name, cafe_id, user_id).await
    }

    /// Closes a session and its open joins.
    pub async fn invalidate(&self, session_id: &str) -> Result<()> {
        session::invalidate(&self.database, session_id).await
    }

    /// Whether a session is active.
    pub async fn check_status(&self, session_id: &str) -> Result<bool> {
        session::check_status(&self.database, session_id).await
    }

    /// Verifies a guest's table code.
    pub async fn verify_table_code(
        &self,
        session_id: &str,
        table_code: &str,
    ) -> Result<session_entity::Model> {
        session::verify_table_code(&self.database, session_id, table_code).await
    }

    /// Records that a diner left the table.
    pub async fn leave(&self, session_id: &str, user_id: i64) -> Result<()> {
        session::leave(&self.database, session_id, user_id).await
    }

    /// Adds items to a session's cart.
    pub async fn add_items(&self, request: AddItemsRequest) -> Result<AddItemsOutcome> {
        cart::add_items(&self.database, &self.settings, request).await
    }

    /// Changes a line's quantity; zero cancels it.
    pub async fn update_quantity(
        &self,
        cart_item_id: &str,
        quantity: i32,
        cart_amount: f64,
    ) -> Result<CartUpdate> {
        cart::update_quantity(&self.database, &self.settings, cart_item_id, quantity, cart_amount)
            .await
    }

    /// Replaces a line's customizations.
    pub async fn update_customizations(
        &self,
        cart_item_id: &str,
        customization_ids: &[String],
        price: f64,
        cart_amount: f64,
    ) -> Result<CartUpdate> {
        cart::update_customizations(
            &self.database,
            &self.settings,
            cart_item_id,
            customization_ids,
            price,
            cart_amount,
        )
        .await
    }

    /// Replaces a line's cross-sell items.
    pub async fn update_cross_sell_items(
        &self,
        cart_item_id: &str,
        cross_sell_item_ids: &[String],
        price: f64,
        cart_amount: f64,
    ) -> Result<CartUpdate> {
        cart::update_cross_sell_items(
            &self.database,
            &self.settings,
            cart_item_id,
            cross_sell_item_ids,
            price,
            cart_amount,
        )
        .await
    }

    /// Sets a line's kitchen note.
    pub async fn add_special_request(
        &self,
        cart_item_id: &str,
        special_request: &str,
    ) -> Result<cart_item::Model> {
        cart::add_special_request(&self.database, cart_item_id, special_request).await
    }

    /// Lists a diner's cart.
    pub async fn get_cart(&self, cart_id: &str, session_id: &str, user_id: i64) -> Result<Vec<CartLine>> {
        cart::get_cart(&self.database, cart_id, session_id, user_id).await
    }

    /// Makes an upsell offer for a given total.
    pub async fn compute_upsell(
        &self,
        cart_id: &str,
        cafe_id: i64,
        current_total: f64,
    ) -> Result<upsell_offer::Model> {
        upsell::compute_upsell(&self.database, cart_id, cafe_id, current_total).await
    }

    /// Makes an upsell offer for the cart's stored total.
    pub async fn compute_upsell_for_cart(&self, cart_id: &str, cafe_id: i64) -> Result<upsell_offer::Model> {
        upsell::compute_upsell_for_cart(&self.database, cart_id, cafe_id).await
    }

    /// Places an order.
    pub async fn place_order(&self, request: PlaceOrderRequest) -> Result<PlacedOrder> {
        order::place_order(
            &self.database,
            &self.settings,
            self.notifier.as_ref(),
            request,
        )
        .await
    }

    /// Withdraws a placed order.
    pub async fn cancel_order(&self, order_id: &str) -> Result<order_entity::Model> {
        order::cancel_order(&self.database, order_id).await
    }

    /// Lists a session's unpaid orders grouped by diner.
    pub async fn fetch_order_details(&self, session_id: &str, user_id: i64) -> Result<SessionOrders> {
        order::fetch_order_details(&self.database, &self.settings, session_id, user_id, Utc::now())
            .await
    }

    /// A diner's loyalty profile.
    pub async fn loyalty_profile(&self, user_id: i64) -> Result<LoyaltyProfile> {
        loyalty::profile(&self.database, &self.settings, user_id, Utc::now()).await
    }

    /// The diner's most recently repeated item set.
    pub async fn repeat_order_signature(
        &self,
        user_id: i64,
        cafe_id: i64,
    ) -> Result<Vec<MenuItemSummary>> {
        personalisation::repeat_order_signature(&self.database, user_id, cafe_id).await
    }

    /// Repeat order, recent order and favourites.
    pub async fn personalised_feed(&self, user_id: i64, cafe_id: i64) -> Result<PersonalisedFeed> {
        personalisation::personalised_feed(&self.database, user_id, cafe_id).await
    }
}
