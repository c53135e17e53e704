//! Cart business logic - Building the shared cart of a session.
//!
//! Every mutation recomputes the cart's `total_amount` from its active lines
//! inside the same store transaction. The total the client declares is only
//! compared against the computed one (see [`reconcile_total`]).

use crate::{
    config::Settings,
    core::session::require_active_session,
    entities::{
        Cart, CartItem, CategoryPopularity, ItemCustomization, MenuItem, UpgradeSuggestion, cart,
        cart_item, category_popularity, item_customization,
        sea_orm_active_enums::{AddedVia, CartItemStatus, CartStatus, SuggestionAction},
        upgrade_suggestion,
    },
    errors::{Error, Result},
};
use chrono::Utc;
use futures::future::try_join_all;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

/// One line to add to a cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCartItem {
    /// Client-chosen line id; minted when absent
    pub cart_item_id: Option<String>,
    /// Menu item
    pub item_id: i64,
    /// Units, at least 1
    pub quantity: i32,
    /// Unit price including customizations
    pub price: f64,
    /// Acquisition channel
    pub added_via: AddedVia,
    /// Note for the kitchen
    pub special_request: Option<String>,
    /// Selected customization ids
    pub customization_ids: Vec<String>,
    /// Cross-sell menu item ids
    pub cross_sell_item_ids: Vec<String>,
}

/// Input of [`add_items`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddItemsRequest {
    /// Existing or client-chosen cart id; minted when absent or empty
    pub cart_id: Option<String>,
    /// Session the cart belongs to
    pub session_id: String,
    /// Cafe the cart belongs to
    pub cafe_id: i64,
    /// Diner adding the items
    pub user_id: i64,
    /// Lines to add
    pub items: Vec<NewCartItem>,
    /// Cart total the client expects after the addition
    pub total_amount: f64,
    /// Discount the client applied
    pub discount_amount: f64,
}

/// Result of [`add_items`].
#[derive(Debug, Clone, PartialEq)]
pub struct AddItemsOutcome {
    /// Cart that received the items
    pub cart_id: String,
    /// Server-computed cart total
    pub total_amount: f64,
    /// `UpgradeCartAi` items for which no pending suggestion was found
    pub unmatched_suggestions: Vec<i64>,
    /// Best-effort side effects that failed
    pub warnings: Vec<String>,
}

/// Result of a single-line mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct CartUpdate {
    /// The line after the update
    pub item: cart_item::Model,
    /// Server-computed cart total after the update
    pub total_amount: f64,
}

/// A resolved customization option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomizationName {
    /// Customization id
    pub id: i64,
    /// Display name of the option
    pub name: String,
}

/// A cart line as returned by [`get_cart`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartLine {
    /// The stored line
    pub item: cart_item::Model,
    /// Names of the selected customizations
    pub customizations: Vec<CustomizationName>,
}

fn validate_line(item: &NewCartItem) -> Result<()> {
    if item.quantity < 1 {
        return Err(Error::validation(format!(
            "quantity for item {} must be at least 1",
            item.item_id
        )));
    }
    if !item.price.is_finite() || item.price < 0.0 {
        return Err(Error::validation(format!(
            "price for item {} must be a non-negative number",
            item.item_id
        )));
    }
    Ok(())
}

fn validate_amount(name: &str, amount: f64) -> Result<()> {
    if amount.is_finite() && amount >= 0.0 {
        Ok(())
    } else {
        Err(Error::validation(format!(
            "{name} must be a non-negative number"
        )))
    }
}

/// Compares the declared cart total with the computed one.
///
/// A difference above `total_tolerance` is a `Conflict` when
/// `reject_total_mismatch` is set and a warning otherwise.
pub fn reconcile_total(settings: &Settings, declared: f64, computed: f64) -> Result<()> {
    if (declared - computed).abs() <= settings.total_tolerance {
        return Ok(());
    }
    if settings.reject_total_mismatch {
        return Err(Error::conflict(format!(
            "cart total {declared:.2} does not match items total {computed:.2}"
        )));
    }
    warn!(declared, computed, "Cart total mismatch accepted");
    Ok(())
}

/// Sum of unit price x quantity over the active lines of a cart.
pub async fn compute_total<C>(db: &C, cart_id: &str) -> Result<f64>
where
    C: ConnectionTrait,
{
    let lines = CartItem::find()
        .filter(cart_item::Column::CartId.eq(cart_id))
        .filter(cart_item::Column::Status.eq(CartItemStatus::Active))
        .all(db)
        .await?;
    Ok(lines
        .iter()
        .map(|line| line.price * f64::from(line.quantity))
        .sum())
}

/// Recomputes, checks and stores a cart's total. Returns the computed total.
async fn refresh_total<C>(db: &C, settings: &Settings, cart_id: &str, declared: f64) -> Result<f64>
where
    C: ConnectionTrait,
{
    let computed = compute_total(db, cart_id).await?;
    reconcile_total(settings, declared, computed)?;
    Cart::update_many()
        .col_expr(cart::Column::TotalAmount, Expr::value(computed))
        .col_expr(cart::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(cart::Column::CartId.eq(cart_id))
        .exec(db)
        .await?;
    Ok(computed)
}

/// Reads an opaque JSON id array, accepting both string and numeric ids.
#[must_use]
pub fn id_list(value: &Json) -> Vec<String> {
    value
        .as_array()
        .map(|ids| {
            ids.iter()
                .filter_map(|id| match id {
                    Json::String(s) => Some(s.clone()),
                    Json::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Adds items to a session's cart, creating the cart on first use.
///
/// Upgrade-cart items mark the matching pending suggestion as added. A missing
/// suggestion does not fail the call; it is reported in
/// [`AddItemsOutcome::unmatched_suggestions`].
#[instrument(skip(db, settings, request), fields(session_id = %request.session_id))]
pub async fn add_items(
    db: &DatabaseConnection,
    settings: &Settings,
    request: AddItemsRequest,
) -> Result<AddItemsOutcome> {
    if request.session_id.trim().is_empty() {
        return Err(Error::validation("session_id is required"));
    }
    if request.user_id == 0 {
        return Err(Error::validation("user is not authenticated"));
    }
    if request.items.is_empty() {
        return Err(Error::validation("at least one item is required"));
    }
    validate_amount("total_amount", request.total_amount)?;
    validate_amount("discount_amount", request.discount_amount)?;
    for item in &request.items {
        validate_line(item)?;
    }

    require_active_session(db, &request.session_id).await?;

    let cart_id = request
        .cart_id
        .clone()
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let now = Utc::now();

    let txn = db.begin().await?;

    match Cart::find_by_id(cart_id.as_str()).one(&txn).await? {
        Some(existing) => {
            if existing.session_id != request.session_id {
                return Err(Error::conflict(format!(
                    "cart {cart_id} belongs to another session"
                )));
            }
            if existing.status == CartStatus::Ordered {
                return Err(Error::conflict(format!("cart {cart_id} was already ordered")));
            }
        }
        None => {
            cart::ActiveModel {
                cart_id: Set(cart_id.clone()),
                session_id: Set(request.session_id.clone()),
                user_id: Set(request.user_id),
                cafe_id: Set(request.cafe_id),
                status: Set(CartStatus::Active),
                total_amount: Set(0.0),
                discount_amount: Set(request.discount_amount),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(&txn)
            .await?;
            debug!("Created cart {}", cart_id);
        }
    }

    let mut unmatched_suggestions = Vec::new();
    for item in &request.items {
        cart_item::ActiveModel {
            cart_item_id: Set(item
                .cart_item_id
                .clone()
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())),
            cart_id: Set(cart_id.clone()),
            item_id: Set(item.item_id),
            quantity: Set(item.quantity),
            price: Set(item.price),
            status: Set(CartItemStatus::Active),
            added_via: Set(item.added_via),
            special_request: Set(item.special_request.clone()),
            customization_ids: Set(serde_json::to_value(&item.customization_ids)?),
            cross_sell_item_ids: Set(serde_json::to_value(&item.cross_sell_item_ids)?),
            added_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        if item.added_via == AddedVia::UpgradeCartAi
            && !mark_suggestion_added(&txn, &cart_id, item.item_id).await?
        {
            warn!(
                cart_id = %cart_id,
                item_id = item.item_id,
                "No pending upgrade suggestion for item"
            );
            unmatched_suggestions.push(item.item_id);
        }
    }

    let total_amount = refresh_total(&txn, settings, &cart_id, request.total_amount).await?;
    Cart::update_many()
        .col_expr(
            cart::Column::DiscountAmount,
            Expr::value(request.discount_amount),
        )
        .filter(cart::Column::CartId.eq(cart_id.as_str()))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    let mut warnings = Vec::new();
    for item in &request.items {
        if let Err(e) = bump_category_popularity(db, request.cafe_id, item.item_id).await {
            warn!(item_id = item.item_id, error = %e, "Category popularity not updated");
            warnings.push(format!("popularity for item {}: {e}", item.item_id));
        }
    }

    info!(
        "Added {} items to cart {} (total {:.2})",
        request.items.len(),
        cart_id,
        total_amount
    );
    Ok(AddItemsOutcome {
        cart_id,
        total_amount,
        unmatched_suggestions,
        warnings,
    })
}

/// Marks the most recent pending suggestion of `item_id` on a cart as added.
/// Returns `false` if there was none.
async fn mark_suggestion_added<C>(db: &C, cart_id: &str, item_id: i64) -> Result<bool>
where
    C: ConnectionTrait,
{
    let Some(suggestion) = UpgradeSuggestion::find()
        .filter(upgrade_suggestion::Column::CartId.eq(cart_id))
        .filter(upgrade_suggestion::Column::SuggestedItemId.eq(item_id))
        .filter(upgrade_suggestion::Column::UserAction.eq(SuggestionAction::Pending))
        .order_by_desc(upgrade_suggestion::Column::Id)
        .one(db)
        .await?
    else {
        return Ok(false);
    };

    let mut active: upgrade_suggestion::ActiveModel = suggestion.into();
    active.user_action = Set(SuggestionAction::Added);
    active.update(db).await?;
    Ok(true)
}

/// Increments the add-to-cart counter of the item's menu category.
async fn bump_category_popularity(db: &DatabaseConnection, cafe_id: i64, item_id: i64) -> Result<()> {
    let Some(menu_item) = MenuItem::find_by_id(item_id).one(db).await? else {
        debug!("Menu item {} unknown, popularity unchanged", item_id);
        return Ok(());
    };

    let updated = CategoryPopularity::update_many()
        .col_expr(
            category_popularity::Column::Hits,
            Expr::col(category_popularity::Column::Hits).add(1),
        )
        .filter(category_popularity::Column::CafeId.eq(cafe_id))
        .filter(category_popularity::Column::Category.eq(menu_item.category.as_str()))
        .exec(db)
        .await?;

    if updated.rows_affected == 0 {
        category_popularity::ActiveModel {
            cafe_id: Set(cafe_id),
            category: Set(menu_item.category),
            hits: Set(1),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

async fn find_line<C>(db: &C, cart_item_id: &str) -> Result<cart_item::Model>
where
    C: ConnectionTrait,
{
    CartItem::find_by_id(cart_item_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("cart item", cart_item_id))
}

fn require_editable(line: &cart_item::Model) -> Result<()> {
    if line.status.can_transition_to(CartItemStatus::Active) {
        Ok(())
    } else {
        Err(Error::conflict(format!(
            "cart item {} is {:?} and can no longer change",
            line.cart_item_id, line.status
        )))
    }
}

/// Sets a line's quantity; zero cancels the line.
///
/// Canceled and ordered lines are final and reject any change with `Conflict`.
#[instrument(skip(db, settings))]
pub async fn update_quantity(
    db: &DatabaseConnection,
    settings: &Settings,
    cart_item_id: &str,
    quantity: i32,
    cart_amount: f64,
) -> Result<CartUpdate> {
    if quantity < 0 {
        return Err(Error::validation("quantity cannot be negative"));
    }
    validate_amount("cart_amount", cart_amount)?;

    let txn = db.begin().await?;
    let line = find_line(&txn, cart_item_id).await?;

    let next = if quantity == 0 {
        CartItemStatus::Canceled
    } else {
        CartItemStatus::Active
    };
    if !line.status.can_transition_to(next) {
        return Err(Error::conflict(format!(
            "cart item {cart_item_id} is {:?} and cannot become {next:?}",
            line.status
        )));
    }

    let cart_id = line.cart_id.clone();
    let mut active: cart_item::ActiveModel = line.into();
    active.quantity = Set(quantity);
    active.status = Set(next);
    active.updated_at = Set(Utc::now());
    let item = active.update(&txn).await?;

    let total_amount = refresh_total(&txn, settings, &cart_id, cart_amount).await?;
    txn.commit().await?;

    debug!("Cart item {} now {:?} x{}", cart_item_id, next, quantity);
    Ok(CartUpdate { item, total_amount })
}

#[derive(Debug, Clone, Copy)]
enum ItemExtras {
    Customizations,
    CrossSellItems,
}

async fn replace_extras(
    db: &DatabaseConnection,
    settings: &Settings,
    cart_item_id: &str,
    extras: ItemExtras,
    ids: &[String],
    price: f64,
    cart_amount: f64,
) -> Result<CartUpdate> {
    validate_amount("price", price)?;
    validate_amount("cart_amount", cart_amount)?;

    let txn = db.begin().await?;
    let line = find_line(&txn, cart_item_id).await?;
    require_editable(&line)?;

    let cart_id = line.cart_id.clone();
    let ids = serde_json::to_value(ids)?;
    let mut active: cart_item::ActiveModel = line.into();
    match extras {
        ItemExtras::Customizations => active.customization_ids = Set(ids),
        ItemExtras::CrossSellItems => active.cross_sell_item_ids = Set(ids),
    }
    active.price = Set(price);
    active.updated_at = Set(Utc::now());
    let item = active.update(&txn).await?;

    let total_amount = refresh_total(&txn, settings, &cart_id, cart_amount).await?;
    txn.commit().await?;
    Ok(CartUpdate { item, total_amount })
}

/// Replaces a line's customizations and unit price.
#[instrument(skip(db, settings, customization_ids))]
pub async fn update_customizations(
    db: &DatabaseConnection,
    settings: &Settings,
    cart_item_id: &str,
    customization_ids: &[String],
    price: f64,
    cart_amount: f64,
) -> Result<CartUpdate> {
    replace_extras(
        db,
        settings,
        cart_item_id,
        ItemExtras::Customizations,
        customization_ids,
        price,
        cart_amount,
    )
    .await
}

/// Replaces a line's cross-sell items and unit price.
#[instrument(skip(db, settings, cross_sell_item_ids))]
pub async fn update_cross_sell_items(
    db: &DatabaseConnection,
    settings: &Settings,
    cart_item_id: &str,
    cross_sell_item_ids: &[String],
    price: f64,
    cart_amount: f64,
) -> Result<CartUpdate> {
    replace_extras(
        db,
        settings,
        cart_item_id,
        ItemExtras::CrossSellItems,
        cross_sell_item_ids,
        price,
        cart_amount,
    )
    .await
}

/// Overwrites the kitchen note of an active line.
pub async fn add_special_request(
    db: &DatabaseConnection,
    cart_item_id: &str,
    special_request: &str,
) -> Result<cart_item::Model> {
    let line = find_line(db, cart_item_id).await?;
    require_editable(&line)?;

    let mut active: cart_item::ActiveModel = line.into();
    active.special_request = Set(Some(special_request.to_string()));
    active.updated_at = Set(Utc::now());
    Ok(active.update(db).await?)
}

/// Resolves customization ids to option names. Unknown or non-numeric ids are skipped.
pub async fn resolve_customizations<C>(db: &C, ids: &[String]) -> Result<Vec<CustomizationName>>
where
    C: ConnectionTrait,
{
    let numeric: Vec<i64> = ids.iter().filter_map(|id| id.parse().ok()).collect();
    if numeric.is_empty() {
        return Ok(Vec::new());
    }

    let options = ItemCustomization::find()
        .filter(item_customization::Column::Id.is_in(numeric))
        .order_by_asc(item_customization::Column::Id)
        .all(db)
        .await?;
    Ok(options
        .into_iter()
        .map(|option| CustomizationName {
            id: option.id,
            name: option.option_name,
        })
        .collect())
}

/// Lists the non-canceled lines of a diner's cart with customization names.
#[instrument(skip(db))]
pub async fn get_cart(
    db: &DatabaseConnection,
    cart_id: &str,
    session_id: &str,
    user_id: i64,
) -> Result<Vec<CartLine>> {
    Cart::find()
        .filter(cart::Column::CartId.eq(cart_id))
        .filter(cart::Column::SessionId.eq(session_id))
        .filter(cart::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("cart", cart_id))?;

    let lines = CartItem::find()
        .filter(cart_item::Column::CartId.eq(cart_id))
        .filter(cart_item::Column::Status.ne(CartItemStatus::Canceled))
        .order_by_asc(cart_item::Column::AddedAt)
        .all(db)
        .await?;

    try_join_all(lines.into_iter().map(|item| async move {
        let customizations = resolve_customizations(db, &id_list(&item.customization_ids)).await?;
        Ok::<_, Error>(CartLine {
            item,
            customizations,
        })
    }))
    .await
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;
    use crate::entities::sea_orm_active_enums::SessionStatus;
    use sea_orm::{DatabaseBackend, MockDatabase};

    const SESSION: &str = "session-1";

    async fn setup() -> Result<DatabaseConnection> {
        let db = setup_with_cafe().await?;
        create_session(&db, SESSION, TEST_TABLE, SessionStatus::Active, 10).await?;
        Ok(db)
    }

    fn request(cart_id: Option<&str>, items: Vec<NewCartItem>, total: f64) -> AddItemsRequest {
        AddItemsRequest {
            cart_id: cart_id.map(ToString::to_string),
            session_id: SESSION.to_string(),
            cafe_id: TEST_CAFE,
            user_id: 10,
            items,
            total_amount: total,
            discount_amount: 0.0,
        }
    }

    #[tokio::test]
    async fn test_add_items_mints_cart_and_computes_total() -> Result<()> {
        let db = setup().await?;
        let mut latte = line(1, 120.0);
        latte.quantity = 2;

        let outcome = add_items(
            &db,
            &test_settings(),
            request(None, vec![latte, line(2, 60.0)], 300.0),
        )
        .await?;

        assert!(!outcome.cart_id.is_empty());
        assert_eq!(outcome.total_amount, 300.0);
        let stored = Cart::find_by_id(outcome.cart_id.as_str()).one(&db).await?.unwrap();
        assert_eq!(stored.status, CartStatus::Active);
        assert_eq!(stored.total_amount, 300.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_client_cart_id_is_created_then_reused() -> Result<()> {
        let db = setup().await?;
        let settings = test_settings();

        let first = add_items(&db, &settings, request(Some("cart-a"), vec![line(1, 100.0)], 100.0))
            .await?;
        let second = add_items(&db, &settings, request(Some("cart-a"), vec![line(2, 50.0)], 150.0))
            .await?;

        assert_eq!(first.cart_id, "cart-a");
        assert_eq!(second.cart_id, "cart-a");
        assert_eq!(second.total_amount, 150.0);
        assert_eq!(Cart::find().all(&db).await?.len(), 1);
        assert_eq!(CartItem::find().all(&db).await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_total_mismatch_is_rejected_and_rolled_back() -> Result<()> {
        let db = setup().await?;

        let result = add_items(
            &db,
            &test_settings(),
            request(Some("cart-a"), vec![line(1, 100.0)], 90.0),
        )
        .await;

        assert!(matches!(result, Err(Error::Conflict { .. })));
        assert!(Cart::find_by_id("cart-a").one(&db).await?.is_none());
        assert!(CartItem::find().all(&db).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_total_mismatch_tolerated_when_not_rejecting() -> Result<()> {
        let db = setup().await?;
        let settings = Settings {
            reject_total_mismatch: false,
            ..test_settings()
        };

        let outcome = add_items(&db, &settings, request(None, vec![line(1, 100.0)], 90.0)).await?;
        // The stored total is always the computed one
        assert_eq!(outcome.total_amount, 100.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_inactive_or_missing_session_is_rejected() -> Result<()> {
        let db = setup_with_cafe().await?;
        create_session(&db, SESSION, TEST_TABLE, SessionStatus::Inactive, 10).await?;
        let settings = test_settings();

        let result = add_items(&db, &settings, request(None, vec![line(1, 100.0)], 100.0)).await;
        assert!(matches!(result, Err(Error::Conflict { .. })));

        let mut orphan = request(None, vec![line(1, 100.0)], 100.0);
        orphan.session_id = "missing".to_string();
        let result = add_items(&db, &settings, orphan).await;
        assert!(matches!(result, Err(Error::NotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_ordered_cart_rejects_more_items() -> Result<()> {
        let db = setup().await?;
        create_cart(&db, "cart-a", SESSION, 10, 100.0).await?;
        Cart::update_many()
            .col_expr(cart::Column::Status, Expr::value(CartStatus::Ordered))
            .exec(&db)
            .await?;

        let result = add_items(
            &db,
            &test_settings(),
            request(Some("cart-a"), vec![line(1, 100.0)], 100.0),
        )
        .await;
        assert!(matches!(result, Err(Error::Conflict { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_upgrade_items_mark_latest_pending_suggestion() -> Result<()> {
        let db = setup().await?;
        create_cart(&db, "cart-a", SESSION, 10, 0.0).await?;
        let older = create_suggestion(&db, "cart-a", 5).await?;
        let newer = create_suggestion(&db, "cart-a", 5).await?;

        let mut upgrade = line(5, 80.0);
        upgrade.added_via = AddedVia::UpgradeCartAi;
        let mut unmatched = line(6, 20.0);
        unmatched.added_via = AddedVia::UpgradeCartAi;

        let outcome = add_items(
            &db,
            &test_settings(),
            request(Some("cart-a"), vec![upgrade, unmatched], 100.0),
        )
        .await?;

        assert_eq!(outcome.unmatched_suggestions, vec![6]);
        let older = UpgradeSuggestion::find_by_id(older.id).one(&db).await?.unwrap();
        let newer = UpgradeSuggestion::find_by_id(newer.id).one(&db).await?.unwrap();
        assert_eq!(older.user_action, SuggestionAction::Pending);
        assert_eq!(newer.user_action, SuggestionAction::Added);
        Ok(())
    }

    #[tokio::test]
    async fn test_category_popularity_counts_additions() -> Result<()> {
        let db = setup().await?;
        create_menu_item(&db, 1, "Latte", "Coffee", 100.0).await?;
        create_menu_item(&db, 2, "Mocha", "Coffee", 100.0).await?;
        let settings = test_settings();

        add_items(&db, &settings, request(Some("cart-a"), vec![line(1, 100.0)], 100.0)).await?;
        let outcome =
            add_items(&db, &settings, request(Some("cart-a"), vec![line(2, 100.0)], 200.0)).await?;

        assert!(outcome.warnings.is_empty());
        let counters = CategoryPopularity::find().all(&db).await?;
        assert_eq!(counters.len(), 1);
        assert_eq!(counters[0].category, "Coffee");
        assert_eq!(counters[0].hits, 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_zero_quantity_cancels_line_for_good() -> Result<()> {
        let db = setup().await?;
        let settings = test_settings();
        let mut first = line(1, 100.0);
        first.cart_item_id = Some("line-1".to_string());
        let mut second = line(2, 50.0);
        second.cart_item_id = Some("line-2".to_string());
        add_items(&db, &settings, request(Some("cart-a"), vec![first, second], 150.0)).await?;

        let update = update_quantity(&db, &settings, "line-1", 0, 50.0).await?;
        assert_eq!(update.item.status, CartItemStatus::Canceled);
        assert_eq!(update.item.quantity, 0);
        assert_eq!(update.total_amount, 50.0);

        for quantity in [0, 3] {
            let again = update_quantity(&db, &settings, "line-1", quantity, 50.0).await;
            assert!(matches!(again, Err(Error::Conflict { .. })));
        }
        let stored = CartItem::find_by_id("line-1").one(&db).await?.unwrap();
        assert_eq!(stored.status, CartItemStatus::Canceled);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_quantity_recomputes_total() -> Result<()> {
        let db = setup().await?;
        let settings = test_settings();
        let mut first = line(1, 100.0);
        first.cart_item_id = Some("line-1".to_string());
        add_items(&db, &settings, request(Some("cart-a"), vec![first], 100.0)).await?;

        let update = update_quantity(&db, &settings, "line-1", 3, 300.0).await?;
        assert_eq!(update.item.quantity, 3);
        assert_eq!(update.total_amount, 300.0);

        let stale = update_quantity(&db, &settings, "line-1", 2, 300.0).await;
        assert!(matches!(stale, Err(Error::Conflict { .. })));
        let stored = CartItem::find_by_id("line-1").one(&db).await?.unwrap();
        assert_eq!(stored.quantity, 3);

        let negative = update_quantity(&db, &settings, "line-1", -1, 0.0).await;
        assert!(matches!(negative, Err(Error::Validation { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_customizations_replaces_ids_and_price() -> Result<()> {
        let db = setup().await?;
        let settings = test_settings();
        let mut first = line(1, 100.0);
        first.cart_item_id = Some("line-1".to_string());
        first.customization_ids = vec!["1".to_string()];
        add_items(&db, &settings, request(Some("cart-a"), vec![first], 100.0)).await?;

        let ids = vec!["2".to_string(), "3".to_string()];
        let update = update_customizations(&db, &settings, "line-1", &ids, 140.0, 140.0).await?;
        assert_eq!(id_list(&update.item.customization_ids), ids);
        assert_eq!(update.item.price, 140.0);
        assert_eq!(update.total_amount, 140.0);

        let cross = vec!["9".to_string()];
        let update = update_cross_sell_items(&db, &settings, "line-1", &cross, 140.0, 140.0).await?;
        assert_eq!(id_list(&update.item.cross_sell_item_ids), cross);
        assert_eq!(id_list(&update.item.customization_ids), ids);
        Ok(())
    }

    #[tokio::test]
    async fn test_special_request_only_on_active_lines() -> Result<()> {
        let db = setup().await?;
        create_cart(&db, "cart-a", SESSION, 10, 0.0).await?;
        create_cart_line(&db, "open", "cart-a", 1, CartItemStatus::Active).await?;
        create_cart_line(&db, "gone", "cart-a", 2, CartItemStatus::Canceled).await?;

        let updated = add_special_request(&db, "open", "extra hot").await?;
        assert_eq!(updated.special_request.as_deref(), Some("extra hot"));
        assert!(matches!(
            add_special_request(&db, "gone", "extra hot").await,
            Err(Error::Conflict { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_get_cart_skips_canceled_and_resolves_customizations() -> Result<()> {
        let db = setup().await?;
        create_menu_item(&db, 1, "Latte", "Coffee", 100.0).await?;
        create_customization(&db, 11, 1, "Oat milk").await?;
        create_customization(&db, 12, 1, "Extra shot").await?;
        let settings = test_settings();

        let mut latte = line(1, 140.0);
        latte.customization_ids = vec!["12".to_string(), "11".to_string(), "bogus".to_string()];
        let mut dropped = line(2, 50.0);
        dropped.cart_item_id = Some("dropped".to_string());
        add_items(&db, &settings, request(Some("cart-a"), vec![latte, dropped], 190.0)).await?;
        update_quantity(&db, &settings, "dropped", 0, 140.0).await?;

        let lines = get_cart(&db, "cart-a", SESSION, 10).await?;
        assert_eq!(lines.len(), 1);
        let names: Vec<_> = lines[0].customizations.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Oat milk", "Extra shot"]);

        let other_user = get_cart(&db, "cart-a", SESSION, 99).await;
        assert!(matches!(other_user, Err(Error::NotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_requests_never_reach_the_store() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let settings = test_settings();

        let empty = add_items(&db, &settings, request(None, Vec::new(), 0.0)).await;
        assert!(matches!(empty, Err(Error::Validation { .. })));

        let mut zero = line(1, 100.0);
        zero.quantity = 0;
        let zero = add_items(&db, &settings, request(None, vec![zero], 0.0)).await;
        assert!(matches!(zero, Err(Error::Validation { .. })));

        let mut anonymous = request(None, vec![line(1, 100.0)], 100.0);
        anonymous.user_id = 0;
        let anonymous = add_items(&db, &settings, anonymous).await;
        assert!(matches!(anonymous, Err(Error::Validation { .. })));
    }

    #[test]
    fn test_id_list_accepts_strings_and_numbers() {
        let ids = id_list(&serde_json::json!(["1", 2, null, "x"]));
        assert_eq!(ids, vec!["1", "2", "x"]);
        assert!(id_list(&serde_json::json!({"a": 1})).is_empty());
    }
}
